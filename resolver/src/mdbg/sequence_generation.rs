//! How the multiplex graph spells sequences: maximal non-branching paths are
//! reduced to contigs, trimming the shared vertex word at every internal
//! vertex and the claimed overlap on every negative-size edge.
use std::collections::HashSet;
use std::path::Path;

use definitions::DnaSeq;
use rayon::prelude::*;

use crate::error::ResolveError;
use crate::multigraph::{EdgeId, NodeId};

use super::MultiplexDbg;

/// One assembled contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub id: String,
    pub seq: DnaSeq,
}

impl MultiplexDbg {
    /// Spell a walk: the start word of the first edge, then for every edge its
    /// inner fragment (or an overlap trim) followed by the end word.
    pub(crate) fn spell_path(&self, path: &[EdgeId]) -> DnaSeq {
        let mut seq = self.vertex(self.graph.edge_from(path[0])).seq().clone();
        for &e in path.iter() {
            let prop = self.edge(e);
            let size = prop.size();
            if size >= 0 {
                seq.extend(prop.seq());
            } else {
                seq.truncate(seq.len() - (-size) as usize);
            }
            seq.extend(self.vertex(self.graph.edge_to(e)).seq());
        }
        seq
    }

    fn is_through_vertex(&self, v: NodeId) -> bool {
        if self.graph.in_degree(v) != 1 || self.graph.out_degree(v) != 1 {
            return false;
        }
        let ie = self.graph.in_edges(v).next().unwrap();
        let oe = self.graph.out_edges(v).next().unwrap();
        ie != oe
    }

    /// Every maximal non-branching path, each edge appearing exactly once.
    /// In a valid graph the interior vertices are gone already (a 1-in-1-out
    /// vertex must be a frozen loop), so most paths are single edges.
    fn maximal_paths(&self) -> Vec<Vec<EdgeId>> {
        let mut used: HashSet<EdgeId> = HashSet::new();
        let mut paths = Vec::new();
        for v in self.graph.nodes() {
            if self.is_through_vertex(v) {
                continue;
            }
            for e in self.graph.out_edges(v) {
                if used.contains(&e) {
                    continue;
                }
                let mut path = vec![e];
                used.insert(e);
                let mut cur = self.graph.edge_to(e);
                while self.is_through_vertex(cur) {
                    let next = self.graph.out_edges(cur).next().unwrap();
                    if used.contains(&next) {
                        break;
                    }
                    path.push(next);
                    used.insert(next);
                    cur = self.graph.edge_to(next);
                }
                paths.push(path);
            }
        }
        // cycles made of through vertices only
        for e in self.graph.edge_ids() {
            if used.contains(&e) {
                continue;
            }
            let mut path = vec![e];
            used.insert(e);
            let mut cur = self.graph.edge_to(e);
            loop {
                let next = self.graph.out_edges(cur).next().unwrap();
                if used.contains(&next) {
                    break;
                }
                path.push(next);
                used.insert(next);
                cur = self.graph.edge_to(next);
            }
            paths.push(path);
        }
        paths
    }

    /// Walk the graph, emit every canonical contig into `fasta_path` and hand
    /// the records back. A sequence is canonical when it is lexicographically
    /// at most its reverse complement; sibling walks spell the complement and
    /// are dropped through a seen-set.
    pub fn print_trim_edges<P: AsRef<Path>>(
        &self,
        fasta_path: P,
    ) -> Result<Vec<Contig>, ResolveError> {
        if !self.is_frozen() {
            warn!("The graph is not fully frozen; contigs are best-effort");
        }
        let paths = self.maximal_paths();
        let spelled: Vec<DnaSeq> = paths.par_iter().map(|p| self.spell_path(p)).collect();
        let mut seen = HashSet::new();
        let mut contigs = Vec::new();
        for seq in spelled {
            let rc = seq.revcomp();
            if seq <= rc && seen.insert(seq.clone()) {
                let id = format!("contig_{:04}", contigs.len());
                contigs.push(Contig { id, seq });
            }
        }
        debug!(
            "Spelled {} contigs, {} symbols in total",
            contigs.len(),
            contigs.iter().map(|c| c.seq.len()).sum::<usize>()
        );
        let mut wtr = bio::io::fasta::Writer::to_file(fasta_path)?;
        for contig in contigs.iter() {
            wtr.write(&contig.id, None, contig.seq.to_string().as_bytes())?;
        }
        Ok(contigs)
    }
}
