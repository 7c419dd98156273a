//! Writers for the graph itself: dot for inspection, GFA1 for downstream
//! tools. Contig FASTA lives next door in sequence generation.
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::multigraph::EdgeId;

use super::MultiplexDbg;

impl MultiplexDbg {
    /// A dot digraph: each vertex labeled with its word length, each edge with
    /// its signed size and uniqueness flag.
    pub fn serialize_to_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut wtr = BufWriter::new(File::create(path)?);
        writeln!(wtr, "digraph {{")?;
        for v in self.graph.nodes() {
            writeln!(wtr, "    {} [label=\"{}\"];", v, self.vertex(v).len())?;
        }
        for e in self.graph.edge_ids() {
            let prop = self.edge(e);
            writeln!(
                wtr,
                "    {} -> {} [label=\"{}\\n{}\"];",
                self.graph.edge_from(e),
                self.graph.edge_to(e),
                prop.size(),
                prop.is_unique() as u8,
            )?;
        }
        writeln!(wtr, "}}")?;
        Ok(())
    }

    /// For every edge, the segment that represents it in the GFA together
    /// with the orientation of the traversal: the canonical sibling spells
    /// forward, its twin spells the reverse complement.
    fn gfa_representatives(&self) -> HashMap<EdgeId, (EdgeId, bool)> {
        let mut rep = HashMap::new();
        for e in self.graph.edge_ids() {
            if rep.contains_key(&e) {
                continue;
            }
            match self.edge(e).rc() {
                Some(t) if t != e => {
                    let spelled_e = self.spell_path(&[e]);
                    let spelled_t = self.spell_path(&[t]);
                    let (canon, other) = if (&spelled_e, e) <= (&spelled_t, t) {
                        (e, t)
                    } else {
                        (t, e)
                    };
                    rep.insert(canon, (canon, true));
                    rep.insert(other, (canon, false));
                }
                _ => {
                    rep.insert(e, (e, true));
                }
            }
        }
        rep
    }

    /// GFA1: one S record per canonical edge carrying the reconstructed full
    /// sequence, and one L record per incident edge pair at every vertex with
    /// the word overlap as a cigar. Mirrored links are written once.
    pub fn serialize_to_gfa<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut wtr = BufWriter::new(File::create(path)?);
        writeln!(wtr, "H\tVN:Z:1.0")?;
        let rep = self.gfa_representatives();
        for e in self.graph.edge_ids() {
            if rep[&e] != (e, true) {
                continue;
            }
            let seq = self.spell_path(&[e]);
            writeln!(wtr, "S\tedge_{}\t{}\tLN:i:{}", e, seq, seq.len())?;
        }
        let orient = |forward: bool| if forward { '+' } else { '-' };
        let mut seen: HashSet<(EdgeId, bool, EdgeId, bool)> = HashSet::new();
        for v in self.graph.nodes() {
            let overlap = self.vertex(v).len().saturating_sub(1);
            let in_edges: Vec<EdgeId> = self.graph.in_edges(v).collect();
            for &a in in_edges.iter() {
                for b in self.graph.out_edges(v) {
                    let (sa, fa) = rep[&a];
                    let (sb, fb) = rep[&b];
                    let record = (sa, fa, sb, fb);
                    let mirror = (sb, !fb, sa, !fa);
                    if seen.contains(&mirror) || !seen.insert(record) {
                        continue;
                    }
                    writeln!(
                        wtr,
                        "L\tedge_{}\t{}\tedge_{}\t{}\t{}M",
                        sa,
                        orient(fa),
                        sb,
                        orient(fb),
                        overlap,
                    )?;
                }
            }
        }
        Ok(())
    }
}
