//! The multiplex de Bruijn graph.
//!
//! Vertices carry DNA words whose length grows over the transform; edges carry
//! only the fragment strictly between their endpoint words, with a signed size
//! that goes negative when the words overlap. The graph owns the read-path
//! registry: every mutation that creates or retires an edge keeps the registry
//! in sync, so that between steps the two structures always agree.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use definitions::{DnaSeq, SparseDbg};

use crate::error::ResolveError;
use crate::multigraph::{EdgeId, MultiGraph, NodeId};
use crate::read_paths::ReadPaths;
use crate::topology::{EdgeProp, SuccinctEdgeRecord, VertexProp};

mod increase;
pub mod mdbg_test;
mod sequence_generation;
mod serialize;

pub use increase::{KIncreaser, StepReport};
pub use sequence_generation::Contig;

/// Resolved transition pairs around a complex vertex: incoming edge to the set
/// of outgoing partners, and the reverse map.
pub type EdgePairs = (
    BTreeMap<EdgeId, BTreeSet<EdgeId>>,
    BTreeMap<EdgeId, BTreeSet<EdgeId>>,
);

#[derive(Debug)]
pub struct MultiplexDbg {
    pub(crate) graph: MultiGraph<VertexProp, EdgeProp>,
    pub(crate) paths: ReadPaths,
    pub(crate) next_vertex: NodeId,
    pub(crate) next_edge: EdgeId,
}

impl std::fmt::Display for MultiplexDbg {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let frozen = self.graph.nodes().filter(|&v| self.vertex(v).is_frozen()).count();
        write!(
            f,
            "Vertices:{}({} frozen), Edges:{}, Paths:{}",
            self.graph.node_count(),
            frozen,
            self.graph.edge_count(),
            self.paths.len(),
        )
    }
}

impl MultiplexDbg {
    /// Build the graph from succinct edge records. The edge index of record
    /// `i` is `i`; read paths must refer to these indices.
    pub fn from_records(
        records: Vec<SuccinctEdgeRecord>,
        start_k: usize,
        paths: ReadPaths,
    ) -> Result<Self, ResolveError> {
        let mut graph = MultiGraph::new();
        let mut next_vertex = 0;
        let mut next_edge = 0;
        for (index, rec) in records.into_iter().enumerate() {
            let malformed = |reason: String| ResolveError::MalformedRecord { index, reason };
            if rec.start_word.len() != start_k || rec.end_word.len() != start_k {
                return Err(malformed(format!(
                    "vertex words must have length {}, got {} and {}",
                    start_k,
                    rec.start_word.len(),
                    rec.end_word.len()
                )));
            }
            if rec.inner_size >= 0 {
                if rec.inner_seq.len() as i64 != rec.inner_size {
                    return Err(malformed(format!(
                        "inner sequence has length {} but size says {}",
                        rec.inner_seq.len(),
                        rec.inner_size
                    )));
                }
            } else {
                let overlap = (-rec.inner_size) as usize;
                if !rec.inner_seq.is_empty() {
                    return Err(malformed(
                        "negative size with a non-empty inner sequence".to_string(),
                    ));
                }
                if overlap >= start_k
                    || rec.start_word.suffix(overlap) != rec.end_word.prefix(overlap)
                {
                    return Err(malformed(format!(
                        "endpoint words do not overlap by {} symbols",
                        overlap
                    )));
                }
            }
            for (id, word) in [(rec.start_id, &rec.start_word), (rec.end_id, &rec.end_word)] {
                if !graph.add_node(id, VertexProp::new(word.clone()))
                    && graph.node_prop(id).seq() != word
                {
                    return Err(malformed(format!(
                        "vertex {} already has word {}, record says {}",
                        id,
                        graph.node_prop(id).seq(),
                        word
                    )));
                }
                next_vertex = next_vertex.max(id + 1);
            }
            graph.add_edge(
                next_edge,
                rec.start_id,
                rec.end_id,
                EdgeProp::new(rec.inner_seq, rec.inner_size, rec.unique),
            );
            next_edge += 1;
        }
        for (index, path) in paths.paths().iter().enumerate() {
            if let Some(&dead) = path.iter().find(|&&e| !graph.contains_edge(e)) {
                return Err(ResolveError::MalformedPath {
                    index,
                    reason: format!("edge {} is not in the graph", dead),
                });
            }
        }
        let mut mdbg = Self {
            graph,
            paths,
            next_vertex,
            next_edge,
        };
        mdbg.link_rc_siblings();
        mdbg.freeze_unpaired_vertices()?;
        mdbg.assert_validity()?;
        debug!("Constructed multiplex graph: {}", mdbg);
        Ok(mdbg)
    }

    /// Build the graph from a sparse de Bruijn graph view. Each edge sequence
    /// is sliced into a `start_k`-prefix word, a `start_k`-suffix word and the
    /// signed infix between them.
    pub fn from_sparse_dbg(
        dbg: &SparseDbg,
        start_k: usize,
        paths: ReadPaths,
    ) -> Result<Self, ResolveError> {
        let vert2ind: HashMap<&str, NodeId> = dbg
            .vertices
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as NodeId))
            .collect();
        let mut records = Vec::with_capacity(dbg.edges.len());
        for (index, edge) in dbg.edges.iter().enumerate() {
            let malformed = |reason: String| ResolveError::MalformedRecord { index, reason };
            let start_id = *vert2ind
                .get(edge.start.as_str())
                .ok_or_else(|| malformed(format!("unknown start vertex {:?}", edge.start)))?;
            let end_id = *vert2ind
                .get(edge.end.as_str())
                .ok_or_else(|| malformed(format!("unknown end vertex {:?}", edge.end)))?;
            let seq = &edge.seq;
            if seq.len() <= start_k {
                return Err(malformed(format!(
                    "edge sequence of length {} does not extend past k={}",
                    seq.len(),
                    start_k
                )));
            }
            let inner_size = seq.len() as i64 - 2 * start_k as i64;
            let inner_seq = if inner_size > 0 {
                seq.sub(start_k, inner_size as usize)
            } else {
                DnaSeq::new()
            };
            records.push(SuccinctEdgeRecord {
                start_id,
                start_word: seq.prefix(start_k),
                end_id,
                end_word: seq.suffix(start_k),
                inner_seq,
                inner_size,
                unique: edge.unique,
            });
        }
        Self::from_records(records, start_k, paths)
    }

    pub fn vertex(&self, v: NodeId) -> &VertexProp {
        self.graph.node_prop(v)
    }
    pub fn edge(&self, e: EdgeId) -> &EdgeProp {
        self.graph.edge_prop(e)
    }
    pub fn edge_endpoints(&self, e: EdgeId) -> (NodeId, NodeId) {
        (self.graph.edge_from(e), self.graph.edge_to(e))
    }
    pub fn vertices(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.nodes()
    }
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.graph.edge_ids()
    }
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
    pub fn in_degree(&self, v: NodeId) -> usize {
        self.graph.in_degree(v)
    }
    pub fn out_degree(&self, v: NodeId) -> usize {
        self.graph.out_degree(v)
    }
    pub fn paths(&self) -> &ReadPaths {
        &self.paths
    }
    pub fn contains_vertex(&self, v: NodeId) -> bool {
        self.graph.contains_node(v)
    }
    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.graph.contains_edge(e)
    }

    pub fn in_edge_indexes(&self, v: NodeId) -> Vec<EdgeId> {
        self.graph.in_edges(v).collect()
    }
    pub fn out_edge_indexes(&self, v: NodeId) -> Vec<EdgeId> {
        self.graph.out_edges(v).collect()
    }
    pub fn is_vertex_complex(&self, v: NodeId) -> bool {
        self.graph.in_degree(v) >= 2 && self.graph.out_degree(v) >= 2
    }

    /// True when every vertex is frozen.
    pub fn is_frozen(&self) -> bool {
        self.graph
            .nodes()
            .all(|v| self.graph.node_prop(v).is_frozen())
    }
    pub fn frozen_count(&self) -> usize {
        self.graph
            .nodes()
            .filter(|&v| self.graph.node_prop(v).is_frozen())
            .count()
    }
    pub fn unfrozen_vertices(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|&v| !self.graph.node_prop(v).is_frozen())
            .collect()
    }
    pub fn min_unfrozen_len(&self) -> Option<usize> {
        self.graph
            .nodes()
            .filter(|&v| !self.graph.node_prop(v).is_frozen())
            .map(|v| self.graph.node_prop(v).len())
            .min()
    }

    /// The length of the genomic region an edge spans, endpoint words included.
    pub fn full_edge_size(&self, e: EdgeId) -> usize {
        let from_len = self.graph.node_prop(self.graph.edge_from(e)).len() as i64;
        let to_len = self.graph.node_prop(self.graph.edge_to(e)).len() as i64;
        let size = self.graph.edge_prop(e).size();
        if size < 0 {
            assert!(from_len >= -size, "overlap exceeds start word of edge {}", e);
            assert!(to_len >= -size, "overlap exceeds end word of edge {}", e);
        }
        (from_len + size + to_len) as usize
    }

    pub fn freeze_vertex(&mut self, v: NodeId) {
        self.graph.node_prop_mut(v).freeze();
    }

    /// Propagate freezing: a neighbor of a frozen vertex freezes as soon as
    /// the edge between them is one symbol short of absorbing it.
    pub fn spread_frost(&mut self) {
        let mut prev: BTreeSet<NodeId> = self
            .graph
            .nodes()
            .filter(|&v| self.graph.node_prop(v).is_frozen())
            .collect();
        while !prev.is_empty() {
            let mut newly = BTreeSet::new();
            for &v in prev.iter() {
                let incident: Vec<(EdgeId, NodeId)> = self
                    .graph
                    .in_edges(v)
                    .map(|e| (e, self.graph.edge_from(e)))
                    .chain(self.graph.out_edges(v).map(|e| (e, self.graph.edge_to(e))))
                    .collect();
                for (e, n) in incident {
                    if !self.graph.node_prop(n).is_frozen()
                        && self.full_edge_size(e) == 1 + self.graph.node_prop(n).len()
                    {
                        self.freeze_vertex(n);
                        newly.insert(n);
                    }
                }
            }
            prev = newly;
        }
    }

    /// Freeze every vertex that the transform could not handle: isolated
    /// self-loops, complex vertices with unpaired edges, and tips without an
    /// unambiguous extension; then let the frost spread.
    pub fn freeze_unpaired_vertices(&mut self) -> Result<(), ResolveError> {
        let snapshot: Vec<NodeId> = self.graph.nodes().collect();
        for v in snapshot {
            if self.graph.node_prop(v).is_frozen() {
                continue;
            }
            let in_edges = self.in_edge_indexes(v);
            let out_edges = self.out_edge_indexes(v);
            if in_edges.len() == 1 && out_edges.len() == 1 {
                if in_edges != out_edges {
                    return Err(ResolveError::Invariant(format!(
                        "vertex {} has one incoming and one outgoing edge but is not a loop",
                        v
                    )));
                }
                self.freeze_vertex(v);
            } else if in_edges.len() >= 2 && out_edges.len() >= 2 {
                let (s2e, e2s) = self.edge_pairs_vertex(v);
                if in_edges.iter().any(|e| !s2e.contains_key(e))
                    || out_edges.iter().any(|e| !e2s.contains_key(e))
                {
                    self.freeze_vertex(v);
                }
            } else if (in_edges.is_empty() && out_edges.len() != 1)
                || (out_edges.is_empty() && in_edges.len() != 1)
            {
                self.freeze_vertex(v);
            }
            self.spread_frost();
        }
        Ok(())
    }

    pub(crate) fn freeze_isolated_loops(&mut self) {
        let snapshot: Vec<NodeId> = self.unfrozen_vertices();
        for v in snapshot {
            if self.graph.in_degree(v) == 1 && self.graph.out_degree(v) == 1 {
                let ie = self.graph.in_edges(v).next().unwrap();
                let oe = self.graph.out_edges(v).next().unwrap();
                if ie == oe {
                    self.freeze_vertex(v);
                }
            }
        }
    }

    /// Which incoming edge continues into which outgoing edge at `v`.
    ///
    /// Pairs come from three sources, in order: read-path evidence, the
    /// single-unique-loop extension, and the all-unique closure over whatever
    /// is still unpaired after the first two.
    pub fn edge_pairs_vertex(&self, v: NodeId) -> EdgePairs {
        let in_edges = self.in_edge_indexes(v);
        let out_edges = self.out_edge_indexes(v);
        let mut s2e: BTreeMap<EdgeId, BTreeSet<EdgeId>> = BTreeMap::new();
        let mut e2s: BTreeMap<EdgeId, BTreeSet<EdgeId>> = BTreeMap::new();
        let pair = |s2e: &mut BTreeMap<EdgeId, BTreeSet<EdgeId>>,
                        e2s: &mut BTreeMap<EdgeId, BTreeSet<EdgeId>>,
                        a: EdgeId,
                        b: EdgeId| {
            s2e.entry(a).or_default().insert(b);
            e2s.entry(b).or_default().insert(a);
        };
        for &a in in_edges.iter() {
            for &b in out_edges.iter() {
                if self.paths.contains_pair(a, b) {
                    pair(&mut s2e, &mut e2s, a, b);
                }
            }
        }
        let loops: Vec<EdgeId> = in_edges
            .iter()
            .copied()
            .filter(|e| out_edges.contains(e))
            .collect();
        if let [lp] = loops[..] {
            if self.graph.edge_prop(lp).is_unique() {
                if in_edges.len() == 2 {
                    let other = in_edges.iter().copied().find(|&e| e != lp).unwrap();
                    pair(&mut s2e, &mut e2s, other, lp);
                }
                if out_edges.len() == 2 {
                    let other = out_edges.iter().copied().find(|&e| e != lp).unwrap();
                    pair(&mut s2e, &mut e2s, lp, other);
                }
            }
        }
        let unpaired_in: Vec<EdgeId> = in_edges
            .iter()
            .copied()
            .filter(|e| !s2e.contains_key(e))
            .collect();
        let unpaired_out: Vec<EdgeId> = out_edges
            .iter()
            .copied()
            .filter(|e| !e2s.contains_key(e))
            .collect();
        let all_in_unique = in_edges.iter().all(|&e| self.graph.edge_prop(e).is_unique());
        let all_out_unique = out_edges
            .iter()
            .all(|&e| self.graph.edge_prop(e).is_unique());
        if let ([a], [b]) = (&unpaired_in[..], &unpaired_out[..]) {
            if all_in_unique || all_out_unique {
                pair(&mut s2e, &mut e2s, *a, *b);
            }
        }
        (s2e, e2s)
    }

    pub(crate) fn new_vertex(&mut self, seq: DnaSeq) -> NodeId {
        let id = self.next_vertex;
        self.next_vertex += 1;
        self.graph.add_node(id, VertexProp::new(seq));
        id
    }

    /// Bridge a resolved `(in_edge, out_edge)` pair with a fresh edge between
    /// the two split vertices. The split words are equal-length copies grown
    /// around the dismantled vertex, so the new edge overlaps them by all but
    /// one symbol. The read paths are rewritten in the same transaction.
    pub(crate) fn add_connecting_edge(
        &mut self,
        left: NodeId,
        right: NodeId,
        in_edge: EdgeId,
        out_edge: EdgeId,
    ) -> EdgeId {
        assert_ne!(left, right, "can only connect distinct split vertices");
        let left_len = self.graph.node_prop(left).len();
        assert_eq!(left_len, self.graph.node_prop(right).len());
        let id = self.next_edge;
        self.next_edge += 1;
        let size = -(left_len as i64) + 1;
        self.paths.add(in_edge, out_edge, id);
        self.graph
            .add_edge(id, left, right, EdgeProp::new(DnaSeq::new(), size, false));
        id
    }

    /// Merge `e1: s1 -> v` and `e2: v -> s3` into a single `e1: s1 -> s3`,
    /// absorbing `v`'s word. Read paths, the retired index `e2` and the
    /// reverse-complement links are all updated here.
    pub fn merge_edges(&mut self, e1: EdgeId, e2: EdgeId) {
        assert_ne!(e1, e2, "cannot merge an edge with itself");
        let mid = self.graph.edge_to(e1);
        assert_eq!(mid, self.graph.edge_from(e2), "edges are not consecutive");
        assert!(
            !self.graph.node_prop(mid).is_frozen(),
            "cannot merge edges via a frozen vertex"
        );
        self.paths.merge(e1, e2);
        let s1 = self.graph.edge_from(e1);
        let (_, s3, e2_prop) = self.graph.remove_edge(e2);
        self.graph.move_edge(e1, s1, s3);
        if let Some(w) = self.graph.node_prop(mid).rc() {
            // the sibling merge retires the twin vertex on its own
            if w != mid
                && self.graph.contains_node(w)
                && self.graph.node_prop(w).rc() == Some(mid)
            {
                self.graph.node_prop_mut(w).set_rc(None);
            }
        }
        let mid_prop = self.graph.remove_node(mid);
        let new_rc = match e2_prop.rc() {
            Some(t) if t == e1 => Some(e1),
            Some(t) if t == e2 => None,
            other => other,
        };
        self.graph.edge_prop_mut(e1).merge(mid_prop, e2_prop);
        self.graph.edge_prop_mut(e1).set_rc(new_rc);
        if let Some(t) = new_rc {
            if t != e1 && self.graph.contains_edge(t) {
                self.graph.edge_prop_mut(t).set_rc(Some(e1));
            }
        }
    }

    /// Take `len` symbols preceding the end word of `e`: from the tail of the
    /// inner fragment while it lasts, then from the start word, bookkeeping
    /// the growing overlap through the signed size.
    pub(crate) fn extract_edge_pre_end_suffix(&mut self, e: EdgeId, len: usize) -> DnaSeq {
        let from = self.graph.edge_from(e);
        let to = self.graph.edge_to(e);
        assert!(len + self.graph.node_prop(to).len() <= self.full_edge_size(e));
        let inner_part = len.min(self.graph.edge_prop(e).size().max(0) as usize);
        let start_part = len - inner_part;
        let shift = -self.graph.edge_prop(e).size();
        let mut suffix = if start_part > 0 {
            self.graph.node_prop(from).seq_suffix(start_part, shift)
        } else {
            DnaSeq::new()
        };
        if inner_part > 0 {
            let inner = self.graph.edge_prop_mut(e).extract_seq_suffix(inner_part);
            suffix.extend(&inner);
        }
        if start_part > 0 {
            self.graph.edge_prop_mut(e).shorten_with_empty_seq(start_part);
        }
        suffix
    }

    /// Mirror image of [extract_edge_pre_end_suffix]: take `len` symbols
    /// following the start word of `e`.
    pub(crate) fn extract_edge_post_start_prefix(&mut self, e: EdgeId, len: usize) -> DnaSeq {
        let from = self.graph.edge_from(e);
        let to = self.graph.edge_to(e);
        assert!(len + self.graph.node_prop(from).len() <= self.full_edge_size(e));
        let inner_part = len.min(self.graph.edge_prop(e).size().max(0) as usize);
        let mut prefix = if inner_part > 0 {
            self.graph.edge_prop_mut(e).extract_seq_prefix(inner_part)
        } else {
            DnaSeq::new()
        };
        let end_part = len - inner_part;
        if end_part > 0 {
            let shift = -self.graph.edge_prop(e).size();
            let tail = self.graph.node_prop(to).seq_prefix(end_part, shift);
            prefix.extend(&tail);
            self.graph.edge_prop_mut(e).shorten_with_empty_seq(end_part);
        }
        prefix
    }

    /// Grow the word of a vertex with exactly one unambiguous side by `len`
    /// symbols absorbed from its lone incoming (or outgoing) edge.
    pub(crate) fn increase_vertex(&mut self, v: NodeId, len: usize) {
        let indegree = self.graph.in_degree(v);
        let outdegree = self.graph.out_degree(v);
        assert!(
            (indegree == 1) != (outdegree == 1),
            "vertex {} has no unambiguous side to absorb from",
            v
        );
        if indegree == 1 {
            let e = self.graph.in_edges(v).next().unwrap();
            let suffix = self.extract_edge_pre_end_suffix(e, len);
            self.graph.node_prop_mut(v).inc_left(&suffix);
        } else {
            let e = self.graph.out_edges(v).next().unwrap();
            let prefix = self.extract_edge_post_start_prefix(e, len);
            self.graph.node_prop_mut(v).inc_right(&prefix);
        }
    }

    /// Pair every vertex and edge with its reverse complement where the input
    /// carries both strands. Palindromic elements pair with themselves;
    /// single-stranded elements stay unpaired.
    fn link_rc_siblings(&mut self) {
        let mut by_word: HashMap<DnaSeq, Vec<NodeId>> = HashMap::new();
        for v in self.graph.nodes() {
            by_word
                .entry(self.graph.node_prop(v).seq().clone())
                .or_default()
                .push(v);
        }
        let vertex_ids: Vec<NodeId> = self.graph.nodes().collect();
        for v in vertex_ids {
            if self.graph.node_prop(v).rc().is_some() {
                continue;
            }
            let rc_word = self.graph.node_prop(v).seq().revcomp();
            let partner = by_word.get(&rc_word).and_then(|cands| {
                cands
                    .iter()
                    .copied()
                    .find(|&u| u != v && self.graph.node_prop(u).rc().is_none())
                    .or_else(|| cands.contains(&v).then_some(v))
            });
            if let Some(u) = partner {
                self.graph.node_prop_mut(v).set_rc(Some(u));
                self.graph.node_prop_mut(u).set_rc(Some(v));
            }
        }
        let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in edge_ids {
            if self.graph.edge_prop(e).rc().is_some() {
                continue;
            }
            let from = self.graph.edge_from(e);
            let to = self.graph.edge_to(e);
            let (rc_from, rc_to) = match (
                self.graph.node_prop(to).rc(),
                self.graph.node_prop(from).rc(),
            ) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            let want_seq = self.graph.edge_prop(e).seq().revcomp();
            let want_size = self.graph.edge_prop(e).size();
            let cands: Vec<EdgeId> = self
                .graph
                .out_edges(rc_from)
                .filter(|&t| {
                    self.graph.edge_to(t) == rc_to
                        && self.graph.edge_prop(t).rc().is_none()
                        && self.graph.edge_prop(t).size() == want_size
                        && *self.graph.edge_prop(t).seq() == want_seq
                })
                .collect();
            let partner = cands
                .iter()
                .copied()
                .find(|&t| t != e)
                .or_else(|| cands.contains(&e).then_some(e));
            if let Some(t) = partner {
                self.graph.edge_prop_mut(e).set_rc(Some(t));
                self.graph.edge_prop_mut(t).set_rc(Some(e));
            }
        }
    }

    /// Drop sibling links whose mirror no longer holds. The links are matched
    /// opportunistically at construction, and asymmetric evidence (or a
    /// coincidental word match on a single-stranded input) can leave one side
    /// of a pair behind during a step; an absent link is always consistent.
    pub(crate) fn prune_broken_siblings(&mut self) {
        loop {
            let mut changed = false;
            let vertex_ids: Vec<NodeId> = self.graph.nodes().collect();
            for v in vertex_ids {
                if let Some(u) = self.graph.node_prop(v).rc() {
                    let ok = self.graph.contains_node(u)
                        && self.graph.node_prop(u).rc() == Some(v)
                        && *self.graph.node_prop(u).seq()
                            == self.graph.node_prop(v).seq().revcomp();
                    if !ok {
                        self.graph.node_prop_mut(v).set_rc(None);
                        changed = true;
                    }
                }
            }
            let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
            for e in edge_ids {
                if let Some(t) = self.graph.edge_prop(e).rc() {
                    let mut ok = self.graph.contains_edge(t)
                        && self.graph.edge_prop(t).rc() == Some(e)
                        && self.graph.edge_prop(t).size() == self.graph.edge_prop(e).size()
                        && *self.graph.edge_prop(t).seq()
                            == self.graph.edge_prop(e).seq().revcomp();
                    if ok {
                        if let Some(rc_to) = self.graph.node_prop(self.graph.edge_to(e)).rc() {
                            ok &= self.graph.edge_from(t) == rc_to;
                        }
                        if let Some(rc_from) = self.graph.node_prop(self.graph.edge_from(e)).rc()
                        {
                            ok &= self.graph.edge_to(t) == rc_from;
                        }
                    }
                    if !ok {
                        self.graph.edge_prop_mut(e).set_rc(None);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Check every structural invariant. Cheap enough to run between steps;
    /// the transform runs it after every step in debug mode.
    pub fn assert_validity(&self) -> Result<(), ResolveError> {
        let fail = |msg: String| Err(ResolveError::Invariant(msg));
        if let Some(max_v) = self.graph.nodes().max() {
            if self.next_vertex <= max_v {
                return fail(format!(
                    "vertex counter {} is not above live vertex {}",
                    self.next_vertex, max_v
                ));
            }
        }
        if let Some(max_e) = self.graph.edge_ids().max() {
            if self.next_edge <= max_e {
                return fail(format!(
                    "edge counter {} is not above live edge {}",
                    self.next_edge, max_e
                ));
            }
        }
        for v in self.graph.nodes() {
            if self.graph.in_degree(v) == 1 && self.graph.out_degree(v) == 1 {
                let ie = self.graph.in_edges(v).next().unwrap();
                let oe = self.graph.out_edges(v).next().unwrap();
                if ie != oe {
                    return fail(format!("vertex {} is 1-in-1-out but not a loop", v));
                }
                if !self.graph.node_prop(v).is_frozen() {
                    return fail(format!("isolated loop {} is not frozen", v));
                }
            }
        }
        for e in self.graph.edge_ids() {
            let prop = self.graph.edge_prop(e);
            let size = prop.size();
            if size >= 0 {
                if prop.seq().len() as i64 != size {
                    return fail(format!(
                        "edge {} has size {} but inner length {}",
                        e,
                        size,
                        prop.seq().len()
                    ));
                }
            } else {
                if !prop.seq().is_empty() {
                    return fail(format!("edge {} has negative size and a non-empty seq", e));
                }
                let overlap = (-size) as usize;
                let from = self.graph.node_prop(self.graph.edge_from(e)).seq();
                let to = self.graph.node_prop(self.graph.edge_to(e)).seq();
                if from.len() < overlap || to.len() < overlap {
                    return fail(format!("edge {} overlaps beyond its endpoint words", e));
                }
                if from.suffix(overlap) != to.prefix(overlap) {
                    return fail(format!("edge {} violates the overlap law", e));
                }
            }
        }
        for idx in self.paths.edge_indexes() {
            if !self.graph.contains_edge(idx) {
                return fail(format!("read paths mention retired edge {}", idx));
            }
        }
        for v in self.graph.nodes() {
            if let Some(u) = self.graph.node_prop(v).rc() {
                if !self.graph.contains_node(u)
                    || self.graph.node_prop(u).rc() != Some(v)
                    || *self.graph.node_prop(u).seq() != self.graph.node_prop(v).seq().revcomp()
                {
                    return fail(format!("vertex {} has a broken sibling link", v));
                }
            }
        }
        for e in self.graph.edge_ids() {
            if let Some(t) = self.graph.edge_prop(e).rc() {
                if !self.graph.contains_edge(t)
                    || self.graph.edge_prop(t).rc() != Some(e)
                    || self.graph.edge_prop(t).size() != self.graph.edge_prop(e).size()
                    || *self.graph.edge_prop(t).seq() != self.graph.edge_prop(e).seq().revcomp()
                {
                    return fail(format!("edge {} has a broken sibling link", e));
                }
                if let Some(rc_to) = self.graph.node_prop(self.graph.edge_to(e)).rc() {
                    if self.graph.edge_from(t) != rc_to {
                        return fail(format!("edge {} sibling starts at the wrong vertex", e));
                    }
                }
                if let Some(rc_from) = self.graph.node_prop(self.graph.edge_from(e)).rc() {
                    if self.graph.edge_to(t) != rc_from {
                        return fail(format!("edge {} sibling ends at the wrong vertex", e));
                    }
                }
            }
        }
        Ok(())
    }
}
