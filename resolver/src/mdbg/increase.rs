//! The k-increase transform: one step grows the word of every unfrozen
//! vertex by a single symbol, and the driver repeats steps until the graph is
//! fully frozen or the saturating bound is reached.
//!
//! A step is atomic from the caller's point of view: it runs three phases over
//! a snapshot of the unfrozen vertex set, and between steps every invariant of
//! the graph holds. The transform is single-threaded by design.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ResolveError;
use crate::multigraph::{EdgeId, NodeId};

use super::MultiplexDbg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    In,
    Out,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::In => Side::Out,
            Side::Out => Side::In,
        }
    }
}

/// What a single step did.
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    pub frozen_now: usize,
    pub all_frozen: bool,
}

#[derive(Debug, Clone)]
pub struct KIncreaser {
    start_k: usize,
    saturating_k: usize,
    debug: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl KIncreaser {
    pub fn new(start_k: usize, saturating_k: usize, debug: bool) -> Self {
        assert!(start_k <= saturating_k);
        Self {
            start_k,
            saturating_k,
            debug,
            cancel: None,
        }
    }
    /// Install a flag checked between steps; a cancelled transform leaves the
    /// graph in the consistent state of the last completed step.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// One transform step.
    pub fn increase(&self, mdbg: &mut MultiplexDbg) -> Result<StepReport, ResolveError> {
        let frozen_before = mdbg.frozen_count();
        let snapshot = mdbg.unfrozen_vertices();
        // Phase 1: a vertex with exactly one unambiguous side absorbs one
        // symbol from its lone edge there. A vertex whose word is within one
        // symbol of spanning that whole edge freezes instead (the same
        // threshold the frost uses; two unfrozen tips eating the same edge
        // from both ends have no frozen seed to spread from).
        for &v in snapshot.iter() {
            let indegree = mdbg.in_degree(v);
            let outdegree = mdbg.out_degree(v);
            if (indegree == 1) != (outdegree == 1) {
                let e = if indegree == 1 {
                    mdbg.graph.in_edges(v).next().unwrap()
                } else {
                    mdbg.graph.out_edges(v).next().unwrap()
                };
                if mdbg.full_edge_size(e) <= 1 + mdbg.vertex(v).len() {
                    mdbg.freeze_vertex(v);
                } else {
                    mdbg.increase_vertex(v, 1);
                }
            }
        }
        // Phase 2: dismantle complex vertices along their resolved pairs.
        let mut splits: HashMap<(EdgeId, Side), NodeId> = HashMap::new();
        let mut connectors: HashMap<(EdgeId, EdgeId), EdgeId> = HashMap::new();
        for &v in snapshot.iter() {
            if mdbg.contains_vertex(v)
                && !mdbg.vertex(v).is_frozen()
                && mdbg.is_vertex_complex(v)
            {
                self.process_complex_vertex(mdbg, v, &mut splits, &mut connectors);
            }
        }
        link_split_siblings(mdbg, &splits, &connectors);
        // Phase 3: merge the edge chains through the 1-in-1-out vertices the
        // splitting left behind.
        for v in mdbg.unfrozen_vertices() {
            if !mdbg.contains_vertex(v) || mdbg.vertex(v).is_frozen() {
                continue;
            }
            if mdbg.in_degree(v) == 1 && mdbg.out_degree(v) == 1 {
                let e1 = mdbg.graph.in_edges(v).next().unwrap();
                let e2 = mdbg.graph.out_edges(v).next().unwrap();
                if e1 != e2 {
                    mdbg.merge_edges(e1, e2);
                }
            }
        }
        mdbg.freeze_isolated_loops();
        mdbg.spread_frost();
        mdbg.prune_broken_siblings();
        if self.debug {
            mdbg.assert_validity()?;
        }
        Ok(StepReport {
            frozen_now: mdbg.frozen_count() - frozen_before,
            all_frozen: mdbg.is_frozen(),
        })
    }

    /// Split a complex vertex: every incident edge is detached onto a fresh
    /// copy of the vertex word, each copy absorbs the one symbol its edge
    /// determines, and the resolved pairs are bridged by connecting edges.
    /// A vertex whose evidence no longer pairs every edge is frozen instead.
    fn process_complex_vertex(
        &self,
        mdbg: &mut MultiplexDbg,
        v: NodeId,
        splits: &mut HashMap<(EdgeId, Side), NodeId>,
        connectors: &mut HashMap<(EdgeId, EdgeId), EdgeId>,
    ) {
        let (s2e, e2s) = mdbg.edge_pairs_vertex(v);
        let in_edges = mdbg.in_edge_indexes(v);
        let out_edges = mdbg.out_edge_indexes(v);
        if in_edges.iter().any(|e| !s2e.contains_key(e))
            || out_edges.iter().any(|e| !e2s.contains_key(e))
        {
            debug!("Vertex {} lost its pairing evidence, freezing", v);
            mdbg.freeze_vertex(v);
            return;
        }
        let word = mdbg.vertex(v).seq().clone();
        let mut in_split: BTreeMap<EdgeId, NodeId> = BTreeMap::new();
        let mut out_split: BTreeMap<EdgeId, NodeId> = BTreeMap::new();
        for &e in in_edges.iter() {
            let x = mdbg.new_vertex(word.clone());
            let from = mdbg.graph.edge_from(e);
            mdbg.graph.move_edge(e, from, x);
            in_split.insert(e, x);
            splits.insert((e, Side::In), x);
        }
        for &f in out_edges.iter() {
            let y = mdbg.new_vertex(word.clone());
            // for a self-loop the target is already the in-side split
            let to = mdbg.graph.edge_to(f);
            mdbg.graph.move_edge(f, y, to);
            out_split.insert(f, y);
            splits.insert((f, Side::Out), y);
        }
        if let Some(w) = mdbg.vertex(v).rc() {
            // the twin is dismantled by its own resolution
            if w != v && mdbg.contains_vertex(w) && mdbg.vertex(w).rc() == Some(v) {
                mdbg.graph.node_prop_mut(w).set_rc(None);
            }
        }
        mdbg.graph.remove_node(v);
        for &x in in_split.values() {
            mdbg.increase_vertex(x, 1);
        }
        for &y in out_split.values() {
            mdbg.increase_vertex(y, 1);
        }
        for (&e, outs) in s2e.iter() {
            for &f in outs.iter() {
                let id = mdbg.add_connecting_edge(in_split[&e], out_split[&f], e, f);
                connectors.insert((e, f), id);
            }
        }
    }

    /// Apply steps until every vertex is frozen or `k` hits the saturating
    /// bound. Returns the final `k`.
    pub fn increase_until_saturation(
        &self,
        mdbg: &mut MultiplexDbg,
    ) -> Result<usize, ResolveError> {
        let mut k = self.start_k;
        info!("Increasing k from {} toward {}", self.start_k, self.saturating_k);
        while !mdbg.is_frozen() && k < self.saturating_k {
            if let Some(flag) = self.cancel.as_ref() {
                if flag.load(Ordering::Relaxed) {
                    info!("Cancelled between steps at k={}", k);
                    return Err(ResolveError::Cancelled { k });
                }
            }
            let min_before = mdbg.min_unfrozen_len();
            let report = self.increase(mdbg)?;
            k += 1;
            debug!("STEP\tk={}\t{}", k, mdbg);
            if report.frozen_now == 0
                && !report.all_frozen
                && mdbg.min_unfrozen_len() <= min_before
            {
                return Err(ResolveError::Stuck { k });
            }
        }
        if !self.debug {
            mdbg.assert_validity()?;
        }
        info!("Finished increasing k at {}", k);
        Ok(k)
    }
}

/// After all complex vertices of a step are split, pair the new vertices and
/// connecting edges with their reverse-complement siblings: the split for an
/// incoming edge mirrors the split for the edge's twin on the outgoing side,
/// and the bridge for `(e, f)` mirrors the bridge for `(rc(f), rc(e))`.
fn link_split_siblings(
    mdbg: &mut MultiplexDbg,
    splits: &HashMap<(EdgeId, Side), NodeId>,
    connectors: &HashMap<(EdgeId, EdgeId), EdgeId>,
) {
    for (&(e, side), &x) in splits.iter() {
        if mdbg.vertex(x).rc().is_some() {
            continue;
        }
        if let Some(t) = mdbg.edge(e).rc() {
            if let Some(&x2) = splits.get(&(t, side.opposite())) {
                mdbg.graph.node_prop_mut(x).set_rc(Some(x2));
                mdbg.graph.node_prop_mut(x2).set_rc(Some(x));
            }
        }
    }
    for (&(e, f), &c) in connectors.iter() {
        if mdbg.edge(c).rc().is_some() {
            continue;
        }
        if let (Some(te), Some(tf)) = (mdbg.edge(e).rc(), mdbg.edge(f).rc()) {
            if let Some(&c2) = connectors.get(&(tf, te)) {
                mdbg.graph.edge_prop_mut(c).set_rc(Some(c2));
                mdbg.graph.edge_prop_mut(c2).set_rc(Some(c));
            }
        }
    }
}
