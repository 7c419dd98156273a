//! A labeled directed multigraph keyed by dense integer ids.
//!
//! Vertices and edges are stored in ordered maps so that whole-graph iteration
//! is deterministic, and each vertex keeps its incident edge ids in insertion
//! order. The transform that runs on top of this container relies on both
//! orders for reproducibility. Parallel edges and self-loops are allowed.

use std::collections::BTreeMap;

pub type NodeId = u64;
pub type EdgeId = u64;

#[derive(Debug, Clone)]
struct NodeEntry<N> {
    prop: N,
    in_edges: Vec<EdgeId>,
    out_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
struct EdgeEntry<E> {
    from: NodeId,
    to: NodeId,
    prop: E,
}

#[derive(Debug, Clone, Default)]
pub struct MultiGraph<N, E> {
    nodes: BTreeMap<NodeId, NodeEntry<N>>,
    edges: BTreeMap<EdgeId, EdgeEntry<E>>,
}

impl<N, E> MultiGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }
    /// Insert a node. Re-inserting an existing id keeps the old property and
    /// returns false.
    pub fn add_node(&mut self, id: NodeId, prop: N) -> bool {
        use std::collections::btree_map::Entry;
        match self.nodes.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(NodeEntry {
                    prop,
                    in_edges: Vec::new(),
                    out_edges: Vec::new(),
                });
                true
            }
        }
    }
    /// Remove an isolated node and hand back its property.
    pub fn remove_node(&mut self, id: NodeId) -> N {
        let entry = self.nodes.remove(&id).expect("no such node");
        assert!(
            entry.in_edges.is_empty() && entry.out_edges.is_empty(),
            "node {} still has incident edges",
            id
        );
        entry.prop
    }
    pub fn add_edge(&mut self, id: EdgeId, from: NodeId, to: NodeId, prop: E) {
        assert!(!self.edges.contains_key(&id), "edge {} already exists", id);
        self.nodes
            .get_mut(&from)
            .expect("no such start node")
            .out_edges
            .push(id);
        self.nodes
            .get_mut(&to)
            .expect("no such end node")
            .in_edges
            .push(id);
        self.edges.insert(id, EdgeEntry { from, to, prop });
    }
    /// Remove an edge, returning its endpoints and property.
    pub fn remove_edge(&mut self, id: EdgeId) -> (NodeId, NodeId, E) {
        let entry = self.edges.remove(&id).expect("no such edge");
        let out = &mut self.nodes.get_mut(&entry.from).unwrap().out_edges;
        out.retain(|&e| e != id);
        let inc = &mut self.nodes.get_mut(&entry.to).unwrap().in_edges;
        inc.retain(|&e| e != id);
        (entry.from, entry.to, entry.prop)
    }
    /// Rewire an edge to new endpoints, keeping its id and property.
    /// The edge re-enters the adjacency lists at the back, as if re-inserted.
    pub fn move_edge(&mut self, id: EdgeId, from: NodeId, to: NodeId) {
        let (old_from, old_to) = {
            let entry = self.edges.get(&id).expect("no such edge");
            (entry.from, entry.to)
        };
        self.nodes
            .get_mut(&old_from)
            .unwrap()
            .out_edges
            .retain(|&e| e != id);
        self.nodes
            .get_mut(&old_to)
            .unwrap()
            .in_edges
            .retain(|&e| e != id);
        self.nodes
            .get_mut(&from)
            .expect("no such start node")
            .out_edges
            .push(id);
        self.nodes
            .get_mut(&to)
            .expect("no such end node")
            .in_edges
            .push(id);
        let entry = self.edges.get_mut(&id).unwrap();
        entry.from = from;
        entry.to = to;
    }
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
    pub fn node_prop(&self, id: NodeId) -> &N {
        &self.nodes.get(&id).expect("no such node").prop
    }
    pub fn node_prop_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.nodes.get_mut(&id).expect("no such node").prop
    }
    pub fn edge_prop(&self, id: EdgeId) -> &E {
        &self.edges.get(&id).expect("no such edge").prop
    }
    pub fn edge_prop_mut(&mut self, id: EdgeId) -> &mut E {
        &mut self.edges.get_mut(&id).expect("no such edge").prop
    }
    pub fn edge_from(&self, id: EdgeId) -> NodeId {
        self.edges.get(&id).expect("no such edge").from
    }
    pub fn edge_to(&self, id: EdgeId) -> NodeId {
        self.edges.get(&id).expect("no such edge").to
    }
    /// Node ids in increasing order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }
    /// Edge ids in increasing order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }
    /// Outgoing edge ids of `id`, in insertion order.
    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes
            .get(&id)
            .expect("no such node")
            .out_edges
            .iter()
            .copied()
    }
    /// Incoming edge ids of `id`, in insertion order.
    pub fn in_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes
            .get(&id)
            .expect("no such node")
            .in_edges
            .iter()
            .copied()
    }
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.nodes.get(&id).expect("no such node").out_edges.len()
    }
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.nodes.get(&id).expect("no such node").in_edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn diamond() -> MultiGraph<&'static str, usize> {
        let mut g = MultiGraph::new();
        for (id, name) in [(0, "a"), (1, "b"), (2, "c"), (3, "d")] {
            g.add_node(id, name);
        }
        g.add_edge(0, 0, 1, 10);
        g.add_edge(1, 0, 2, 11);
        g.add_edge(2, 1, 3, 12);
        g.add_edge(3, 2, 3, 13);
        g
    }
    #[test]
    fn build() {
        let g = diamond();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.out_degree(0), 2);
        assert_eq!(g.in_degree(3), 2);
    }
    #[test]
    fn duplicate_node_keeps_first() {
        let mut g = diamond();
        assert!(!g.add_node(0, "other"));
        assert_eq!(*g.node_prop(0), "a");
    }
    #[test]
    fn adjacency_is_insertion_ordered() {
        let mut g = diamond();
        g.add_edge(4, 0, 3, 14);
        let out: Vec<_> = g.out_edges(0).collect();
        assert_eq!(out, vec![0, 1, 4]);
        let inc: Vec<_> = g.in_edges(3).collect();
        assert_eq!(inc, vec![2, 3, 4]);
    }
    #[test]
    fn parallel_edges_and_loops() {
        let mut g = diamond();
        g.add_edge(4, 0, 1, 20);
        g.add_edge(5, 1, 1, 21);
        assert_eq!(g.out_edges(0).collect::<Vec<_>>(), vec![0, 1, 4]);
        assert_eq!(g.in_degree(1), 3);
        assert_eq!(g.out_degree(1), 2);
    }
    #[test]
    fn remove_edge_keeps_others() {
        let mut g = diamond();
        let (from, to, prop) = g.remove_edge(1);
        assert_eq!((from, to, prop), (0, 2, 11));
        assert_eq!(g.out_edges(0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(g.in_degree(2), 0);
    }
    #[test]
    fn move_edge_rewires() {
        let mut g = diamond();
        g.move_edge(0, 0, 3);
        assert_eq!(g.edge_to(0), 3);
        assert_eq!(g.in_edges(3).collect::<Vec<_>>(), vec![2, 3, 0]);
        assert_eq!(g.in_degree(1), 0);
        assert_eq!(*g.edge_prop(0), 10);
    }
    #[test]
    fn remove_isolated_node() {
        let mut g = diamond();
        g.remove_edge(0);
        g.remove_edge(2);
        assert_eq!(g.remove_node(1), "b");
        assert!(!g.contains_node(1));
    }
    #[test]
    #[should_panic]
    fn remove_connected_node_panics() {
        let mut g = diamond();
        g.remove_node(1);
    }
}
