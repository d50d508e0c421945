//! LayoutGraph - borrowed topology view shared by both layout engines.
//!
//! Built once per layout call from the caller's node and edge slices. It
//! resolves caller ids to dense slot indices (the input order of `nodes`)
//! and stores the resolvable edges in a petgraph `StableGraph`. Edges whose
//! endpoints are missing never make it into the graph.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use std::collections::HashMap;

use super::edge::Edge;
use super::node::{Node, NodeId};

/// Directed topology over node slots.
///
/// Node weights are slot indices into the caller's `nodes` slice; edge
/// weights are indices into the caller's `edges` slice.
pub struct LayoutGraph {
    graph: StableGraph<usize, usize, Directed>,

    /// Map from caller id to slot. The first node wins on duplicate ids.
    id_to_slot: HashMap<NodeId, usize>,

    /// Edges skipped because an endpoint did not resolve.
    dangling: usize,

    /// Edges skipped because source == target.
    self_loops: usize,
}

impl LayoutGraph {
    /// Build the topology for one layout call.
    pub fn build(nodes: &[Node], edges: &[Edge]) -> Self {
        let mut graph = StableGraph::with_capacity(nodes.len(), edges.len());
        let mut id_to_slot = HashMap::with_capacity(nodes.len());

        for (slot, node) in nodes.iter().enumerate() {
            graph.add_node(slot);
            id_to_slot.entry(node.id.clone()).or_insert(slot);
        }

        let mut dangling = 0;
        let mut self_loops = 0;
        for (edge_slot, edge) in edges.iter().enumerate() {
            let (Some(&source), Some(&target)) =
                (id_to_slot.get(&edge.source), id_to_slot.get(&edge.target))
            else {
                tracing::debug!(source = %edge.source, target = %edge.target, "skipping dangling edge");
                dangling += 1;
                continue;
            };
            if source == target {
                self_loops += 1;
                continue;
            }
            graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), edge_slot);
        }

        Self {
            graph,
            id_to_slot,
            dangling,
            self_loops,
        }
    }

    /// Number of node slots.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of resolvable, non-loop edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges dropped for a missing endpoint.
    pub fn dangling_count(&self) -> usize {
        self.dangling
    }

    /// Number of self-loops left out of the topology.
    pub fn self_loop_count(&self) -> usize {
        self.self_loops
    }

    /// All links as `(source_slot, target_slot)` in edge input order.
    pub fn links(&self) -> Vec<(usize, usize)> {
        let mut links: Vec<(usize, usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| (*e.weight(), e.source().index(), e.target().index()))
            .collect();
        links.sort_unstable_by_key(|&(edge_slot, _, _)| edge_slot);
        links.into_iter().map(|(_, s, t)| (s, t)).collect()
    }

    /// Undirected degree of a slot (multi-edges counted separately).
    pub fn degree(&self, slot: usize) -> usize {
        let index = NodeIndex::new(slot);
        self.graph.edges_directed(index, Direction::Outgoing).count()
            + self.graph.edges_directed(index, Direction::Incoming).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[&str]) -> Vec<Node> {
        ids.iter().map(|id| Node::new(*id, 10.0, 10.0)).collect()
    }

    #[test]
    fn test_build_resolves_ids() {
        let nodes = nodes(&["a", "b", "c"]);
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
        let graph = LayoutGraph::build(&nodes, &edges);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.links(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_dangling_and_self_loops_are_skipped() {
        let nodes = nodes(&["a", "b"]);
        let edges = vec![
            Edge::new("a", "ghost"),
            Edge::new("a", "a"),
            Edge::new("a", "b"),
        ];
        let graph = LayoutGraph::build(&nodes, &edges);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dangling_count(), 1);
        assert_eq!(graph.self_loop_count(), 1);
        assert_eq!(graph.links(), vec![(0, 1)]);
    }

    #[test]
    fn test_degree_counts_both_directions() {
        let nodes = nodes(&["a", "b", "c", "d"]);
        let edges = vec![
            Edge::new("a", "c"),
            Edge::new("a", "b"),
            Edge::new("d", "a"),
        ];
        let graph = LayoutGraph::build(&nodes, &edges);

        assert_eq!(graph.links(), vec![(0, 2), (0, 1), (3, 0)]);
        assert_eq!(graph.degree(0), 3);
        assert_eq!(graph.degree(1), 1);
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first() {
        let nodes = nodes(&["a", "a", "b"]);
        let graph = LayoutGraph::build(&nodes, &[Edge::new("a", "b")]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.links(), vec![(0, 2)]);
    }
}
