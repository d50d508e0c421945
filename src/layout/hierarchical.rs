//! Layered (Sugiyama-style) layout.
//!
//! Places nodes on discrete ranks along the flow direction and orders each
//! rank to keep edge crossings low.
//!
//! # Algorithm Overview
//!
//! 1. **Cycle breaking:** depth-first search in input order; edges that point
//!    back into the current DFS path are reversed.
//! 2. **Ranking:** longest-path layering from the sources, then sources are
//!    pulled down next to their nearest successor. Every edge spans at least
//!    one rank; unconnected nodes sit in rank 0.
//! 3. **Normalization:** edges spanning several ranks are split with dummy
//!    nodes, one per intermediate rank.
//! 4. **Ordering:** alternating downward/upward barycenter sweeps. The
//!    ordering with the fewest crossings seen is kept.
//! 5. **Coordinates:** ranks are stacked by their thickest node plus the rank
//!    spacing. Within a rank, nodes are packed in order and then pulled
//!    toward the median of their neighbors while keeping order and spacing.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use petgraph::{Directed, Direction as EdgeDirection};

use super::{Direction, LayoutOptions, LayoutResult};
use crate::geometry::Side;
use crate::graph::{Edge, LayoutGraph, Node};

/// Configuration for the layered layout.
#[derive(Debug, Clone)]
pub struct HierarchicalConfig {
    /// Gap between neighboring boxes within a rank.
    pub node_spacing: f64,
    /// Gap between consecutive ranks.
    pub rank_spacing: f64,
    /// Barycenter sweeps (each one down or up) during ordering.
    pub ordering_rounds: usize,
    /// Median alignment passes during coordinate assignment.
    pub alignment_rounds: usize,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 80.0,
            ordering_rounds: 8,
            alignment_rounds: 4,
        }
    }
}

/// A node of the layered graph. Dummies have no slot and no extent.
#[derive(Debug, Clone)]
struct LayeredNode {
    /// Index into the caller's nodes (None for dummies).
    slot: Option<usize>,
    /// Extent across the rank (width for top-to-bottom).
    breadth: f64,
    /// Extent along the flow (height for top-to-bottom).
    thickness: f64,
    rank: usize,
}

type Layered = StableGraph<LayeredNode, (), Directed>;

/// Layered layout with default spacing.
pub fn compute_hierarchical_layout(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
) -> LayoutResult {
    compute_hierarchical_layout_with(nodes, edges, options, &HierarchicalConfig::default())
}

/// Layered layout with explicit spacing.
pub fn compute_hierarchical_layout_with(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
    config: &HierarchicalConfig,
) -> LayoutResult {
    let direction = options.resolved_direction(Direction::TopToBottom);
    let span = tracing::debug_span!(
        "hierarchical_layout",
        nodes = nodes.len(),
        edges = edges.len(),
        ?direction
    );
    let _guard = span.enter();

    // Ports on the left/right sides mean ranks advance along x.
    let (exit_side, _) = direction.port_sides();
    let ranks_along_x = matches!(exit_side, Side::Left | Side::Right);

    let topology = LayoutGraph::build(nodes, edges);
    if topology.dangling_count() + topology.self_loop_count() > 0 {
        tracing::debug!(
            dangling = topology.dangling_count(),
            self_loops = topology.self_loop_count(),
            "edges left out of ranking"
        );
    }
    let mut graph = build_layered(nodes, &topology, ranks_along_x);

    let reversed = break_cycles(&mut graph);
    if reversed > 0 {
        tracing::debug!(reversed, "reversed edges to break cycles");
    }
    assign_ranks(&mut graph);
    normalize(&mut graph);

    let mut layers = initial_order(&graph);
    order_layers(&graph, &mut layers, config.ordering_rounds);

    let across = assign_in_rank(&graph, &layers, config);
    let along = assign_rank_centers(&graph, &layers, config.rank_spacing);

    let mut placed = nodes.to_vec();
    for (layer_index, layer) in layers.iter().enumerate() {
        for &n in layer {
            let Some(slot) = graph[n].slot else {
                continue;
            };
            let a = across[n.index()];
            let r = along[layer_index];
            let (cx, cy) = if ranks_along_x { (r, a) } else { (a, r) };
            placed[slot] = nodes[slot].with_center(cx, cy);
        }
    }

    LayoutResult {
        nodes: placed,
        edges: edges.to_vec(),
    }
}

fn build_layered(nodes: &[Node], topology: &LayoutGraph, ranks_along_x: bool) -> Layered {
    let mut graph = Layered::with_capacity(nodes.len(), topology.edge_count());
    for (slot, node) in nodes.iter().enumerate() {
        let size = node.size.sanitized();
        let (breadth, thickness) = if ranks_along_x {
            (size.height, size.width)
        } else {
            (size.width, size.height)
        };
        graph.add_node(LayeredNode {
            slot: Some(slot),
            breadth,
            thickness,
            rank: 0,
        });
    }
    for (source, target) in topology.links() {
        graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
    }
    graph
}

/// Outgoing edges of `n` in insertion order.
fn out_edges(graph: &Layered, n: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
    let mut out: Vec<(EdgeIndex, NodeIndex)> = graph
        .edges_directed(n, EdgeDirection::Outgoing)
        .map(|e| (e.id(), e.target()))
        .collect();
    out.sort_unstable_by_key(|&(e, _)| e.index());
    out
}

fn neighbors(graph: &Layered, n: NodeIndex, dir: EdgeDirection) -> Vec<NodeIndex> {
    let mut out: Vec<(usize, NodeIndex)> = graph
        .edges_directed(n, dir)
        .map(|e| {
            let other = if dir == EdgeDirection::Outgoing {
                e.target()
            } else {
                e.source()
            };
            (e.id().index(), other)
        })
        .collect();
    out.sort_unstable_by_key(|&(e, _)| e);
    out.into_iter().map(|(_, other)| other).collect()
}

// ============================================================================
// Cycle breaking
// ============================================================================

/// Reverse every DFS back edge. Returns the number of reversed edges.
fn break_cycles(graph: &mut Layered) -> usize {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let bound = graph.node_bound();
    let mut color = vec![WHITE; bound];
    let mut back_edges = Vec::new();

    let roots: Vec<NodeIndex> = graph.node_indices().collect();
    for root in roots {
        if color[root.index()] != WHITE {
            continue;
        }
        color[root.index()] = GRAY;
        let mut stack = vec![(root, out_edges(graph, root), 0usize)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let step = frame.1.get(frame.2).copied();
            frame.2 += 1;

            let Some((edge, target)) = step else {
                color[node.index()] = BLACK;
                stack.pop();
                continue;
            };
            match color[target.index()] {
                WHITE => {
                    color[target.index()] = GRAY;
                    stack.push((target, out_edges(graph, target), 0));
                }
                GRAY => back_edges.push(edge),
                _ => {}
            }
        }
    }

    for &edge in &back_edges {
        if let Some((source, target)) = graph.edge_endpoints(edge) {
            graph.remove_edge(edge);
            graph.add_edge(target, source, ());
        }
    }
    back_edges.len()
}

// ============================================================================
// Ranking
// ============================================================================

/// Longest-path ranking on the (now acyclic) graph.
fn assign_ranks(graph: &mut Layered) {
    let order = topological_order(graph);

    for &n in &order {
        let rank = neighbors(graph, n, EdgeDirection::Incoming)
            .into_iter()
            .map(|p| graph[p].rank + 1)
            .max()
            .unwrap_or(0);
        graph[n].rank = rank;
    }

    // Sources sit directly above their nearest successor instead of rank 0.
    for &n in &order {
        if graph.edges_directed(n, EdgeDirection::Incoming).next().is_some() {
            continue;
        }
        if let Some(nearest) = neighbors(graph, n, EdgeDirection::Outgoing)
            .into_iter()
            .map(|s| graph[s].rank)
            .min()
        {
            graph[n].rank = nearest - 1;
        }
    }

    let min_rank = graph.node_weights().map(|w| w.rank).min().unwrap_or(0);
    if min_rank > 0 {
        for w in graph.node_weights_mut() {
            w.rank -= min_rank;
        }
    }
}

/// Kahn's algorithm, ties broken by node index.
fn topological_order(graph: &Layered) -> Vec<NodeIndex> {
    let bound = graph.node_bound();
    let mut indegree = vec![0usize; bound];
    for e in graph.edge_references() {
        indegree[e.target().index()] += 1;
    }

    let mut ready: std::collections::BTreeSet<usize> = graph
        .node_indices()
        .filter(|n| indegree[n.index()] == 0)
        .map(|n| n.index())
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(i) = ready.pop_first() {
        let n = NodeIndex::new(i);
        order.push(n);
        for (_, target) in out_edges(graph, n) {
            indegree[target.index()] -= 1;
            if indegree[target.index()] == 0 {
                ready.insert(target.index());
            }
        }
    }
    order
}

// ============================================================================
// Normalization
// ============================================================================

/// Split every edge that spans more than one rank with dummy nodes.
fn normalize(graph: &mut Layered) {
    let long_edges: Vec<EdgeIndex> = graph
        .edge_references()
        .filter(|e| graph[e.target()].rank > graph[e.source()].rank + 1)
        .map(|e| e.id())
        .collect();

    for edge in long_edges {
        let Some((source, target)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let (from, to) = (graph[source].rank, graph[target].rank);
        graph.remove_edge(edge);

        let mut previous = source;
        for rank in from + 1..to {
            let dummy = graph.add_node(LayeredNode {
                slot: None,
                breadth: 0.0,
                thickness: 0.0,
                rank,
            });
            graph.add_edge(previous, dummy, ());
            previous = dummy;
        }
        graph.add_edge(previous, target, ());
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// DFS from each node in index order, appending nodes to their rank on
/// first visit. Keeps chains together in the starting order.
fn initial_order(graph: &Layered) -> Vec<Vec<NodeIndex>> {
    let rank_count = graph.node_weights().map(|w| w.rank + 1).max().unwrap_or(0);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); rank_count];
    let mut visited = vec![false; graph.node_bound()];

    let mut starts: Vec<NodeIndex> = graph.node_indices().collect();
    starts.sort_by_key(|n| (graph[*n].rank, n.index()));

    for start in starts {
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if visited[n.index()] {
                continue;
            }
            visited[n.index()] = true;
            layers[graph[n].rank].push(n);
            let mut next = neighbors(graph, n, EdgeDirection::Outgoing);
            next.reverse();
            stack.extend(next.into_iter().filter(|s| !visited[s.index()]));
        }
    }
    layers
}

/// Barycenter sweeps, keeping the best ordering seen.
fn order_layers(graph: &Layered, layers: &mut [Vec<NodeIndex>], rounds: usize) {
    let mut best = layers.to_vec();
    let mut best_crossings = count_crossings(graph, layers);

    for round in 0..rounds {
        if best_crossings == 0 {
            break;
        }
        if round % 2 == 0 {
            for i in 1..layers.len() {
                let (fixed, free) = layers.split_at_mut(i);
                sort_by_barycenter(graph, &fixed[i - 1], &mut free[0], EdgeDirection::Incoming);
            }
        } else {
            for i in (0..layers.len().saturating_sub(1)).rev() {
                let (free, fixed) = layers.split_at_mut(i + 1);
                sort_by_barycenter(graph, &fixed[0], &mut free[i], EdgeDirection::Outgoing);
            }
        }

        let crossings = count_crossings(graph, layers);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.to_vec();
        }
    }

    layers.clone_from_slice(&best);
    tracing::trace!(crossings = best_crossings, "ordering done");
}

/// Reorder `free` by the mean position of each node's neighbors in `fixed`.
/// Nodes without such neighbors keep their current position as key.
fn sort_by_barycenter(
    graph: &Layered,
    fixed: &[NodeIndex],
    free: &mut Vec<NodeIndex>,
    toward_fixed: EdgeDirection,
) {
    let mut position = vec![usize::MAX; graph.node_bound()];
    for (i, n) in fixed.iter().enumerate() {
        position[n.index()] = i;
    }

    let mut keyed: Vec<(f64, NodeIndex)> = free
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let ps: Vec<usize> = neighbors(graph, n, toward_fixed)
                .into_iter()
                .map(|m| position[m.index()])
                .filter(|&p| p != usize::MAX)
                .collect();
            let key = if ps.is_empty() {
                i as f64
            } else {
                ps.iter().sum::<usize>() as f64 / ps.len() as f64
            };
            (key, n)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    *free = keyed.into_iter().map(|(_, n)| n).collect();
}

/// Total crossings between all pairs of adjacent ranks.
fn count_crossings(graph: &Layered, layers: &[Vec<NodeIndex>]) -> usize {
    layers
        .windows(2)
        .map(|pair| bilayer_crossings(graph, &pair[0], &pair[1]))
        .sum()
}

/// Crossings between two adjacent ranks, counted as inversions of the
/// south-end positions with a Fenwick tree.
fn bilayer_crossings(graph: &Layered, north: &[NodeIndex], south: &[NodeIndex]) -> usize {
    let mut south_pos = vec![usize::MAX; graph.node_bound()];
    for (i, n) in south.iter().enumerate() {
        south_pos[n.index()] = i;
    }

    let mut ends: Vec<usize> = Vec::new();
    for &n in north {
        let mut targets: Vec<usize> = neighbors(graph, n, EdgeDirection::Outgoing)
            .into_iter()
            .map(|s| south_pos[s.index()])
            .filter(|&p| p != usize::MAX)
            .collect();
        targets.sort_unstable();
        ends.extend(targets);
    }

    let mut tree = vec![0usize; south.len() + 1];
    let mut crossings = 0;
    for (seen, &p) in ends.iter().enumerate() {
        // Count already-inserted ends at positions <= p.
        let mut i = p + 1;
        let mut not_greater = 0;
        while i > 0 {
            not_greater += tree[i];
            i -= i & i.wrapping_neg();
        }
        crossings += seen - not_greater;

        let mut i = p + 1;
        while i < tree.len() {
            tree[i] += 1;
            i += i & i.wrapping_neg();
        }
    }
    crossings
}

// ============================================================================
// Coordinates
// ============================================================================

/// Position of every node across its rank, indexed by node index.
fn assign_in_rank(
    graph: &Layered,
    layers: &[Vec<NodeIndex>],
    config: &HierarchicalConfig,
) -> Vec<f64> {
    let mut pos = vec![0.0; graph.node_bound()];

    let gap = |a: NodeIndex, b: NodeIndex| {
        let both_real = graph[a].slot.is_some() && graph[b].slot.is_some();
        let spacing = if both_real {
            config.node_spacing
        } else {
            config.node_spacing / 2.0
        };
        (graph[a].breadth + graph[b].breadth) / 2.0 + spacing
    };

    for layer in layers {
        let mut cursor = 0.0;
        for (i, &n) in layer.iter().enumerate() {
            if i > 0 {
                cursor += gap(layer[i - 1], n);
            }
            pos[n.index()] = cursor;
        }
        // Center every rank on zero.
        if let (Some(&first), Some(&last)) = (layer.first(), layer.last()) {
            let mid = (pos[first.index()] + pos[last.index()]) / 2.0;
            for &n in layer {
                pos[n.index()] -= mid;
            }
        }
    }

    for round in 0..config.alignment_rounds * 2 {
        let down = round % 2 == 0;
        let dir = if down {
            EdgeDirection::Incoming
        } else {
            EdgeDirection::Outgoing
        };
        let indices: Vec<usize> = if down {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };

        for li in indices {
            let layer = &layers[li];
            let desired: Vec<f64> = layer
                .iter()
                .map(|&n| {
                    let mut around: Vec<f64> = neighbors(graph, n, dir)
                        .into_iter()
                        .map(|m| pos[m.index()])
                        .collect();
                    median(&mut around).unwrap_or(pos[n.index()])
                })
                .collect();
            let gaps: Vec<f64> = layer.windows(2).map(|w| gap(w[0], w[1])).collect();
            let resolved = resolve_with_gaps(&desired, &gaps);
            for (&n, p) in layer.iter().zip(resolved) {
                pos[n.index()] = p;
            }
        }
    }

    // Shift so the leftmost box edge sits at zero.
    let min_edge = layers
        .iter()
        .flatten()
        .map(|&n| pos[n.index()] - graph[n].breadth / 2.0)
        .fold(f64::INFINITY, f64::min);
    if min_edge.is_finite() {
        for p in &mut pos {
            *p -= min_edge;
        }
    }
    pos
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    })
}

/// Closest order-preserving placement to `desired` with `p[i+1] - p[i] >=
/// gaps[i]`: the mean of a left-to-right push and a right-to-left push.
fn resolve_with_gaps(desired: &[f64], gaps: &[f64]) -> Vec<f64> {
    let n = desired.len();
    if n == 0 {
        return Vec::new();
    }

    let mut forward = desired.to_vec();
    for i in 1..n {
        forward[i] = forward[i].max(forward[i - 1] + gaps[i - 1]);
    }
    let mut backward = desired.to_vec();
    for i in (0..n - 1).rev() {
        backward[i] = backward[i].min(backward[i + 1] - gaps[i]);
    }

    forward
        .into_iter()
        .zip(backward)
        .map(|(f, b)| (f + b) / 2.0)
        .collect()
}

/// Center of each rank along the flow axis.
fn assign_rank_centers(graph: &Layered, layers: &[Vec<NodeIndex>], rank_spacing: f64) -> Vec<f64> {
    let mut centers = Vec::with_capacity(layers.len());
    let mut cursor = 0.0;
    for layer in layers {
        let thickness = layer
            .iter()
            .map(|&n| graph[n].thickness)
            .fold(0.0, f64::max);
        centers.push(cursor + thickness / 2.0);
        cursor += thickness + rank_spacing;
    }
    centers
}
