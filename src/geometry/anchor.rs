//! Floating edge anchors.
//!
//! The renderer calls these whenever endpoint geometry changes (after a drag
//! or a resize), once per edge. Everything here is O(1) per edge and pure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::intersect::{classify_side, intersect};
use super::rect::{Point, Rect, Side};
use crate::graph::{Edge, Node, NodeId};

/// Where a floating edge attaches to its two endpoint boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeAnchor {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
    pub source_side: Side,
    pub target_side: Side,
}

impl EdgeAnchor {
    #[inline]
    pub fn source_point(&self) -> Point {
        Point::new(self.sx, self.sy)
    }

    #[inline]
    pub fn target_point(&self) -> Point {
        Point::new(self.tx, self.ty)
    }

    /// Straight-line length between the two anchor points.
    #[inline]
    pub fn length(&self) -> f64 {
        self.source_point().distance(self.target_point())
    }
}

/// Anchor record for an edge from `source` to `target`.
///
/// Each end is resolved against its own box, so the two points are not
/// mirror images when the boxes differ in shape.
pub fn compute_edge_anchor(source: &Node, target: &Node) -> EdgeAnchor {
    anchor_between(&Rect::from_node(source), &Rect::from_node(target))
}

/// Anchor record between two boxes.
pub fn anchor_between(source: &Rect, target: &Rect) -> EdgeAnchor {
    let s = intersect(source, target);
    let t = intersect(target, source);

    EdgeAnchor {
        sx: s.x,
        sy: s.y,
        tx: t.x,
        ty: t.y,
        source_side: classify_side(source, s),
        target_side: classify_side(target, t),
    }
}

/// Anchors for a batch of edges, aligned with `edges`.
///
/// An edge whose source or target id is not among `nodes` yields `None`.
pub fn compute_edge_anchors(nodes: &[Node], edges: &[Edge]) -> Vec<Option<EdgeAnchor>> {
    let mut by_id: HashMap<&NodeId, &Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        by_id.entry(&node.id).or_insert(node);
    }

    edges
        .iter()
        .map(|edge| {
            let source = by_id.get(&edge.source)?;
            let target = by_id.get(&edge.target)?;
            Some(compute_edge_anchor(source, target))
        })
        .collect()
}
