//! Geometry for floating edges.
//!
//! - `rect`: axis-aligned boxes, points and sides
//! - `intersect`: center-line/boundary intersection and side classification
//! - `anchor`: the per-edge anchor record consumed by the renderer

pub mod anchor;
pub mod intersect;
pub mod rect;

pub use anchor::{EdgeAnchor, anchor_between, compute_edge_anchor, compute_edge_anchors};
pub use intersect::{classify_side, intersect};
pub use rect::{Point, Rect, Side};
