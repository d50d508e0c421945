//! Graph data structures.
//!
//! `Node` and `Edge` are the caller-facing types handed over by the
//! front-end. `LayoutGraph` is the per-call topology built on petgraph's
//! StableGraph that both layout engines read from.

mod edge;
mod engine;
mod node;

pub use edge::Edge;
pub use engine::LayoutGraph;
pub use node::{Node, NodeId, Position, Size};
