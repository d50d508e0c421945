//! Spatial acceleration for the force simulation.
//!
//! - `quadtree`: Barnes-Hut tree for O(n log n) many-body repulsion
//! - `rtree`: R-tree candidate search for the collision force

pub mod quadtree;
mod rtree;

pub use quadtree::BarnesHut;
pub use rtree::{Body, CollisionIndex};
