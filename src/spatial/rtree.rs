//! R-tree collision index using the rstar crate.
//!
//! The collision force needs, for every node, the other nodes whose circles
//! could overlap its own. Bodies are bulk loaded once per tick and queried
//! with a radius of `own_radius + max_radius`.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// A simulation body in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Slot of the node in the simulation arrays.
    pub slot: usize,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Body {
    /// Create a new Body.
    pub fn new(slot: usize, x: f64, y: f64) -> Self {
        Self { slot, x, y }
    }
}

impl RTreeObject for Body {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for Body {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.x == point[0] && self.y == point[1]
    }
}

/// Spatial index over simulation bodies.
pub struct CollisionIndex {
    tree: RTree<Body>,
    max_radius: f64,
}

impl CollisionIndex {
    /// Bulk load bodies. `max_radius` bounds every body's collision radius.
    pub fn build(bodies: Vec<Body>, max_radius: f64) -> Self {
        Self {
            tree: RTree::bulk_load(bodies),
            max_radius,
        }
    }

    /// Slots of bodies whose center lies within `radius + max_radius` of
    /// `(x, y)`, i.e. every body that may overlap a circle of `radius` there.
    pub fn candidates(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        let reach = radius + self.max_radius;
        let mut slots: Vec<usize> = self
            .tree
            .locate_within_distance([x, y], reach * reach)
            .map(|body| body.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Get the number of bodies in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
