//! Batch layout algorithms for the investigation graph.
//!
//! Both engines take the caller's nodes and edges by reference and return
//! freshly positioned copies. Positions go in and come out as top-left
//! anchors; the engines work on box centers internally.
//!
//! - `force`: spring / repulsion / collision simulation
//! - `hierarchical`: layered (Sugiyama-style) placement

pub mod force;
pub mod hierarchical;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Side};
use crate::graph::{Edge, Node};

pub use force::{
    ForceConfig, ForceSimulation, compute_force_layout, compute_force_layout_with_rng,
};
pub use hierarchical::{
    HierarchicalConfig, compute_hierarchical_layout, compute_hierarchical_layout_with,
};

/// Default charge coefficient (negative repels).
pub const DEFAULT_STRENGTH: f64 = -300.0;
/// Default target edge length.
pub const DEFAULT_DISTANCE: f64 = 100.0;
/// Default number of simulation ticks.
pub const DEFAULT_ITERATIONS: u32 = 300;
/// Upper bound on simulation ticks accepted from callers.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Main flow direction of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "LR", alias = "LeftToRight", alias = "RIGHT")]
    LeftToRight,
    #[serde(rename = "TB", alias = "TopToBottom", alias = "DOWN")]
    TopToBottom,
}

impl Direction {
    /// Sides an edge leaves its source from and enters its target through.
    pub fn port_sides(self) -> (Side, Side) {
        match self {
            Direction::LeftToRight => (Side::Right, Side::Left),
            Direction::TopToBottom => (Side::Bottom, Side::Top),
        }
    }

    /// Strengths of the x and y pulls toward the layout center.
    pub fn axis_pull(self) -> (f64, f64) {
        match self {
            Direction::LeftToRight => (0.1, 0.05),
            Direction::TopToBottom => (0.05, 0.1),
        }
    }
}

/// Options shared by both batch layouts.
///
/// Deserialized straight from the front-end's option object; every field is
/// optional there. Use the accessor methods rather than the raw fields, they
/// fall back to defaults for values that cannot be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Flow direction; each engine has its own default.
    pub direction: Option<Direction>,
    /// Charge coefficient for the force layout.
    pub strength: f64,
    /// Target edge length for the force layout.
    #[serde(alias = "linkDistance")]
    pub distance: f64,
    /// Simulation ticks. Taken as a float so any JS number is accepted.
    pub iterations: f64,
    /// Seed for the positions of nodes that have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: None,
            strength: DEFAULT_STRENGTH,
            distance: DEFAULT_DISTANCE,
            iterations: DEFAULT_ITERATIONS as f64,
            seed: None,
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations as f64;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Direction, or the engine's default when unset.
    pub fn resolved_direction(&self, default: Direction) -> Direction {
        self.direction.unwrap_or(default)
    }

    /// Charge coefficient; non-finite values fall back to the default.
    pub fn charge_strength(&self) -> f64 {
        if self.strength.is_finite() {
            self.strength
        } else {
            DEFAULT_STRENGTH
        }
    }

    /// Target edge length; non-finite or negative values fall back to the
    /// default.
    pub fn link_distance(&self) -> f64 {
        if self.distance.is_finite() && self.distance >= 0.0 {
            self.distance
        } else {
            DEFAULT_DISTANCE
        }
    }

    /// Tick count. Negative, NaN and infinite values clamp to zero.
    pub fn iteration_count(&self) -> u32 {
        if !self.iterations.is_finite() || self.iterations <= 0.0 {
            return 0;
        }
        self.iterations.floor().min(MAX_ITERATIONS as f64) as u32
    }
}

/// Output of a batch layout: repositioned nodes, edges unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl LayoutResult {
    /// Bounding box of all node boxes, or `None` when there are no nodes.
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .map(Rect::from_node)
            .reduce(|acc, rect| acc.union(&rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = LayoutOptions::default();
        assert_eq!(options.charge_strength(), -300.0);
        assert_eq!(options.link_distance(), 100.0);
        assert_eq!(options.iteration_count(), 300);
        assert_eq!(
            options.resolved_direction(Direction::TopToBottom),
            Direction::TopToBottom
        );
    }

    #[test]
    fn test_options_clamp_bad_values() {
        let options = LayoutOptions {
            strength: f64::NAN,
            distance: -5.0,
            iterations: -10.0,
            ..LayoutOptions::default()
        };
        assert_eq!(options.charge_strength(), DEFAULT_STRENGTH);
        assert_eq!(options.link_distance(), DEFAULT_DISTANCE);
        assert_eq!(options.iteration_count(), 0);

        let options = LayoutOptions {
            iterations: f64::INFINITY,
            ..LayoutOptions::default()
        };
        assert_eq!(options.iteration_count(), 0);

        let options = LayoutOptions {
            iterations: 1e12,
            ..LayoutOptions::default()
        };
        assert_eq!(options.iteration_count(), MAX_ITERATIONS);

        let options = LayoutOptions {
            iterations: 12.7,
            ..LayoutOptions::default()
        };
        assert_eq!(options.iteration_count(), 12);
    }

    #[test]
    fn test_options_from_json() {
        let options: LayoutOptions =
            serde_json::from_str(r#"{"direction":"LR","linkDistance":150,"seed":9}"#).unwrap();
        assert_eq!(options.direction, Some(Direction::LeftToRight));
        assert_eq!(options.link_distance(), 150.0);
        assert_eq!(options.charge_strength(), DEFAULT_STRENGTH);
        assert_eq!(options.seed, Some(9));

        let options: LayoutOptions =
            serde_json::from_str(r#"{"direction":"TopToBottom","distance":80}"#).unwrap();
        assert_eq!(options.direction, Some(Direction::TopToBottom));
        assert_eq!(options.link_distance(), 80.0);
    }

    #[test]
    fn test_direction_tables() {
        assert_eq!(
            Direction::LeftToRight.port_sides(),
            (Side::Right, Side::Left)
        );
        assert_eq!(
            Direction::TopToBottom.port_sides(),
            (Side::Bottom, Side::Top)
        );
        assert_eq!(Direction::LeftToRight.axis_pull(), (0.1, 0.05));
        assert_eq!(Direction::TopToBottom.axis_pull(), (0.05, 0.1));
    }

    #[test]
    fn test_result_bounds() {
        let result = LayoutResult {
            nodes: vec![
                Node::new("a", 10.0, 10.0).at(0.0, 0.0),
                Node::new("b", 20.0, 5.0).at(50.0, -10.0),
            ],
            edges: Vec::new(),
        };
        let bounds = result.bounds().unwrap();
        assert_eq!(bounds.left(), 0.0);
        assert_eq!(bounds.top(), -10.0);
        assert_eq!(bounds.right(), 70.0);
        assert_eq!(bounds.bottom(), 10.0);

        let empty = LayoutResult {
            nodes: Vec::new(),
            edges: Vec::new(),
        };
        assert!(empty.bounds().is_none());
    }
}
