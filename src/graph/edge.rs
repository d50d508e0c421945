//! Edge type.
//!
//! Edges connect two nodes by id. The engine never requires the ids to
//! resolve: an edge whose endpoint is missing is skipped by every consumer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::node::NodeId;

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,

    /// Fields the engine does not interpret (`id`, `label`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            extra: Map::new(),
        }
    }

    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
