//! Node type and related structures.
//!
//! Nodes are the boxes of the investigation graph. Each node has:
//! - A caller-assigned identifier (string or integer, opaque to the engine)
//! - An optional top-left position in graph space
//! - A size (width, height) used for anchoring, collision and rank thickness
//! - Any other caller fields, carried through untouched

use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-assigned node identifier.
///
/// The front-end uses both string ids (`"person-12"`) and numeric ids; both
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

// JS numbers may arrive as floats; integral ones are integer ids.
impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = NodeId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer node id")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<NodeId, E> {
                Ok(NodeId::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<NodeId, E> {
                i64::try_from(v)
                    .map(NodeId::Int)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<NodeId, E> {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Ok(NodeId::Int(v as i64))
                } else {
                    Err(E::invalid_value(Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<NodeId, E> {
                Ok(NodeId::Str(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<NodeId, E> {
                Ok(NodeId::Str(v))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => write!(f, "Node({id})"),
            NodeId::Str(id) => write!(f, "Node({id})"),
        }
    }
}

impl From<&str> for NodeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::Str(id.to_owned())
    }
}

impl From<String> for NodeId {
    #[inline]
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

impl From<i64> for NodeId {
    #[inline]
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for NodeId {
    #[inline]
    fn from(id: i32) -> Self {
        Self::Int(id.into())
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::Int(id.into())
    }
}

/// Top-left anchor of a node box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Box dimensions of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Negative and non-finite extents are treated as zero.
    pub fn sanitized(self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 { v } else { 0.0 }
        }
        Self {
            width: clamp(self.width),
            height: clamp(self.height),
        }
    }

    /// The longer side of the box.
    #[inline]
    pub fn max_extent(self) -> f64 {
        self.width.max(self.height)
    }
}

/// A graph node as handed over by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Top-left anchor. Absent for freshly created nodes; layouts seed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(flatten)]
    pub size: Size,

    /// Fields the engine does not interpret (`type`, `data`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a node without a position.
    pub fn new(id: impl Into<NodeId>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            position: None,
            size: Size::new(width, height),
            extra: Map::new(),
        }
    }

    /// Builder-style top-left placement.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    /// Top-left anchor, or the origin when unset.
    #[inline]
    pub fn position_or_origin(&self) -> Position {
        self.position.unwrap_or_default()
    }

    /// Copy of this node placed so that its center lands on `(cx, cy)`.
    pub fn with_center(&self, cx: f64, cy: f64) -> Self {
        let size = self.size.sanitized();
        let mut placed = self.clone();
        placed.position = Some(Position::new(cx - size.width / 2.0, cy - size.height / 2.0));
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(format!("{}", NodeId::from("a")), "Node(a)");
        assert_eq!(format!("{}", NodeId::from(42)), "Node(42)");
    }

    #[test]
    fn test_node_id_kinds_stay_distinct() {
        assert_ne!(NodeId::from("1"), NodeId::from(1));
    }

    #[test]
    fn test_size_sanitized() {
        let size = Size::new(-5.0, f64::NAN).sanitized();
        assert_eq!(size, Size::new(0.0, 0.0));

        let size = Size::new(30.0, 20.0).sanitized();
        assert_eq!(size, Size::new(30.0, 20.0));
        assert_eq!(size.max_extent(), 30.0);
    }

    #[test]
    fn test_with_center_leaves_input_untouched() {
        let node = Node::new("a", 100.0, 50.0).at(10.0, 10.0);
        let moved = node.with_center(0.0, 0.0);

        assert_eq!(moved.position, Some(Position::new(-50.0, -25.0)));
        assert_eq!(node.position, Some(Position::new(10.0, 10.0)));
    }

    #[test]
    fn test_node_json_passthrough() {
        let json = r#"{"id":"p1","position":{"x":1.0,"y":2.0},"width":10.0,"height":20.0,"type":"person","data":{"label":"Ada"}}"#;
        let node: Node = serde_json::from_str(json).unwrap();

        assert_eq!(node.id, NodeId::from("p1"));
        assert_eq!(node.position, Some(Position::new(1.0, 2.0)));
        assert_eq!(node.size, Size::new(10.0, 20.0));
        assert_eq!(node.extra.get("type"), Some(&Value::from("person")));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["data"]["label"], Value::from("Ada"));
        assert_eq!(back["width"], Value::from(10.0));
    }

    #[test]
    fn test_node_id_rejects_fractional_and_other_types() {
        assert!(serde_json::from_str::<NodeId>("1.5").is_err());
        assert!(serde_json::from_str::<NodeId>("true").is_err());
        assert_eq!(
            serde_json::from_str::<NodeId>(r#""x""#).unwrap(),
            NodeId::from("x")
        );
    }

    #[test]
    fn test_node_json_defaults() {
        let node: Node = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(node.id, NodeId::Int(7));
        let node: Node = serde_json::from_str(r#"{"id":7.0}"#).unwrap();
        assert_eq!(node.id, NodeId::Int(7));
        assert_eq!(node.position, None);
        assert_eq!(node.size, Size::default());
    }
}
