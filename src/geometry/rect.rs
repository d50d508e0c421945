//! Rectangle and point primitives.

use serde::{Deserialize, Serialize};

use crate::graph::Node;

/// A point in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Side of a node box an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Axis-aligned rectangle stored as center plus half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center_x: f64,
    pub center_y: f64,
    pub half_width: f64,
    pub half_height: f64,
}

impl Rect {
    #[inline]
    pub fn from_center(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            center_x,
            center_y,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    #[inline]
    pub fn from_top_left(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_center(x + width / 2.0, y + height / 2.0, width, height)
    }

    /// Box of a caller node. A node without a position sits at the origin.
    pub fn from_node(node: &Node) -> Self {
        let position = node.position_or_origin();
        let size = node.size.sanitized();
        Self::from_top_left(position.x, position.y, size.width, size.height)
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.center_x - self.half_width
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.center_y - self.half_height
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.center_x + self.half_width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.center_y + self.half_height
    }

    /// Zero width or zero height.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.half_width == 0.0 || self.half_height == 0.0
    }

    #[inline]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            center_x: self.center_x + dx,
            center_y: self.center_y + dy,
            ..*self
        }
    }

    /// True when the interiors do not overlap.
    pub fn is_disjoint(&self, other: &Rect) -> bool {
        self.right() <= other.left()
            || other.right() <= self.left()
            || self.bottom() <= other.top()
            || other.bottom() <= self.top()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::from_top_left(left, top, right - left, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::from_top_left(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), Point::new(60.0, 45.0));
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.bottom(), 70.0);
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);
    }

    #[test]
    fn test_rect_from_node_without_position() {
        let rect = Rect::from_node(&Node::new("a", 40.0, 20.0));
        assert_eq!(rect.center(), Point::new(20.0, 10.0));
    }

    #[test]
    fn test_rect_from_node_clamps_negative_size() {
        let rect = Rect::from_node(&Node::new("a", -40.0, 20.0).at(5.0, 5.0));
        assert!(rect.is_degenerate());
        assert_eq!(rect.center(), Point::new(5.0, 15.0));
    }

    #[test]
    fn test_disjoint_and_union() {
        let a = Rect::from_top_left(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_top_left(20.0, 0.0, 10.0, 10.0);
        let c = Rect::from_top_left(5.0, 5.0, 10.0, 10.0);

        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));

        let u = a.union(&b);
        assert_eq!(u.left(), 0.0);
        assert_eq!(u.right(), 30.0);
        assert_eq!(u.height(), 10.0);
    }
}
