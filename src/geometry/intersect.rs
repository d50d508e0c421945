//! Floating-edge boundary intersection and side classification.
//!
//! `intersect` finds where the line between two box centers leaves the first
//! box. In coordinates normalized by the half extents it is an L1 projection:
//! the ray is scaled so that `max(|u|, |v|) = 1`, which puts the point on the
//! box outline for any aspect ratio without branching per side.

use super::rect::{Point, Rect, Side};

/// Pixel tolerance for side classification.
const SIDE_TOLERANCE: f64 = 1.0;

/// Point where the segment from `node.center` toward `other.center` crosses
/// the boundary of `node`.
///
/// Returns the center of `node` when it has zero width or height, or when the
/// two centers coincide.
pub fn intersect(node: &Rect, other: &Rect) -> Point {
    if node.is_degenerate() {
        return node.center();
    }

    let w = node.half_width;
    let h = node.half_height;
    let (x2, y2) = (node.center_x, node.center_y);
    let (x1, y1) = (other.center_x, other.center_y);

    let xx1 = (x1 - x2) / (2.0 * w) - (y1 - y2) / (2.0 * h);
    let yy1 = (x1 - x2) / (2.0 * w) + (y1 - y2) / (2.0 * h);

    let norm = xx1.abs() + yy1.abs();
    if norm == 0.0 || !norm.is_finite() {
        return node.center();
    }
    let a = 1.0 / norm;

    let x = w * (a * xx1 + a * yy1) + x2;
    let y = h * (-a * xx1 + a * yy1) + y2;
    Point::new(x, y)
}

/// Side of `rect` that `point` lies on.
///
/// Origin and point are rounded to whole pixels first. Left and right win
/// over top and bottom; a point that matches nothing (interior, or numeric
/// noise around a vertex) reports `Top`.
pub fn classify_side(rect: &Rect, point: Point) -> Side {
    let left = rect.left().round();
    let top = rect.top().round();
    let px = point.x.round();
    let py = point.y.round();

    if px <= left + SIDE_TOLERANCE {
        return Side::Left;
    }
    if px >= left + rect.width() - SIDE_TOLERANCE {
        return Side::Right;
    }
    if py <= top + SIDE_TOLERANCE {
        return Side::Top;
    }
    if py >= top + rect.height() - SIDE_TOLERANCE {
        return Side::Bottom;
    }
    Side::Top
}
