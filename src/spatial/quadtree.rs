//! Barnes-Hut quadtree for many-body repulsion.
//!
//! Each quad aggregates the charge of the bodies below it and their
//! charge-weighted centroid. A body far enough from a quad (quad width over
//! distance below `theta`) interacts with the aggregate instead of visiting
//! its children, which brings the charge force from O(n²) to O(n log n).

use rand::Rng;

/// Bodies that still share a leaf at this depth are kept together.
const MAX_DEPTH: usize = 32;

/// Default opening criterion (θ = 0.9).
pub const DEFAULT_THETA: f64 = 0.9;

/// Squared distances below this are softened to avoid blow-ups.
const DISTANCE_MIN2: f64 = 1.0;

#[derive(Debug, Clone)]
struct Quad {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    depth: usize,
    children: Option<[usize; 4]>,
    /// Body indices held by a leaf.
    bodies: Vec<usize>,
    /// Summed charge of everything below.
    charge: f64,
    /// Charge-weighted centroid.
    cx: f64,
    cy: f64,
}

impl Quad {
    fn new(x0: f64, y0: f64, x1: f64, y1: f64, depth: usize) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            depth,
            children: None,
            bodies: Vec::new(),
            charge: 0.0,
            cx: (x0 + x1) / 2.0,
            cy: (y0 + y1) / 2.0,
        }
    }

    fn child_for(&self, x: f64, y: f64) -> usize {
        let mx = (self.x0 + self.x1) / 2.0;
        let my = (self.y0 + self.y1) / 2.0;
        (usize::from(y >= my) << 1) | usize::from(x >= mx)
    }
}

/// Quadtree over body positions with per-body charges.
pub struct BarnesHut<'a> {
    quads: Vec<Quad>,
    xs: &'a [f64],
    ys: &'a [f64],
    charges: &'a [f64],
    theta2: f64,
}

impl<'a> BarnesHut<'a> {
    /// Build the tree. All three slices are indexed by body.
    pub fn build(xs: &'a [f64], ys: &'a [f64], charges: &'a [f64], theta: f64) -> Self {
        let mut tree = Self {
            quads: Vec::new(),
            xs,
            ys,
            charges,
            theta2: theta * theta,
        };
        if xs.is_empty() {
            return tree;
        }

        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (&x, &y) in xs.iter().zip(ys) {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        // Square root cell, at least one unit wide.
        let side = (x1 - x0).max(y1 - y0).max(1.0);
        tree.quads.push(Quad::new(x0, y0, x0 + side, y0 + side, 0));

        for body in 0..xs.len() {
            tree.insert(body);
        }
        tree.accumulate(0);
        tree
    }

    /// Number of quads in the tree.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    fn insert(&mut self, body: usize) {
        let (x, y) = (self.xs[body], self.ys[body]);
        let mut q = 0;
        loop {
            if let Some(children) = self.quads[q].children {
                q = children[self.quads[q].child_for(x, y)];
                continue;
            }

            let quad = &self.quads[q];
            let coincident = quad
                .bodies
                .first()
                .is_some_and(|&other| self.xs[other] == x && self.ys[other] == y);
            if quad.bodies.is_empty() || coincident || quad.depth >= MAX_DEPTH {
                self.quads[q].bodies.push(body);
                return;
            }

            self.split(q);
        }
    }

    fn split(&mut self, q: usize) {
        let Quad {
            x0, y0, x1, y1, depth, ..
        } = self.quads[q];
        let mx = (x0 + x1) / 2.0;
        let my = (y0 + y1) / 2.0;

        let base = self.quads.len();
        self.quads.push(Quad::new(x0, y0, mx, my, depth + 1));
        self.quads.push(Quad::new(mx, y0, x1, my, depth + 1));
        self.quads.push(Quad::new(x0, my, mx, y1, depth + 1));
        self.quads.push(Quad::new(mx, my, x1, y1, depth + 1));
        let children = [base, base + 1, base + 2, base + 3];

        let moved = std::mem::take(&mut self.quads[q].bodies);
        self.quads[q].children = Some(children);
        for body in moved {
            let c = self.quads[q].child_for(self.xs[body], self.ys[body]);
            self.quads[children[c]].bodies.push(body);
        }
    }

    fn accumulate(&mut self, q: usize) {
        let (mut charge, mut weight, mut wx, mut wy) = (0.0, 0.0, 0.0, 0.0);

        if let Some(children) = self.quads[q].children {
            for c in children {
                self.accumulate(c);
                let child = &self.quads[c];
                let w = child.charge.abs();
                charge += child.charge;
                weight += w;
                wx += w * child.cx;
                wy += w * child.cy;
            }
        } else {
            for &body in &self.quads[q].bodies {
                let w = self.charges[body].abs();
                charge += self.charges[body];
                weight += w;
                wx += w * self.xs[body];
                wy += w * self.ys[body];
            }
        }

        let quad = &mut self.quads[q];
        quad.charge = charge;
        if weight > 0.0 {
            quad.cx = wx / weight;
            quad.cy = wy / weight;
        }
    }

    /// Velocity change on `body` from every other charge, scaled by `alpha`.
    ///
    /// Coincident bodies get a tiny random offset so they can separate.
    pub fn force_on<R: Rng>(&self, body: usize, alpha: f64, rng: &mut R) -> (f64, f64) {
        let mut acc = (0.0, 0.0);
        if self.quads.is_empty() {
            return acc;
        }

        let (x, y) = (self.xs[body], self.ys[body]);
        let mut stack = vec![0usize];
        while let Some(q) = stack.pop() {
            let quad = &self.quads[q];
            if quad.charge == 0.0 {
                continue;
            }

            let mut dx = quad.cx - x;
            let mut dy = quad.cy - y;
            let width = quad.x1 - quad.x0;
            let mut l = dx * dx + dy * dy;

            // Far enough away: treat the quad as a single body.
            if width * width / self.theta2 < l {
                if dx == 0.0 {
                    dx = jiggle(rng);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(rng);
                    l += dy * dy;
                }
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                acc.0 += dx * quad.charge * alpha / l;
                acc.1 += dy * quad.charge * alpha / l;
                continue;
            }

            if let Some(children) = quad.children {
                stack.extend(children);
                continue;
            }

            // Leaf: exact interaction with each body it holds.
            if quad.bodies.iter().all(|&other| other == body) {
                continue;
            }
            for &other in &quad.bodies {
                if other == body {
                    continue;
                }
                let mut dx = self.xs[other] - x;
                let mut dy = self.ys[other] - y;
                let mut l = dx * dx + dy * dy;
                if dx == 0.0 {
                    dx = jiggle(rng);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(rng);
                    l += dy * dy;
                }
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                let w = self.charges[other] * alpha / l;
                acc.0 += dx * w;
                acc.1 += dy * w;
            }
        }
        acc
    }
}

/// Tiny random displacement used to break exact symmetry.
pub fn jiggle<R: Rng>(rng: &mut R) -> f64 {
    (rng.r#gen::<f64>() - 0.5) * 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn exact(xs: &[f64], ys: &[f64], charges: &[f64], body: usize) -> (f64, f64) {
        let mut acc = (0.0, 0.0);
        for other in 0..xs.len() {
            if other == body {
                continue;
            }
            let dx = xs[other] - xs[body];
            let dy = ys[other] - ys[body];
            let l = dx * dx + dy * dy;
            acc.0 += dx * charges[other] / l;
            acc.1 += dy * charges[other] / l;
        }
        acc
    }

    #[test]
    fn test_two_bodies_repel() {
        let xs = [0.0, 10.0];
        let ys = [0.0, 0.0];
        let charges = [-300.0, -300.0];
        let tree = BarnesHut::build(&xs, &ys, &charges, DEFAULT_THETA);
        let mut rng = StdRng::seed_from_u64(1);

        let (vx, vy) = tree.force_on(0, 1.0, &mut rng);
        assert!((vx - -30.0).abs() < 1e-9, "vx = {vx}");
        assert!(vy.abs() < 1e-5);

        let (vx, _) = tree.force_on(1, 1.0, &mut rng);
        assert!((vx - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_matches_exact_sum_with_zero_theta() {
        let xs = [0.0, 40.0, -25.0, 13.0, 70.0, -60.0];
        let ys = [0.0, 5.0, 30.0, -45.0, 80.0, -10.0];
        let charges = [-300.0; 6];
        let tree = BarnesHut::build(&xs, &ys, &charges, 0.0);
        let mut rng = StdRng::seed_from_u64(7);

        for body in 0..xs.len() {
            let (vx, vy) = tree.force_on(body, 1.0, &mut rng);
            let (ex, ey) = exact(&xs, &ys, &charges, body);
            assert!((vx - ex).abs() < 1e-9, "body {body}: {vx} vs {ex}");
            assert!((vy - ey).abs() < 1e-9, "body {body}: {vy} vs {ey}");
        }
    }

    #[test]
    fn test_approximation_close_to_exact() {
        let n = 60;
        let xs: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64 * 5.0).collect();
        let ys: Vec<f64> = (0..n).map(|i| ((i * 53) % 97) as f64 * 5.0).collect();
        let charges = vec![-300.0; n];
        let tree = BarnesHut::build(&xs, &ys, &charges, DEFAULT_THETA);
        let mut rng = StdRng::seed_from_u64(3);

        let (vx, vy) = tree.force_on(0, 1.0, &mut rng);
        let (ex, ey) = exact(&xs, &ys, &charges, 0);
        let err = (vx - ex).hypot(vy - ey);
        let mag = ex.hypot(ey);
        assert!(err <= 0.25 * mag + 1e-6, "err {err} vs magnitude {mag}");
    }

    #[test]
    fn test_coincident_bodies_get_pushed_apart() {
        let xs = [5.0, 5.0];
        let ys = [5.0, 5.0];
        let charges = [-300.0, -300.0];
        let tree = BarnesHut::build(&xs, &ys, &charges, DEFAULT_THETA);
        let mut rng = StdRng::seed_from_u64(11);

        let (vx, vy) = tree.force_on(0, 1.0, &mut rng);
        assert!(vx.is_finite() && vy.is_finite());
        assert!(vx != 0.0 || vy != 0.0);
    }

    #[test]
    fn test_empty_tree() {
        let tree = BarnesHut::build(&[], &[], &[], DEFAULT_THETA);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(tree.quad_count(), 0);
        assert_eq!(tree.force_on(0, 1.0, &mut rng), (0.0, 0.0));
    }
}
