//! Force-directed layout.
//!
//! A velocity-Verlet style simulation in the d3-force tradition. Each tick
//! superposes five forces on the node velocities (or positions, for the
//! centering force), then integrates with velocity decay:
//!
//! 1. **Link:** springs pull connected nodes toward the target distance.
//! 2. **Charge:** every node repels every other (Barnes-Hut approximated).
//! 3. **Center:** the mean position is kept on a fixed point.
//! 4. **Collision:** circles of `max(w, h)/2 + padding` may not overlap.
//! 5. **Axis pull:** weak springs toward the center x and y; the direction
//!    picks which axis pulls harder.
//!
//! Cooling follows a fixed 300-tick schedule (`alpha` from 1 to 0.001)
//! regardless of how many ticks the caller runs. Ticks are stepped
//! synchronously; `ForceSimulation` can be driven in chunks by callers that
//! want to yield between slices.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Direction, LayoutOptions, LayoutResult};
use crate::geometry::Point;
use crate::graph::{Edge, LayoutGraph, Node, Position, Size};
use crate::spatial::quadtree::{DEFAULT_THETA, jiggle};
use crate::spatial::{BarnesHut, Body, CollisionIndex};

/// Seed used when the caller provides none.
pub const DEFAULT_SEED: u64 = 0x5EED_CA5E;

/// Side of the square that unplaced nodes are seeded into.
pub const SEED_EXTENT: f64 = 500.0;

/// Configuration for the force simulation.
#[derive(Debug, Clone)]
pub struct ForceConfig {
    /// Fixed point the layout gravitates to.
    pub center: Point,
    /// Charge per node (negative repels).
    pub strength: f64,
    /// Target link length.
    pub distance: f64,
    /// Ticks to run.
    pub iterations: u32,
    /// Flow direction for the axis pull.
    pub direction: Direction,
    /// Added to half the longer box side to get the collision radius.
    pub collision_padding: f64,
    /// Barnes-Hut opening criterion.
    pub theta: f64,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f64,
    /// Alpha reached after `cooling_ticks` ticks.
    pub alpha_min: f64,
    /// Length of the cooling schedule.
    pub cooling_ticks: u32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            center: Point::new(250.0, 250.0),
            strength: super::DEFAULT_STRENGTH,
            distance: super::DEFAULT_DISTANCE,
            iterations: super::DEFAULT_ITERATIONS,
            direction: Direction::LeftToRight,
            collision_padding: 10.0,
            theta: DEFAULT_THETA,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            cooling_ticks: 300,
        }
    }
}

impl ForceConfig {
    /// Config for the caller's options; unset direction means left-to-right.
    pub fn from_options(options: &LayoutOptions) -> Self {
        Self {
            strength: options.charge_strength(),
            distance: options.link_distance(),
            iterations: options.iteration_count(),
            direction: options.resolved_direction(Direction::LeftToRight),
            ..Self::default()
        }
    }

    fn alpha_decay(&self) -> f64 {
        1.0 - self.alpha_min.powf(1.0 / self.cooling_ticks.max(1) as f64)
    }
}

/// A spring between two node slots.
#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    strength: f64,
    /// Share of the correction applied to the target.
    bias: f64,
}

/// Steppable force simulation over node centers.
pub struct ForceSimulation<R: Rng> {
    config: ForceConfig,
    sizes: Vec<Size>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    vxs: Vec<f64>,
    vys: Vec<f64>,
    radii: Vec<f64>,
    charges: Vec<f64>,
    links: Vec<Link>,
    alpha: f64,
    alpha_decay: f64,
    ticks: u32,
    rng: R,
}

impl<R: Rng> ForceSimulation<R> {
    /// Seed positions and set up the forces.
    ///
    /// Nodes with a position start at their box center; the rest get a
    /// random center in `[0, SEED_EXTENT)²` drawn from `rng`. Edges with an
    /// endpoint that is not among `nodes` are left out of the link force.
    pub fn new(nodes: &[Node], edges: &[Edge], config: ForceConfig, mut rng: R) -> Self {
        let n = nodes.len();
        let mut sizes = Vec::with_capacity(n);
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);

        for node in nodes {
            let size = node.size.sanitized();
            let (cx, cy) = match node.position {
                Some(p) if p.x.is_finite() && p.y.is_finite() => {
                    (p.x + size.width / 2.0, p.y + size.height / 2.0)
                }
                _ => (
                    rng.r#gen::<f64>() * SEED_EXTENT,
                    rng.r#gen::<f64>() * SEED_EXTENT,
                ),
            };
            sizes.push(size);
            xs.push(cx);
            ys.push(cy);
        }

        let radii = sizes
            .iter()
            .map(|s| s.max_extent() / 2.0 + config.collision_padding)
            .collect();
        let charges = vec![config.strength; n];

        let graph = LayoutGraph::build(nodes, edges);
        let links = graph
            .links()
            .into_iter()
            .map(|(source, target)| {
                let ds = graph.degree(source) as f64;
                let dt = graph.degree(target) as f64;
                Link {
                    source,
                    target,
                    strength: 1.0 / ds.min(dt),
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        let alpha_decay = config.alpha_decay();
        Self {
            config,
            sizes,
            xs,
            ys,
            vxs: vec![0.0; n],
            vys: vec![0.0; n],
            radii,
            charges,
            links,
            alpha: 1.0,
            alpha_decay,
            ticks: 0,
            rng,
        }
    }

    /// Current cooling factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Ticks left before the configured iteration count is reached.
    pub fn remaining(&self) -> u32 {
        self.config.iterations.saturating_sub(self.ticks)
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of springs that made it into the link force.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Advance by up to `max_ticks`, never past the iteration count.
    /// Returns the number of ticks actually run.
    pub fn run(&mut self, max_ticks: u32) -> u32 {
        let n = max_ticks.min(self.remaining());
        for _ in 0..n {
            self.tick();
        }
        tracing::trace!(ran = n, ticks = self.ticks, alpha = self.alpha, "force chunk");
        n
    }

    /// One simulation step.
    pub fn tick(&mut self) {
        self.alpha += (0.0 - self.alpha) * self.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collision();
        self.apply_axis_pull();

        let keep = 1.0 - self.config.velocity_decay;
        for i in 0..self.xs.len() {
            self.vxs[i] *= keep;
            self.vys[i] *= keep;
            self.xs[i] += self.vxs[i];
            self.ys[i] += self.vys[i];
        }
        self.ticks += 1;
    }

    /// Current center of each node, in input order.
    pub fn centers(&self) -> Vec<Point> {
        self.xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| Point::new(x, y))
            .collect()
    }

    /// Current top-left anchor of each node, in input order.
    pub fn positions(&self) -> Vec<Position> {
        self.centers()
            .into_iter()
            .zip(&self.sizes)
            .map(|(c, s)| Position::new(c.x - s.width / 2.0, c.y - s.height / 2.0))
            .collect()
    }

    /// Copies of `nodes` carrying the simulated positions.
    ///
    /// `nodes` must be the slice the simulation was created from.
    pub fn place(&self, nodes: &[Node]) -> Vec<Node> {
        nodes
            .iter()
            .zip(self.centers())
            .map(|(node, c)| node.with_center(c.x, c.y))
            .collect()
    }

    fn apply_links(&mut self) {
        for link in &self.links {
            let (s, t) = (link.source, link.target);
            let mut dx = self.xs[t] + self.vxs[t] - self.xs[s] - self.vxs[s];
            let mut dy = self.ys[t] + self.vys[t] - self.ys[s] - self.vys[s];
            if dx == 0.0 {
                dx = jiggle(&mut self.rng);
            }
            if dy == 0.0 {
                dy = jiggle(&mut self.rng);
            }

            let len = (dx * dx + dy * dy).sqrt();
            let k = (len - self.config.distance) / len * self.alpha * link.strength;
            dx *= k;
            dy *= k;

            self.vxs[t] -= dx * link.bias;
            self.vys[t] -= dy * link.bias;
            self.vxs[s] += dx * (1.0 - link.bias);
            self.vys[s] += dy * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        if self.xs.len() < 2 {
            return;
        }
        let tree = BarnesHut::build(&self.xs, &self.ys, &self.charges, self.config.theta);
        for i in 0..self.xs.len() {
            let (dvx, dvy) = tree.force_on(i, self.alpha, &mut self.rng);
            self.vxs[i] += dvx;
            self.vys[i] += dvy;
        }
    }

    fn apply_center(&mut self) {
        let n = self.xs.len();
        if n == 0 {
            return;
        }
        let sx = self.xs.iter().sum::<f64>() / n as f64 - self.config.center.x;
        let sy = self.ys.iter().sum::<f64>() / n as f64 - self.config.center.y;
        for i in 0..n {
            self.xs[i] -= sx;
            self.ys[i] -= sy;
        }
    }

    fn apply_collision(&mut self) {
        let n = self.xs.len();
        if n < 2 {
            return;
        }
        let max_radius = self.radii.iter().copied().fold(0.0, f64::max);
        let bodies = (0..n)
            .map(|i| Body::new(i, self.xs[i] + self.vxs[i], self.ys[i] + self.vys[i]))
            .collect();
        let index = CollisionIndex::build(bodies, max_radius);

        for i in 0..n {
            let ri = self.radii[i];
            let ri2 = ri * ri;
            let xi = self.xs[i] + self.vxs[i];
            let yi = self.ys[i] + self.vys[i];

            for j in index.candidates(xi, yi, ri) {
                if j <= i {
                    continue;
                }
                let rj = self.radii[j];
                let r = ri + rj;
                let mut dx = xi - self.xs[j] - self.vxs[j];
                let mut dy = yi - self.ys[j] - self.vys[j];
                let mut l = dx * dx + dy * dy;
                if l >= r * r {
                    continue;
                }

                if dx == 0.0 {
                    dx = jiggle(&mut self.rng);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(&mut self.rng);
                    l += dy * dy;
                }
                let len = l.sqrt();
                let k = (r - len) / len;
                dx *= k;
                dy *= k;

                let rj2 = rj * rj;
                let share = rj2 / (ri2 + rj2);
                self.vxs[i] += dx * share;
                self.vys[i] += dy * share;
                self.vxs[j] -= dx * (1.0 - share);
                self.vys[j] -= dy * (1.0 - share);
            }
        }
    }

    fn apply_axis_pull(&mut self) {
        let (kx, ky) = self.config.direction.axis_pull();
        let Point { x: cx, y: cy } = self.config.center;
        for i in 0..self.xs.len() {
            self.vxs[i] += (cx - self.xs[i]) * kx * self.alpha;
            self.vys[i] += (cy - self.ys[i]) * ky * self.alpha;
        }
    }
}

/// Force layout with an explicit RNG for the seeding and tie-breaking noise.
pub fn compute_force_layout_with_rng<R: Rng>(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
    rng: &mut R,
) -> LayoutResult {
    let config = ForceConfig::from_options(options);
    let span = tracing::debug_span!(
        "force_layout",
        nodes = nodes.len(),
        edges = edges.len(),
        iterations = config.iterations
    );
    let _guard = span.enter();

    let mut sim = ForceSimulation::new(nodes, edges, config, rng);
    if sim.link_count() < edges.len() {
        tracing::debug!(
            dropped = edges.len() - sim.link_count(),
            "edges left out of the link force"
        );
    }
    let ticks = sim.remaining();
    sim.run(ticks);

    LayoutResult {
        nodes: sim.place(nodes),
        edges: edges.to_vec(),
    }
}

/// Force layout seeded from `options.seed` (or a fixed default seed).
///
/// Equal inputs give bit-identical output.
pub fn compute_force_layout(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
) -> LayoutResult {
    let mut rng = StdRng::seed_from_u64(options.seed.unwrap_or(DEFAULT_SEED));
    compute_force_layout_with_rng(nodes, edges, options, &mut rng)
}
