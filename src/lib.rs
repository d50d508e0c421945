//! Caseboard Layout - WASM Module
//!
//! Layout and edge-routing engine for the investigation board. It computes
//! where the boxes of a node-link diagram go and where each edge meets the
//! boundary of its two boxes. It is compiled to WebAssembly and exposes a
//! JavaScript-friendly API via wasm-bindgen.
//!
//! # Architecture
//!
//! - `geometry`: boxes, boundary intersection, side classification, anchors
//! - `graph`: caller-facing nodes/edges and the petgraph topology
//! - `layout`: force-directed and layered batch layouts
//! - `spatial`: Barnes-Hut quadtree and R-tree used by the force simulation
//!
//! Every exported function takes plain JS objects (`{ id, position, width,
//! height, ... }` nodes, `{ source, target, ... }` edges) and returns plain
//! JS objects. Fields the engine does not know are carried through.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod spatial;

use error::{LayoutError, Result};
use geometry::{compute_edge_anchor, compute_edge_anchors};
use graph::{Edge, Node};
use layout::{
    ForceConfig, ForceSimulation, LayoutOptions, LayoutResult, compute_force_layout,
    compute_hierarchical_layout,
};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &'static str) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(LayoutError::input(what))
}

/// `undefined` and `null` mean "all defaults".
fn options_from_js(value: JsValue) -> Result<LayoutOptions> {
    if value.is_undefined() || value.is_null() {
        return Ok(LayoutOptions::default());
    }
    from_js(value, "layout options")
}

/// Plain objects and arrays, never `Map`.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(LayoutError::Output)
}

/// Seed for callers that asked for none.
fn random_seed() -> u64 {
    (js_sys::Math::random() * (1u64 << 53) as f64) as u64
}

// =========================================================================
// Edge anchors
// =========================================================================

/// Compute where the edge between two nodes meets their boundaries.
///
/// Returns `{ sx, sy, tx, ty, sourceSide, targetSide }`.
#[wasm_bindgen(js_name = computeEdgeAnchor)]
pub fn compute_edge_anchor_js(
    source: JsValue,
    target: JsValue,
) -> std::result::Result<JsValue, JsError> {
    let source: Node = from_js(source, "source node")?;
    let target: Node = from_js(target, "target node")?;
    Ok(to_js(&compute_edge_anchor(&source, &target))?)
}

/// Anchors for a whole edge list, index-aligned with `edges`.
///
/// Entries are `null` for edges whose endpoints are not among `nodes`.
#[wasm_bindgen(js_name = computeEdgeAnchors)]
pub fn compute_edge_anchors_js(
    nodes: JsValue,
    edges: JsValue,
) -> std::result::Result<JsValue, JsError> {
    let nodes: Vec<Node> = from_js(nodes, "nodes")?;
    let edges: Vec<Edge> = from_js(edges, "edges")?;
    Ok(to_js(&compute_edge_anchors(&nodes, &edges))?)
}

// =========================================================================
// Batch layouts
// =========================================================================

/// Force-directed layout. Returns `{ nodes, edges }` with new positions.
///
/// Options: `direction` ("LR" | "TB"), `strength`, `distance`,
/// `iterations`, `seed`. Without a seed the result is still deterministic.
#[wasm_bindgen(js_name = computeForceLayout)]
pub fn compute_force_layout_js(
    nodes: JsValue,
    edges: JsValue,
    options: JsValue,
) -> std::result::Result<JsValue, JsError> {
    let nodes: Vec<Node> = from_js(nodes, "nodes")?;
    let edges: Vec<Edge> = from_js(edges, "edges")?;
    let options = options_from_js(options)?;
    Ok(to_js(&compute_force_layout(&nodes, &edges, &options))?)
}

/// Layered layout. Returns `{ nodes, edges }` with new positions.
///
/// Options: `direction` ("TB" | "LR", default "TB").
#[wasm_bindgen(js_name = computeHierarchicalLayout)]
pub fn compute_hierarchical_layout_js(
    nodes: JsValue,
    edges: JsValue,
    options: JsValue,
) -> std::result::Result<JsValue, JsError> {
    let nodes: Vec<Node> = from_js(nodes, "nodes")?;
    let edges: Vec<Edge> = from_js(edges, "edges")?;
    let options = options_from_js(options)?;
    Ok(to_js(&compute_hierarchical_layout(&nodes, &edges, &options))?)
}

// =========================================================================
// Incremental force layout
// =========================================================================

/// Force layout that the front-end steps in slices between frames.
///
/// ```js
/// const task = new ForceLayoutTask(nodes, edges, { iterations: 300 });
/// while (!task.isDone) { task.step(20); await nextFrame(); }
/// const { nodes: placed } = task.result();
/// ```
#[wasm_bindgen]
pub struct ForceLayoutTask {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    sim: ForceSimulation<StdRng>,
}

impl ForceLayoutTask {
    fn build(nodes: Vec<Node>, edges: Vec<Edge>, options: &LayoutOptions, seed: u64) -> Self {
        let config = ForceConfig::from_options(options);
        let sim = ForceSimulation::new(&nodes, &edges, config, StdRng::seed_from_u64(seed));
        Self { nodes, edges, sim }
    }

    fn layout(&self) -> LayoutResult {
        LayoutResult {
            nodes: self.sim.place(&self.nodes),
            edges: self.edges.clone(),
        }
    }
}

#[wasm_bindgen]
impl ForceLayoutTask {
    /// Seed the simulation. Nothing is stepped yet.
    ///
    /// Without `options.seed` the task draws a random seed.
    #[wasm_bindgen(constructor)]
    pub fn new(
        nodes: JsValue,
        edges: JsValue,
        options: JsValue,
    ) -> std::result::Result<ForceLayoutTask, JsError> {
        let nodes: Vec<Node> = from_js(nodes, "nodes")?;
        let edges: Vec<Edge> = from_js(edges, "edges")?;
        let options = options_from_js(options)?;
        let seed = options.seed.unwrap_or_else(random_seed);
        Ok(Self::build(nodes, edges, &options, seed))
    }

    /// Run up to `ticks` more ticks. Returns the number actually run.
    pub fn step(&mut self, ticks: u32) -> u32 {
        self.sim.run(ticks)
    }

    #[wasm_bindgen(getter, js_name = isDone)]
    pub fn is_done(&self) -> bool {
        self.sim.is_done()
    }

    /// Ticks left before the requested iteration count is reached.
    #[wasm_bindgen(getter)]
    pub fn remaining(&self) -> u32 {
        self.sim.remaining()
    }

    /// Current positions as `{ nodes, edges }`. Valid at any point.
    pub fn result(&self) -> std::result::Result<JsValue, JsError> {
        Ok(to_js(&self.layout())?)
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::geometry::Side;
    use crate::layout::Direction;
    use serde_json::json;

    fn board() -> (Vec<Node>, Vec<Edge>) {
        let nodes = json!([
            { "id": "suspect", "width": 160, "height": 60, "type": "person" },
            { "id": "alibi", "width": 140, "height": 50, "type": "note" },
            { "id": "scene", "width": 200, "height": 80, "type": "place",
              "data": { "label": "Warehouse" } },
            { "id": 4, "width": 120, "height": 40 }
        ]);
        let edges = json!([
            { "source": "suspect", "target": "alibi", "label": "claims" },
            { "source": "suspect", "target": "scene" },
            { "source": "scene", "target": 4 },
            { "source": 4, "target": "ghost" }
        ]);
        (
            serde_json::from_value(nodes).unwrap(),
            serde_json::from_value(edges).unwrap(),
        )
    }

    /// Arrange with the force layout, then route every edge. This is the
    /// sequence the board runs on "arrange".
    #[test]
    fn test_force_layout_then_anchors() {
        let (nodes, edges) = board();
        let result = compute_force_layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(result.nodes.len(), 4);
        assert!(result.nodes.iter().all(|n| n.position.is_some()));

        let anchors = compute_edge_anchors(&result.nodes, &result.edges);
        assert_eq!(anchors.len(), 4);
        assert!(anchors[..3].iter().all(Option::is_some));
        assert!(anchors[3].is_none(), "edge to a missing node has no anchor");
        for anchor in anchors.iter().flatten() {
            assert!(anchor.sx.is_finite() && anchor.ty.is_finite());
        }
    }

    #[test]
    fn test_hierarchical_layout_then_anchors() {
        let (nodes, edges) = board();
        let options = LayoutOptions::default().with_direction(Direction::TopToBottom);
        let result = compute_hierarchical_layout(&nodes, &edges, &options);
        let anchors = compute_edge_anchors(&result.nodes, &result.edges);

        // Ranks stack downward, so tree edges leave the bottom and enter the top.
        let first = anchors[0].unwrap();
        assert_eq!(first.source_side, Side::Bottom);
        assert_eq!(first.target_side, Side::Top);
        assert!(first.sy < first.ty);
    }

    #[test]
    fn test_result_keeps_unknown_fields() {
        let (nodes, edges) = board();
        let result = compute_hierarchical_layout(&nodes, &edges, &LayoutOptions::default());
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["nodes"][2]["data"]["label"], "Warehouse");
        assert_eq!(value["nodes"][0]["type"], "person");
        assert_eq!(value["nodes"][3]["id"], 4);
        assert_eq!(value["edges"][0]["label"], "claims");
        assert!(value["nodes"][1]["position"]["x"].is_number());
    }

    #[test]
    fn test_task_matches_batch_layout() {
        let (nodes, edges) = board();
        let options = LayoutOptions::default().with_iterations(120).with_seed(17);

        let mut task = ForceLayoutTask::build(nodes.clone(), edges.clone(), &options, 17);
        assert_eq!(task.remaining(), 120);
        let mut steps = 0;
        while !task.is_done() {
            task.step(25);
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(task.remaining(), 0);
        assert_eq!(task.step(10), 0);

        let batch = compute_force_layout(&nodes, &edges, &options);
        assert_eq!(task.layout(), batch);
    }

    #[test]
    fn test_task_result_before_stepping_is_seeded() {
        let (nodes, edges) = board();
        let task = ForceLayoutTask::build(nodes, edges, &LayoutOptions::default(), 1);
        let result = task.layout();
        assert!(result.nodes.iter().all(|n| n.position.is_some()));
        assert!(!task.is_done());
    }
}
