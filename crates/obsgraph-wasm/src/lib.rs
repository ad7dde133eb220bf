//! WebAssembly bindings for obsgraph
//!
//! このクレートはブラウザ環境で観測グラフを生成・拡張するための
//! WebAssemblyバインディングを提供します。
//! Snapshots cross the boundary as JSON; the page owns rendering and the
//! auto-append timer, and checks `isAuto` before each tick.

mod utils;

use obsgraph_core::RngSource;
use obsgraph_engine::{EngineConfig, GenerateOptions, GraphSession, Mode};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// One graph session living for the lifetime of the page
#[wasm_bindgen]
pub struct ObsGraph {
    session: GraphSession<RngSource>,
}

#[wasm_bindgen]
impl ObsGraph {
    /// Create a session; pass a seed for reproducible graphs
    #[wasm_bindgen(constructor)]
    pub fn new(seed: Option<f64>) -> Result<ObsGraph, JsValue> {
        utils::set_panic_hook();
        Self::build(EngineConfig::default(), seed).map_err(to_js)
    }

    /// Create a session from a JSON engine configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str, seed: Option<f64>) -> Result<ObsGraph, JsValue> {
        utils::set_panic_hook();
        let config: EngineConfig = serde_json::from_str(config_json).map_err(to_js)?;
        Self::build(config, seed).map_err(to_js)
    }

    /// Replace the graph with `count` fresh observations; returns the snapshot JSON
    #[wasm_bindgen]
    pub fn generate(&mut self, count: usize) -> Result<String, JsValue> {
        let snapshot = self.session.generate(count).map_err(to_js)?;
        log(&format!("Generated graph: {}", snapshot.summary()));
        serde_json::to_string(snapshot).map_err(to_js)
    }

    /// Add `count` observations; returns the snapshot JSON
    #[wasm_bindgen]
    pub fn append(&mut self, count: usize) -> Result<String, JsValue> {
        let snapshot = self.session.append(count).map_err(to_js)?;
        log(&format!("Appended {} observations: {}", count, snapshot.summary()));
        serde_json::to_string(snapshot).map_err(to_js)
    }

    /// Pin the fields of the observation with `uuid` near `(x, y)`
    #[wasm_bindgen]
    pub fn pin(&mut self, uuid: &str, x: f64, y: f64) -> Result<String, JsValue> {
        let uuid = Uuid::parse_str(uuid).map_err(to_js)?;
        let snapshot = self.session.pin_observation(uuid, x, y).map_err(to_js)?;
        log(&format!("Pinned observation {}", uuid));
        serde_json::to_string(snapshot).map_err(to_js)
    }

    /// Toggle auto mode; the page stops its timer once this reads false
    #[wasm_bindgen(js_name = setAuto)]
    pub fn set_auto(&mut self, auto: bool) {
        let mode = if auto { Mode::Auto } else { Mode::Manual };
        self.session.set_mode(mode);
    }

    #[wasm_bindgen(js_name = isAuto)]
    pub fn is_auto(&self) -> bool {
        self.session.mode() == Mode::Auto
    }

    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&mut self, reuse_probability: f64, try_to_be_bad: bool) -> Result<(), JsValue> {
        self.session
            .set_options(GenerateOptions {
                reuse_probability,
                try_to_be_bad,
            })
            .map_err(to_js)
    }

    /// Observations per append, as configured
    #[wasm_bindgen(js_name = batchSize)]
    pub fn batch_size(&self) -> usize {
        self.session.config().batch_size
    }

    /// Suggested auto-append delay in milliseconds
    #[wasm_bindgen(js_name = intervalMs)]
    pub fn interval_ms(&self) -> f64 {
        self.session.config().autoplay.interval_ms as f64
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.snapshot()).map_err(to_js)
    }

    /// The current snapshot as a plain JS object
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        js_sys::JSON::parse(&self.snapshot_json()?)
    }

    #[wasm_bindgen]
    pub fn summary(&self) -> String {
        self.session.snapshot().summary().to_string()
    }
}

impl ObsGraph {
    fn build(config: EngineConfig, seed: Option<f64>) -> Result<ObsGraph, obsgraph_engine::EngineError> {
        let session = match seed.map(seed_from_js) {
            Some(seed) => GraphSession::seeded(config, seed)?,
            None => GraphSession::from_entropy(config)?,
        };
        Ok(ObsGraph { session })
    }
}

/// JS numbers are doubles; non-finite or negative seeds collapse to 0
fn seed_from_js(seed: f64) -> u64 {
    if seed.is_finite() && seed > 0.0 {
        seed as u64
    } else {
        0
    }
}

fn to_js<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Utility function to log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    tracing::info!("{}", message);
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn main() {
    utils::set_panic_hook();
    log("obsgraph WebAssembly module initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(seed: f64) -> ObsGraph {
        ObsGraph::build(EngineConfig::default(), Some(seed)).unwrap()
    }

    #[test]
    fn test_seed_conversion() {
        assert_eq!(seed_from_js(42.9), 42);
        assert_eq!(seed_from_js(-1.0), 0);
        assert_eq!(seed_from_js(f64::NAN), 0);
    }

    #[test]
    fn test_generate_append_and_pin() {
        let mut graph = graph(3.0);

        let json = graph.generate(5).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["observations"].as_array().unwrap().len(), 5);

        graph.append(3).unwrap();
        let value: serde_json::Value = serde_json::from_str(&graph.snapshot_json().unwrap()).unwrap();
        let first = value["observations"][0]["uuid"].as_str().unwrap().to_string();
        assert_eq!(value["observations"].as_array().unwrap().len(), 8);

        let pinned: serde_json::Value = serde_json::from_str(&graph.pin(&first, 5.0, 5.0).unwrap()).unwrap();
        assert!(!pinned["fieldNodes"].as_array().unwrap().is_empty());
        assert!(graph.summary().contains("8 observations"));
    }

    #[test]
    fn test_auto_flag() {
        let mut graph = graph(1.0);
        assert!(!graph.is_auto());
        graph.set_auto(true);
        assert!(graph.is_auto());
        graph.set_auto(false);
        assert!(!graph.is_auto());
        assert_eq!(graph.batch_size(), 10);
        assert_eq!(graph.interval_ms(), 2000.0);
    }
}
