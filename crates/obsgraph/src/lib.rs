//! # obsgraph - Synthetic Observation Graph Stack
//!
//! obsgraph generates synthetic security observations (source and destination
//! IPs, usernames, domains, URLs, emails, a severity) and aggregates the
//! values they share into a graph of recurring actors. Values seen often
//! enough become field nodes linked to the observations that carry them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use obsgraph::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = GraphSession::seeded(EngineConfig::default(), 7)?;
//!
//!     session.generate(20)?;
//!     let snapshot = session.append(10)?;
//!     println!("{}", snapshot.summary());
//!
//!     let first = snapshot.state.observations[0].uuid;
//!     session.pin_observation(first, 120.0, 80.0)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`obsgraph-core`**: observations, fields, snapshots and the injectable random source
//! - **`obsgraph-engine`**: generator, aggregator, graph builder, session and auto-append loop
//! - **`obsgraph-cli`**: the `obsgraph` command-line tool
//! - **`obsgraph-wasm`**: browser bindings (built separately for `wasm32`)
//!
//! ## Feature Flags
//!
//! - `full` (default): everything below
//! - `core`: data models only
//! - `engine`: generation, aggregation and building
//! - `autoplay`: the tokio auto-append loop
//! - `cli`: command-line tools

#[cfg(feature = "core")]
pub use obsgraph_core as core;

#[cfg(feature = "engine")]
pub use obsgraph_engine as engine;

#[cfg(feature = "cli")]
pub use obsgraph_cli as cli;

// Convenience re-exports for common types
#[cfg(feature = "core")]
pub use obsgraph_core::{
    Field, FieldMap, FieldSlot, FieldType, GraphError, GraphSnapshot, GraphState, Observation,
    RandomSource, RngSource, SequenceSource,
};

#[cfg(feature = "engine")]
pub use obsgraph_engine::{
    EngineConfig, EngineError, GenerateOptions, GraphBuilder, GraphSession, Mode,
};

#[cfg(feature = "autoplay")]
pub use obsgraph_engine::{run_autoplay, AutoplaySettings};

pub use anyhow;
pub use serde;
pub use serde_json;

#[cfg(feature = "autoplay")]
pub use tokio;

/// Prelude module for convenient imports
///
/// ```rust
/// use obsgraph::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "core")]
    pub use obsgraph_core::{
        Edge, Field, FieldMap, FieldNode, FieldSlot, FieldType, GraphError, GraphSnapshot,
        GraphState, ObsNode, Observation, Placement, RandomSource, RngSource,
    };

    #[cfg(feature = "engine")]
    pub use obsgraph_engine::{
        EngineConfig, EngineError, GenerateOptions, GraphBuilder, GraphSession, Mode,
    };

    #[cfg(feature = "autoplay")]
    pub use obsgraph_engine::{run_autoplay, AutoplaySettings};

    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
}

/// Current version of obsgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version and enabled modules
pub fn health_check() -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": VERSION,
        "modules": {
            "core": cfg!(feature = "core"),
            "engine": cfg!(feature = "engine"),
            "autoplay": cfg!(feature = "autoplay"),
            "cli": cfg!(feature = "cli")
        }
    })
}
