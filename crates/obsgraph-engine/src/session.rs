//! # Graph Session
//!
//! Holds the current snapshot between user actions. Every action builds a new
//! snapshot from the previous one and replaces it only on success.

use crate::builder::GraphBuilder;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::generator::GenerateOptions;
use obsgraph_core::{GraphSnapshot, GraphState, RandomSource, RngSource};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Whether appends are triggered by the user or by the auto-append loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Manual,
    Auto,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Manual => write!(f, "manual"),
            Mode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(Mode::Manual),
            "auto" => Ok(Mode::Auto),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Explicit graph state plus the random source that drives it
#[derive(Debug)]
pub struct GraphSession<R = RngSource> {
    builder: GraphBuilder,
    rng: R,
    snapshot: GraphSnapshot,
    mode: Mode,
    options: GenerateOptions,
}

impl GraphSession<RngSource> {
    /// Reproducible session
    pub fn seeded(config: EngineConfig, seed: u64) -> Result<Self> {
        Self::new(config, RngSource::seeded(seed))
    }

    pub fn from_entropy(config: EngineConfig) -> Result<Self> {
        Self::new(config, RngSource::from_entropy())
    }
}

impl<R: RandomSource> GraphSession<R> {
    pub fn new(config: EngineConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let options = GenerateOptions::with_reuse(config.reuse_probability);
        Ok(Self {
            builder: GraphBuilder::new(config),
            rng,
            snapshot: GraphSnapshot::default(),
            mode: Mode::default(),
            options,
        })
    }

    /// Replace the graph with `count` fresh observations
    pub fn generate(&mut self, count: usize) -> Result<&GraphSnapshot> {
        let options = self.options;
        self.generate_with(count, options)
    }

    pub fn generate_with(&mut self, count: usize, options: GenerateOptions) -> Result<&GraphSnapshot> {
        let snapshot = self
            .builder
            .build(&mut self.rng, &GraphState::default(), count, options)?;
        info!(count, summary = %snapshot.summary(), "generated graph");
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }

    /// Add `count` observations to the current graph
    pub fn append(&mut self, count: usize) -> Result<&GraphSnapshot> {
        let options = self.options;
        self.append_with(count, options)
    }

    pub fn append_with(&mut self, count: usize, options: GenerateOptions) -> Result<&GraphSnapshot> {
        let snapshot = self
            .builder
            .build(&mut self.rng, &self.snapshot.state, count, options)?;
        info!(count, summary = %snapshot.summary(), "appended observations");
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }

    /// Pin the fields of one observation and re-project so they show
    pub fn pin_observation(&mut self, uuid: Uuid, x: f64, y: f64) -> Result<&GraphSnapshot> {
        let state = &self.snapshot.state;
        let observation = state
            .observation(uuid)
            .ok_or(EngineError::UnknownObservation(uuid))?;
        let fields = self.builder.pin(&mut self.rng, &state.fields, observation, x, y)?;

        let snapshot = self
            .builder
            .project(GraphState::new(state.observations.clone(), fields))?;
        info!(observation = %uuid, x, y, "pinned observation");
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> &GraphState {
        &self.snapshot.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "mode changed");
        }
        self.mode = mode;
    }

    pub fn options(&self) -> GenerateOptions {
        self.options
    }

    pub fn set_options(&mut self, options: GenerateOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        self.builder.config()
    }
}
