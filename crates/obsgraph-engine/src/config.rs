//! # Engine Configuration
//!
//! Tunables for generation, aggregation gating, layout hints and auto-append.
//! Every field has a default, so a JSON file only needs the keys it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest start date window accepted, one year
pub const MAX_WINDOW_MINUTES: i64 = 365 * 24 * 60;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A field becomes a node once its count exceeds this
    pub significance_threshold: u32,

    /// Default chance of redrawing a known value for a pooled slot
    pub reuse_probability: f64,

    /// Observations added by one manual append
    pub batch_size: usize,

    /// Width of the window each new start date is drawn from
    pub window_minutes: i64,

    /// Highest severities summed into a field's weight
    pub top_severity_count: usize,

    /// Damping exponent applied to severities and weights
    pub severity_exponent: f64,

    /// Fields at or above this severity are preferred when generating "bad" traffic
    pub bad_severity_floor: u8,

    pub layout: LayoutConfig,

    pub autoplay: AutoplayConfig,
}

/// Layout hints for the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub field_layout: FieldLayout,
    pub obs_radius: ObsRadius,
    /// Spread of the random offset applied around a pin point
    pub pin_jitter: f64,
}

/// Vertical placement of unpinned field nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// Last-seen time on x, damped severity weight on y
    Timeline,
    /// Angle hint on y; x is left to the renderer
    AxisFree,
}

/// Radius function for observation nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsRadius {
    /// `severity^exponent + 3`
    Damped,
    /// `sqrt(severity * 20)`
    SquareRoot,
}

/// Auto-append loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval_ms: u64,

    /// Observations appended per cycle
    pub batch_size: usize,

    /// Stop after this many cycles
    pub max_cycles: Option<usize>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 4,
            reuse_probability: 0.25,
            batch_size: 10,
            window_minutes: 60,
            top_severity_count: 4,
            severity_exponent: 0.7,
            bad_severity_floor: 7,
            layout: LayoutConfig::default(),
            autoplay: AutoplayConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            field_layout: FieldLayout::Timeline,
            obs_radius: ObsRadius::Damped,
            pin_jitter: 100.0,
        }
    }
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            batch_size: 3,
            max_cycles: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reuse_probability) {
            return Err(ConfigError::Invalid(format!(
                "reuse_probability must lie in [0, 1], got {}",
                self.reuse_probability
            )));
        }
        if self.window_minutes <= 0 || self.window_minutes > MAX_WINDOW_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "window_minutes must lie in 1..={}, got {}",
                MAX_WINDOW_MINUTES, self.window_minutes
            )));
        }
        if self.top_severity_count == 0 {
            return Err(ConfigError::Invalid("top_severity_count must be at least 1".to_string()));
        }
        if !self.severity_exponent.is_finite() || self.severity_exponent <= 0.0 {
            return Err(ConfigError::Invalid("severity_exponent must be a positive number".to_string()));
        }
        if self.bad_severity_floor > obsgraph_core::MAX_SEVERITY {
            return Err(ConfigError::Invalid(format!(
                "bad_severity_floor must not exceed {}",
                obsgraph_core::MAX_SEVERITY
            )));
        }
        if !self.layout.pin_jitter.is_finite() || self.layout.pin_jitter < 0.0 {
            return Err(ConfigError::Invalid("layout.pin_jitter must be non-negative".to_string()));
        }
        if self.autoplay.interval_ms == 0 {
            return Err(ConfigError::Invalid("autoplay.interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}
