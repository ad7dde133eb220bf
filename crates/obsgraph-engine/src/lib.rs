//! # obsgraph engine
//!
//! Observation generation, field aggregation and graph building.
//! A [`GraphSession`] ties them together and carries state between cycles.

pub mod aggregator;
#[cfg(feature = "autoplay")]
pub mod autoplay;
pub mod builder;
pub mod config;
pub mod error;
pub mod generator;
pub mod session;
pub mod synthetic;

pub use aggregator::*;
#[cfg(feature = "autoplay")]
pub use autoplay::*;
pub use builder::*;
pub use config::*;
pub use error::EngineError;
pub use generator::*;
pub use session::*;
