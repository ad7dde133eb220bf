//! Engine errors

use crate::config::ConfigError;
use obsgraph_core::GraphError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no observation with uuid {0} in the current graph")]
    UnknownObservation(Uuid),
}

pub type Result<T> = std::result::Result<T, EngineError>;
