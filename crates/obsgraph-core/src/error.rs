//! Data-integrity errors

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Errors raised while building or validating the observation graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("edge {edge} references {endpoint} node {node} which is not in the snapshot")]
    DanglingEdge {
        edge: Uuid,
        endpoint: EdgeEndpoint,
        node: Uuid,
    },

    #[error("field label already present in the field map: {0}")]
    DuplicateField(String),

    #[error("observation {observation} references field value {label:?} unknown to the field map")]
    UnknownField { observation: Uuid, label: String },

    #[error("reuse probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("severity {0} is outside 0..=10")]
    SeverityOutOfRange(u8),

    #[error("start date window after {anchor} runs past the supported calendar range")]
    DateOutOfRange { anchor: DateTime<Utc> },
}

/// Which side of an edge failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEndpoint {
    Observation,
    Field,
}

impl std::fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeEndpoint::Observation => write!(f, "observation"),
            EdgeEndpoint::Field => write!(f, "field"),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
