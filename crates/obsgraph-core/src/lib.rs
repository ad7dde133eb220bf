//! # obsgraph core
//!
//! 合成セキュリティ観測とフィールド集計のデータモデル
//! Observations, the identity fields they share, and the node/edge snapshot
//! consumed by a rendering layer.

pub mod error;
pub mod graph;
pub mod model;
pub mod random;

pub use error::{EdgeEndpoint, GraphError};
pub use graph::*;
pub use model::*;
pub use random::*;
