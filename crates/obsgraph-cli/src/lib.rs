//! # obsgraph CLI Library
//!
//! 観測グラフの生成と探索をコマンドラインから実行
//! One-shot commands and an interactive shell over a single graph session.

pub mod commands;
pub mod interactive;

pub use commands::*;
pub use interactive::*;
