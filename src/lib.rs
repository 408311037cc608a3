#![recursion_limit = "256"]

pub mod types;
pub mod error;
pub mod csv_report;
pub mod ml_commands;

// 学習・推論
pub mod ml;
pub mod model;
// データセット作成ツール
pub mod tools;

pub use error::{PipelineError, Result};
pub use types::Label;
