//! データセット作成・整理用のツール

pub mod generate;
pub mod organize;
pub mod preprocess;

pub use generate::{generate_dataset, GenerateSummary, DEFAULT_COUNT};
pub use organize::{organize_test_data, OrganizeSummary};
pub use preprocess::{add_test_to_dataset, preprocess_directory, PreprocessSummary};
