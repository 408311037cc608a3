pub mod model_metadata;
pub mod model_storage;
pub mod config;

pub use model_metadata::ModelMetadata;
pub use model_storage::{save_model, load_model, save_metadata, load_metadata, print_metadata_info};
pub use config::{AppConfig, DeviceType, TrainingSettings, PathSettings};
