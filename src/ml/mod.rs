pub mod transform;
pub mod dataset;
pub mod data;
pub mod ml_model;
pub mod device;
pub mod training;
pub mod inference;

pub use ml_model::{ShapeClassifier, NUM_CLASSES, CLASS_NAMES};
pub use transform::IMAGE_SIZE;
pub use dataset::{Sample, SampleIndex};
pub use device::{ComputeDevice, DeviceTier};
pub use training::{train, train_with_progress, TrainingConfig, TrainingSummary, EpochReport};
pub use inference::{predict, InferenceEngine, ConfusionMatrix, PredictionSummary};
