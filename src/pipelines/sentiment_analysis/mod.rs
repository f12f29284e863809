/// Text featurization
pub mod featurizer;

/// Batcher
pub mod batcher;

/// Logistic regression model
pub mod model;

/// The fitted pipeline
pub mod pipeline;

/// Sentiment Analysis Items
pub mod item;

/// Training
pub mod training;

/// Evaluation
pub mod evaluation;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use evaluation::{evaluate, Metrics};
pub use featurizer::{Featurizer, FeaturizerConfig};
pub use inference::Prediction;
pub use item::Item;
pub use model::Model;
pub use pipeline::Pipeline;
pub use training::{train, TrainingConfig};
