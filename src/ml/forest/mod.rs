//! Deterministic random forest for binary classification.
//!
//! - Bootstrap-sampled CART trees split on Gini impurity.
//! - Per-tree seeds derived from one master seed, so a seed reproduces the model exactly.
//! - JSON model export/load with structural validation.

mod model;
mod train;

pub use model::{
    DecisionTree, MODEL_FILE_NAME, MODEL_TYPE, MODEL_VERSION, ModelError, Node, RandomForest,
    TrainingSummary,
};
pub use train::{TrainOptions, train_forest};
