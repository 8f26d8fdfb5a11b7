//! Single-sample inference shared by the predictor and scanner binaries.
//!
//! Every outcome, including failures, is rendered as one JSON object so callers
//! can always parse standard output.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureError, FeatureVector};
use crate::ml::forest::{ModelError, RandomForest};

/// Error text reported when no model artifact exists yet.
pub const MODEL_NOT_FOUND_MESSAGE: &str = "Model file not found. Please train the model first.";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{}", MODEL_NOT_FOUND_MESSAGE)]
    ModelNotFound { path: PathBuf },
    #[error(transparent)]
    Model(ModelError),
    #[error("Expected 4 feature values, got {0}")]
    MissingFeatures(usize),
    #[error("Invalid {name} value: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Features(#[from] FeatureError),
}

impl From<ModelError> for PredictError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound { path } => Self::ModelNotFound { path },
            other => Self::Model(other),
        }
    }
}

/// Binary decision label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ransomware,
    Safe,
}

/// Classification for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub is_ransomware: bool,
    /// Probability of the ransomware class.
    pub confidence: f64,
    pub status: Status,
}

impl Prediction {
    pub fn from_model(model: &RandomForest, features: &FeatureVector) -> Self {
        let confidence = model.predict_proba(features);
        let is_ransomware = model.predict(features);
        Self {
            is_ransomware,
            confidence,
            status: if is_ransomware {
                Status::Ransomware
            } else {
                Status::Safe
            },
        }
    }
}

/// Load the model, mapping a missing file to [`PredictError::ModelNotFound`].
pub fn load_model(path: &Path) -> Result<RandomForest, PredictError> {
    Ok(RandomForest::load_json(path)?)
}

/// Parse the first four arguments as features in model column order.
pub fn parse_feature_args(args: &[String]) -> Result<FeatureVector, PredictError> {
    if args.len() < FEATURE_COUNT {
        return Err(PredictError::MissingFeatures(args.len()));
    }
    let mut values = [0.0f64; FEATURE_COUNT];
    for ((slot, raw), name) in values.iter_mut().zip(args).zip(FEATURE_NAMES) {
        *slot = parse_number(name, raw)?;
    }
    Ok(FeatureVector::from_array(values))
}

/// Parse a finite floating-point value for the named feature.
pub fn parse_number(name: &'static str, raw: &str) -> Result<f64, PredictError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| PredictError::InvalidNumber {
            name,
            value: raw.to_string(),
        })
}

/// A JSON line: the successful payload, or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output<T> {
    Ok(T),
    Error { error: String },
}

impl<T: Serialize> Output<T> {
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Error {
                error: err.to_string(),
            },
        }
    }

    /// Render as compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }).to_string())
    }
}
