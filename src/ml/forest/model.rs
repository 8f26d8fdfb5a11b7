use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::train::TrainOptions;
use crate::dataset::Dataset;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
use crate::ml::metrics::ConfusionMatrix;

/// Default file name of the persisted model.
pub const MODEL_FILE_NAME: &str = "ransomware_model.json";
/// Model format version written by this crate.
pub const MODEL_VERSION: i64 = 1;
/// Model type tag stored in the artifact.
pub const MODEL_TYPE: &str = "random_forest";

/// Probability above which a sample is classified as ransomware.
const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Failed to read model {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid model: {0}")]
    Invalid(String),
    #[error("Failed to serialize model: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to write model {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A tree node stored in a flat, pre-order array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `features[feature] <= threshold` go to `left`.
    Split {
        feature: u16,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Terminal node holding the fraction of ransomware training rows.
    Leaf { probability: f64, samples: u32 },
}

/// Single CART tree; the root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Probability of the ransomware class for one feature row.
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature as usize).copied().unwrap_or(0.0);
                    let next = if value <= *threshold { *left } else { *right };
                    idx = next as usize;
                }
                Some(Node::Leaf { probability, .. }) => return *probability,
                None => return 0.0,
            }
        }
    }

    /// Longest root-to-leaf path, counting edges.
    ///
    /// Children are stored after their parent, so one forward pass suffices.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut deepest = 0usize;
        for (idx, node) in self.nodes.iter().enumerate() {
            let depth = depths[idx];
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = node {
                for child in [*left, *right] {
                    if let Some(slot) = depths.get_mut(child as usize) {
                        *slot = depth + 1;
                    }
                }
            }
        }
        deepest
    }

    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature as usize >= FEATURE_COUNT {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    // Children after their parent guarantees prediction terminates.
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { probability, .. } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(format!("leaf {idx} probability {probability} outside [0, 1]"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Holdout statistics recorded by the trainer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub holdout_accuracy: Option<f64>,
}

/// Random forest classifier over [`FeatureVector`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Model format version.
    pub model_version: i64,
    /// Always [`MODEL_TYPE`].
    pub model_type: String,
    /// Column names in the order the trees index them.
    pub feature_names: Vec<String>,
    /// Hyperparameters the forest was trained with.
    pub params: TrainOptions,
    #[serde(default)]
    pub summary: TrainingSummary,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Validate structural invariants and the feature-order contract.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            ));
        }
        if self.model_type != MODEL_TYPE {
            return Err(format!(
                "Unsupported model_type {} (expected {MODEL_TYPE})",
                self.model_type
            ));
        }
        if self.feature_names != FEATURE_NAMES {
            return Err(format!(
                "Feature order {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            ));
        }
        if self.trees.is_empty() {
            return Err("Model contains no trees".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|err| format!("Tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Load and validate a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ModelError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ModelError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate().map_err(ModelError::Invalid)?;
        tracing::debug!(
            "Loaded {} trees from {}",
            model.trees.len(),
            path.display()
        );
        Ok(model)
    }

    /// Write the model as JSON, replacing `path` atomically.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let write_err = |source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;
        let bytes = serde_json::to_vec_pretty(self).map_err(ModelError::Serialize)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|err| write_err(err.error))?;
        tracing::info!("Saved {} trees to {}", self.trees.len(), path.display());
        Ok(())
    }

    /// Mean ransomware probability over all trees.
    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        self.predict_proba_row(&features.to_array())
    }

    /// Classify a sample; agrees with [`Self::predict_proba`] by construction.
    pub fn predict(&self, features: &FeatureVector) -> bool {
        self.predict_proba(features) > DECISION_THRESHOLD
    }

    pub(crate) fn predict_proba_row(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict_proba(row)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    /// Score every row of `dataset`.
    pub fn evaluate(&self, dataset: &Dataset) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new();
        for (row, &truth) in dataset.x.iter().zip(&dataset.y) {
            cm.add(truth, self.predict_proba_row(row) > DECISION_THRESHOLD);
        }
        cm
    }
}
