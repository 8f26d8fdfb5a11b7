//! Labeled training data: CSV loading and seeded train/test splitting.

pub mod loader;
mod split;

pub use loader::{DatasetError, LABEL_COLUMN, load_dataset, parse_dataset};
pub use split::train_test_split;

use crate::features::{FEATURE_COUNT, FeatureVector};

/// One labeled sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRecord {
    pub features: FeatureVector,
    pub is_ransomware: bool,
}

/// In-memory dataset, row-major, with labels aligned to rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Feature rows in model column order.
    pub x: Vec<[f64; FEATURE_COUNT]>,
    /// `true` for ransomware rows.
    pub y: Vec<bool>,
}

impl Dataset {
    pub fn push(&mut self, record: TrainingRecord) {
        self.x.push(record.features.to_array());
        self.y.push(record.is_ransomware);
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of rows labeled as ransomware.
    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&label| label).count()
    }

    /// Copy the rows at `indices` into a new dataset.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&idx| self.x[idx]).collect(),
            y: indices.iter().map(|&idx| self.y[idx]).collect(),
        }
    }
}
