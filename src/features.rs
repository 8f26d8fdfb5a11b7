//! The four-value feature vector shared by training and inference.
//!
//! Column order is part of the model contract: trees index features by
//! position, so every conversion to and from `[f64; 4]` goes through
//! [`FeatureVector`] and [`FEATURE_NAMES`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of features per sample.
pub const FEATURE_COUNT: usize = 4;

/// Feature names in model column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "entropy",
    "file_size_mb",
    "modification_rate",
    "rename_count",
];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Behavioral and content features describing one file-system entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Shannon entropy of the content in bits per byte.
    pub entropy: f64,
    /// Size in megabytes.
    pub file_size_mb: f64,
    /// Modifications observed per time window.
    pub modification_rate: f64,
    /// Renames observed.
    pub rename_count: f64,
}

impl FeatureVector {
    /// Build a vector from values in model column order.
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [entropy, file_size_mb, modification_rate, rename_count] = values;
        Self {
            entropy,
            file_size_mb,
            modification_rate,
            rename_count,
        }
    }

    /// Values in model column order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.entropy,
            self.file_size_mb,
            self.modification_rate,
            self.rename_count,
        ]
    }
}

/// Errors raised while extracting features from a file on disk.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Shannon entropy of `data` in bits per byte, in `[0, 8]`.
///
/// Empty input has zero entropy.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut frequency = [0u64; 256];
    for &byte in data {
        frequency[byte as usize] += 1;
    }
    let len = data.len() as f64;
    let mut entropy = 0.0f64;
    for &count in &frequency {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }
    entropy
}

/// Extract content features from `path` and combine them with observed behavior.
///
/// Modification rate and rename count come from whoever watched the file; the
/// content alone cannot provide them.
pub fn extract_file_features(
    path: &Path,
    modification_rate: f64,
    rename_count: f64,
) -> Result<FeatureVector, FeatureError> {
    let bytes = std::fs::read(path).map_err(|source| FeatureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entropy = shannon_entropy(&bytes);
    tracing::debug!(
        "Extracted features from {}: {} bytes, entropy {:.4}",
        path.display(),
        bytes.len(),
        entropy
    );
    Ok(FeatureVector {
        entropy,
        file_size_mb: bytes.len() as f64 / BYTES_PER_MB,
        modification_rate,
        rename_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn array_conversion_keeps_column_order() {
        let vector = FeatureVector::from_array([7.8, 0.5, 50.0, 5.0]);
        assert_eq!(vector.entropy, 7.8);
        assert_eq!(vector.file_size_mb, 0.5);
        assert_eq!(vector.modification_rate, 50.0);
        assert_eq!(vector.rename_count, 5.0);
        assert_eq!(vector.to_array(), [7.8, 0.5, 50.0, 5.0]);
    }

    #[test]
    fn entropy_bounds() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[42u8; 1024]), 0.0);
        let uniform: Vec<u8> = (0..=255u8).collect();
        assert!((shannon_entropy(&uniform) - 8.0).abs() < 1e-12);
        let two_symbols = [0u8, 1, 0, 1];
        assert!((shannon_entropy(&two_symbols) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn extracts_size_and_entropy_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let data: Vec<u8> = (0..1024 * 1024).map(|i| (i % 256) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let features = extract_file_features(&path, 12.0, 3.0).unwrap();
        assert!((features.file_size_mb - 1.0).abs() < 1e-12);
        assert!((features.entropy - 8.0).abs() < 1e-9);
        assert_eq!(features.modification_rate, 12.0);
        assert_eq!(features.rename_count, 3.0);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        let err = extract_file_features(&path, 0.0, 0.0).unwrap_err();
        assert!(err.to_string().contains("absent.bin"));
    }
}
