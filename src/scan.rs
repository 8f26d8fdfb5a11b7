//! File scanning: derive content features from a file and classify them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ScanThresholds;
use crate::features::{FeatureVector, extract_file_features};
use crate::ml::forest::RandomForest;
use crate::predict::{PredictError, Prediction};

/// Three-tier bucket of the model's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Suspicious,
    Ransomware,
}

impl RiskLevel {
    pub fn from_confidence(confidence: f64, thresholds: &ScanThresholds) -> Self {
        if confidence >= thresholds.ransomware_threshold {
            Self::Ransomware
        } else if confidence >= thresholds.suspicious_threshold {
            Self::Suspicious
        } else {
            Self::Normal
        }
    }
}

/// Severity of the alert raised for a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// `None` below the alert threshold.
    pub fn from_confidence(confidence: f64, thresholds: &ScanThresholds) -> Option<Self> {
        if confidence >= thresholds.critical_alert_threshold {
            Some(Self::Critical)
        } else if confidence >= thresholds.high_alert_threshold {
            Some(Self::High)
        } else if confidence >= thresholds.alert_threshold {
            Some(Self::Medium)
        } else {
            None
        }
    }
}

/// Result of scanning one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub file: PathBuf,
    /// Dotted extension such as `.locked`, if the file name has one.
    pub extension: Option<String>,
    pub features: FeatureVector,
    #[serde(flatten)]
    pub prediction: Prediction,
    pub risk_level: RiskLevel,
    pub alert: Option<AlertSeverity>,
}

fn dotted_extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// Extract features from `path` and classify them with `model`.
pub fn scan_file(
    model: &RandomForest,
    path: &Path,
    modification_rate: f64,
    rename_count: f64,
    thresholds: &ScanThresholds,
) -> Result<ScanReport, PredictError> {
    let features = extract_file_features(path, modification_rate, rename_count)?;
    let prediction = Prediction::from_model(model, &features);
    let risk_level = RiskLevel::from_confidence(prediction.confidence, thresholds);
    let alert = AlertSeverity::from_confidence(prediction.confidence, thresholds);
    tracing::info!(
        "Scanned {}: entropy {:.3}, confidence {:.3}, risk {:?}",
        path.display(),
        features.entropy,
        prediction.confidence,
        risk_level
    );
    if let Some(severity) = alert {
        tracing::warn!("Alert {severity:?} for {}", path.display());
    }
    Ok(ScanReport {
        file: path.to_path_buf(),
        extension: dotted_extension(path),
        features,
        prediction,
        risk_level,
        alert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::ml::forest::{
        DecisionTree, MODEL_TYPE, MODEL_VERSION, Node, TrainOptions, TrainingSummary,
    };
    use crate::predict::Status;
    use tempfile::tempdir;

    fn entropy_model() -> RandomForest {
        RandomForest {
            model_version: MODEL_VERSION,
            model_type: MODEL_TYPE.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            params: TrainOptions::default(),
            summary: TrainingSummary::default(),
            trees: vec![DecisionTree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 7.5,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf {
                        probability: 0.05,
                        samples: 40,
                    },
                    Node::Leaf {
                        probability: 0.95,
                        samples: 40,
                    },
                ],
            }],
        }
    }

    #[test]
    fn risk_levels_follow_thresholds() {
        let thresholds = ScanThresholds::default();
        assert_eq!(RiskLevel::from_confidence(0.1, &thresholds), RiskLevel::Normal);
        assert_eq!(RiskLevel::from_confidence(0.4, &thresholds), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_confidence(0.69, &thresholds), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_confidence(0.7, &thresholds), RiskLevel::Ransomware);
    }

    #[test]
    fn alert_severity_follows_thresholds() {
        let thresholds = ScanThresholds::default();
        assert_eq!(AlertSeverity::from_confidence(0.49, &thresholds), None);
        assert_eq!(
            AlertSeverity::from_confidence(0.5, &thresholds),
            Some(AlertSeverity::Medium)
        );
        assert_eq!(
            AlertSeverity::from_confidence(0.59, &thresholds),
            Some(AlertSeverity::Medium)
        );
        assert_eq!(
            AlertSeverity::from_confidence(0.6, &thresholds),
            Some(AlertSeverity::High)
        );
        assert_eq!(
            AlertSeverity::from_confidence(0.79, &thresholds),
            Some(AlertSeverity::High)
        );
        assert_eq!(
            AlertSeverity::from_confidence(0.8, &thresholds),
            Some(AlertSeverity::Critical)
        );
        assert_eq!(
            AlertSeverity::from_confidence(1.0, &thresholds),
            Some(AlertSeverity::Critical)
        );
    }

    #[test]
    fn custom_alert_thresholds_apply() {
        let thresholds = ScanThresholds {
            alert_threshold: 0.2,
            high_alert_threshold: 0.3,
            critical_alert_threshold: 0.4,
            ..ScanThresholds::default()
        };
        assert_eq!(AlertSeverity::from_confidence(0.1, &thresholds), None);
        assert_eq!(
            AlertSeverity::from_confidence(0.25, &thresholds),
            Some(AlertSeverity::Medium)
        );
        assert_eq!(
            AlertSeverity::from_confidence(0.45, &thresholds),
            Some(AlertSeverity::Critical)
        );
    }

    #[test]
    fn extension_keeps_last_segment_with_dot() {
        assert_eq!(
            dotted_extension(Path::new("invoice.pdf.LOCKED")).as_deref(),
            Some(".LOCKED")
        );
        assert_eq!(dotted_extension(Path::new("Makefile")), None);
    }

    #[test]
    fn scans_random_and_plain_files() {
        let dir = tempdir().unwrap();
        let model = entropy_model();
        let thresholds = ScanThresholds::default();

        let encrypted = dir.path().join("photo.jpg.locked");
        let bytes: Vec<u8> = (0..64 * 1024).map(|i| (i % 256) as u8).collect();
        std::fs::write(&encrypted, bytes).unwrap();
        let report = scan_file(&model, &encrypted, 40.0, 6.0, &thresholds).unwrap();
        assert!(report.prediction.is_ransomware);
        assert_eq!(report.prediction.status, Status::Ransomware);
        assert_eq!(report.risk_level, RiskLevel::Ransomware);
        assert_eq!(report.alert, Some(AlertSeverity::Critical));
        assert_eq!(report.extension.as_deref(), Some(".locked"));
        assert_eq!(report.features.modification_rate, 40.0);

        let plain = dir.path().join("notes.txt");
        std::fs::write(&plain, "hello hello hello hello").unwrap();
        let report = scan_file(&model, &plain, 0.0, 0.0, &thresholds).unwrap();
        assert!(!report.prediction.is_ransomware);
        assert_eq!(report.risk_level, RiskLevel::Normal);
        assert_eq!(report.alert, None);
    }

    #[test]
    fn report_serializes_flat_prediction_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "abc").unwrap();
        let report = scan_file(&entropy_model(), &path, 1.0, 0.0, &ScanThresholds::default()).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "safe");
        assert_eq!(value["risk_level"], "normal");
        assert_eq!(value["is_ransomware"], false);
        assert_eq!(value["extension"], ".txt");
        assert!(value["alert"].is_null());
        assert!(value["features"]["entropy"].is_number());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = scan_file(
            &entropy_model(),
            &dir.path().join("gone.bin"),
            0.0,
            0.0,
            &ScanThresholds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::Features(_)));
    }
}
