//! Optional TOML settings and explicit path resolution.
//!
//! Settings live in `ransomguard.toml` inside the application directory, or at
//! the path named by `RANSOMGUARD_CONFIG`. A missing default file means
//! defaults. Paths are never discovered by probing directories: a command-line
//! flag wins, then the environment, then the settings file, then the default
//! file name in the working directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::ml::forest::{MODEL_FILE_NAME, TrainOptions};

/// Settings file name inside the application directory.
pub const CONFIG_FILE_NAME: &str = "ransomguard.toml";
/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "RANSOMGUARD_CONFIG";
/// Environment variable naming the model artifact.
pub const MODEL_ENV: &str = "RANSOMGUARD_MODEL";
/// Environment variable naming the training dataset.
pub const DATASET_ENV: &str = "RANSOMGUARD_DATASET";
/// Default training dataset file name.
pub const DATASET_FILE_NAME: &str = "dataset.csv";

/// Errors that may occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML settings.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level settings file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub training: TrainingSettings,
    pub scan: ScanThresholds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub dataset: Option<PathBuf>,
    pub model: Option<PathBuf>,
}

/// Training defaults applied when the trainer is run without flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub n_trees: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        let options = TrainOptions::default();
        Self {
            n_trees: options.n_trees,
            seed: options.seed,
            test_fraction: 0.2,
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split,
            min_samples_leaf: options.min_samples_leaf,
        }
    }
}

impl TrainingSettings {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            n_trees: self.n_trees,
            seed: self.seed,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            ..TrainOptions::default()
        }
    }
}

/// Confidence cut-offs for the scanner's risk level and alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanThresholds {
    pub suspicious_threshold: f64,
    pub ransomware_threshold: f64,
    /// Lowest confidence that raises an alert (`medium`).
    pub alert_threshold: f64,
    pub high_alert_threshold: f64,
    pub critical_alert_threshold: f64,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            suspicious_threshold: 0.4,
            ransomware_threshold: 0.7,
            alert_threshold: 0.5,
            high_alert_threshold: 0.6,
            critical_alert_threshold: 0.8,
        }
    }
}

impl ScanThresholds {
    fn normalized(mut self) -> Self {
        let defaults = Self::default();
        let fields = [
            (&mut self.suspicious_threshold, defaults.suspicious_threshold),
            (&mut self.ransomware_threshold, defaults.ransomware_threshold),
            (&mut self.alert_threshold, defaults.alert_threshold),
            (&mut self.high_alert_threshold, defaults.high_alert_threshold),
            (&mut self.critical_alert_threshold, defaults.critical_alert_threshold),
        ];
        for (value, default) in fields {
            if !value.is_finite() {
                *value = default;
            }
            *value = value.clamp(0.0, 1.0);
        }
        if self.suspicious_threshold > self.ransomware_threshold {
            std::mem::swap(&mut self.suspicious_threshold, &mut self.ransomware_threshold);
        }
        let mut alerts = [
            self.alert_threshold,
            self.high_alert_threshold,
            self.critical_alert_threshold,
        ];
        alerts.sort_by(f64::total_cmp);
        [
            self.alert_threshold,
            self.high_alert_threshold,
            self.critical_alert_threshold,
        ] = alerts;
        self
    }
}

impl Settings {
    /// Clamp values into usable ranges.
    pub fn normalized(mut self) -> Self {
        let training = &mut self.training;
        training.n_trees = training.n_trees.max(1);
        training.min_samples_split = training.min_samples_split.max(2);
        training.min_samples_leaf = training.min_samples_leaf.max(1);
        if !training.test_fraction.is_finite() {
            training.test_fraction = TrainingSettings::default().test_fraction;
        }
        training.test_fraction = training.test_fraction.clamp(0.01, 0.99);

        self.scan = self.scan.normalized();
        self
    }
}

/// Load settings from `RANSOMGUARD_CONFIG` or the application directory.
///
/// An explicitly named file must exist; the default file is optional, and an
/// application directory that cannot be resolved just means defaults.
pub fn load_settings() -> Result<Settings, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        let path = PathBuf::from(path);
        return read_settings(&path);
    }
    let root = match app_dirs::app_root_path() {
        Ok(root) => root,
        Err(err) => {
            tracing::warn!("Using default settings: {err}");
            return Ok(Settings::default());
        }
    };
    let path = root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(Settings::default());
    }
    read_settings(&path)
}

/// Parse a settings file.
pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings.normalized())
}

/// Model artifact location: flag, then `RANSOMGUARD_MODEL`, then settings, then default.
pub fn resolve_model_path(cli: Option<PathBuf>, settings: &Settings) -> PathBuf {
    resolve_path(
        cli,
        std::env::var_os(MODEL_ENV),
        settings.paths.model.as_deref(),
        MODEL_FILE_NAME,
    )
}

/// Training dataset location: flag, then `RANSOMGUARD_DATASET`, then settings, then default.
pub fn resolve_dataset_path(cli: Option<PathBuf>, settings: &Settings) -> PathBuf {
    resolve_path(
        cli,
        std::env::var_os(DATASET_ENV),
        settings.paths.dataset.as_deref(),
        DATASET_FILE_NAME,
    )
}

fn resolve_path(
    cli: Option<PathBuf>,
    env_value: Option<OsString>,
    configured: Option<&Path>,
    default_name: &str,
) -> PathBuf {
    cli.or_else(|| env_value.filter(|value| !value.is_empty()).map(PathBuf::from))
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(default_name))
}
