//! Library exports shared by the training, prediction and scan binaries.
/// Application directory resolution.
pub mod app_dirs;
/// TOML settings and path resolution.
pub mod config;
/// CSV dataset loading and train/test splitting.
pub mod dataset;
/// Feature vector definition and file feature extraction.
pub mod features;
/// Logging setup.
pub mod logging;
/// Random forest training, inference and metrics.
pub mod ml;
/// Prediction results and the shared inference entry point.
pub mod predict;
/// File scanning with three-tier risk levels.
pub mod scan;
