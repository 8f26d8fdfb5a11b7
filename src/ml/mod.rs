//! Machine learning for ransomware detection.
//!
//! A small, deterministic random forest trained and evaluated in Rust, plus the
//! binary classification metrics used to report holdout quality.

pub mod forest;
pub mod metrics;
