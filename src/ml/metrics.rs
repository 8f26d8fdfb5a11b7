//! Evaluation metrics for the binary ransomware classifier.

use serde::{Deserialize, Serialize};

/// Confusion counts with ransomware as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: u32,
    pub false_positive: u32,
    pub true_negative: u32,
    pub false_negative: u32,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, truth: bool, predicted: bool) {
        let slot = match (truth, predicted) {
            (true, true) => &mut self.true_positive,
            (false, true) => &mut self.false_positive,
            (false, false) => &mut self.true_negative,
            (true, false) => &mut self.false_negative,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total number of recorded predictions.
    pub fn total(&self) -> u64 {
        [
            self.true_positive,
            self.false_positive,
            self.true_negative,
            self.false_negative,
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }

    /// Fraction of correct predictions; 0 when empty.
    pub fn accuracy(&self) -> f64 {
        ratio(
            u64::from(self.true_positive) + u64::from(self.true_negative),
            self.total(),
        )
    }

    /// `TP / (TP + FP)`.
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positive.into(),
            u64::from(self.true_positive) + u64::from(self.false_positive),
        )
    }

    /// `TP / (TP + FN)`.
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positive.into(),
            u64::from(self.true_positive) + u64::from(self.false_negative),
        )
    }

    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
