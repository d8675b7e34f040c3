//! Coarse threshold classifier for scalar diagnosis strengths
//!
//! Maps a crisp strength (typically 0-100) onto one label through half-open,
//! strictly increasing thresholds: `(-inf, t0)` is the first label,
//! `[t0, t1)` the second, and `[t_last, +inf)` the last. Every finite value
//! therefore lands in exactly one label.

use crate::error::{FuzzdxError, Result};
use crate::vocabulary::REFERENCE_DIAGNOSES;
use serde::{Deserialize, Serialize};

/// Threshold classifier over labelled half-open intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassifierFields")]
pub struct StrengthClassifier {
    labels: Vec<String>,
    thresholds: Vec<f64>,
}

/// Unchecked serialized form
#[derive(Deserialize)]
struct ClassifierFields {
    labels: Vec<String>,
    thresholds: Vec<f64>,
}

impl TryFrom<ClassifierFields> for StrengthClassifier {
    type Error = FuzzdxError;

    fn try_from(fields: ClassifierFields) -> Result<Self> {
        Self::new(fields.labels, fields.thresholds)
    }
}

impl StrengthClassifier {
    /// Create a classifier; `thresholds` must have one entry fewer than
    /// `labels` and be strictly increasing
    pub fn new<S: Into<String>>(labels: Vec<S>, thresholds: Vec<f64>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(FuzzdxError::EmptyVocabulary("classifier label"));
        }
        if thresholds.len() + 1 != labels.len() {
            return Err(FuzzdxError::configuration(format!(
                "{} labels need {} thresholds, got {}",
                labels.len(),
                labels.len() - 1,
                thresholds.len()
            )));
        }
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(FuzzdxError::configuration("classifier thresholds must be finite"));
        }
        if thresholds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FuzzdxError::configuration(
                "classifier thresholds must be strictly increasing",
            ));
        }
        Ok(Self { labels, thresholds })
    }

    /// Evenly spaced thresholds `step, 2*step, ...`
    pub fn uniform<S: Into<String>>(labels: Vec<S>, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(FuzzdxError::configuration(format!(
                "classifier step {step} must be positive"
            )));
        }
        let count = labels.len().saturating_sub(1);
        let thresholds = (1..=count).map(|k| step * k as f64).collect();
        Self::new(labels, thresholds)
    }

    /// Reference diagnosis labels in steps of 20
    pub fn reference() -> Self {
        Self {
            labels: REFERENCE_DIAGNOSES.iter().map(|s| s.to_string()).collect(),
            thresholds: vec![20.0, 40.0, 60.0, 80.0, 100.0],
        }
    }

    /// Labels in threshold order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Lower bounds of every label but the first
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Index of the label for `value`
    pub fn classify_index(&self, value: f64) -> Result<usize> {
        if !value.is_finite() {
            return Err(FuzzdxError::InvalidQuery(format!(
                "strength {value} is not a finite number"
            )));
        }
        Ok(self.thresholds.partition_point(|&t| t <= value))
    }

    /// Label for `value`
    pub fn classify(&self, value: f64) -> Result<&str> {
        let index = self.classify_index(value)?;
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| FuzzdxError::configuration("classifier has fewer labels than thresholds"))
    }
}
