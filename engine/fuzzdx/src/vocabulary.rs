//! Ordered symptom and diagnosis vocabularies
//!
//! The position of a label in its set is the canonical index used by every
//! matrix, query vector and ranking in the crate.

use crate::error::{FuzzdxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Symptom names used by the reference configuration
pub const REFERENCE_SYMPTOMS: [&str; 5] =
    ["temperature", "headache", "cough", "fatigue", "sore_throat"];

/// Diagnosis labels used by the reference configuration
pub const REFERENCE_DIAGNOSES: [&str; 6] = [
    "Healthy",
    "Common Cold",
    "Flu",
    "Allergy",
    "Bronchitis",
    "Pneumonia",
];

fn validate_labels(kind: &'static str, labels: &[String]) -> Result<()> {
    if labels.is_empty() {
        return Err(FuzzdxError::EmptyVocabulary(kind));
    }
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if label.trim().is_empty() {
            return Err(FuzzdxError::configuration(format!(
                "blank {kind} label in vocabulary"
            )));
        }
        if !seen.insert(label.as_str()) {
            return Err(FuzzdxError::DuplicateLabel {
                kind,
                label: label.clone(),
            });
        }
    }
    Ok(())
}

/// Ordered, non-empty set of symptom names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SymptomSet {
    names: Vec<String>,
}

impl SymptomSet {
    /// Create a symptom set, rejecting empty or duplicated vocabularies
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        validate_labels("symptom", &names)?;
        Ok(Self { names })
    }

    /// The five symptoms of the reference configuration
    pub fn reference() -> Self {
        Self {
            names: REFERENCE_SYMPTOMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of symptoms (S)
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Canonical index of a symptom
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Symptom name at a canonical index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate names in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Names as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

impl TryFrom<Vec<String>> for SymptomSet {
    type Error = FuzzdxError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<SymptomSet> for Vec<String> {
    fn from(set: SymptomSet) -> Self {
        set.names
    }
}

/// Ordered, non-empty set of diagnosis labels
///
/// The order doubles as the tie-break key when ranking: on equal scores the
/// diagnosis with the lower index sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DiagnosisSet {
    labels: Vec<String>,
}

impl DiagnosisSet {
    /// Create a diagnosis set, rejecting empty or duplicated vocabularies
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        validate_labels("diagnosis", &labels)?;
        Ok(Self { labels })
    }

    /// The six diagnoses of the reference configuration
    pub fn reference() -> Self {
        Self {
            labels: REFERENCE_DIAGNOSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of diagnoses (D)
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Canonical index of a diagnosis
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Diagnosis label at a canonical index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Iterate labels in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Labels as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

impl TryFrom<Vec<String>> for DiagnosisSet {
    type Error = FuzzdxError;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<DiagnosisSet> for Vec<String> {
    fn from(set: DiagnosisSet) -> Self {
        set.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vocabularies() {
        let symptoms = SymptomSet::reference();
        let diagnoses = DiagnosisSet::reference();

        assert_eq!(symptoms.len(), 5);
        assert_eq!(diagnoses.len(), 6);
        assert_eq!(symptoms.index_of("cough"), Some(2));
        assert_eq!(diagnoses.get(0), Some("Healthy"));
        assert_eq!(diagnoses.index_of("Pneumonia"), Some(5));
        assert_eq!(diagnoses.index_of("Measles"), None);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let err = SymptomSet::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, FuzzdxError::EmptyVocabulary("symptom"));
        assert!(err.is_configuration());

        let err = DiagnosisSet::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, FuzzdxError::EmptyVocabulary("diagnosis"));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = DiagnosisSet::new(["Flu", "Allergy", "Flu"]).unwrap_err();
        assert!(matches!(
            err,
            FuzzdxError::DuplicateLabel { kind: "diagnosis", ref label } if label == "Flu"
        ));
    }

    #[test]
    fn test_order_is_preserved() {
        let set = SymptomSet::new(["b", "a", "c"]).unwrap();
        let names: Vec<&str> = set.iter().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
