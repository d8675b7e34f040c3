//! Error types for the fuzzdx diagnostic engine

use thiserror::Error;

/// Coarse classification of a [`FuzzdxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal misconfiguration of vocabularies, relation matrices or mappings
    Configuration,
    /// Bad caller input that can be corrected and resubmitted
    Input,
    /// Nothing to rank
    EmptyResult,
}

/// fuzzdx error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FuzzdxError {
    /// Matrix or vector does not have the shape the vocabularies require
    #[error("Shape mismatch for {matrix}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Name of the offending matrix
        matrix: &'static str,
        /// Expected (rows, columns)
        expected: (usize, usize),
        /// Actual (rows, columns)
        got: (usize, usize),
    },

    /// Matrix entry outside [0, 1]
    #[error("Value {value} at ({row}, {col}) of {matrix} is outside [0, 1]")]
    OutOfUnitRange {
        /// Name of the offending matrix
        matrix: &'static str,
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Offending value
        value: f64,
    },

    /// Symptom or diagnosis vocabulary with no entries
    #[error("Empty {0} set")]
    EmptyVocabulary(&'static str),

    /// Label that appears twice in a vocabulary
    #[error("Duplicate {kind} label '{label}'")]
    DuplicateLabel {
        /// "symptom" or "diagnosis"
        kind: &'static str,
        /// Repeated label
        label: String,
    },

    /// Membership mapping that fails validation
    #[error("Invalid mapping for symptom '{symptom}': {reason}")]
    InvalidMapping {
        /// Symptom the mapping belongs to
        symptom: String,
        /// What is wrong with it
        reason: String,
    },

    /// Any other configuration problem (loading, parsing, coverage)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Patient vector has the wrong number of symptom values
    #[error("Patient '{patient}' has {got} symptom values, expected {expected}")]
    SymptomCountMismatch {
        /// Patient identifier
        patient: String,
        /// |SymptomSet|
        expected: usize,
        /// Values supplied
        got: usize,
    },

    /// Raw value that is not a finite number
    #[error("Symptom '{symptom}' has non-numeric value '{raw}'")]
    NonNumericSymptom {
        /// Symptom name
        symptom: String,
        /// Raw text supplied
        raw: String,
    },

    /// Value outside the declared domain of its mapping
    #[error("Symptom '{symptom}' value {value} is outside its domain [{min}, {max}]")]
    OutOfDomain {
        /// Symptom name
        symptom: String,
        /// Offending value
        value: f64,
        /// Domain lower bound
        min: f64,
        /// Domain upper bound
        max: f64,
    },

    /// Symptom name not present in the vocabulary
    #[error("Unknown symptom '{0}'")]
    UnknownSymptom(String),

    /// Symptom name with no supplied value
    #[error("Missing value for symptom '{0}'")]
    MissingSymptom(String),

    /// Query vector component that is malformed
    #[error("Invalid query vector: {0}")]
    InvalidQuery(String),

    /// Nothing to compose or rank
    #[error("No result: {0}")]
    EmptyResult(String),
}

impl FuzzdxError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FuzzdxError::ShapeMismatch { .. }
            | FuzzdxError::OutOfUnitRange { .. }
            | FuzzdxError::EmptyVocabulary(_)
            | FuzzdxError::DuplicateLabel { .. }
            | FuzzdxError::InvalidMapping { .. }
            | FuzzdxError::Configuration(_) => ErrorKind::Configuration,
            FuzzdxError::SymptomCountMismatch { .. }
            | FuzzdxError::NonNumericSymptom { .. }
            | FuzzdxError::OutOfDomain { .. }
            | FuzzdxError::UnknownSymptom(_)
            | FuzzdxError::MissingSymptom(_)
            | FuzzdxError::InvalidQuery(_) => ErrorKind::Input,
            FuzzdxError::EmptyResult(_) => ErrorKind::EmptyResult,
        }
    }

    /// True for fatal configuration errors
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// True for recoverable input errors
    pub fn is_input(&self) -> bool {
        self.kind() == ErrorKind::Input
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        FuzzdxError::Configuration(message.into())
    }
}

/// Result type for fuzzdx operations
pub type Result<T> = std::result::Result<T, FuzzdxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(FuzzdxError::EmptyVocabulary("symptom").is_configuration());
        assert!(FuzzdxError::UnknownSymptom("rash".to_string()).is_input());
        assert_eq!(
            FuzzdxError::EmptyResult("no patients".to_string()).kind(),
            ErrorKind::EmptyResult
        );
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = FuzzdxError::SymptomCountMismatch {
            patient: "p-7".to_string(),
            expected: 5,
            got: 4,
        };
        assert_eq!(
            err.to_string(),
            "Patient 'p-7' has 4 symptom values, expected 5"
        );

        let err = FuzzdxError::OutOfUnitRange {
            matrix: "weights",
            row: 1,
            col: 2,
            value: 1.5,
        };
        assert!(err.to_string().contains("weights"));
        assert!(err.to_string().contains("(1, 2)"));
    }
}
