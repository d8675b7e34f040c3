//! Patient records supplied by the caller

use crate::error::{FuzzdxError, Result};
use crate::vocabulary::SymptomSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A patient and their raw symptom values, ordered like the [`SymptomSet`]
///
/// Values are in the units of each symptom (°C, 0-10 severity, ...) and are
/// not transformed until a query vector is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Caller-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Raw symptom values in canonical symptom order
    pub symptoms: Vec<f64>,
}

impl PatientRecord {
    /// Create a record from an already ordered value vector
    pub fn new(id: impl Into<String>, name: impl Into<String>, symptoms: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symptoms,
        }
    }

    /// Build a record from a name to value map
    ///
    /// Every symptom of the set must be present exactly once; unknown names
    /// are rejected rather than ignored.
    pub fn from_named(
        id: impl Into<String>,
        name: impl Into<String>,
        symptom_set: &SymptomSet,
        values: &HashMap<String, f64>,
    ) -> Result<Self> {
        if let Some(unknown) = values.keys().find(|k| symptom_set.index_of(k).is_none()) {
            return Err(FuzzdxError::UnknownSymptom(unknown.clone()));
        }

        let symptoms = symptom_set
            .iter()
            .map(|symptom| {
                values
                    .get(symptom)
                    .copied()
                    .ok_or_else(|| FuzzdxError::MissingSymptom(symptom.to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self::new(id, name, symptoms))
    }

    /// Build a record from raw text values, such as form fields or CLI arguments
    pub fn parse<S: AsRef<str>>(
        id: impl Into<String>,
        name: impl Into<String>,
        symptom_set: &SymptomSet,
        raw_values: &[S],
    ) -> Result<Self> {
        let id = id.into();
        if raw_values.len() != symptom_set.len() {
            return Err(FuzzdxError::SymptomCountMismatch {
                patient: id,
                expected: symptom_set.len(),
                got: raw_values.len(),
            });
        }

        let symptoms = symptom_set
            .iter()
            .zip(raw_values)
            .map(|(symptom, raw)| {
                let raw = raw.as_ref().trim();
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| FuzzdxError::NonNumericSymptom {
                        symptom: symptom.to_string(),
                        raw: raw.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self::new(id, name, symptoms))
    }

    /// Check the value count against the symptom set
    pub fn check_arity(&self, symptom_set: &SymptomSet) -> Result<()> {
        if self.symptoms.len() != symptom_set.len() {
            return Err(FuzzdxError::SymptomCountMismatch {
                patient: self.id.clone(),
                expected: symptom_set.len(),
                got: self.symptoms.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_named_orders_values() {
        let set = SymptomSet::reference();
        let values: HashMap<String, f64> = [
            ("cough", 3.0),
            ("temperature", 38.0),
            ("sore_throat", 5.0),
            ("headache", 1.0),
            ("fatigue", 2.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let record = PatientRecord::from_named("1", "Ada", &set, &values).unwrap();
        assert_eq!(record.symptoms, vec![38.0, 1.0, 3.0, 2.0, 5.0]);
    }

    #[test]
    fn test_from_named_rejects_unknown_and_missing() {
        let set = SymptomSet::new(["temperature", "cough"]).unwrap();

        let mut values = HashMap::new();
        values.insert("temperature".to_string(), 37.0);
        let err = PatientRecord::from_named("1", "Ada", &set, &values).unwrap_err();
        assert_eq!(err, FuzzdxError::MissingSymptom("cough".to_string()));

        values.insert("cough".to_string(), 1.0);
        values.insert("rash".to_string(), 1.0);
        let err = PatientRecord::from_named("1", "Ada", &set, &values).unwrap_err();
        assert_eq!(err, FuzzdxError::UnknownSymptom("rash".to_string()));
    }

    #[test]
    fn test_parse_raw_values() {
        let set = SymptomSet::reference();
        let record =
            PatientRecord::parse("2", "Bo", &set, &["36.6", " 2", "0", "1.5", "4"]).unwrap();
        assert_eq!(record.symptoms, vec![36.6, 2.0, 0.0, 1.5, 4.0]);

        let err = PatientRecord::parse("2", "Bo", &set, &["36.6", "two", "0", "1", "4"])
            .unwrap_err();
        assert!(matches!(
            err,
            FuzzdxError::NonNumericSymptom { ref symptom, ref raw }
                if symptom == "headache" && raw == "two"
        ));
        assert!(err.is_input());

        let err = PatientRecord::parse("2", "Bo", &set, &["36.6", "NaN", "0", "1", "4"])
            .unwrap_err();
        assert!(matches!(err, FuzzdxError::NonNumericSymptom { .. }));
    }

    #[test]
    fn test_parse_wrong_count() {
        let set = SymptomSet::reference();
        let err = PatientRecord::parse("3", "Cy", &set, &["36.6", "1"]).unwrap_err();
        assert_eq!(
            err,
            FuzzdxError::SymptomCountMismatch {
                patient: "3".to_string(),
                expected: 5,
                got: 2,
            }
        );
    }
}
