//! Diagnostic configuration
//!
//! A [`DiagnosticConfig`] describes the vocabularies, the relation matrices
//! and the per-symptom membership mappings. It can be loaded from TOML
//! (merged with `FUZZDX_`-prefixed environment variables) and is validated
//! once, at load time.
//!
//! ```toml
//! symptoms = ["temperature", "cough"]
//! diagnoses = ["Healthy", "Flu"]
//!
//! [relation]
//! membership = [[0.4, 0.8], [0.1, 0.8]]
//! weights = [[0.5, 0.9], [0.4, 1.0]]
//!
//! [relation.non_membership]
//! mode = "complement"
//!
//! [[mappings]]
//! symptom = "temperature"
//! domain = { min = 30.0, max = 45.0 }
//! mapping = { kind = "banded", bands = [
//!     { upper = 37.5, inclusive = true, value = 0.5 },
//!     { value = 1.0 },
//! ] }
//!
//! [[mappings]]
//! symptom = "cough"
//! domain = { min = 0.0, max = 10.0 }
//! mapping = { kind = "linear_normalize", scale_max = 10.0, floor = 0.8 }
//! ```

use crate::error::{FuzzdxError, Result};
use crate::membership::{MappingTable, SymptomMapping};
use crate::relation::{matrix_from_rows, Relation, REFERENCE_MEMBERSHIP, REFERENCE_WEIGHTS};
use crate::scoring::DEFAULT_DISPLAY_PRECISION;
use crate::vocabulary::{DiagnosisSet, SymptomSet, REFERENCE_DIAGNOSES, REFERENCE_SYMPTOMS};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable prefix merged over file configuration
pub const ENV_PREFIX: &str = "FUZZDX_";

/// How the relation's non-membership matrix is obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NonMembershipConfig {
    /// `1 - membership`, no hesitation at the relation level
    Complement,
    /// Independently supplied matrix
    Explicit {
        /// S×D rows
        matrix: Vec<Vec<f64>>,
    },
}

/// Relation matrices as rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationConfig {
    /// S×D membership rows
    pub membership: Vec<Vec<f64>>,
    /// Non-membership source
    pub non_membership: NonMembershipConfig,
    /// Optional S×D weight rows, applied to membership only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<Vec<f64>>>,
}

impl RelationConfig {
    /// Build and validate the relation
    pub fn build(&self) -> Result<Relation> {
        let membership = matrix_from_rows("membership", &self.membership)?;
        let weights = self
            .weights
            .as_deref()
            .map(|rows| matrix_from_rows("weights", rows))
            .transpose()?;

        match &self.non_membership {
            NonMembershipConfig::Complement => Relation::complement(membership, weights),
            NonMembershipConfig::Explicit { matrix } => {
                let non_membership = matrix_from_rows("non_membership", matrix)?;
                Relation::new(membership, non_membership, weights)
            }
        }
    }
}

/// Complete configuration of a diagnostic engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticConfig {
    /// Ordered symptom names
    pub symptoms: Vec<String>,
    /// Ordered diagnosis labels (also the ranking tie-break order)
    pub diagnoses: Vec<String>,
    /// Relation matrices
    pub relation: RelationConfig,
    /// One mapping per symptom
    pub mappings: Vec<SymptomMapping>,
    /// Decimals used when presenting scores
    #[serde(default = "default_display_precision")]
    pub display_precision: u32,
}

fn default_display_precision() -> u32 {
    DEFAULT_DISPLAY_PRECISION
}

/// Validated pieces of a configuration
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// Symptom vocabulary
    pub symptoms: SymptomSet,
    /// Diagnosis vocabulary
    pub diagnoses: DiagnosisSet,
    /// Relation checked against both vocabularies
    pub relation: Relation,
    /// Mappings aligned with the symptom order
    pub mappings: MappingTable,
    /// Presentation decimals
    pub display_precision: u32,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            symptoms: REFERENCE_SYMPTOMS.iter().map(|s| s.to_string()).collect(),
            diagnoses: REFERENCE_DIAGNOSES.iter().map(|s| s.to_string()).collect(),
            relation: RelationConfig {
                membership: REFERENCE_MEMBERSHIP.iter().map(|r| r.to_vec()).collect(),
                non_membership: NonMembershipConfig::Complement,
                weights: Some(REFERENCE_WEIGHTS.iter().map(|r| r.to_vec()).collect()),
            },
            mappings: MappingTable::reference_mappings(),
            display_precision: DEFAULT_DISPLAY_PRECISION,
        }
    }
}

impl DiagnosticConfig {
    fn extract(figment: Figment, origin: &str) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| {
            FuzzdxError::configuration(format!("Failed to load configuration from {origin}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, with `FUZZDX_` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FuzzdxError::configuration(format!(
                "configuration file {path:?} does not exist"
            )));
        }
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        let config = Self::extract(figment, &format!("{path:?}"))?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Load from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::extract(Figment::new().merge(Toml::string(content)), "TOML string")
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            FuzzdxError::configuration(format!("Failed to serialize configuration to TOML: {e}"))
        })
    }

    /// Save to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(&path, content).map_err(|e| {
            FuzzdxError::configuration(format!(
                "Failed to write configuration to {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    /// Validate everything and return the built components
    pub fn build(&self) -> Result<ValidatedConfig> {
        let symptoms = SymptomSet::new(self.symptoms.clone())?;
        let diagnoses = DiagnosisSet::new(self.diagnoses.clone())?;
        let relation = self.relation.build()?;
        relation.validate_for(&symptoms, &diagnoses)?;
        let mappings = MappingTable::new(&symptoms, self.mappings.clone())?;
        if self.display_precision > 10 {
            return Err(FuzzdxError::configuration(format!(
                "display_precision {} is larger than 10",
                self.display_precision
            )));
        }

        Ok(ValidatedConfig {
            symptoms,
            diagnoses,
            relation,
            mappings,
            display_precision: self.display_precision,
        })
    }

    /// Validate without keeping the built components
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{Band, BandValue, Domain, MembershipMapping};

    const TWO_BY_TWO: &str = r#"
symptoms = ["temperature", "cough"]
diagnoses = ["Healthy", "Flu"]

[relation]
membership = [[0.4, 0.8], [0.1, 0.8]]
weights = [[0.5, 0.9], [0.4, 1.0]]

[relation.non_membership]
mode = "explicit"
matrix = [[0.5, 0.1], [0.7, 0.1]]

[[mappings]]
symptom = "temperature"
domain = { min = 30.0, max = 45.0 }
mapping = { kind = "banded", bands = [
    { upper = 37.5, inclusive = true, value = 0.5 },
    { value = { slope = 0.25, intercept = -9.0 } },
] }

[[mappings]]
symptom = "cough"
domain = { min = 0.0, max = 10.0 }
mapping = { kind = "linear_normalize", scale_max = 10.0, floor = 0.8 }
"#;

    #[test]
    fn test_default_config_is_reference() {
        let config = DiagnosticConfig::default();
        let built = config.build().unwrap();

        assert_eq!(built.symptoms, SymptomSet::reference());
        assert_eq!(built.diagnoses, DiagnosisSet::reference());
        assert_eq!(built.relation, Relation::reference());
        assert_eq!(built.display_precision, 2);
    }

    #[test]
    fn test_parse_toml() {
        let config = DiagnosticConfig::from_toml_str(TWO_BY_TWO).unwrap();
        assert_eq!(config.display_precision, 2);
        assert!(matches!(
            config.relation.non_membership,
            NonMembershipConfig::Explicit { .. }
        ));
        assert_eq!(
            config.mappings[0].mapping,
            MembershipMapping::Banded {
                bands: vec![
                    Band::up_to(37.5, BandValue::Constant(0.5)),
                    Band::rest(BandValue::Affine {
                        slope: 0.25,
                        intercept: -9.0,
                    }),
                ],
            }
        );

        let built = config.build().unwrap();
        assert_eq!(built.relation.non_membership()[[0, 0]], 0.5);
        assert_eq!(built.mappings.mappings()[1].domain, Domain::new(0.0, 10.0));
    }

    #[test]
    fn test_shape_mismatch_is_configuration_error() {
        let content = TWO_BY_TWO.replace(
            "membership = [[0.4, 0.8], [0.1, 0.8]]",
            "membership = [[0.4, 0.8, 0.2], [0.1, 0.8, 0.3]]",
        );
        let err = DiagnosticConfig::from_toml_str(&content).unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[test]
    fn test_out_of_range_entry_rejected() {
        let content = TWO_BY_TWO.replace("matrix = [[0.5, 0.1]", "matrix = [[1.5, 0.1]");
        let err = DiagnosticConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(
            err,
            FuzzdxError::OutOfUnitRange { matrix: "non_membership", row: 0, col: 0, .. }
        ));
    }

    #[test]
    fn test_empty_symptoms_rejected() {
        let mut config = DiagnosticConfig::default();
        config.symptoms.clear();
        assert_eq!(
            config.validate().unwrap_err(),
            FuzzdxError::EmptyVocabulary("symptom")
        );
    }

    #[test]
    fn test_malformed_toml() {
        let err = DiagnosticConfig::from_toml_str("symptoms = [").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzdx.toml");

        let config = DiagnosticConfig::default();
        config.save_toml(&path).unwrap();
        let loaded = DiagnosticConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = DiagnosticConfig::from_file("/nonexistent/fuzzdx.toml").unwrap_err();
        assert!(err.is_configuration());
    }
}
