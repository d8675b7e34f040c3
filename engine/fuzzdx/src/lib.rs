//! # fuzzdx - Intuitionistic Fuzzy Diagnosis
//!
//! Ranks candidate diagnoses for a patient's symptoms using intuitionistic
//! fuzzy relations and max-min-max composition.
//!
//! ## Features
//!
//! - **Relations**: S×D membership, non-membership and weight matrices,
//!   with complement or independent non-membership
//! - **Membership mapping**: declarative per-symptom banded and
//!   linear-normalize mappings, validated at load time
//! - **Composition**: max-min-max composition for single patients and batches
//! - **Scoring**: hesitation margin and score of reliability (SR) with a
//!   deterministic ranking
//! - **Refinement**: explicit, lock-protected relation updates from evidence
//! - **Configuration**: TOML + environment via figment
//!
//! ## Architecture
//!
//! ```text
//! PatientRecord ──► MappingTable ──► QueryVector
//!                                        │
//!                   RelationStore ──► compose ──► score ──► rank ──► Vec<DiagnosisScore>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use fuzzdx::{DiagnosticEngine, PatientRecord};
//!
//! let engine = DiagnosticEngine::reference()?;
//! let patient = PatientRecord::new("17", "Ada", vec![39.2, 7.0, 8.0, 6.0, 5.0]);
//!
//! let result = engine.diagnose_patient(&patient)?;
//! let top = result.top().expect("one score per diagnosis");
//! println!("{top}");
//! assert_eq!(result.ranking.len(), 6);
//! # Ok::<(), fuzzdx::FuzzdxError>(())
//! ```

pub mod classifier;
pub mod composition;
pub mod config;
pub mod engine;
pub mod error;
pub mod membership;
pub mod patient;
pub mod relation;
pub mod scoring;
pub mod vocabulary;

pub use classifier::StrengthClassifier;
pub use composition::{compose, compose_batch, refine_relation, refine_with, Composed, ComposedBatch};
pub use config::{DiagnosticConfig, NonMembershipConfig, RelationConfig, ValidatedConfig};
pub use engine::{Diagnoser, DiagnosticEngine, PatientDiagnosis};
pub use error::{ErrorKind, FuzzdxError, Result};
pub use membership::{
    Band, BandValue, Domain, MappingTable, MembershipMapping, QueryBatch, QueryVector,
    SymptomMapping,
};
pub use patient::PatientRecord;
pub use relation::{Relation, RelationStore, UpdateOutcome};
pub use scoring::{hesitation, rank, score, score_of_reliability, DiagnosisScore};
pub use vocabulary::{DiagnosisSet, SymptomSet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
