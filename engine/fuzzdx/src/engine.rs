//! Diagnostic engine: patient records in, ranked diagnoses out

use crate::composition::{compose, compose_batch, refine_relation};
use crate::config::DiagnosticConfig;
use crate::error::{FuzzdxError, Result};
use crate::membership::{MappingTable, QueryBatch, QueryVector};
use crate::patient::PatientRecord;
use crate::relation::{Relation, RelationStore, UpdateOutcome};
use crate::scoring::{rank, score, DiagnosisScore, DEFAULT_DISPLAY_PRECISION};
use crate::vocabulary::{DiagnosisSet, SymptomSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Anything that turns a patient's symptoms into a ranked diagnosis list
pub trait Diagnoser: Send + Sync {
    /// Rank every diagnosis for one patient, best first
    fn diagnose(&self, patient: &PatientRecord) -> Result<Vec<DiagnosisScore>>;
}

/// Ranked diagnoses for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDiagnosis {
    /// Patient identifier
    pub patient_id: String,
    /// Patient display name
    pub patient_name: String,
    /// Diagnoses, best first
    pub ranking: Vec<DiagnosisScore>,
}

impl PatientDiagnosis {
    /// First-ranked diagnosis
    pub fn top(&self) -> Option<&DiagnosisScore> {
        self.ranking.first()
    }

    /// Copy with all scores rounded for presentation
    pub fn presented(&self, decimals: u32) -> PatientDiagnosis {
        PatientDiagnosis {
            patient_id: self.patient_id.clone(),
            patient_name: self.patient_name.clone(),
            ranking: self.ranking.iter().map(|s| s.presented(decimals)).collect(),
        }
    }
}

/// Intuitionistic fuzzy diagnostic engine
///
/// Owns the symptom mappings and the shared [`RelationStore`]. Diagnosis
/// calls take a snapshot of the relation; [`DiagnosticEngine::refine`] is the
/// only path that changes it.
#[derive(Debug)]
pub struct DiagnosticEngine {
    mappings: MappingTable,
    store: RelationStore,
    display_precision: u32,
}

impl DiagnosticEngine {
    /// Assemble an engine from validated parts
    pub fn new(mappings: MappingTable, store: RelationStore) -> Result<Self> {
        if mappings.symptoms() != store.symptoms() {
            return Err(FuzzdxError::configuration(
                "mapping table and relation store use different symptom sets",
            ));
        }
        Ok(Self {
            mappings,
            store,
            display_precision: DEFAULT_DISPLAY_PRECISION,
        })
    }

    /// Build an engine from a configuration
    pub fn from_config(config: &DiagnosticConfig) -> Result<Self> {
        let validated = config.build()?;
        let store = RelationStore::new(validated.symptoms, validated.diagnoses, validated.relation)?;
        info!(
            "Diagnostic engine ready: {} symptoms, {} diagnoses",
            store.symptoms().len(),
            store.diagnoses().len()
        );
        Ok(Self {
            mappings: validated.mappings,
            store,
            display_precision: validated.display_precision,
        })
    }

    /// Engine with the reference configuration
    pub fn reference() -> Result<Self> {
        Self::new(MappingTable::reference()?, RelationStore::reference())
    }

    /// Symptom vocabulary
    pub fn symptoms(&self) -> &SymptomSet {
        self.store.symptoms()
    }

    /// Diagnosis vocabulary
    pub fn diagnoses(&self) -> &DiagnosisSet {
        self.store.diagnoses()
    }

    /// Mapping table
    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    /// Relation store
    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    /// Snapshot of the active relation
    pub fn relation(&self) -> Arc<Relation> {
        self.store.get()
    }

    /// Decimals used when presenting results
    pub fn display_precision(&self) -> u32 {
        self.display_precision
    }

    /// Map a patient to a query vector
    pub fn build_query(&self, patient: &PatientRecord) -> Result<QueryVector> {
        self.mappings.build_query(patient)
    }

    /// Rank diagnoses for an already built query
    pub fn diagnose_query(&self, query: &QueryVector) -> Result<Vec<DiagnosisScore>> {
        let relation = self.store.get();
        let composed = compose(query, &relation)?;
        let scores = score(&composed);
        rank(self.store.diagnoses(), &composed, &scores)
    }

    /// Diagnose one patient
    pub fn diagnose_patient(&self, patient: &PatientRecord) -> Result<PatientDiagnosis> {
        debug!("Diagnosing patient '{}'", patient.id);
        let query = self.build_query(patient)?;
        let ranking = self.diagnose_query(&query)?;
        Ok(PatientDiagnosis {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            ranking,
        })
    }

    /// Diagnose several patients against one relation snapshot
    pub fn diagnose_batch(&self, patients: &[PatientRecord]) -> Result<Vec<PatientDiagnosis>> {
        let queries = self.mappings.build_batch(patients)?;
        let relation = self.store.get();
        let composed = compose_batch(&queries, &relation)?;

        patients
            .iter()
            .zip(composed.rows())
            .map(|(patient, row)| {
                let scores = score(&row);
                Ok(PatientDiagnosis {
                    patient_id: patient.id.clone(),
                    patient_name: patient.name.clone(),
                    ranking: rank(self.store.diagnoses(), &row, &scores)?,
                })
            })
            .collect()
    }

    /// Refine the relation from a set of patients
    ///
    /// Queries are composed against the current relation and the refined
    /// relation is stored, all under the store's write lock.
    pub fn refine(&self, patients: &[PatientRecord]) -> Result<UpdateOutcome> {
        let queries = self.mappings.build_batch(patients)?;
        self.refine_queries(&queries)
    }

    /// Refine the relation from prebuilt queries
    pub fn refine_queries(&self, queries: &QueryBatch) -> Result<UpdateOutcome> {
        let outcome = self.store.update(|current| {
            let composed = compose_batch(queries, current)?;
            refine_relation(queries, &composed, current)
        })?;
        info!(
            "Refinement from {} patient(s): changed={}, generation={}",
            queries.patients(),
            outcome.changed,
            outcome.generation
        );
        Ok(outcome)
    }
}

impl Diagnoser for DiagnosticEngine {
    fn diagnose(&self, patient: &PatientRecord) -> Result<Vec<DiagnosisScore>> {
        self.diagnose_patient(patient).map(|d| d.ranking)
    }
}
