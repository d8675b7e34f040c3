//! # Relation Store
//!
//! Symptom × diagnosis evidence matrices and the shared store that guards them.
//!
//! A [`Relation`] holds an S×D membership matrix, an S×D non-membership
//! matrix and an optional S×D weight matrix. Non-membership may be the plain
//! complement of membership or an independent matrix that leaves room for
//! hesitation. Weights scale membership only, never non-membership.
//!
//! [`RelationStore`] shares one relation between any number of concurrent
//! readers and serializes refinement writes (single writer, many readers).

use crate::error::{FuzzdxError, Result};
use crate::vocabulary::{DiagnosisSet, SymptomSet};
use ndarray::Array2;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Reference membership matrix (rows: symptoms, columns: diagnoses)
pub const REFERENCE_MEMBERSHIP: [[f64; 6]; 5] = [
    [0.4, 0.6, 0.8, 0.4, 0.6, 0.9],
    [0.1, 0.6, 0.7, 0.3, 0.7, 0.8],
    [0.1, 0.7, 0.8, 0.6, 0.8, 0.9],
    [0.2, 0.5, 0.7, 0.3, 0.7, 0.8],
    [0.1, 0.7, 0.6, 0.5, 0.7, 0.8],
];

/// Reference weight matrix (rows: symptoms, columns: diagnoses)
pub const REFERENCE_WEIGHTS: [[f64; 6]; 5] = [
    [0.5, 0.7, 0.9, 0.6, 0.8, 1.0],
    [0.4, 0.6, 0.7, 0.5, 0.7, 0.8],
    [0.4, 0.8, 1.0, 0.6, 0.9, 1.0],
    [0.3, 0.5, 0.8, 0.4, 0.7, 0.9],
    [0.3, 0.7, 0.7, 0.6, 0.7, 0.8],
];

/// Build a matrix from rows, rejecting ragged or empty input
pub fn matrix_from_rows(name: &'static str, rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if n_rows == 0 || n_cols == 0 {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: name,
            expected: (n_rows.max(1), n_cols.max(1)),
            got: (n_rows, n_cols),
        });
    }
    if let Some(ragged) = rows.iter().find(|row| row.len() != n_cols) {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: name,
            expected: (n_rows, n_cols),
            got: (n_rows, ragged.len()),
        });
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| FuzzdxError::configuration(format!("{name}: {e}")))
}

fn check_unit_range(name: &'static str, matrix: &Array2<f64>) -> Result<()> {
    match matrix
        .indexed_iter()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        Some(((row, col), &value)) => Err(FuzzdxError::OutOfUnitRange {
            matrix: name,
            row,
            col,
            value,
        }),
        None => Ok(()),
    }
}

fn check_shape(name: &'static str, matrix: &Array2<f64>, expected: (usize, usize)) -> Result<()> {
    if matrix.dim() != expected {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: name,
            expected,
            got: matrix.dim(),
        });
    }
    Ok(())
}

/// Intuitionistic fuzzy relation between symptoms and diagnoses
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    membership: Array2<f64>,
    non_membership: Array2<f64>,
    weights: Option<Array2<f64>>,
    weighted_membership: Array2<f64>,
}

impl Relation {
    /// Create a relation from independent membership and non-membership
    ///
    /// All matrices must share one non-empty shape and hold values in [0, 1].
    pub fn new(
        membership: Array2<f64>,
        non_membership: Array2<f64>,
        weights: Option<Array2<f64>>,
    ) -> Result<Self> {
        let shape = membership.dim();
        if shape.0 == 0 || shape.1 == 0 {
            return Err(FuzzdxError::configuration(
                "relation needs at least one symptom and one diagnosis",
            ));
        }
        check_shape("non_membership", &non_membership, shape)?;
        check_unit_range("membership", &membership)?;
        check_unit_range("non_membership", &non_membership)?;
        if let Some(weights) = &weights {
            check_shape("weights", weights, shape)?;
            check_unit_range("weights", weights)?;
        }

        let weighted_membership = match &weights {
            Some(weights) => &membership * weights,
            None => membership.clone(),
        };

        Ok(Self {
            membership,
            non_membership,
            weights,
            weighted_membership,
        })
    }

    /// Create a relation whose non-membership is `1 - membership`
    pub fn complement(membership: Array2<f64>, weights: Option<Array2<f64>>) -> Result<Self> {
        let non_membership = membership.mapv(|m| 1.0 - m);
        Self::new(membership, non_membership, weights)
    }

    /// The reference relation: five symptoms, six diagnoses, weighted,
    /// complement non-membership
    pub fn reference() -> Self {
        let membership = Array2::from_shape_fn((5, 6), |(i, j)| REFERENCE_MEMBERSHIP[i][j]);
        let weights = Array2::from_shape_fn((5, 6), |(i, j)| REFERENCE_WEIGHTS[i][j]);
        let non_membership = membership.mapv(|m| 1.0 - m);
        let weighted_membership = &membership * &weights;
        Self {
            membership,
            non_membership,
            weights: Some(weights),
            weighted_membership,
        }
    }

    /// Check the relation against the vocabularies it is used with
    pub fn validate_for(&self, symptoms: &SymptomSet, diagnoses: &DiagnosisSet) -> Result<()> {
        check_shape(
            "membership",
            &self.membership,
            (symptoms.len(), diagnoses.len()),
        )
    }

    /// (S, D)
    pub fn shape(&self) -> (usize, usize) {
        self.membership.dim()
    }

    /// Number of symptoms (S)
    pub fn symptom_count(&self) -> usize {
        self.membership.nrows()
    }

    /// Number of diagnoses (D)
    pub fn diagnosis_count(&self) -> usize {
        self.membership.ncols()
    }

    /// S×D membership matrix
    pub fn membership(&self) -> &Array2<f64> {
        &self.membership
    }

    /// S×D non-membership matrix
    pub fn non_membership(&self) -> &Array2<f64> {
        &self.non_membership
    }

    /// Optional S×D weight matrix
    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.weights.as_ref()
    }

    /// Membership multiplied elementwise by the weights, or plain membership
    pub fn weighted_membership(&self) -> &Array2<f64> {
        &self.weighted_membership
    }

    /// Same relation with new membership and non-membership, keeping weights
    pub(crate) fn with_matrices(
        &self,
        membership: Array2<f64>,
        non_membership: Array2<f64>,
    ) -> Result<Self> {
        check_shape("membership", &membership, self.shape())?;
        Self::new(membership, non_membership, self.weights.clone())
    }
}

/// Outcome of a relation update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Whether the stored relation changed
    pub changed: bool,
    /// Store generation after the update
    pub generation: u64,
}

/// Shared, read-mostly holder of the active [`Relation`]
///
/// Readers get an `Arc` snapshot, so a composition in flight always sees a
/// single consistent relation. Writers hold the write lock for the whole
/// read-compute-swap sequence.
#[derive(Debug)]
pub struct RelationStore {
    symptoms: SymptomSet,
    diagnoses: DiagnosisSet,
    relation: RwLock<Arc<Relation>>,
    generation: AtomicU64,
}

impl RelationStore {
    /// Create a store after checking the relation against both vocabularies
    pub fn new(symptoms: SymptomSet, diagnoses: DiagnosisSet, relation: Relation) -> Result<Self> {
        relation.validate_for(&symptoms, &diagnoses)?;
        debug!(
            "Relation store initialised with {}x{} relation",
            relation.symptom_count(),
            relation.diagnosis_count()
        );
        Ok(Self {
            symptoms,
            diagnoses,
            relation: RwLock::new(Arc::new(relation)),
            generation: AtomicU64::new(0),
        })
    }

    /// Store holding the reference relation
    pub fn reference() -> Self {
        Self {
            symptoms: SymptomSet::reference(),
            diagnoses: DiagnosisSet::reference(),
            relation: RwLock::new(Arc::new(Relation::reference())),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current relation
    pub fn get(&self) -> Arc<Relation> {
        Arc::clone(&self.relation.read())
    }

    /// Symptom vocabulary
    pub fn symptoms(&self) -> &SymptomSet {
        &self.symptoms
    }

    /// Diagnosis vocabulary
    pub fn diagnoses(&self) -> &DiagnosisSet {
        &self.diagnoses
    }

    /// Number of effective updates applied so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the relation wholesale
    pub fn replace(&self, relation: Relation) -> Result<UpdateOutcome> {
        self.update(|_| Ok(relation))
    }

    /// Compute a new relation from the current one under the write lock
    ///
    /// Nothing is stored if `f` fails or returns a relation of the wrong
    /// shape. A result equal to the current relation leaves the generation
    /// untouched.
    pub fn update<F>(&self, f: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&Relation) -> Result<Relation>,
    {
        let mut guard = self.relation.write();
        let next = f(&guard)?;
        next.validate_for(&self.symptoms, &self.diagnoses)?;

        if next == **guard {
            debug!("Relation update is a fixed point, keeping current relation");
            return Ok(UpdateOutcome {
                changed: false,
                generation: self.generation(),
            });
        }

        *guard = Arc::new(next);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!("Relation updated to generation {}", generation);
        Ok(UpdateOutcome {
            changed: true,
            generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reference_relation() {
        let relation = Relation::reference();
        assert_eq!(relation.shape(), (5, 6));
        assert_eq!(relation.membership()[[0, 5]], 0.9);
        assert!((relation.weighted_membership()[[0, 0]] - 0.2).abs() < 1e-12);
        assert!((relation.non_membership()[[2, 2]] - 0.2).abs() < 1e-12);
        assert!(relation.weights().is_some());
    }

    #[test]
    fn test_reference_equals_complement_constructor() {
        let membership = matrix_from_rows(
            "membership",
            &REFERENCE_MEMBERSHIP.iter().map(|r| r.to_vec()).collect::<Vec<_>>(),
        )
        .unwrap();
        let weights = matrix_from_rows(
            "weights",
            &REFERENCE_WEIGHTS.iter().map(|r| r.to_vec()).collect::<Vec<_>>(),
        )
        .unwrap();
        let relation = Relation::complement(membership, Some(weights)).unwrap();
        assert_eq!(relation, Relation::reference());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Relation::new(
            array![[0.1, 0.2], [0.3, 0.4]],
            array![[0.1, 0.2, 0.3], [0.3, 0.4, 0.5]],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FuzzdxError::ShapeMismatch { matrix: "non_membership", expected: (2, 2), got: (2, 3) }
        ));

        let err = Relation::complement(array![[0.1, 0.2]], Some(array![[1.0]])).unwrap_err();
        assert!(matches!(err, FuzzdxError::ShapeMismatch { matrix: "weights", .. }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = Relation::new(array![[0.1, 1.2]], array![[0.5, 0.0]], None).unwrap_err();
        assert_eq!(
            err,
            FuzzdxError::OutOfUnitRange {
                matrix: "membership",
                row: 0,
                col: 1,
                value: 1.2,
            }
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = matrix_from_rows("membership", &[vec![0.1, 0.2], vec![0.3]]).unwrap_err();
        assert!(matches!(err, FuzzdxError::ShapeMismatch { .. }));
        assert!(matrix_from_rows("membership", &[]).is_err());
    }

    #[test]
    fn test_explicit_non_membership_keeps_hesitation() {
        let relation = Relation::new(array![[0.5]], array![[0.2]], None).unwrap();
        assert_eq!(relation.non_membership()[[0, 0]], 0.2);
        assert_eq!(relation.weighted_membership()[[0, 0]], 0.5);
    }

    #[test]
    fn test_store_validates_vocabulary() {
        let symptoms = SymptomSet::new(["a", "b"]).unwrap();
        let diagnoses = DiagnosisSet::reference();
        let err = RelationStore::new(symptoms, diagnoses, Relation::reference()).unwrap_err();
        assert!(matches!(
            err,
            FuzzdxError::ShapeMismatch { expected: (2, 6), got: (5, 6), .. }
        ));
    }

    #[test]
    fn test_store_update_generations() {
        let store = RelationStore::reference();
        assert_eq!(store.generation(), 0);

        let outcome = store.update(|current| Ok(current.clone())).unwrap();
        assert!(!outcome.changed);
        assert_eq!(store.generation(), 0);

        let snapshot = store.get();
        let outcome = store
            .update(|current| {
                current.with_matrices(
                    current.membership().mapv(|m| m * 0.5),
                    current.non_membership().clone(),
                )
            })
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.generation, 1);

        // earlier snapshots are unaffected
        assert_eq!(snapshot.membership()[[0, 0]], 0.4);
        assert_eq!(store.get().membership()[[0, 0]], 0.2);
    }

    #[test]
    fn test_store_rejects_wrong_shape_update() {
        let store = RelationStore::reference();
        let err = store
            .replace(Relation::complement(array![[0.5]], None).unwrap())
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(store.get().shape(), (5, 6));
    }
}
