//! Max-min-max composition of query vectors with a [`Relation`]
//!
//! For a query `A` over S symptoms and a relation `R` over S×D:
//!
//! ```text
//! B_mem[j] = max_i min(A_mem[i], weighted_R_mem[i][j])
//! B_non[j] = min_i max(A_non[i], R_non[i][j])
//! ```
//!
//! Batches are composed row by row with no interaction between patients.
//! The same operator, applied to stacked queries and composed results,
//! yields a refined relation.

use crate::error::{FuzzdxError, Result};
use crate::membership::{QueryBatch, QueryVector};
use crate::relation::Relation;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, warn};

/// Per-diagnosis membership and non-membership for one patient
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    membership: Array1<f64>,
    non_membership: Array1<f64>,
}

impl Composed {
    /// Build a composed result directly, e.g. when it was computed elsewhere
    pub fn new(membership: Array1<f64>, non_membership: Array1<f64>) -> Result<Self> {
        if membership.len() != non_membership.len() {
            return Err(FuzzdxError::ShapeMismatch {
                matrix: "composed non_membership",
                expected: (1, membership.len()),
                got: (1, non_membership.len()),
            });
        }
        check_unit_values("membership", &membership)?;
        check_unit_values("non-membership", &non_membership)?;
        Ok(Self {
            membership,
            non_membership,
        })
    }

    /// Number of diagnoses (D)
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    /// True when there are no diagnoses
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Membership per diagnosis
    pub fn membership(&self) -> &Array1<f64> {
        &self.membership
    }

    /// Non-membership per diagnosis
    pub fn non_membership(&self) -> &Array1<f64> {
        &self.non_membership
    }
}

/// Composed results for N patients as N×D matrices
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedBatch {
    membership: Array2<f64>,
    non_membership: Array2<f64>,
}

impl ComposedBatch {
    /// Number of patients (N)
    pub fn patients(&self) -> usize {
        self.membership.nrows()
    }

    /// Number of diagnoses (D)
    pub fn diagnoses(&self) -> usize {
        self.membership.ncols()
    }

    /// N×D membership matrix
    pub fn membership(&self) -> &Array2<f64> {
        &self.membership
    }

    /// N×D non-membership matrix
    pub fn non_membership(&self) -> &Array2<f64> {
        &self.non_membership
    }

    /// Result row of one patient
    pub fn row(&self, k: usize) -> Option<Composed> {
        if k >= self.patients() {
            return None;
        }
        Some(Composed {
            membership: self.membership.row(k).to_owned(),
            non_membership: self.non_membership.row(k).to_owned(),
        })
    }

    /// All rows in patient order
    pub fn rows(&self) -> impl Iterator<Item = Composed> + '_ {
        (0..self.patients()).filter_map(move |k| self.row(k))
    }
}

impl From<Composed> for ComposedBatch {
    fn from(composed: Composed) -> Self {
        Self {
            membership: composed.membership.insert_axis(Axis(0)),
            non_membership: composed.non_membership.insert_axis(Axis(0)),
        }
    }
}

fn check_unit_values(component: &str, values: &Array1<f64>) -> Result<()> {
    match values.iter().position(|v| !(0.0..=1.0).contains(v)) {
        Some(j) => Err(FuzzdxError::InvalidQuery(format!(
            "composed {component}[{j}] = {} is outside [0, 1]",
            values[j]
        ))),
        None => Ok(()),
    }
}

fn compose_row(
    a_mem: ArrayView1<'_, f64>,
    a_non: ArrayView1<'_, f64>,
    relation: &Relation,
) -> (Array1<f64>, Array1<f64>) {
    let weighted = relation.weighted_membership();
    let r_non = relation.non_membership();

    let membership = weighted
        .axis_iter(Axis(1))
        .map(|column| {
            column
                .iter()
                .zip(a_mem.iter())
                .map(|(&r, &a)| a.min(r))
                .fold(0.0, f64::max)
        })
        .collect::<Array1<f64>>();

    let non_membership = r_non
        .axis_iter(Axis(1))
        .map(|column| {
            column
                .iter()
                .zip(a_non.iter())
                .map(|(&r, &a)| a.max(r))
                .fold(1.0, f64::min)
        })
        .collect::<Array1<f64>>();

    (membership, non_membership)
}

fn check_symptom_count(got: usize, relation: &Relation) -> Result<()> {
    if got != relation.symptom_count() {
        return Err(FuzzdxError::InvalidQuery(format!(
            "query covers {got} symptoms but the relation has {}",
            relation.symptom_count()
        )));
    }
    Ok(())
}

/// Compose one query with the relation
pub fn compose(query: &QueryVector, relation: &Relation) -> Result<Composed> {
    check_symptom_count(query.len(), relation)?;
    debug!("Weighted R membership matrix: {:?}", relation.weighted_membership());

    let (membership, non_membership) =
        compose_row(query.membership(), query.non_membership(), relation);

    debug!("T membership: {:?}", membership);
    debug!("T non-membership: {:?}", non_membership);
    if membership.iter().all(|&m| m == 0.0) {
        warn!("Composition produced zero membership for every diagnosis");
    }

    Ok(Composed {
        membership,
        non_membership,
    })
}

/// Compose every row of a query batch with the relation
pub fn compose_batch(queries: &QueryBatch, relation: &Relation) -> Result<ComposedBatch> {
    if queries.patients() == 0 {
        return Err(FuzzdxError::EmptyResult("query batch has no patients".to_string()));
    }
    check_symptom_count(queries.symptoms(), relation)?;

    let shape = (queries.patients(), relation.diagnosis_count());
    let mut membership = Array2::zeros(shape);
    let mut non_membership = Array2::zeros(shape);

    for (k, (a_mem, a_non)) in queries
        .membership()
        .outer_iter()
        .zip(queries.non_membership().outer_iter())
        .enumerate()
    {
        let (b_mem, b_non) = compose_row(a_mem, a_non, relation);
        membership.row_mut(k).assign(&b_mem);
        non_membership.row_mut(k).assign(&b_non);
    }

    debug!("T membership matrix: {:?}", membership);
    debug!("T non-membership matrix: {:?}", non_membership);

    Ok(ComposedBatch {
        membership,
        non_membership,
    })
}

/// Refine a relation from stacked queries and their composed results
///
/// ```text
/// R'_mem[i][j] = max_k min(Q_mem[k][i], T_mem[k][j])
/// R'_non[i][j] = min_k max(Q_non[k][i], T_non[k][j])
/// ```
///
/// The weight matrix of `current` is carried over unchanged.
pub fn refine_relation(
    queries: &QueryBatch,
    composed: &ComposedBatch,
    current: &Relation,
) -> Result<Relation> {
    if queries.patients() == 0 {
        return Err(FuzzdxError::EmptyResult("nothing to refine from".to_string()));
    }
    if queries.patients() != composed.patients() {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: "composed",
            expected: (queries.patients(), current.diagnosis_count()),
            got: (composed.patients(), composed.diagnoses()),
        });
    }
    check_symptom_count(queries.symptoms(), current)?;
    if composed.diagnoses() != current.diagnosis_count() {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: "composed",
            expected: (composed.patients(), current.diagnosis_count()),
            got: (composed.patients(), composed.diagnoses()),
        });
    }

    let (q_mem, q_non) = (queries.membership(), queries.non_membership());
    let (t_mem, t_non) = (composed.membership(), composed.non_membership());
    let patients = queries.patients();

    let membership = Array2::from_shape_fn(current.shape(), |(i, j)| {
        (0..patients)
            .map(|k| q_mem[[k, i]].min(t_mem[[k, j]]))
            .fold(0.0, f64::max)
    });
    let non_membership = Array2::from_shape_fn(current.shape(), |(i, j)| {
        (0..patients)
            .map(|k| q_non[[k, i]].max(t_non[[k, j]]))
            .fold(1.0, f64::min)
    });

    debug!("Refined R membership: {:?}", membership);
    debug!("Refined R non-membership: {:?}", non_membership);
    current.with_matrices(membership, non_membership)
}

/// Refine a relation from a single query and its composed result
pub fn refine_with(query: &QueryVector, composed: &Composed, current: &Relation) -> Result<Relation> {
    let queries = QueryBatch::from_queries(std::slice::from_ref(query))?;
    refine_relation(&queries, &ComposedBatch::from(composed.clone()), current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_compose_reference_low_patient() {
        let relation = Relation::reference();
        let query = QueryVector::complement(vec![0.4, 0.8, 0.8, 0.8, 0.8]).unwrap();

        let composed = compose(&query, &relation).unwrap();
        let expected_mem = [0.2, 0.56, 0.8, 0.36, 0.72, 0.8];
        let expected_non = [0.6, 0.3, 0.2, 0.4, 0.2, 0.2];

        assert_eq!(composed.len(), 6);
        for j in 0..6 {
            assert!(approx(composed.membership()[j], expected_mem[j]), "mem[{j}]");
            assert!(approx(composed.non_membership()[j], expected_non[j]), "non[{j}]");
        }
    }

    #[test]
    fn test_weights_apply_to_membership_only() {
        let relation = Relation::new(
            array![[0.8, 0.6]],
            array![[0.1, 0.3]],
            Some(array![[0.5, 1.0]]),
        )
        .unwrap();
        let query = QueryVector::new(vec![1.0], vec![0.0]).unwrap();

        let composed = compose(&query, &relation).unwrap();
        assert!(approx(composed.membership()[0], 0.4));
        assert!(approx(composed.membership()[1], 0.6));
        assert!(approx(composed.non_membership()[0], 0.1));
        assert!(approx(composed.non_membership()[1], 0.3));
    }

    #[test]
    fn test_compose_rejects_wrong_length() {
        let relation = Relation::reference();
        let query = QueryVector::complement(vec![0.5, 0.5]).unwrap();
        let err = compose(&query, &relation).unwrap_err();
        assert!(matches!(err, FuzzdxError::InvalidQuery(_)));
    }

    #[test]
    fn test_batch_rows_match_single_composition() {
        let relation = Relation::reference();
        let queries = vec![
            QueryVector::complement(vec![0.4, 0.8, 0.8, 0.8, 0.8]).unwrap(),
            QueryVector::complement(vec![1.0, 0.9, 1.0, 0.8, 0.9]).unwrap(),
            QueryVector::new(vec![0.9, 0.1, 0.2, 0.3, 0.0], vec![0.05, 0.6, 0.5, 0.4, 0.7])
                .unwrap(),
        ];
        let batch = compose_batch(&QueryBatch::from_queries(&queries).unwrap(), &relation).unwrap();

        assert_eq!(batch.patients(), 3);
        assert_eq!(batch.diagnoses(), 6);
        for (k, query) in queries.iter().enumerate() {
            let single = compose(query, &relation).unwrap();
            assert_eq!(batch.row(k).unwrap(), single);
        }
        assert!(batch.row(3).is_none());
    }

    #[test]
    fn test_refine_fixed_point() {
        // Rank-one relation built from q and t: composing q with it yields t,
        // and refining with (q, t) reproduces it.
        let q = vec![1.0, 0.6, 0.3];
        let t = array![0.7, 0.2, 0.9, 0.5];
        let query = QueryVector::complement(q.clone()).unwrap();
        let t_non = t.mapv(|x: f64| 1.0 - x);

        let membership = Array2::from_shape_fn((3, 4), |(i, j)| q[i].min(t[j]));
        let non_membership = Array2::from_shape_fn((3, 4), |(i, j)| (1.0 - q[i]).max(t_non[j]));
        let relation = Relation::new(membership, non_membership, None).unwrap();

        let composed = compose(&query, &relation).unwrap();
        assert_eq!(composed.membership(), &t);
        assert_eq!(composed.non_membership(), &t_non);

        let refined = refine_with(&query, &composed, &relation).unwrap();
        assert_eq!(refined, relation);
    }

    #[test]
    fn test_refine_keeps_weights_and_bounds() {
        let relation = Relation::reference();
        let query = QueryVector::complement(vec![0.4, 0.8, 0.8, 0.8, 0.8]).unwrap();
        let composed = compose(&query, &relation).unwrap();

        let refined = refine_with(&query, &composed, &relation).unwrap();
        assert_eq!(refined.shape(), relation.shape());
        assert_eq!(refined.weights(), relation.weights());
        assert!(refined.membership().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(refined.non_membership().iter().all(|v| (0.0..=1.0).contains(v)));
        // temperature row is capped by the temperature query membership
        assert!(refined.membership().row(0).iter().all(|&v| v <= 0.4));
    }

    #[test]
    fn test_refine_shape_checks() {
        let relation = Relation::reference();
        let queries = QueryBatch::from_queries(&[
            QueryVector::complement(vec![0.4, 0.8, 0.8, 0.8, 0.8]).unwrap(),
            QueryVector::complement(vec![0.9, 0.8, 0.8, 0.8, 0.8]).unwrap(),
        ])
        .unwrap();
        let single = QueryBatch::from_queries(&[
            QueryVector::complement(vec![0.4, 0.8, 0.8, 0.8, 0.8]).unwrap()
        ])
        .unwrap();
        let composed = compose_batch(&single, &relation).unwrap();

        let err = refine_relation(&queries, &composed, &relation).unwrap_err();
        assert!(matches!(err, FuzzdxError::ShapeMismatch { matrix: "composed", .. }));
    }

    #[test]
    fn test_composed_rejects_values_outside_unit_range() {
        let err = Composed::new(array![2.0, 0.5], array![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FuzzdxError::InvalidQuery(_)), "{err}");
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);

        let err = Composed::new(array![0.5, f64::NAN], array![0.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("membership[1]"), "{err}");

        assert!(Composed::new(array![0.5, 0.2], array![0.1, -0.1]).is_err());
        assert!(Composed::new(array![0.0, 1.0], array![1.0, 0.0]).is_ok());
    }
}
