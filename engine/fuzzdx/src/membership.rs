//! # Membership Mapping
//!
//! Maps raw patient symptom values onto intuitionistic fuzzy query vectors.
//!
//! Each symptom gets its own declarative [`MembershipMapping`]:
//!
//! - **Banded**: contiguous bands over the symptom's domain, each with a
//!   constant or affine membership value. The last band is open-ended and
//!   saturates into [0, 1].
//! - **Linear normalize**: `clamp(value / scale_max, floor, 1)` for bounded
//!   severity scales. The floor keeps low but present severities from
//!   collapsing the diagnostic signal.
//!
//! Non-membership of a mapped value is the complement `1 - membership`.
//! Callers that model hesitation explicitly can build a [`QueryVector`]
//! directly from independent membership and non-membership components.
//!
//! Mappings are validated once, when the [`MappingTable`] is built, not on
//! every lookup.

use crate::error::{FuzzdxError, Result};
use crate::patient::PatientRecord;
use crate::vocabulary::SymptomSet;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Membership value of a band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BandValue {
    /// Constant membership over the whole band
    Constant(f64),
    /// `slope * x + intercept`, clamped into [0, 1]
    Affine {
        /// Slope per raw unit
        slope: f64,
        /// Value at x = 0
        intercept: f64,
    },
}

impl BandValue {
    /// Membership for a value inside the band
    pub(crate) fn evaluate(&self, x: f64) -> f64 {
        match self {
            BandValue::Constant(value) => *value,
            BandValue::Affine { slope, intercept } => (slope * x + intercept).clamp(0.0, 1.0),
        }
    }
}

/// One band of a banded mapping
///
/// A band covers everything above the previous band's upper bound up to its
/// own `upper` bound. `upper = None` marks the final open-ended band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Upper bound of the band, `None` for the last band
    #[serde(default)]
    pub upper: Option<f64>,
    /// Whether a value equal to `upper` belongs to this band
    #[serde(default)]
    pub inclusive: bool,
    /// Membership inside the band
    pub value: BandValue,
}

impl Band {
    /// Band ending strictly below `upper`
    pub fn below(upper: f64, value: BandValue) -> Self {
        Self {
            upper: Some(upper),
            inclusive: false,
            value,
        }
    }

    /// Band ending at and including `upper`
    pub fn up_to(upper: f64, value: BandValue) -> Self {
        Self {
            upper: Some(upper),
            inclusive: true,
            value,
        }
    }

    /// Final open-ended band
    pub fn rest(value: BandValue) -> Self {
        Self {
            upper: None,
            inclusive: false,
            value,
        }
    }

    fn contains(&self, x: f64) -> bool {
        match self.upper {
            None => true,
            Some(upper) => x < upper || (self.inclusive && x == upper),
        }
    }
}

/// Raw-unit to membership function for one symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MembershipMapping {
    /// Contiguous bands covering the whole domain
    Banded {
        /// Bands in increasing order of their upper bound
        bands: Vec<Band>,
    },
    /// `clamp(value / scale_max, floor, 1)`
    LinearNormalize {
        /// Top of the severity scale
        scale_max: f64,
        /// Lowest membership any value can map to
        floor: f64,
    },
}

impl MembershipMapping {
    /// Banded temperature mapping in °C
    pub fn reference_temperature() -> Self {
        MembershipMapping::Banded {
            bands: vec![
                Band::below(36.5, BandValue::Constant(0.4)),
                Band::up_to(37.5, BandValue::Constant(0.8)),
                Band::up_to(38.5, BandValue::Constant(0.9)),
                Band::rest(BandValue::Constant(1.0)),
            ],
        }
    }

    /// 0-10 severity mapping with a 0.8 floor
    pub fn reference_severity() -> Self {
        MembershipMapping::LinearNormalize {
            scale_max: 10.0,
            floor: 0.8,
        }
    }

    /// Membership degree of a raw value; only meaningful once validated
    pub(crate) fn membership(&self, x: f64) -> f64 {
        match self {
            MembershipMapping::Banded { bands } => bands
                .iter()
                .find(|band| band.contains(x))
                .map(|band| band.value.evaluate(x))
                // validated mappings always end with an open band
                .unwrap_or(1.0),
            MembershipMapping::LinearNormalize { scale_max, floor } => {
                (x / scale_max).clamp(*floor, 1.0)
            }
        }
    }

    /// (membership, non-membership) pair of a raw value
    pub(crate) fn evaluate(&self, x: f64) -> (f64, f64) {
        let membership = self.membership(x);
        (membership, 1.0 - membership)
    }

    fn validate(&self, symptom: &str) -> Result<()> {
        let invalid = |reason: String| FuzzdxError::InvalidMapping {
            symptom: symptom.to_string(),
            reason,
        };

        match self {
            MembershipMapping::Banded { bands } => {
                let Some((last, head)) = bands.split_last() else {
                    return Err(invalid("banded mapping has no bands".to_string()));
                };
                if last.upper.is_some() {
                    return Err(invalid("last band must be open-ended".to_string()));
                }

                let mut previous: Option<f64> = None;
                for (i, band) in head.iter().enumerate() {
                    let Some(upper) = band.upper else {
                        return Err(invalid(format!("band {i} is open-ended but not last")));
                    };
                    if !upper.is_finite() {
                        return Err(invalid(format!("band {i} has a non-finite bound")));
                    }
                    if previous.is_some_and(|p| upper <= p) {
                        return Err(invalid(format!(
                            "band bounds must be strictly increasing (band {i})"
                        )));
                    }
                    previous = Some(upper);
                }

                for (i, band) in bands.iter().enumerate() {
                    match band.value {
                        BandValue::Constant(v) if !(0.0..=1.0).contains(&v) => {
                            return Err(invalid(format!(
                                "band {i} membership {v} is outside [0, 1]"
                            )));
                        }
                        BandValue::Affine { slope, intercept }
                            if !slope.is_finite() || !intercept.is_finite() =>
                        {
                            return Err(invalid(format!("band {i} has non-finite coefficients")));
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            MembershipMapping::LinearNormalize { scale_max, floor } => {
                if !(scale_max.is_finite() && *scale_max > 0.0) {
                    return Err(invalid(format!("scale_max {scale_max} must be positive")));
                }
                if !(0.0..=1.0).contains(floor) {
                    return Err(invalid(format!("floor {floor} is outside [0, 1]")));
                }
                Ok(())
            }
        }
    }
}

/// Closed interval of plausible raw values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Lowest accepted value
    pub min: f64,
    /// Highest accepted value
    pub max: f64,
}

impl Domain {
    /// Create a domain
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `x` lies in the domain
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// Mapping descriptor for a single symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomMapping {
    /// Symptom name
    pub symptom: String,
    /// Accepted raw value range
    pub domain: Domain,
    /// Raw value to membership function
    pub mapping: MembershipMapping,
}

impl SymptomMapping {
    /// Create a mapping descriptor
    pub fn new(symptom: impl Into<String>, domain: Domain, mapping: MembershipMapping) -> Self {
        Self {
            symptom: symptom.into(),
            domain,
            mapping,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.domain.min.is_finite()
            && self.domain.max.is_finite()
            && self.domain.min <= self.domain.max)
        {
            return Err(FuzzdxError::InvalidMapping {
                symptom: self.symptom.clone(),
                reason: format!(
                    "domain [{}, {}] is not a finite interval",
                    self.domain.min, self.domain.max
                ),
            });
        }
        self.mapping.validate(&self.symptom)
    }
}

/// Intuitionistic fuzzy query for one patient, ordered like the [`SymptomSet`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVector {
    membership: Array1<f64>,
    non_membership: Array1<f64>,
}

impl QueryVector {
    /// Build a query from independent membership and non-membership vectors
    ///
    /// `membership[i] + non_membership[i]` may be below 1; each component on
    /// its own must lie in [0, 1].
    pub fn new(membership: Vec<f64>, non_membership: Vec<f64>) -> Result<Self> {
        if membership.len() != non_membership.len() {
            return Err(FuzzdxError::InvalidQuery(format!(
                "membership has {} entries but non-membership has {}",
                membership.len(),
                non_membership.len()
            )));
        }
        if membership.is_empty() {
            return Err(FuzzdxError::InvalidQuery("query has no symptoms".to_string()));
        }
        check_unit(&membership, "membership")?;
        check_unit(&non_membership, "non-membership")?;

        Ok(Self {
            membership: Array1::from_vec(membership),
            non_membership: Array1::from_vec(non_membership),
        })
    }

    /// Query whose non-membership is the complement of `membership`
    pub fn complement(membership: Vec<f64>) -> Result<Self> {
        let non_membership = membership.iter().map(|m| 1.0 - m).collect();
        Self::new(membership, non_membership)
    }

    /// Number of symptoms
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    /// Always false for a constructed query
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Membership degrees per symptom
    pub fn membership(&self) -> ArrayView1<'_, f64> {
        self.membership.view()
    }

    /// Non-membership degrees per symptom
    pub fn non_membership(&self) -> ArrayView1<'_, f64> {
        self.non_membership.view()
    }
}

fn check_unit(values: &[f64], component: &str) -> Result<()> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        Some((i, v)) => Err(FuzzdxError::InvalidQuery(format!(
            "{component}[{i}] = {v} is outside [0, 1]"
        ))),
        None => Ok(()),
    }
}

/// Queries for N patients stacked as N×S matrices
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBatch {
    membership: Array2<f64>,
    non_membership: Array2<f64>,
}

impl QueryBatch {
    /// Stack query vectors; all must have the same length
    pub fn from_queries(queries: &[QueryVector]) -> Result<Self> {
        let Some(first) = queries.first() else {
            return Err(FuzzdxError::EmptyResult("query batch has no patients".to_string()));
        };
        let symptoms = first.len();

        let mut membership = Array2::zeros((queries.len(), symptoms));
        let mut non_membership = Array2::zeros((queries.len(), symptoms));
        for (k, query) in queries.iter().enumerate() {
            if query.len() != symptoms {
                return Err(FuzzdxError::InvalidQuery(format!(
                    "query {k} has {} symptoms, expected {symptoms}",
                    query.len()
                )));
            }
            membership.row_mut(k).assign(&query.membership);
            non_membership.row_mut(k).assign(&query.non_membership);
        }

        Ok(Self {
            membership,
            non_membership,
        })
    }

    /// Number of patients (N)
    pub fn patients(&self) -> usize {
        self.membership.nrows()
    }

    /// Number of symptoms (S)
    pub fn symptoms(&self) -> usize {
        self.membership.ncols()
    }

    /// N×S membership matrix
    pub fn membership(&self) -> &Array2<f64> {
        &self.membership
    }

    /// N×S non-membership matrix
    pub fn non_membership(&self) -> &Array2<f64> {
        &self.non_membership
    }
}

/// Symptom mappings aligned with a [`SymptomSet`]
#[derive(Debug, Clone)]
pub struct MappingTable {
    symptoms: SymptomSet,
    mappings: Vec<SymptomMapping>,
}

impl MappingTable {
    /// Validate mappings and align them with the canonical symptom order
    ///
    /// Every symptom needs exactly one mapping; mappings for unknown
    /// symptoms are a configuration error.
    pub fn new(symptoms: &SymptomSet, mappings: Vec<SymptomMapping>) -> Result<Self> {
        let mut slots: Vec<Option<SymptomMapping>> = vec![None; symptoms.len()];

        for mapping in mappings {
            mapping.validate()?;
            let index = symptoms.index_of(&mapping.symptom).ok_or_else(|| {
                FuzzdxError::configuration(format!(
                    "mapping given for unknown symptom '{}'",
                    mapping.symptom
                ))
            })?;
            if slots[index].is_some() {
                return Err(FuzzdxError::configuration(format!(
                    "symptom '{}' has more than one mapping",
                    mapping.symptom
                )));
            }
            slots[index] = Some(mapping);
        }

        let mappings = slots
            .into_iter()
            .zip(symptoms.iter())
            .map(|(slot, name)| {
                slot.ok_or_else(|| {
                    FuzzdxError::configuration(format!("symptom '{name}' has no mapping"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            symptoms: symptoms.clone(),
            mappings,
        })
    }

    /// Mapping descriptors of the reference configuration
    pub fn reference_mappings() -> Vec<SymptomMapping> {
        let severity_domain = Domain::new(0.0, 10.0);
        vec![
            SymptomMapping::new(
                "temperature",
                Domain::new(30.0, 45.0),
                MembershipMapping::reference_temperature(),
            ),
            SymptomMapping::new(
                "headache",
                severity_domain,
                MembershipMapping::reference_severity(),
            ),
            SymptomMapping::new(
                "cough",
                severity_domain,
                MembershipMapping::reference_severity(),
            ),
            SymptomMapping::new(
                "fatigue",
                severity_domain,
                MembershipMapping::reference_severity(),
            ),
            SymptomMapping::new(
                "sore_throat",
                severity_domain,
                MembershipMapping::reference_severity(),
            ),
        ]
    }

    /// Table for the reference symptom set
    pub fn reference() -> Result<Self> {
        Self::new(&SymptomSet::reference(), Self::reference_mappings())
    }

    /// Symptom set this table is aligned with
    pub fn symptoms(&self) -> &SymptomSet {
        &self.symptoms
    }

    /// Mappings in canonical symptom order
    pub fn mappings(&self) -> &[SymptomMapping] {
        &self.mappings
    }

    /// Map one patient to a query vector
    ///
    /// Rejects a wrong value count and values outside a mapping's domain;
    /// values are never truncated or padded.
    pub fn build_query(&self, patient: &PatientRecord) -> Result<QueryVector> {
        patient.check_arity(&self.symptoms)?;

        let mut membership = Vec::with_capacity(self.mappings.len());
        let mut non_membership = Vec::with_capacity(self.mappings.len());
        for (mapping, &value) in self.mappings.iter().zip(&patient.symptoms) {
            if !value.is_finite() {
                return Err(FuzzdxError::NonNumericSymptom {
                    symptom: mapping.symptom.clone(),
                    raw: value.to_string(),
                });
            }
            if !mapping.domain.contains(value) {
                return Err(FuzzdxError::OutOfDomain {
                    symptom: mapping.symptom.clone(),
                    value,
                    min: mapping.domain.min,
                    max: mapping.domain.max,
                });
            }
            let (m, n) = mapping.mapping.evaluate(value);
            membership.push(m);
            non_membership.push(n);
        }

        debug!(
            "Query for patient '{}': membership {:?}, non-membership {:?}",
            patient.id, membership, non_membership
        );
        QueryVector::new(membership, non_membership)
    }

    /// Map several patients to an N×S query batch
    pub fn build_batch(&self, patients: &[PatientRecord]) -> Result<QueryBatch> {
        if patients.is_empty() {
            return Err(FuzzdxError::EmptyResult("no patients to diagnose".to_string()));
        }
        let queries = patients
            .iter()
            .map(|patient| self.build_query(patient))
            .collect::<Result<Vec<_>>>()?;
        QueryBatch::from_queries(&queries)
    }
}
