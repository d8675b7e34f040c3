//! Score of reliability (SR) and diagnosis ranking
//!
//! ```text
//! hesitation = max(0, 1 - (T_mem + T_non))
//! SR         = T_mem - T_non + hesitation * (1 - |T_mem - T_non|)
//! ```
//!
//! Scores stay at full precision; rounding is only applied when a score is
//! presented.

use crate::composition::Composed;
use crate::error::{FuzzdxError, Result};
use crate::vocabulary::DiagnosisSet;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// Default number of decimals used for presentation
pub const DEFAULT_DISPLAY_PRECISION: u32 = 2;

/// Hesitation margin, clamped to be non-negative
pub fn hesitation(membership: f64, non_membership: f64) -> f64 {
    (1.0 - (membership + non_membership)).max(0.0)
}

/// Score of reliability in [-1, 1]
pub fn score_of_reliability(membership: f64, non_membership: f64) -> f64 {
    let net = membership - non_membership;
    net + hesitation(membership, non_membership) * (1.0 - net.abs())
}

/// SR for every diagnosis of a composed result
pub fn score(composed: &Composed) -> Array1<f64> {
    let scores: Array1<f64> = composed
        .membership()
        .iter()
        .zip(composed.non_membership().iter())
        .map(|(&m, &n)| score_of_reliability(m, n))
        .collect();
    debug!("SR values: {:?}", scores);
    scores
}

/// Most decimals rounding will honour; f64 carries no more than this
pub const MAX_DISPLAY_PRECISION: u32 = 15;

/// Round to a fixed number of decimals, at most [`MAX_DISPLAY_PRECISION`]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DISPLAY_PRECISION) as i32);
    (value * factor).round() / factor
}

/// Composed evidence and score for one diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisScore {
    /// Diagnosis label
    pub diagnosis: String,
    /// Canonical position of the diagnosis
    pub index: usize,
    /// Composed membership
    pub membership: f64,
    /// Composed non-membership
    pub non_membership: f64,
    /// Hesitation margin
    pub hesitation: f64,
    /// Score of reliability
    pub score: f64,
}

impl DiagnosisScore {
    /// Copy with membership, non-membership, hesitation and score rounded
    pub fn presented(&self, decimals: u32) -> DiagnosisScore {
        DiagnosisScore {
            diagnosis: self.diagnosis.clone(),
            index: self.index,
            membership: round_to(self.membership, decimals),
            non_membership: round_to(self.non_membership, decimals),
            hesitation: round_to(self.hesitation, decimals),
            score: round_to(self.score, decimals),
        }
    }

    /// Descending score, then ascending canonical position
    pub fn ranking_order(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl fmt::Display for DiagnosisScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(DEFAULT_DISPLAY_PRECISION as usize);
        write!(
            f,
            "{}: membership={:.p$}, non_membership={:.p$}, SR={:.p$}",
            self.diagnosis,
            self.membership,
            self.non_membership,
            self.score,
            p = precision
        )
    }
}

/// Rank diagnoses by descending SR
///
/// Ties are broken by the canonical order of `diagnoses`, independent of the
/// order in which scores were computed.
pub fn rank(
    diagnoses: &DiagnosisSet,
    composed: &Composed,
    scores: &Array1<f64>,
) -> Result<Vec<DiagnosisScore>> {
    if composed.is_empty() || diagnoses.is_empty() {
        return Err(FuzzdxError::EmptyResult("no diagnoses to rank".to_string()));
    }
    if composed.len() != diagnoses.len() || scores.len() != diagnoses.len() {
        return Err(FuzzdxError::ShapeMismatch {
            matrix: "scores",
            expected: (1, diagnoses.len()),
            got: (1, composed.len().min(scores.len())),
        });
    }

    let mut ranking: Vec<DiagnosisScore> = diagnoses
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let membership = composed.membership()[index];
            let non_membership = composed.non_membership()[index];
            DiagnosisScore {
                diagnosis: label.to_string(),
                index,
                membership,
                non_membership,
                hesitation: hesitation(membership, non_membership),
                score: scores[index],
            }
        })
        .collect();

    ranking.sort_by(DiagnosisScore::ranking_order);
    debug!(
        "Ranking: {:?}",
        ranking
            .iter()
            .map(|s| (s.diagnosis.as_str(), s.score))
            .collect::<Vec<_>>()
    );
    Ok(ranking)
}
