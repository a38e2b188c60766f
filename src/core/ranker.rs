use std::cmp::Ordering;
use std::num::NonZeroUsize;

use crate::models::{SchoolCatalog, SchoolRecord};

/// A school paired with the score it received for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub school: SchoolRecord,
    pub score: f64,
}

/// Ordered top-N schools for one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecommendationResult {
    pub candidates: Vec<ScoredCandidate>,
    /// Catalog entries that were scored
    pub considered: usize,
    /// Entries dropped because their score was undefined
    pub excluded: usize,
}

impl RecommendationResult {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Rank catalog entries by score.
///
/// Non-finite scores are excluded and counted. Remaining entries are
/// ordered by descending score, ties broken by ascending school id, then
/// truncated to `n`. Fewer than `n` valid entries is not an error.
///
/// `scores` must line up with `catalog`; extra entries on either side are
/// ignored.
pub fn rank(scores: &[f64], catalog: &SchoolCatalog, n: NonZeroUsize) -> RecommendationResult {
    let schools = catalog.as_slice();
    let considered = schools.len().min(scores.len());

    let mut valid: Vec<(usize, f64)> = scores
        .iter()
        .take(considered)
        .copied()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .collect();

    let excluded = considered - valid.len();

    // All scores are finite here; 0.0 and -0.0 compare equal and fall
    // through to the id.
    valid.sort_by(|(a_idx, a_score), (b_idx, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| schools[*a_idx].id.cmp(&schools[*b_idx].id))
    });

    valid.truncate(n.get());

    let candidates = valid
        .into_iter()
        .map(|(idx, score)| ScoredCandidate {
            school: schools[idx].clone(),
            score,
        })
        .collect();

    RecommendationResult {
        candidates,
        considered,
        excluded,
    }
}
