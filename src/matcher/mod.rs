//! Dataset matcher.
//!
//! Finds the dataset question closest to a free-text query and hands back its
//! answer when the similarity clears a threshold. Every operation is a pure
//! function of the query and a borrowed, immutable slice of records.

pub mod fuzz;


use thiserror::Error;
use tracing::debug;

use crate::dataset::QaRecord;

pub use fuzz::{full_process, ratio, token_set_ratio};

/// Minimum score for a dataset answer to be surfaced.
pub const DEFAULT_THRESHOLD: u8 = 70;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    #[error("Dataset contains no records")]
    EmptyDataset,
    #[error("Query is empty or blank")]
    InvalidQuery,
}

/// Score of one dataset record against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// Position of the record in dataset order.
    pub index: usize,
    /// Token-set similarity, `0..=100`.
    pub score: u8,
}

/// Outcome of a thresholded lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice<'a> {
    Expert { answer: &'a str, matched: MatchResult },
    NoMatch { best: MatchResult },
}

impl<'a> Advice<'a> {
    #[inline]
    pub fn answer(&self) -> Option<&'a str> {
        match self {
            Self::Expert { answer, .. } => Some(*answer),
            Self::NoMatch { .. } => None,
        }
    }

    /// The best-scoring record, whether or not it cleared the threshold.
    #[inline]
    pub fn best(&self) -> MatchResult {
        match self {
            Self::Expert { matched, .. } => *matched,
            Self::NoMatch { best } => *best,
        }
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Expert { .. })
    }
}

/// Look up the answer to `query`, returning it only if the best score is at
/// least `threshold`. Ties go to the earliest record.
#[inline]
pub fn find_best_answer<'a>(
    query: &str,
    records: &'a [QaRecord],
    threshold: u8,
) -> Result<Advice<'a>, MatchError> {
    let best = best_match(query, records)?;

    debug!(
        "Best dataset match: record {} with score {} (threshold {})",
        best.index, best.score, threshold
    );

    if best.score < threshold {
        return Ok(Advice::NoMatch { best });
    }

    let answer = records
        .get(best.index)
        .map(|record| record.answer.as_str())
        .ok_or(MatchError::EmptyDataset)?;

    Ok(Advice::Expert {
        answer,
        matched: best,
    })
}

/// Highest-scoring record for `query`. The first record wins a tie.
#[inline]
pub fn best_match(query: &str, records: &[QaRecord]) -> Result<MatchResult, MatchError> {
    validate(query, records)?;

    scores(query, records)
        .reduce(|best, candidate| {
            if candidate.score > best.score {
                candidate
            } else {
                best
            }
        })
        .ok_or(MatchError::EmptyDataset)
}

/// The `k` highest-scoring records, best first. Equal scores keep dataset
/// order.
#[inline]
pub fn top_matches(
    query: &str,
    records: &[QaRecord],
    k: usize,
) -> Result<Vec<MatchResult>, MatchError> {
    validate(query, records)?;

    let mut ranked: Vec<MatchResult> = scores(query, records).collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(k);

    Ok(ranked)
}

fn scores<'q>(
    query: &'q str,
    records: &'q [QaRecord],
) -> impl Iterator<Item = MatchResult> + 'q {
    records
        .iter()
        .enumerate()
        .map(move |(index, record)| MatchResult {
            index,
            score: token_set_ratio(query, &record.question),
        })
}

fn validate(query: &str, records: &[QaRecord]) -> Result<(), MatchError> {
    if records.is_empty() {
        return Err(MatchError::EmptyDataset);
    }
    if query.trim().is_empty() {
        return Err(MatchError::InvalidQuery);
    }
    Ok(())
}
