//! # Unit Resolver
//!
//! Maps loosely spelled unit phrases onto the controlled unit vocabulary.
//!
//! Every phrase is scored against every allowed unit with
//! [`weighted_ratio`](crate::similarity::weighted_ratio). The best candidate
//! is kept only when its score is strictly above the configured threshold;
//! anything else is dropped silently. Dropping is a normal outcome, not an
//! error: a missing measurement is preferred over a wrong one.

use crate::observability::record_resolution_metrics;
use crate::similarity::weighted_ratio;
use crate::text_processing::RawToken;
use crate::vocabulary::AllowedUnits;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Default minimum score; a match must score strictly above it
pub const DEFAULT_MATCH_THRESHOLD: u8 = 70;

/// Best vocabulary candidate for a unit phrase, before thresholding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMatch<'a> {
    pub unit: &'a str,
    pub score: u8,
}

/// A number paired with a canonical unit
///
/// Displays as `"<number> <unit>"`, the pipeline's output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMeasurement {
    /// The numeric literal exactly as it appeared in the text
    pub value: String,
    /// Canonical unit from the allowed vocabulary
    pub unit: String,
    /// Similarity score that accepted the unit (0-100)
    pub score: u8,
}

impl fmt::Display for NormalizedMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Fuzzy resolver over a fixed unit vocabulary
#[derive(Debug, Clone)]
pub struct UnitResolver<'v> {
    allowed: &'v AllowedUnits,
    threshold: u8,
}

impl<'v> UnitResolver<'v> {
    pub fn new(allowed: &'v AllowedUnits) -> Self {
        Self::with_threshold(allowed, DEFAULT_MATCH_THRESHOLD)
    }

    pub fn with_threshold(allowed: &'v AllowedUnits, threshold: u8) -> Self {
        Self { allowed, threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Highest-scoring allowed unit for `phrase`
    ///
    /// Ties keep the candidate that comes first in the vocabulary order.
    /// Returns `None` only when the vocabulary is empty.
    pub fn best_match(&self, phrase: &str) -> Option<UnitMatch<'v>> {
        let phrase = phrase.trim();
        let mut best: Option<UnitMatch<'v>> = None;

        for unit in self.allowed.iter() {
            let score = weighted_ratio(phrase, unit);
            trace!(phrase = %phrase, candidate = %unit, score, "Scored unit candidate");
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(UnitMatch { unit, score });
                if score == 100 {
                    break;
                }
            }
        }

        best
    }

    /// Resolve a single phrase, applying the threshold
    pub fn resolve_phrase(&self, phrase: &str) -> Option<UnitMatch<'v>> {
        self.best_match(phrase)
            .filter(|candidate| candidate.score > self.threshold)
    }

    /// Resolve every pair, keeping input order and omitting rejected pairs
    pub fn resolve_detailed<'t, I>(&self, pairs: I) -> Vec<NormalizedMeasurement>
    where
        I: IntoIterator<Item = RawToken<'t>>,
    {
        let mut results = Vec::new();
        let mut dropped = 0usize;

        for pair in pairs {
            match self.resolve_phrase(pair.unit_phrase) {
                Some(candidate) => {
                    debug!(
                        number = %pair.number,
                        phrase = %pair.unit_phrase.trim(),
                        unit = %candidate.unit,
                        score = candidate.score,
                        "Resolved unit phrase"
                    );
                    record_resolution_metrics(true, Some(candidate.score));
                    results.push(NormalizedMeasurement {
                        value: pair.number.to_string(),
                        unit: candidate.unit.to_string(),
                        score: candidate.score,
                    });
                }
                None => {
                    debug!(
                        number = %pair.number,
                        phrase = %pair.unit_phrase.trim(),
                        threshold = self.threshold,
                        "Dropped unit phrase below threshold"
                    );
                    record_resolution_metrics(false, None);
                    dropped += 1;
                }
            }
        }

        trace!(
            accepted = results.len(),
            dropped,
            "Finished resolving unit phrases"
        );
        results
    }

    /// Resolve every pair into `"<number> <unit>"` strings
    pub fn resolve<'t, I>(&self, pairs: I) -> Vec<String>
    where
        I: IntoIterator<Item = RawToken<'t>>,
    {
        self.resolve_detailed(pairs)
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}
