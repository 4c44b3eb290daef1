//! # Measurement Pipeline
//!
//! Ties the stages together:
//!
//! ```text
//! raw text ─clean─▶ cleaned ─standardize─▶ standardized ─locate─▶ (number, phrase) pairs ─resolve─▶ "number unit"
//! ```
//!
//! A [`MeasurementPipeline`] owns its vocabulary, compiled abbreviation rules,
//! and match threshold. It holds no mutable state, so one instance can be
//! shared by reference across threads and used for any number of texts.

use crate::config::MatchingConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability::record_pipeline_metrics;
use crate::text_processing::{clean_text, locate_quantities, RawToken, UnitStandardizer};
use crate::unit_resolver::{NormalizedMeasurement, UnitResolver, DEFAULT_MATCH_THRESHOLD};
use crate::vocabulary::{AllowedUnits, MeasurementVocabulary};
use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info};

/// Every intermediate value of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineTrace {
    pub cleaned: String,
    pub standardized: String,
    /// Located `(number, unit phrase)` pairs, glued abbreviations expanded
    pub located: Vec<(String, String)>,
    pub measurements: Vec<String>,
}

/// Stateless measurement extraction pipeline
pub struct MeasurementPipeline {
    vocabulary: MeasurementVocabulary,
    allowed_units: AllowedUnits,
    standardizer: UnitStandardizer,
    threshold: u8,
}

impl MeasurementPipeline {
    /// Build a pipeline with the default match threshold
    pub fn new(vocabulary: MeasurementVocabulary) -> AppResult<Self> {
        Self::with_threshold(vocabulary, DEFAULT_MATCH_THRESHOLD)
    }

    /// Build a pipeline from matching settings
    pub fn from_config(vocabulary: MeasurementVocabulary, config: &MatchingConfig) -> AppResult<Self> {
        config.validate()?;
        Self::with_threshold(vocabulary, config.match_threshold)
    }

    /// Build a pipeline with an explicit match threshold
    ///
    /// The vocabulary is expected to have been validated when it was loaded;
    /// it is not re-checked here.
    pub fn with_threshold(vocabulary: MeasurementVocabulary, threshold: u8) -> AppResult<Self> {
        let standardizer = UnitStandardizer::new(&vocabulary.abbreviations).map_err(|e| {
            AppError::Config(format!("invalid abbreviation pattern: {}", e))
        })?;
        let allowed_units = vocabulary.allowed_units();

        info!(
            entities = vocabulary.entity_units.len(),
            allowed_units = allowed_units.len(),
            abbreviations = standardizer.rule_count(),
            threshold,
            "Created measurement pipeline"
        );

        Ok(Self {
            vocabulary,
            allowed_units,
            standardizer,
            threshold,
        })
    }

    pub fn vocabulary(&self) -> &MeasurementVocabulary {
        &self.vocabulary
    }

    pub fn allowed_units(&self) -> &AllowedUnits {
        &self.allowed_units
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Clean then standardize raw recognized text
    pub fn prepare(&self, raw_text: &str) -> String {
        self.standardizer.standardize(&clean_text(raw_text))
    }

    /// Locate pairs in prepared text and expand abbreviations glued to their number
    fn locate<'t>(&'t self, prepared: &'t str) -> Vec<(&'t str, Cow<'t, str>)> {
        locate_quantities(prepared)
            .map(|token| (token.number, self.standardizer.expand_leading(token.unit_phrase)))
            .collect()
    }

    fn run(&self, raw_text: &str, allowed: &AllowedUnits) -> Vec<NormalizedMeasurement> {
        let start_time = Instant::now();
        let prepared = self.prepare(raw_text);
        let located = self.locate(&prepared);
        let resolver = UnitResolver::with_threshold(allowed, self.threshold);
        let measurements = resolver.resolve_detailed(
            located
                .iter()
                .map(|(number, phrase)| RawToken::new(number, phrase)),
        );

        debug!(
            text_length = raw_text.len(),
            measurements = measurements.len(),
            "Extracted measurements from text"
        );
        record_pipeline_metrics(start_time.elapsed(), raw_text.len(), measurements.len());
        measurements
    }

    /// Extract measurements with their match scores
    pub fn extract(&self, raw_text: &str) -> Vec<NormalizedMeasurement> {
        self.run(raw_text, &self.allowed_units)
    }

    /// Extract `"<number> <unit>"` strings from raw recognized text
    ///
    /// # Examples
    ///
    /// ```rust
    /// use measurement_extractor::{MeasurementPipeline, MeasurementVocabulary};
    ///
    /// let pipeline = MeasurementPipeline::new(MeasurementVocabulary::default())?;
    /// assert_eq!(pipeline.normalize("Weight: 5 kg approx"), vec!["5 kilogram"]);
    /// # Ok::<(), measurement_extractor::errors::AppError>(())
    /// ```
    pub fn normalize(&self, raw_text: &str) -> Vec<String> {
        self.extract(raw_text)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Like [`normalize`](Self::normalize), but only units valid for `entity` are candidates
    pub fn normalize_for_entity(&self, raw_text: &str, entity: &str) -> AppResult<Vec<String>> {
        let allowed = self.vocabulary.units_for_entity(entity).ok_or_else(|| {
            let err = AppError::Validation(format!("unknown entity '{}'", entity));
            error_logging::log_validation_error(&err, "normalize_for_entity", "entity", Some(entity));
            err
        })?;
        Ok(self
            .run(raw_text, &allowed)
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Normalize many texts in parallel; output order matches input order
    pub fn normalize_batch<S>(&self, texts: &[S]) -> Vec<Vec<String>>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.normalize(text.as_ref()))
            .collect()
    }

    /// Run the pipeline and keep every intermediate stage
    pub fn trace(&self, raw_text: &str) -> PipelineTrace {
        let cleaned = clean_text(raw_text);
        let standardized = self.standardizer.standardize(&cleaned);
        let tokens = self.locate(&standardized);
        let resolver = UnitResolver::with_threshold(&self.allowed_units, self.threshold);
        let measurements = resolver.resolve(
            tokens
                .iter()
                .map(|(number, phrase)| RawToken::new(number, phrase)),
        );
        let located = tokens
            .into_iter()
            .map(|(number, phrase)| (number.to_string(), phrase.into_owned()))
            .collect();

        PipelineTrace {
            cleaned,
            standardized,
            located,
            measurements,
        }
    }
}
