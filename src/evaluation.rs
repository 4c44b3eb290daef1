//! # Ground-Truth Evaluation
//!
//! Compares batch results against a labelled CSV of the form
//!
//! ```text
//! image_link,group_id,entity_name,entity_value
//! https://host/images/41a1b2.jpg,101,item_weight,500.0 gram
//! ```
//!
//! Images are matched to rows by the basename of `image_link`. A prediction
//! counts as exact when its unit equals the labelled unit and the two numbers
//! are numerically equal, so `500 gram` matches `500.0 gram`.

use crate::batch::ImageReport;
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// One labelled row of the ground-truth CSV
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroundTruthRecord {
    pub image_link: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    pub entity_value: String,
}

impl GroundTruthRecord {
    /// File name portion of `image_link`
    pub fn image_key(&self) -> &str {
        self.image_link
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.image_link)
    }
}

/// Labelled values keyed by image file name
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    records: HashMap<String, GroundTruthRecord>,
}

impl GroundTruth {
    /// Parse ground truth from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = HashMap::new();
        for row in csv_reader.deserialize() {
            let record: GroundTruthRecord = row?;
            let key = record.image_key().to_string();
            if records.contains_key(&key) {
                warn!("Duplicate ground-truth row for image '{}', keeping the last", key);
            }
            records.insert(key, record);
        }

        debug!("Loaded {} ground-truth records", records.len());
        Ok(Self { records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn get(&self, image_file: &str) -> Option<&GroundTruthRecord> {
        self.records.get(image_file)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How a single image's predictions compare with its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Exact,
    Mismatch,
    NoPrediction,
    MissingGroundTruth,
}

/// Per-image evaluation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEvaluation {
    pub file_name: String,
    pub predicted: Vec<String>,
    pub actual: Option<String>,
    pub outcome: EvaluationOutcome,
    /// Carried over from the image report when no text was obtained
    pub error: Option<String>,
}

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub exact: usize,
    pub mismatch: usize,
    pub no_prediction: usize,
    pub missing_ground_truth: usize,
}

impl EvaluationSummary {
    fn add(&mut self, outcome: EvaluationOutcome) {
        self.total += 1;
        match outcome {
            EvaluationOutcome::Exact => self.exact += 1,
            EvaluationOutcome::Mismatch => self.mismatch += 1,
            EvaluationOutcome::NoPrediction => self.no_prediction += 1,
            EvaluationOutcome::MissingGroundTruth => self.missing_ground_truth += 1,
        }
    }

    /// Share of labelled images with an exact prediction (0.0 when nothing is labelled)
    pub fn accuracy(&self) -> f64 {
        let labelled = self.total - self.missing_ground_truth;
        if labelled == 0 {
            0.0
        } else {
            self.exact as f64 / labelled as f64
        }
    }
}

fn split_measurement(value: &str) -> Option<(f64, &str)> {
    let (number, unit) = value.trim().split_once(' ')?;
    let number: f64 = number.parse().ok()?;
    Some((number, unit.trim()))
}

/// Whether a `"<number> <unit>"` prediction equals a labelled value
pub fn values_match(predicted: &str, actual: &str) -> bool {
    match (split_measurement(predicted), split_measurement(actual)) {
        (Some((p_num, p_unit)), Some((a_num, a_unit))) => {
            p_unit == a_unit && (p_num - a_num).abs() < 1e-9
        }
        _ => predicted.trim() == actual.trim(),
    }
}

/// Classify one image report against the ground truth
pub fn evaluate_report(report: &ImageReport, truth: &GroundTruth) -> ImageEvaluation {
    let actual = truth.get(&report.file_name).map(|r| r.entity_value.clone());

    let outcome = match &actual {
        None => EvaluationOutcome::MissingGroundTruth,
        Some(_) if report.measurements.is_empty() => EvaluationOutcome::NoPrediction,
        Some(value) if report.measurements.iter().any(|p| values_match(p, value)) => {
            EvaluationOutcome::Exact
        }
        Some(_) => EvaluationOutcome::Mismatch,
    };

    ImageEvaluation {
        file_name: report.file_name.clone(),
        predicted: report.measurements.clone(),
        actual,
        outcome,
        error: report.error.clone(),
    }
}

/// Evaluate a whole batch
pub fn evaluate_batch(
    reports: &[ImageReport],
    truth: &GroundTruth,
) -> (Vec<ImageEvaluation>, EvaluationSummary) {
    let mut summary = EvaluationSummary::default();
    let evaluations: Vec<ImageEvaluation> = reports
        .iter()
        .map(|report| {
            let evaluation = evaluate_report(report, truth);
            summary.add(evaluation.outcome);
            evaluation
        })
        .collect();

    info!(
        total = summary.total,
        exact = summary.exact,
        accuracy = summary.accuracy(),
        "Evaluated batch against ground truth"
    );
    (evaluations, summary)
}
