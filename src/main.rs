use anyhow::Result;
use measurement_extractor::batch::{BatchProcessor, BatchSummary, SidecarTextSource};
use measurement_extractor::config::AppConfig;
use measurement_extractor::errors::error_logging;
use measurement_extractor::evaluation::{evaluate_batch, EvaluationSummary, GroundTruth};
use measurement_extractor::observability;
use measurement_extractor::vocabulary::{load_vocabulary_config, load_vocabulary_from_path};
use measurement_extractor::MeasurementPipeline;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

/// Build the pipeline from environment configuration
fn build_pipeline(config: &AppConfig) -> Result<MeasurementPipeline> {
    // An explicitly configured vocabulary must load; otherwise fall back through the default paths
    let vocabulary = match &config.matching.vocabulary_path {
        Some(path) => load_vocabulary_from_path(path).map_err(|e| {
            error_logging::log_config_error(&e, "MEASUREMENT_VOCABULARY_PATH", "load_vocabulary");
            anyhow::anyhow!("Failed to load vocabulary from {}: {}", path.display(), e)
        })?,
        None => load_vocabulary_config(),
    };

    MeasurementPipeline::from_config(vocabulary, &config.matching)
        .map_err(|e| anyhow::anyhow!("Failed to build measurement pipeline: {}", e))
}

/// Normalize each stdin line and print the measurements as a JSON array
fn run_stdin(pipeline: &MeasurementPipeline) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let measurements = pipeline.normalize(&line);
        writeln!(out, "{}", serde_json::to_string(&measurements)?)?;
    }
    Ok(())
}

/// Final line of folder mode output
#[derive(Serialize)]
struct RunSummary {
    #[serde(flatten)]
    batch: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<EvaluationSummary>,
}

/// Process an image folder, optionally scoring it against a ground-truth CSV
fn run_folder(
    pipeline: &MeasurementPipeline,
    folder: PathBuf,
    ground_truth: Option<PathBuf>,
) -> Result<()> {
    let source = SidecarTextSource;
    let processor = BatchProcessor::new(pipeline, &source);
    let reports = processor.process_folder(&folder)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let evaluation = match ground_truth {
        Some(csv_path) => {
            let truth = GroundTruth::from_path(&csv_path)?;
            let (evaluations, summary) = evaluate_batch(&reports, &truth);
            for evaluation in &evaluations {
                writeln!(out, "{}", serde_json::to_string(evaluation)?)?;
            }
            Some(summary)
        }
        None => {
            for report in &reports {
                writeln!(out, "{}", serde_json::to_string(report)?)?;
            }
            None
        }
    };

    let summary = RunSummary {
        batch: BatchSummary::from_reports(&reports),
        evaluation,
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    observability::init_tracing(&config.observability)?;

    let pipeline = build_pipeline(&config)?;

    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(folder) => {
            let ground_truth = args.next().map(PathBuf::from);
            info!(folder = %folder, ground_truth = ?ground_truth, "Processing image folder");
            run_folder(&pipeline, PathBuf::from(folder), ground_truth)
        }
        None => {
            info!("Reading recognized text from stdin");
            run_stdin(&pipeline)
        }
    }
}
