//! Logging and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable level and format
//! - Metrics recording functions for the extraction pipeline
//!
//! Metrics go through the `metrics` facade. The library never installs a
//! recorder, so unless the embedding application does, recording is a no-op.

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::config::ObservabilityConfig;

/// Initialize structured logging with tracing and configuration
///
/// Pretty output in development (or when `log_format` is `pretty`), JSON
/// otherwise. `RUST_LOG` directives are honoured on top of the configured
/// crate level.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("measurement_extractor={}", config.log_level).parse()?);

    if config.is_development() || config.log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Record the outcome of resolving one unit phrase
pub fn record_resolution_metrics(accepted: bool, score: Option<u8>) {
    metrics::counter!(
        "measurement_pairs_total",
        "outcome" => if accepted { "accepted" } else { "dropped" }
    )
    .increment(1);
    if let Some(score) = score {
        metrics::histogram!("measurement_match_score").record(score as f64);
    }
}

/// Record one end-to-end pipeline run
pub fn record_pipeline_metrics(duration: std::time::Duration, text_length: usize, measurements: usize) {
    metrics::counter!("pipeline_runs_total").increment(1);
    metrics::histogram!("pipeline_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("pipeline_input_length_bytes").record(text_length as f64);
    metrics::histogram!("pipeline_measurements_per_run").record(measurements as f64);
}

/// Record the result of processing one image in a batch
pub fn record_batch_image_metrics(success: bool, duration: std::time::Duration) {
    metrics::counter!(
        "batch_images_total",
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
    metrics::histogram!("batch_image_duration_seconds").record(duration.as_secs_f64());
}
