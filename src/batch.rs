//! # Batch Processing
//!
//! Runs the measurement pipeline over a folder of product images.
//!
//! Text recognition itself happens outside this crate. The [`TextSource`]
//! trait is the seam where recognized text comes in; [`SidecarTextSource`]
//! reads the text an external OCR engine left next to each image
//! (`photo.jpg` → `photo.txt`).
//!
//! Images are processed in parallel with rayon. A failure to obtain text for
//! one image is logged and recorded in that image's report; the rest of the
//! batch carries on.

use crate::errors::{error_logging, AppError, AppResult};
use crate::observability::record_batch_image_metrics;
use crate::pipeline::MeasurementPipeline;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Image file extensions picked up by [`list_images`]
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Source of recognized text for an image
pub trait TextSource: Sync {
    /// Return the raw recognized text for `image`; may be empty
    fn recognize(&self, image: &Path) -> AppResult<String>;
}

/// Reads pre-computed OCR output from a `.txt` file beside each image
#[derive(Debug, Clone, Default)]
pub struct SidecarTextSource;

impl SidecarTextSource {
    pub fn sidecar_path(image: &Path) -> PathBuf {
        image.with_extension("txt")
    }
}

impl TextSource for SidecarTextSource {
    fn recognize(&self, image: &Path) -> AppResult<String> {
        let path = Self::sidecar_path(image);
        fs::read_to_string(&path).map_err(|e| {
            AppError::Ocr(format!(
                "no recognized text for '{}' at '{}': {}",
                image.display(),
                path.display(),
                e
            ))
        })
    }
}

/// Outcome of processing a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub file_name: String,
    pub measurements: Vec<String>,
    /// Set when no text could be obtained for the image
    pub error: Option<String>,
}

impl ImageReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Image and failure counts for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub images: usize,
    pub failures: usize,
    /// Images with at least one extracted measurement
    pub with_measurements: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ImageReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.images += 1;
            if !report.is_success() {
                summary.failures += 1;
            }
            if !report.measurements.is_empty() {
                summary.with_measurements += 1;
            }
            summary
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List image files directly inside `dir`, sorted by file name
pub fn list_images(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        error_logging::log_filesystem_error(
            &e,
            "list_images",
            Some(&dir.display().to_string()),
            None,
        );
        AppError::FileSystem(format!("failed to read directory '{}': {}", dir.display(), e))
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            images.push(path);
        }
    }
    images.sort();

    debug!("Found {} images in {}", images.len(), dir.display());
    Ok(images)
}

/// Drives the pipeline over many images
pub struct BatchProcessor<'a, S: TextSource> {
    pipeline: &'a MeasurementPipeline,
    source: &'a S,
}

impl<'a, S: TextSource> BatchProcessor<'a, S> {
    pub fn new(pipeline: &'a MeasurementPipeline, source: &'a S) -> Self {
        Self { pipeline, source }
    }

    /// Recognize and normalize one image
    pub fn process_image(&self, image: &Path) -> ImageReport {
        let start_time = Instant::now();
        let file_name = image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.display().to_string());

        let report = match self.source.recognize(image) {
            Ok(text) => ImageReport {
                measurements: self.pipeline.normalize(&text),
                file_name,
                error: None,
            },
            Err(e) => {
                error_logging::log_ocr_error(
                    &e,
                    "recognize",
                    Some(&image.display().to_string()),
                    Some(start_time.elapsed()),
                );
                ImageReport {
                    file_name,
                    measurements: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };

        record_batch_image_metrics(report.is_success(), start_time.elapsed());
        report
    }

    /// Process every image in `dir`; reports follow [`list_images`] order
    pub fn process_folder(&self, dir: &Path) -> AppResult<Vec<ImageReport>> {
        let images = list_images(dir)?;
        if images.is_empty() {
            warn!("No images found in {}", dir.display());
        }

        let reports: Vec<ImageReport> = images
            .par_iter()
            .map(|image| self.process_image(image))
            .collect();

        let summary = BatchSummary::from_reports(&reports);
        info!(
            directory = %dir.display(),
            images = summary.images,
            failures = summary.failures,
            "Processed image folder"
        );
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_filter() {
        assert!(has_image_extension(Path::new("a/photo.JPG")));
        assert!(has_image_extension(Path::new("photo.jpeg")));
        assert!(has_image_extension(Path::new("photo.png")));
        assert!(!has_image_extension(Path::new("photo.txt")));
        assert!(!has_image_extension(Path::new("photo")));
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            SidecarTextSource::sidecar_path(Path::new("/data/item.jpg")),
            PathBuf::from("/data/item.txt")
        );
    }
}
