//! # Measurement Extractor
//!
//! Extracts physical measurements ("12.5 centimetre", "5 kilogram") from
//! noisy text recognized in product images. Raw text is cleaned, unit
//! abbreviations are expanded, number/unit pairs are located, and each unit
//! phrase is fuzzily resolved against a controlled unit vocabulary.

pub mod batch;
pub mod config;
pub mod errors;
pub mod evaluation;
pub mod observability;
pub mod pipeline;
pub mod similarity;
pub mod text_processing;
pub mod unit_resolver;
pub mod vocabulary;

// Re-export types for easier access
pub use pipeline::{MeasurementPipeline, PipelineTrace};
pub use text_processing::{clean_text, locate_quantities, RawToken, UnitStandardizer};
pub use unit_resolver::{NormalizedMeasurement, UnitResolver};
pub use vocabulary::{AbbreviationEntry, AllowedUnits, MeasurementVocabulary};
