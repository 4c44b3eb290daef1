//! # Measurement Vocabulary
//!
//! Static configuration tables for the measurement pipeline:
//!
//! - **Entity vocabulary**: which canonical units are valid for each measurable
//!   property (`width`, `item_weight`, `voltage`, ...)
//! - **Allowed units**: the flattened union of every entity's units, used as
//!   the target space for fuzzy unit resolution
//! - **Abbreviation table**: ordered short form → canonical unit rewrites
//!
//! The tables are loaded once (from JSON or the built-in defaults) and are
//! immutable afterwards, so they can be shared freely between threads.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit vocabulary file
pub const VOCABULARY_PATH_ENV: &str = "MEASUREMENT_VOCABULARY_PATH";

/// A single short form → canonical unit rewrite
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AbbreviationEntry {
    /// The abbreviation as it appears in recognized text (e.g. "cm", "fl oz")
    pub short: String,
    /// The canonical unit it expands to (e.g. "centimetre")
    pub full: String,
}

impl AbbreviationEntry {
    pub fn new(short: &str, full: &str) -> Self {
        Self {
            short: short.to_string(),
            full: full.to_string(),
        }
    }
}

/// Entity vocabulary and abbreviation table loaded from JSON
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeasurementVocabulary {
    /// Entity name → canonical units valid for that entity
    pub entity_units: BTreeMap<String, BTreeSet<String>>,
    /// Abbreviations, applied in this order
    pub abbreviations: Vec<AbbreviationEntry>,
}

impl Default for MeasurementVocabulary {
    fn default() -> Self {
        let length = ["centimetre", "foot", "inch", "metre", "millimetre", "yard"];
        let weight = [
            "gram",
            "kilogram",
            "microgram",
            "milligram",
            "ounce",
            "pound",
            "ton",
        ];
        let volume = [
            "centilitre",
            "cubic foot",
            "cubic inch",
            "cup",
            "decilitre",
            "fluid ounce",
            "gallon",
            "imperial gallon",
            "litre",
            "microlitre",
            "millilitre",
            "pint",
            "quart",
        ];

        let entities: [(&str, &[&str]); 8] = [
            ("width", &length[..]),
            ("depth", &length[..]),
            ("height", &length[..]),
            ("item_weight", &weight[..]),
            ("maximum_weight_recommendation", &weight[..]),
            ("voltage", &["kilovolt", "millivolt", "volt"][..]),
            ("wattage", &["kilowatt", "watt"][..]),
            ("item_volume", &volume[..]),
        ];

        let entity_units = entities
            .iter()
            .map(|(entity, units)| {
                (
                    entity.to_string(),
                    units.iter().map(|u| u.to_string()).collect(),
                )
            })
            .collect();

        // Multi-word forms go first so that "fl oz" is not split by the "oz"
        // pass and "imp gal" is not split by "gal". This order, and the metric
        // and electrical entries after "cm", deliberately differ from the
        // classic short-form table, which ran "oz" before "fl oz".
        let abbreviations = [
            ("cubic ft", "cubic foot"),
            ("cubic in", "cubic inch"),
            ("fl oz", "fluid ounce"),
            ("imp gal", "imperial gallon"),
            ("cm", "centimetre"),
            ("m", "metre"),
            ("mm", "millimetre"),
            ("kg", "kilogram"),
            ("g", "gram"),
            ("mg", "milligram"),
            ("mcg", "microgram"),
            ("l", "litre"),
            ("ml", "millilitre"),
            ("cl", "centilitre"),
            ("dl", "decilitre"),
            ("ft", "foot"),
            ("in", "inch"),
            ("yd", "yard"),
            ("oz", "ounce"),
            ("lb", "pound"),
            ("lbs", "pound"),
            ("v", "volt"),
            ("kv", "kilovolt"),
            ("mv", "millivolt"),
            ("kw", "kilowatt"),
            ("w", "watt"),
            ("gal", "gallon"),
            ("pt", "pint"),
            ("qt", "quart"),
        ]
        .iter()
        .map(|(short, full)| AbbreviationEntry::new(short, full))
        .collect();

        Self {
            entity_units,
            abbreviations,
        }
    }
}

impl MeasurementVocabulary {
    /// Validate the vocabulary tables
    ///
    /// Every abbreviation must expand to a unit that some entity allows, and
    /// no entity, unit, or abbreviation may be blank or contain control
    /// characters.
    pub fn validate(&self) -> AppResult<()> {
        if self.entity_units.is_empty() {
            return Err(AppError::Config(
                "entity_units cannot be empty".to_string(),
            ));
        }

        let check_text = |value: &str, context: &str| -> AppResult<()> {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} cannot be empty", context)));
            }
            if value.chars().any(|c| c.is_control()) {
                return Err(AppError::Config(format!(
                    "{} '{}' contains control characters",
                    context, value
                )));
            }
            Ok(())
        };

        for (entity, units) in &self.entity_units {
            check_text(entity, "entity name")?;
            if units.is_empty() {
                return Err(AppError::Config(format!(
                    "entity '{}' has no units",
                    entity
                )));
            }
            for unit in units {
                check_text(unit, &format!("unit of entity '{}'", entity))?;
            }
        }

        let allowed = self.allowed_units();
        for (i, entry) in self.abbreviations.iter().enumerate() {
            check_text(&entry.short, &format!("abbreviations[{}].short", i))?;
            if !allowed.contains(&entry.full) {
                return Err(AppError::Config(format!(
                    "abbreviations[{}] '{}' expands to '{}', which is not an allowed unit",
                    i, entry.short, entry.full
                )));
            }
        }

        Ok(())
    }

    /// Flatten the entity vocabulary into the fuzzy-match target space
    pub fn allowed_units(&self) -> AllowedUnits {
        AllowedUnits::new(self.entity_units.values().flatten().cloned())
    }

    /// Units valid for a single entity, if the entity is known
    pub fn units_for_entity(&self, entity: &str) -> Option<AllowedUnits> {
        self.entity_units
            .get(entity)
            .map(|units| AllowedUnits::new(units.iter().cloned()))
    }

    /// Known entity names, in sorted order
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entity_units.keys().map(String::as_str)
    }
}

/// Ordered, de-duplicated set of canonical units
///
/// Iteration order is longest unit first, then alphabetical. The order is
/// the resolver's tie-break: when `kilogram` and `gram` score the same
/// against a phrase, the longer unit is seen first and wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedUnits {
    units: Vec<String>,
}

impl AllowedUnits {
    pub fn new<I>(units: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let unique: BTreeSet<String> = units.into_iter().collect();
        let mut units: Vec<String> = unique.into_iter().collect();
        units.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        Self { units }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(String::as_str)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.units.iter().any(|u| u == unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Read and validate a vocabulary file
pub fn load_vocabulary_from_path(path: impl AsRef<Path>) -> AppResult<MeasurementVocabulary> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::FileSystem(format!(
            "failed to read vocabulary file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let vocabulary: MeasurementVocabulary = serde_json::from_str(&content)?;
    vocabulary.validate()?;
    debug!(
        path = %path.display(),
        entities = vocabulary.entity_units.len(),
        abbreviations = vocabulary.abbreviations.len(),
        "Parsed measurement vocabulary"
    );
    Ok(vocabulary)
}

/// Load the measurement vocabulary
///
/// Sources are tried in order:
/// 1. the file named by `MEASUREMENT_VOCABULARY_PATH`
/// 2. `config/measurement_vocabulary.json` (local development)
/// 3. `../config/measurement_vocabulary.json` (tests)
/// 4. the built-in default tables
///
/// A source that cannot be read or fails validation is logged and skipped.
pub fn load_vocabulary_config() -> MeasurementVocabulary {
    if let Ok(config_path) = std::env::var(VOCABULARY_PATH_ENV) {
        info!(
            "Loading measurement vocabulary from environment variable: {}",
            config_path
        );
        match load_vocabulary_from_path(&config_path) {
            Ok(vocabulary) => return vocabulary,
            Err(e) => warn!(
                "Failed to load measurement vocabulary from '{}': {}. Falling back to default paths.",
                config_path, e
            ),
        }
    }

    let possible_paths = [
        "config/measurement_vocabulary.json",
        "../config/measurement_vocabulary.json",
    ];

    for config_path in &possible_paths {
        if !Path::new(config_path).exists() {
            continue;
        }
        match load_vocabulary_from_path(config_path) {
            Ok(vocabulary) => {
                info!(
                    "Successfully loaded measurement vocabulary from fallback path: {}",
                    config_path
                );
                return vocabulary;
            }
            Err(e) => {
                warn!(
                    "Failed to load measurement vocabulary at '{}': {}. Trying next path.",
                    config_path, e
                );
            }
        }
    }

    info!("No measurement vocabulary file found, using built-in defaults");
    MeasurementVocabulary::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_is_valid() {
        assert!(MeasurementVocabulary::default().validate().is_ok());
    }

    #[test]
    fn test_allowed_units_are_deduplicated_and_ordered() {
        let allowed = MeasurementVocabulary::default().allowed_units();
        let units: Vec<&str> = allowed.iter().collect();

        assert_eq!(units[0], "imperial gallon");
        assert_eq!(units.iter().filter(|u| **u == "centimetre").count(), 1);

        let kilogram = units.iter().position(|u| *u == "kilogram").unwrap();
        let gram = units.iter().position(|u| *u == "gram").unwrap();
        assert!(kilogram < gram);
    }

    #[test]
    fn test_every_allowed_unit_belongs_to_an_entity() {
        let vocabulary = MeasurementVocabulary::default();
        for unit in vocabulary.allowed_units().iter() {
            assert!(vocabulary
                .entity_units
                .values()
                .any(|units| units.contains(unit)));
        }
    }

    #[test]
    fn test_abbreviation_outside_vocabulary_is_rejected() {
        let mut vocabulary = MeasurementVocabulary::default();
        vocabulary
            .abbreviations
            .push(AbbreviationEntry::new("hp", "horsepower"));

        let err = vocabulary.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("horsepower")));
    }

    #[test]
    fn test_entity_without_units_is_rejected() {
        let mut vocabulary = MeasurementVocabulary::default();
        vocabulary
            .entity_units
            .insert("luminosity".to_string(), BTreeSet::new());
        assert!(vocabulary.validate().is_err());
    }

    #[test]
    fn test_units_for_entity() {
        let vocabulary = MeasurementVocabulary::default();
        let voltage = vocabulary.units_for_entity("voltage").unwrap();
        assert_eq!(
            voltage.iter().collect::<Vec<_>>(),
            vec!["millivolt", "kilovolt", "volt"]
        );
        assert!(vocabulary.units_for_entity("colour").is_none());
    }
}
