//! # Application Configuration
//!
//! Centralized runtime settings loaded from environment variables (a `.env`
//! file is honoured via `dotenvy`). The vocabulary tables themselves live in
//! [`crate::vocabulary`]; this module only carries where to find them and how
//! strictly to match against them.

use crate::errors::{AppError, AppResult};
use crate::unit_resolver::DEFAULT_MATCH_THRESHOLD;
use crate::vocabulary::VOCABULARY_PATH_ENV;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Pipeline matching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// A unit match must score strictly above this value (0-100)
    pub match_threshold: u8,
    /// Explicit vocabulary file, if any
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            vocabulary_path: None,
        }
    }
}

impl MatchingConfig {
    /// Validate matching configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.match_threshold >= 100 {
            return Err(AppError::Config(format!(
                "match_threshold must be below 100 (got {}), otherwise nothing can match",
                self.match_threshold
            )));
        }

        if let Some(path) = &self.vocabulary_path {
            if path.as_os_str().is_empty() {
                return Err(AppError::Config(
                    "vocabulary_path cannot be empty if provided".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Logging configuration for different environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for this crate
    pub log_level: String,
    /// Output format: "pretty" or "json"
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }

        if self.log_format != "pretty" && self.log_format != "json" {
            return Err(AppError::Config(format!(
                "Invalid log format: {} (expected 'pretty' or 'json')",
                self.log_format
            )));
        }

        Ok(())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `MATCH_THRESHOLD`, `MEASUREMENT_VOCABULARY_PATH`, `ENVIRONMENT`,
    /// `LOG_LEVEL` and `LOG_FORMAT`. Missing variables take their defaults;
    /// malformed numbers are configuration errors.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let match_threshold = match env::var("MATCH_THRESHOLD") {
            Ok(raw) => raw.trim().parse::<u8>().map_err(|_| {
                AppError::Config(format!(
                    "MATCH_THRESHOLD must be an integer between 0 and 99, got '{}'",
                    raw
                ))
            })?,
            Err(_) => defaults.matching.match_threshold,
        };

        let config = Self {
            matching: MatchingConfig {
                match_threshold,
                vocabulary_path: env::var(VOCABULARY_PATH_ENV).ok().map(PathBuf::from),
            },
            observability: ObservabilityConfig {
                environment: env::var("ENVIRONMENT")
                    .unwrap_or(defaults.observability.environment),
                log_level: env::var("LOG_LEVEL").unwrap_or(defaults.observability.log_level),
                log_format: env::var("LOG_FORMAT").unwrap_or(defaults.observability.log_format),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.matching.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.match_threshold, 70);
    }

    #[test]
    fn test_threshold_of_100_is_rejected() {
        let config = MatchingConfig {
            match_threshold: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_log_settings_are_rejected() {
        let mut config = ObservabilityConfig::default();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = ObservabilityConfig::default();
        config.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_helpers() {
        let mut config = ObservabilityConfig::default();
        assert!(config.is_development());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
