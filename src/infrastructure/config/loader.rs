use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".taxonomist";

/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "TAXONOMIST_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Invalid wave_width: {0}. Must be at least 1")]
    InvalidWaveWidth(usize),

    #[error("Invalid min_split_size: {0}. Must be at least 2")]
    InvalidMinSplitSize(usize),

    #[error("Invalid default_confidence: {0}. Must be between 0.0 and 1.0")]
    InvalidConfidence(f64),

    #[error("Invalid {phase} max attempts: {value}. Cannot be 0")]
    InvalidMaxAttempts { phase: &'static str, value: u32 },

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid cache max_entries: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    #[error("Invalid requests_per_second: {0}. Must be at least 1")]
    InvalidRateLimit(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: minutely, hourly, daily, never")]
    InvalidRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .taxonomist/config.yaml (project config)
    /// 3. .taxonomist/local.yaml (local overrides, optional)
    /// 4. Environment variables (TAXONOMIST_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with `root` in place of the working directory.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment overrides still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let classification = &config.classification;
        if classification.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(classification.batch_size));
        }
        if classification.wave_width == 0 {
            return Err(ConfigError::InvalidWaveWidth(classification.wave_width));
        }
        if classification.min_split_size < 2 {
            return Err(ConfigError::InvalidMinSplitSize(classification.min_split_size));
        }
        if !(0.0..=1.0).contains(&classification.default_confidence) {
            return Err(ConfigError::InvalidConfidence(classification.default_confidence));
        }

        let retry = &config.retry;
        if retry.taxonomy_max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts {
                phase: "taxonomy",
                value: retry.taxonomy_max_attempts,
            });
        }
        if retry.batch_max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts {
                phase: "batch",
                value: retry.batch_max_attempts,
            });
        }
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.initial_backoff_ms,
                retry.max_backoff_ms,
            ));
        }

        if config.cache.max_entries == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.max_entries));
        }

        if config.classifier.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(config.classifier.requests_per_second));
        }
        if config.classifier.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "classifier model cannot be empty".to_string(),
            ));
        }

        if config.circuit_breaker.enabled && config.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "circuit_breaker failure_threshold must be at least 1 when enabled".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["minutely", "hourly", "daily", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
