use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Upper bound on attempts per case.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Must be between 1 and 10")]
    InvalidMaxAttempts(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid timeout for {0}: must be at least 1 second")]
    InvalidTimeout(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_cases_per_scenario: must be at least 1")]
    InvalidScenarioSize,

    #[error("Invalid memory.{0}: {1}. Must be between 0.0 and 1.0")]
    InvalidRate(&'static str, f64),

    #[error(
        "Invalid memory confidences: observed_confidence ({0}) must not be below heuristic_confidence ({1})"
    )]
    ObservedBelowHeuristic(f64, f64),

    #[error("device.app_path is required when device.install_app or device.reinstall_per_scenario is set")]
    MissingAppPath,

    #[error("State directory cannot be empty")]
    EmptyStateDir,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .qa-automator/config.yaml (project config, created by init)
    /// 3. .qa-automator/local.yaml (project local overrides, optional)
    /// 4. Environment variables (QA_AUTOMATOR_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with the project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let project = root.as_ref().join(".qa-automator");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project.join("config.yaml")))
            .merge(Yaml::file(project.join("local.yaml")))
            .merge(Env::prefixed("QA_AUTOMATOR_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let max_attempts = config.retry.max_attempts;
        if max_attempts == 0 || max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.timeouts.producer_secs == 0 {
            return Err(ConfigError::InvalidTimeout("producer"));
        }
        if config.timeouts.execution_secs == 0 {
            return Err(ConfigError::InvalidTimeout("execution"));
        }

        if config.grouping.max_cases_per_scenario == 0 {
            return Err(ConfigError::InvalidScenarioSize);
        }

        let memory = &config.memory;
        for (name, value) in [
            ("reinforce_rate", memory.reinforce_rate),
            ("penalty_rate", memory.penalty_rate),
            ("contradiction_rate", memory.contradiction_rate),
            ("heuristic_confidence", memory.heuristic_confidence),
            ("observed_confidence", memory.observed_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate(name, value));
            }
        }

        // A confirmed path must rank above an untried guess for the same key.
        if memory.observed_confidence < memory.heuristic_confidence {
            return Err(ConfigError::ObservedBelowHeuristic(
                memory.observed_confidence,
                memory.heuristic_confidence,
            ));
        }

        if config.paths.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStateDir);
        }

        let device = &config.device;
        if (device.install_app || device.reinstall_per_scenario) && device.app_path.is_none() {
            return Err(ConfigError::MissingAppPath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
