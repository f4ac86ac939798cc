//! Configuration file parsing
//!
//! Reads reltab.toml configuration files for the demo workload.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Number of workload steps to run
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Seed for the random event stream. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            seed: None,
        }
    }
}

/// Value pools and ranges for generated books.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default = "default_titles")]
    pub titles: Vec<String>,

    #[serde(default = "default_authors")]
    pub authors: Vec<String>,

    #[serde(default = "default_genres")]
    pub genres: Vec<String>,

    /// Inclusive page-count range
    #[serde(default = "default_pages")]
    pub pages: RangeConfig,

    /// Inclusive publication-year range
    #[serde(default = "default_years")]
    pub years: RangeConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            titles: default_titles(),
            authors: default_authors(),
            genres: default_genres(),
            pages: default_pages(),
            years: default_years(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RangeConfig {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "reltab=debug"
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_steps() -> usize {
    20
}

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{prefix} {i}")).collect()
}

fn default_titles() -> Vec<String> {
    numbered("Title", 5)
}

fn default_authors() -> Vec<String> {
    numbered("Author", 5)
}

fn default_genres() -> Vec<String> {
    numbered("Genre", 5)
}

fn default_pages() -> RangeConfig {
    RangeConfig { min: 100, max: 999 }
}

fn default_years() -> RangeConfig {
    RangeConfig {
        min: 1950,
        max: 2024,
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.steps == 0 {
            return Err(ConfigError::Validation(
                "simulation.steps must be at least 1".to_string(),
            ));
        }
        for (name, pool) in [
            ("library.titles", &self.library.titles),
            ("library.authors", &self.library.authors),
            ("library.genres", &self.library.genres),
        ] {
            if pool.is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        for (name, range) in [
            ("library.pages", &self.library.pages),
            ("library.years", &self.library.years),
        ] {
            if range.min > range.max {
                return Err(ConfigError::Validation(format!(
                    "{name}: min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}
