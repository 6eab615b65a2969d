//! Configuration for dialcheck.
//!
//! Configuration precedence (highest first):
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables (`DIALCHECK_*`)
//! 3. Local config file (`./.dialcheckrc`)
//! 4. Global config file (`~/.dialcheck/config.toml`)
//! 5. Defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::{LengthRange, Normalizer, PacingPolicy};

/// Overrides `resolution.batch_size`.
pub const ENV_BATCH_SIZE: &str = "DIALCHECK_BATCH_SIZE";
/// Overrides `resolution.inter_batch_delay_secs`.
pub const ENV_INTER_BATCH_DELAY: &str = "DIALCHECK_INTER_BATCH_DELAY";
/// Overrides `resolution.throttle_grace_secs`.
pub const ENV_THROTTLE_GRACE: &str = "DIALCHECK_THROTTLE_GRACE";
/// Overrides `resolution.identifier_length.min`.
pub const ENV_MIN_DIGITS: &str = "DIALCHECK_MIN_DIGITS";
/// Overrides `resolution.identifier_length.max`.
pub const ENV_MAX_DIGITS: &str = "DIALCHECK_MAX_DIGITS";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings consumed by the planner, normalizer and executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Maximum identifiers per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, in seconds.
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_secs: u64,

    /// Buffer added to every throttle wait, in seconds.
    #[serde(default = "default_throttle_grace")]
    pub throttle_grace_secs: u64,

    /// Accepted digit counts.
    #[serde(default)]
    pub identifier_length: LengthRange,
}

fn default_batch_size() -> usize {
    4000
}

fn default_inter_batch_delay() -> u64 {
    10
}

fn default_throttle_grace() -> u64 {
    5
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_secs: default_inter_batch_delay(),
            throttle_grace_secs: default_throttle_grace(),
            identifier_length: LengthRange::default(),
        }
    }
}

impl ResolutionConfig {
    /// Checks the settings for values the engine cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue("batch_size must be at least 1".to_string()));
        }
        self.identifier_length
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Pacing derived from the configured delays.
    pub fn pacing(&self) -> PacingPolicy {
        PacingPolicy::new(
            Duration::from_secs(self.inter_batch_delay_secs),
            Duration::from_secs(self.throttle_grace_secs),
        )
    }

    /// Normalizer using the configured digit range.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.identifier_length)
    }
}

/// Output preferences for the command-line adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Lines per rendered page of identifiers.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Default output format (human, json).
    #[serde(default = "default_output_format")]
    pub format: String,
}

fn default_page_size() -> usize {
    50
}

fn default_output_format() -> String {
    "human".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { page_size: default_page_size(), format: default_output_format() }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialcheckConfig {
    /// Engine settings.
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Output preferences.
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,
}

impl DialcheckConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let table = read_table(path)?;
        Self::from_table(table, path)
    }

    /// Loads several files in order, later files overriding earlier ones key by key.
    ///
    /// Missing files are skipped; unreadable or malformed files are errors.
    pub fn load_layered(paths: &[PathBuf]) -> ConfigResult<Self> {
        let mut merged = toml::Table::new();
        let mut last = None;
        for path in paths {
            if !path.exists() {
                continue;
            }
            merge_tables(&mut merged, read_table(path)?);
            last = Some(path.as_path());
        }
        Self::from_table(merged, last.unwrap_or_else(|| Path::new("<defaults>")))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".dialcheck")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".dialcheckrc")
    }

    /// Discover and load configuration files, then apply environment overrides.
    pub fn discover_and_load() -> ConfigResult<Self> {
        let mut config =
            Self::load_layered(&[Self::default_global_path(), Self::default_local_path()])?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `DIALCHECK_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolution = &mut self.resolution;
        if let Some(v) = parse_env(&lookup, ENV_BATCH_SIZE)? {
            resolution.batch_size = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_INTER_BATCH_DELAY)? {
            resolution.inter_batch_delay_secs = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_THROTTLE_GRACE)? {
            resolution.throttle_grace_secs = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_MIN_DIGITS)? {
            resolution.identifier_length.min = v;
        }
        if let Some(v) = parse_env(&lookup, ENV_MAX_DIGITS)? {
            resolution.identifier_length.max = v;
        }
        Ok(())
    }

    /// Checks all sections.
    pub fn validate(&self) -> ConfigResult<()> {
        self.resolution.validate()?;
        if self.output.page_size == 0 {
            return Err(ConfigError::InvalidValue("output.page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))
    }

    fn from_table(table: toml::Table, origin: &Path) -> ConfigResult<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("{}: {}", origin.display(), e)))
    }
}

fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Deep-merges `overlay` into `base`; nested tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw:?} is not a valid number")))
        })
        .transpose()
}
