//! CLI configuration loading and merging.

use std::path::Path;

use anyhow::Context;
use dialcheck_core::config::DialcheckConfig;

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (applied per command)
/// 2. Environment variables
/// 3. `--config <path>` if given, otherwise the local config file (./.dialcheckrc)
///    layered over the global config file (~/.dialcheck/config.toml)
/// 4. Defaults
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<DialcheckConfig> {
    let mut config = match explicit {
        Some(path) => DialcheckConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => DialcheckConfig::load_layered(&[
            DialcheckConfig::default_global_path(),
            DialcheckConfig::default_local_path(),
        ])
        .context("Failed to load configuration")?,
    };

    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid DIALCHECK_* environment override")?;
    Ok(config)
}

/// Overrides from command-line flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub batch_size: Option<usize>,
    pub delay: Option<u64>,
    pub grace: Option<u64>,
    pub min_digits: Option<usize>,
    pub max_digits: Option<usize>,
}

impl Overrides {
    /// Applies the flags that were given and validates the result.
    pub fn apply(self, config: &mut DialcheckConfig) -> anyhow::Result<()> {
        let resolution = &mut config.resolution;
        if let Some(batch_size) = self.batch_size {
            resolution.batch_size = batch_size;
        }
        if let Some(delay) = self.delay {
            resolution.inter_batch_delay_secs = delay;
        }
        if let Some(grace) = self.grace {
            resolution.throttle_grace_secs = grace;
        }
        if let Some(min) = self.min_digits {
            resolution.identifier_length.min = min;
        }
        if let Some(max) = self.max_digits {
            resolution.identifier_length.max = max;
        }
        config.validate().context("Invalid configuration")
    }
}
