//! Config command implementation.

use anyhow::Context;
use dialcheck_core::DialcheckConfig;

/// Prints the effective configuration.
pub fn execute(config: &DialcheckConfig) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;
    let rendered = config.to_toml_string().context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
