//! Normalize command implementation.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use dialcheck_core::DialcheckConfig;
use dialcheck_core::batch::normalize_all;

use crate::commands::read_inputs;
use crate::config::Overrides;

/// Arguments for `dialcheck normalize`.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input files; reads stdin when omitted
    pub files: Vec<PathBuf>,

    /// Fewest digits accepted
    #[arg(long)]
    pub min_digits: Option<usize>,

    /// Most digits accepted
    #[arg(long)]
    pub max_digits: Option<usize>,
}

/// Execute normalize command.
pub fn execute(args: &NormalizeArgs, mut config: DialcheckConfig) -> anyhow::Result<()> {
    Overrides { min_digits: args.min_digits, max_digits: args.max_digits, ..Overrides::default() }
        .apply(&mut config)?;

    let inputs = read_inputs(&args.files)?;
    let identifiers = normalize_all(&inputs, &config.resolution.normalizer());
    if identifiers.is_empty() {
        bail!("No valid phone numbers in input");
    }

    for id in &identifiers {
        println!("{id}");
    }
    Ok(())
}
