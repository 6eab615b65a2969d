//! Command implementations for the dialcheck CLI.

pub mod check;
pub mod normalize;
pub mod show_config;

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use dialcheck_core::batch::{RawInput, parse_input, parse_input_file};

/// Reads every file in `files`, or stdin when none are given.
pub fn read_inputs(files: &[PathBuf]) -> anyhow::Result<Vec<RawInput>> {
    if files.is_empty() {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content).context("Failed to read stdin")?;
        return Ok(vec![parse_input(None, &content).context("Failed to parse stdin")?]);
    }

    files
        .iter()
        .map(|path| {
            parse_input_file(path)
                .with_context(|| format!("Failed to parse input file: {}", path.display()))
        })
        .collect()
}
