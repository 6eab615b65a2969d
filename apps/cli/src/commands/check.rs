//! Check command implementation.
//!
//! Resolves number lists against an offline directory in paced batches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Args;
use colored::Colorize;
use dialcheck_core::batch::{
    ProgressCallback, RunProgress, paginate, parse_input_file, render_progress, render_summary,
    write_csv,
};
use dialcheck_core::{
    DialcheckConfig, DialcheckError, DirectoryResolver, ResolverSession, RunRequest, RunResult,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::read_inputs;
use crate::config::Overrides;

/// Arguments for `dialcheck check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input files (one number per line, or CSV/TSV); reads stdin when omitted
    pub files: Vec<PathBuf>,

    /// Directory file listing the registered numbers to resolve against
    #[arg(long)]
    pub directory: PathBuf,

    /// Maximum numbers per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seconds to wait between batches
    #[arg(long)]
    pub delay: Option<u64>,

    /// Seconds added to every throttle wait
    #[arg(long)]
    pub grace: Option<u64>,

    /// Fewest digits accepted
    #[arg(long)]
    pub min_digits: Option<usize>,

    /// Most digits accepted
    #[arg(long)]
    pub max_digits: Option<usize>,

    /// Also write `status,identifier` rows to this file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            batch_size: self.batch_size,
            delay: self.delay,
            grace: self.grace,
            min_digits: self.min_digits,
            max_digits: self.max_digits,
        }
    }
}

/// Execute check command.
pub async fn execute(args: CheckArgs, mut config: DialcheckConfig) -> anyhow::Result<()> {
    args.overrides().apply(&mut config)?;
    let json = args.json || config.output.format == "json";

    let directory = load_directory(&args, &config)?;
    let inputs = read_inputs(&args.files)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Cancellation requested, finishing current batch...", "⚠".yellow());
            ctrl_c.cancel();
        }
    });

    let mut request = RunRequest::new(inputs, config.resolution.clone()).with_cancellation(cancel);
    if !json {
        let progress: ProgressCallback = Arc::new(|progress: &RunProgress| {
            eprintln!("  {}", render_progress(progress).dimmed());
        });
        request = request.with_progress(progress);
    }

    let session = ResolverSession::new("directory", Arc::new(directory));
    let result = match session.run(request).await {
        Ok(result) => result,
        Err(DialcheckError::NoValidIdentifiers) => bail!("No valid phone numbers in input"),
        Err(e) => return Err(e).context("Resolution failed"),
    };

    if let Some(path) = &args.csv {
        write_csv(&result, path)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        info!(path = %path.display(), "CSV report written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_human(&result, config.output.page_size);
    }
    Ok(())
}

fn load_directory(args: &CheckArgs, config: &DialcheckConfig) -> anyhow::Result<DirectoryResolver> {
    let raw = parse_input_file(&args.directory)
        .with_context(|| format!("Failed to load directory: {}", args.directory.display()))?;
    let registered = raw.normalize(&config.resolution.normalizer());
    info!(path = %args.directory.display(), registered = registered.len(), "Directory loaded");
    Ok(DirectoryResolver::new(registered))
}

fn print_human(result: &RunResult, page_size: usize) {
    println!();
    print!("{}", render_summary(result));
    if result.has_warnings() {
        println!(
            "\n{} Some transient contacts may remain in the remote address book; remove them by hand.",
            "⚠".yellow()
        );
    }

    if result.found.is_empty() {
        println!("\n{}", "No registered numbers found.".yellow());
        return;
    }

    println!("\n{}", "Found:".bold().green());
    for page in paginate(&result.found_list(), page_size) {
        println!("{page}");
        println!();
    }
}
