//! dialcheck CLI - check which phone numbers belong to registered accounts.
//!
//! This CLI provides a `dialcheck` command that normalizes number lists and
//! resolves them in rate-safe batches.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{check, normalize, show_config};

/// dialcheck - rate-safe batch lookup of phone numbers
#[derive(Parser, Debug)]
#[command(
    name = "dialcheck",
    author,
    version,
    about = "Check which phone numbers belong to registered accounts",
    long_about = "dialcheck normalizes phone number lists and resolves them against a contact directory in paced, throttle-aware batches.\nLogs go to stderr; results go to stdout."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Configuration file (skips discovery of ~/.dialcheck/config.toml and ./.dialcheckrc)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve numbers against a directory
    ///
    /// Reads the given files (or stdin), normalizes every number, and checks
    /// them in batches. Ctrl+C stops after the current batch.
    Check(check::CheckArgs),

    /// Print the normalized, deduplicated numbers
    Normalize(normalize::NormalizeArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli_config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Check(check_args) => check::execute(check_args, cli_config).await,
        Command::Normalize(normalize_args) => normalize::execute(&normalize_args, cli_config),
        Command::Config => show_config::execute(&cli_config),
    }
}
