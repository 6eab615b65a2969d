//! dialcheck core - rate-safe batch resolution of phone numbers.
//!
//! This crate provides the engine behind dialcheck, including:
//! - Normalization of raw input into canonical identifiers
//! - Batch planning and throttle-aware sequential execution
//! - Aggregation into found, not-found and unresolved sets
//! - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dialcheck_core::{DirectoryResolver, ResolverSession, RunRequest, config::DialcheckConfig};
//! use dialcheck_core::batch::parse_input;
//!
//! #[tokio::main]
//! async fn main() -> dialcheck_core::Result<()> {
//!     let config = DialcheckConfig::discover_and_load()?;
//!     let session = ResolverSession::new("offline", Arc::new(DirectoryResolver::default()));
//!     let input = parse_input(None, "+15551234567\n15557654321")?;
//!     let result = session.run(RunRequest::new(vec![input], config.resolution)).await?;
//!     println!("{}", dialcheck_core::batch::render_summary(&result));
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod directory;
pub mod error;
pub mod session;

pub use batch::{
    BatchExecutor, BatchPlan, BatchState, IdentifierSet, Normalizer, PacingPolicy, RunResult,
    RunWarning,
};
pub use config::{ConfigError, DialcheckConfig, OutputConfig, ResolutionConfig};
pub use dialcheck_abstraction::{
    BatchToken, ContactResolver, Identifier, Registration, RemoteHandle, ResolverError,
    ThrottleSignal,
};
pub use directory::{DirectoryCall, DirectoryResolver};
pub use error::{DialcheckError, Result};
pub use session::{ResolverSession, RunRequest};
