//! Batch resolution engine: normalize, plan, execute, aggregate.

pub mod aggregator;
pub mod error;
pub mod executor;
pub mod formats;
pub mod input;
pub mod normalizer;
pub mod planner;
pub mod progress;
pub mod report;
pub mod types;

pub use aggregator::ResultAggregator;
pub use error::BatchError;
pub use executor::BatchExecutor;
pub use formats::{detect_format, InputFormat};
pub use input::{normalize_all, parse_input, parse_input_file, InputError, RawInput};
pub use normalizer::{IdentifierSet, LengthRange, Normalizer};
pub use planner::{Batch, BatchPlan, Batches};
pub use progress::{render_progress, ProgressCallback, RunProgress};
pub use report::{paginate, render_summary, to_csv, write_csv, ReportError};
pub use types::{
    BatchFailure, BatchReport, BatchState, FailureReason, PacingPolicy, RunResult, RunWarning,
    WarningKind,
};
