//! Error types for batch resolution.

use thiserror::Error;

use crate::batch::types::BatchState;

/// Errors raised by the planner and executor themselves.
///
/// Remote failures are not represented here: they are folded into the
/// [`RunResult`](crate::batch::RunResult) as unresolved identifiers or warnings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Invalid planner or executor configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch attempted a state change the lifecycle does not allow.
    #[error("Illegal batch transition {from:?} -> {to:?} (batch {index})")]
    IllegalTransition {
        /// Batch position in the plan.
        index: usize,
        /// State the batch was in.
        from: BatchState,
        /// State that was requested.
        to: BatchState,
    },
}
