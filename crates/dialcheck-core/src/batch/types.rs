//! Data types for batch resolution.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dialcheck_abstraction::{BatchToken, Identifier, ThrottleSignal};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single batch inside the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchState {
    /// Planned but not yet submitted.
    Pending,
    /// A `register` call is in flight.
    Submitted,
    /// The last `register` was rejected by rate limiting.
    Throttled,
    /// Waiting out a throttle before resubmitting.
    Backoff,
    /// Registration succeeded; transient remote state exists.
    Resolved,
    /// Transient remote state was released.
    RolledBack,
    /// Registration succeeded but the rollback failed; remote state may leak.
    RollbackFailed,
    /// Registration failed fatally; identifiers stay unresolved.
    Abandoned,
    /// The run was cancelled before this batch resolved.
    Cancelled,
}

impl BatchState {
    /// Whether the batch has reached an end state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::RolledBack | Self::RollbackFailed | Self::Abandoned | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal lifecycle step.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Submitted | Self::Cancelled)
                | (Self::Submitted, Self::Throttled | Self::Resolved | Self::Abandoned)
                | (Self::Throttled, Self::Backoff)
                | (Self::Backoff, Self::Submitted | Self::Cancelled)
                | (Self::Resolved, Self::RolledBack | Self::RollbackFailed)
        )
    }
}

/// Pacing applied between and around remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Fixed pause after each completed batch, before the next one.
    pub inter_batch_delay: Duration,
    /// Extra buffer added to every throttle wait.
    pub throttle_grace: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self { inter_batch_delay: Duration::from_secs(10), throttle_grace: Duration::from_secs(5) }
    }
}

impl PacingPolicy {
    /// Create a new pacing policy.
    pub const fn new(inter_batch_delay: Duration, throttle_grace: Duration) -> Self {
        Self { inter_batch_delay, throttle_grace }
    }

    /// No pauses at all; useful for offline directories.
    pub const fn immediate() -> Self {
        Self { inter_batch_delay: Duration::ZERO, throttle_grace: Duration::ZERO }
    }

    /// How long to suspend after a throttle signal.
    pub fn backoff_for(&self, signal: ThrottleSignal) -> Duration {
        signal.wait.saturating_add(self.throttle_grace)
    }
}

/// Kind of advisory attached to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// `unregister` failed; transient contacts may remain on the remote side.
    RollbackFailed,
}

/// Non-fatal problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWarning {
    /// What went wrong.
    pub kind: WarningKind,
    /// Batch position in the plan.
    pub batch_index: usize,
    /// Batch correlation token.
    pub token: BatchToken,
    /// Number of remote handles that may have leaked.
    pub leaked_handles: usize,
    /// Error reported by the resolver.
    pub message: String,
}

/// Why a batch ended up unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The resolver returned a fatal error on registration.
    Remote,
    /// The run was cancelled before the batch could resolve.
    Cancelled,
}

/// Identifiers of a batch that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Batch position in the plan.
    pub batch_index: usize,
    /// Batch correlation token.
    pub token: BatchToken,
    /// Why the batch failed.
    pub reason: FailureReason,
    /// Identifiers left unresolved.
    pub identifiers: Vec<Identifier>,
    /// Error detail.
    pub error: String,
}

/// Per-batch execution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Batch position in the plan.
    pub index: usize,
    /// Batch correlation token.
    pub token: BatchToken,
    /// Identifiers in the batch.
    pub size: usize,
    /// Final lifecycle state.
    pub state: BatchState,
    /// `register` calls made for this batch.
    pub attempts: u32,
    /// Throttle signals received (registration and rollback).
    pub throttles: u32,
    /// Total time spent in throttle backoff.
    pub throttle_wait: Duration,
    /// Identifiers confirmed present.
    pub found: usize,
}

/// Final outcome of one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifiers that belong to registered accounts.
    pub found: BTreeSet<Identifier>,
    /// Identifiers confirmed absent.
    pub not_found: BTreeSet<Identifier>,
    /// Identifiers whose batch never resolved.
    pub unresolved: BTreeSet<Identifier>,
    /// Advisories, e.g. rollback failures.
    pub warnings: Vec<RunWarning>,
    /// Batches that ended unresolved.
    pub failures: Vec<BatchFailure>,
    /// Per-batch execution records in plan order.
    pub batches: Vec<BatchReport>,
    /// Whether the caller cancelled the run.
    pub cancelled: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunResult {
    /// Number of identifiers covered by the run.
    pub fn total(&self) -> usize {
        self.found.len() + self.not_found.len() + self.unresolved.len()
    }

    /// Whether every identifier was classified as found or not found.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && !self.cancelled
    }

    /// Whether any advisory was recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Found identifiers in order.
    pub fn found_list(&self) -> Vec<Identifier> {
        self.found.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use BatchState::*;
        let path = [Pending, Submitted, Throttled, Backoff, Submitted, Resolved, RolledBack];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(RolledBack.is_terminal());
        assert!(!Resolved.is_terminal());
    }

    #[test]
    fn test_illegal_transitions() {
        use BatchState::*;
        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Submitted));
        assert!(!Abandoned.can_transition_to(Submitted));
        assert!(!RolledBack.can_transition_to(Pending));
        assert!(!Submitted.can_transition_to(Cancelled));
    }

    #[test]
    fn test_backoff_adds_grace() {
        let pacing = PacingPolicy::new(Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(pacing.backoff_for(ThrottleSignal::from_secs(3)), Duration::from_secs(8));
        assert_eq!(PacingPolicy::immediate().backoff_for(ThrottleSignal::from_secs(3)), Duration::from_secs(3));
    }

    #[test]
    fn test_pacing_defaults() {
        let pacing = PacingPolicy::default();
        assert_eq!(pacing.inter_batch_delay, Duration::from_secs(10));
        assert_eq!(pacing.throttle_grace, Duration::from_secs(5));
    }
}
