//! Throttle-aware batch executor.
//!
//! Drives every batch of a plan through the resolver, one at a time and in
//! plan order. Each successful registration is rolled back before the next
//! batch is submitted, so at most one batch worth of transient contacts exists
//! on the remote side at any moment.

use std::sync::Arc;
use std::time::Duration;

use dialcheck_abstraction::{ContactResolver, Registration, RemoteHandle, ResolverError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::aggregator::ResultAggregator;
use crate::batch::error::BatchError;
use crate::batch::planner::{Batch, BatchPlan};
use crate::batch::progress::{ProgressCallback, RunProgress};
use crate::batch::types::{
    BatchFailure, BatchReport, BatchState, FailureReason, PacingPolicy, RunResult, RunWarning,
    WarningKind,
};

/// Lifecycle and counters of the batch currently being driven.
#[derive(Debug)]
struct BatchTracker {
    index: usize,
    token: dialcheck_abstraction::BatchToken,
    size: usize,
    state: BatchState,
    attempts: u32,
    throttles: u32,
    throttle_wait: Duration,
    found: usize,
}

impl BatchTracker {
    fn new(batch: &Batch) -> Self {
        Self {
            index: batch.index(),
            token: batch.token(),
            size: batch.len(),
            state: BatchState::Pending,
            attempts: 0,
            throttles: 0,
            throttle_wait: Duration::ZERO,
            found: 0,
        }
    }

    /// Moves to `to`. The state is updated even when the step is illegal so
    /// the report reflects what actually happened.
    fn advance(&mut self, to: BatchState) -> Result<(), BatchError> {
        let from = self.state;
        self.state = to;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(BatchError::IllegalTransition { index: self.index, from, to })
        }
    }

    fn into_report(self) -> BatchReport {
        BatchReport {
            index: self.index,
            token: self.token,
            size: self.size,
            state: self.state,
            attempts: self.attempts,
            throttles: self.throttles,
            throttle_wait: self.throttle_wait,
            found: self.found,
        }
    }
}

/// Sequential, rate-safe executor for a [`BatchPlan`].
pub struct BatchExecutor {
    resolver: Arc<dyn ContactResolver>,
    pacing: PacingPolicy,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("resolver", &self.resolver.name())
            .field("pacing", &self.pacing)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl BatchExecutor {
    /// Creates an executor over `resolver` with the given pacing.
    pub fn new(resolver: Arc<dyn ContactResolver>, pacing: PacingPolicy) -> Self {
        Self { resolver, pacing, cancel: CancellationToken::new(), progress: None }
    }

    /// Uses `token` to receive cancellation requests.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reports progress after every batch.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Pacing in effect.
    pub const fn pacing(&self) -> PacingPolicy {
        self.pacing
    }

    /// Resolves every batch of `plan`.
    ///
    /// Never fails as a whole: remote failures end up as unresolved
    /// identifiers or warnings on the returned result.
    pub async fn execute(&self, plan: &BatchPlan) -> RunResult {
        let total_batches = plan.batch_count();
        let mut aggregator = ResultAggregator::new(plan.identifiers().iter().cloned().collect());
        let mut progress = RunProgress::new(total_batches, plan.len(), self.pacing.inter_batch_delay);

        info!(
            resolver = %self.resolver.name(),
            plan_id = %plan.plan_id(),
            identifiers = plan.len(),
            batches = total_batches,
            batch_size = plan.batch_size(),
            "Starting resolution run"
        );

        for batch in plan.batches() {
            let started = Instant::now();
            let report = if self.cancel.is_cancelled() {
                self.cancel_batch(&batch, BatchTracker::new(&batch), &mut aggregator)
            } else {
                self.run_batch(&batch, &mut aggregator).await
            };

            progress.record_batch(&report, started.elapsed());
            let attempted = report.attempts > 0;
            aggregator.record_report(report);
            if let Some(callback) = &self.progress {
                callback(&progress);
            }

            let is_last = batch.index() + 1 == total_batches;
            if attempted && !is_last && !self.pacing.inter_batch_delay.is_zero() {
                debug!(
                    delay_secs = self.pacing.inter_batch_delay.as_secs_f64(),
                    "Pacing before next batch"
                );
                self.pause(self.pacing.inter_batch_delay).await;
            }
        }

        if self.cancel.is_cancelled() {
            aggregator.mark_cancelled();
        }

        let result = aggregator.finish();
        info!(
            resolver = %self.resolver.name(),
            found = result.found.len(),
            not_found = result.not_found.len(),
            unresolved = result.unresolved.len(),
            warnings = result.warnings.len(),
            cancelled = result.cancelled,
            elapsed_secs = result.elapsed.as_secs_f64(),
            "Resolution run finished"
        );
        result
    }

    /// Drives one batch to a terminal state.
    async fn run_batch(&self, batch: &Batch, aggregator: &mut ResultAggregator) -> BatchReport {
        let mut tracker = BatchTracker::new(batch);

        let registration = loop {
            self.transition(&mut tracker, BatchState::Submitted);
            tracker.attempts += 1;
            debug!(
                batch_index = batch.index(),
                batch_token = %batch.token(),
                batch_len = batch.len(),
                attempt = tracker.attempts,
                "Registering batch"
            );

            match self.resolver.register(batch.token(), batch.identifiers()).await {
                Ok(registration) => {
                    self.transition(&mut tracker, BatchState::Resolved);
                    break registration;
                }
                Err(ResolverError::Throttled(signal)) => {
                    self.transition(&mut tracker, BatchState::Throttled);
                    tracker.throttles += 1;
                    let backoff = self.pacing.backoff_for(signal);
                    warn!(
                        batch_index = batch.index(),
                        wait_secs = signal.wait.as_secs_f64(),
                        backoff_secs = backoff.as_secs_f64(),
                        attempt = tracker.attempts,
                        "Registration throttled, backing off"
                    );
                    self.transition(&mut tracker, BatchState::Backoff);
                    let waited_from = Instant::now();
                    let completed = self.pause(backoff).await;
                    tracker.throttle_wait += waited_from.elapsed();
                    if !completed {
                        return self.cancel_batch(batch, tracker, aggregator);
                    }
                }
                Err(ResolverError::Fatal(message)) => {
                    self.transition(&mut tracker, BatchState::Abandoned);
                    error!(
                        batch_index = batch.index(),
                        batch_token = %batch.token(),
                        batch_len = batch.len(),
                        error = %message,
                        "Registration failed, abandoning batch"
                    );
                    aggregator.record_failure(BatchFailure {
                        batch_index: batch.index(),
                        token: batch.token(),
                        reason: FailureReason::Remote,
                        identifiers: batch.identifiers().to_vec(),
                        error: message,
                    });
                    return tracker.into_report();
                }
            }
        };

        let Registration { found, handles } = registration;
        tracker.found = aggregator.record_found(batch, found);
        debug!(
            batch_index = batch.index(),
            found = tracker.found,
            handles = handles.len(),
            "Batch resolved, rolling back"
        );

        self.release(batch, handles, &mut tracker, aggregator).await;
        tracker.into_report()
    }

    /// Rolls back the transient contacts of a resolved batch.
    ///
    /// Throttled rollbacks are retried after backoff; the wait is not
    /// cancellable because the handles must be released either way.
    async fn release(
        &self,
        batch: &Batch,
        handles: Vec<RemoteHandle>,
        tracker: &mut BatchTracker,
        aggregator: &mut ResultAggregator,
    ) {
        let handle_count = handles.len();
        let mut pending = Some(handles);

        while let Some(handles) = pending.take() {
            let retry = handles.clone();
            match self.resolver.unregister(batch.token(), handles).await {
                Ok(()) => {
                    self.transition(tracker, BatchState::RolledBack);
                    debug!(batch_index = batch.index(), handles = handle_count, "Batch rolled back");
                }
                Err(ResolverError::Throttled(signal)) => {
                    tracker.throttles += 1;
                    let backoff = self.pacing.backoff_for(signal);
                    warn!(
                        batch_index = batch.index(),
                        wait_secs = signal.wait.as_secs_f64(),
                        backoff_secs = backoff.as_secs_f64(),
                        "Rollback throttled, backing off"
                    );
                    let waited_from = Instant::now();
                    tokio::time::sleep(backoff).await;
                    tracker.throttle_wait += waited_from.elapsed();
                    pending = Some(retry);
                }
                Err(ResolverError::Fatal(message)) => {
                    self.transition(tracker, BatchState::RollbackFailed);
                    warn!(
                        batch_index = batch.index(),
                        batch_token = %batch.token(),
                        handles = handle_count,
                        error = %message,
                        "Rollback failed, transient contacts may remain"
                    );
                    aggregator.record_warning(RunWarning {
                        kind: WarningKind::RollbackFailed,
                        batch_index: batch.index(),
                        token: batch.token(),
                        leaked_handles: handle_count,
                        message,
                    });
                }
            }
        }
    }

    /// Marks a batch that will not be resolved because the run was cancelled.
    fn cancel_batch(
        &self,
        batch: &Batch,
        mut tracker: BatchTracker,
        aggregator: &mut ResultAggregator,
    ) -> BatchReport {
        self.transition(&mut tracker, BatchState::Cancelled);
        debug!(batch_index = batch.index(), batch_len = batch.len(), "Batch cancelled");
        aggregator.record_failure(BatchFailure {
            batch_index: batch.index(),
            token: batch.token(),
            reason: FailureReason::Cancelled,
            identifiers: batch.identifiers().to_vec(),
            error: "run cancelled".to_string(),
        });
        tracker.into_report()
    }

    fn transition(&self, tracker: &mut BatchTracker, to: BatchState) {
        if let Err(e) = tracker.advance(to) {
            error!(error = %e, "Batch lifecycle violation");
        }
    }

    /// Sleeps for `duration` unless cancelled first. Returns false on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}
