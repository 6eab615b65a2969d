//! Merges per-batch outcomes into a [`RunResult`].

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use dialcheck_abstraction::Identifier;
use tokio::time::Instant;
use tracing::warn;

use crate::batch::normalizer::IdentifierSet;
use crate::batch::planner::Batch;
use crate::batch::types::{BatchFailure, BatchReport, RunResult, RunWarning};

/// Accumulates batch outcomes for one run.
///
/// Anything not reported as found and not belonging to a failed batch is
/// classified as not found when the run finishes.
#[derive(Debug)]
pub struct ResultAggregator {
    input: IdentifierSet,
    found: BTreeSet<Identifier>,
    unresolved: BTreeSet<Identifier>,
    warnings: Vec<RunWarning>,
    failures: Vec<BatchFailure>,
    batches: Vec<BatchReport>,
    cancelled: bool,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl ResultAggregator {
    /// Starts aggregating a run over `input`.
    pub fn new(input: IdentifierSet) -> Self {
        Self {
            input,
            found: BTreeSet::new(),
            unresolved: BTreeSet::new(),
            warnings: Vec::new(),
            failures: Vec::new(),
            batches: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Records identifiers the resolver reported as found for `batch`.
    ///
    /// Identifiers that were not part of the batch are ignored. Returns how
    /// many identifiers were accepted.
    pub fn record_found(&mut self, batch: &Batch, found: Vec<Identifier>) -> usize {
        let members: HashSet<&Identifier> = batch.identifiers().iter().collect();
        let mut accepted = 0;
        for id in found {
            if members.contains(&id) {
                if self.found.insert(id) {
                    accepted += 1;
                }
            } else {
                warn!(
                    batch_index = batch.index(),
                    identifier = %id,
                    "Resolver reported an identifier outside the submitted batch, ignoring"
                );
            }
        }
        accepted
    }

    /// Records a batch whose identifiers could not be resolved.
    pub fn record_failure(&mut self, failure: BatchFailure) {
        self.unresolved.extend(failure.identifiers.iter().cloned());
        self.failures.push(failure);
    }

    /// Attaches an advisory to the run.
    pub fn record_warning(&mut self, warning: RunWarning) {
        self.warnings.push(warning);
    }

    /// Records the final execution report of a batch.
    pub fn record_report(&mut self, report: BatchReport) {
        self.batches.push(report);
    }

    /// Marks the run as cancelled by the caller.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Closes the run and computes the final partition.
    pub fn finish(self) -> RunResult {
        let not_found = self
            .input
            .into_iter()
            .filter(|id| !self.found.contains(id) && !self.unresolved.contains(id))
            .collect();

        RunResult {
            found: self.found,
            not_found,
            unresolved: self.unresolved,
            warnings: self.warnings,
            failures: self.failures,
            batches: self.batches,
            cancelled: self.cancelled,
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
        }
    }
}
