//! Progress tracking for resolution runs.

use std::sync::Arc;
use std::time::Duration;

use crate::batch::types::{BatchReport, BatchState};

/// Called after every batch reaches a terminal state.
pub type ProgressCallback = Arc<dyn Fn(&RunProgress) + Send + Sync>;

/// Snapshot of how far a run has progressed.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Batches in the plan.
    pub total_batches: usize,
    /// Batches that reached a terminal state.
    pub completed_batches: usize,
    /// Identifiers in the plan.
    pub total_identifiers: usize,
    /// Identifiers confirmed found so far.
    pub found: usize,
    /// Identifiers left unresolved so far.
    pub unresolved: usize,
    /// Throttle signals received so far.
    pub throttles: u32,
    /// Final state of the most recent batch.
    pub last_state: Option<BatchState>,
    /// Pause taken between batches, used for the estimate.
    pub pacing: Duration,
    /// Processing time of each completed batch, excluding pacing.
    pub durations: Vec<Duration>,
}

impl RunProgress {
    /// Create a new progress snapshot for a plan.
    pub fn new(total_batches: usize, total_identifiers: usize, pacing: Duration) -> Self {
        Self {
            total_batches,
            completed_batches: 0,
            total_identifiers,
            found: 0,
            unresolved: 0,
            throttles: 0,
            last_state: None,
            pacing,
            durations: Vec::new(),
        }
    }

    /// Records a finished batch.
    pub fn record_batch(&mut self, report: &BatchReport, duration: Duration) {
        self.completed_batches += 1;
        self.found += report.found;
        if matches!(report.state, BatchState::Abandoned | BatchState::Cancelled) {
            self.unresolved += report.size;
        }
        self.throttles += report.throttles;
        self.last_state = Some(report.state);
        self.durations.push(duration);
    }

    /// Batches not yet processed.
    pub fn remaining_batches(&self) -> usize {
        self.total_batches.saturating_sub(self.completed_batches)
    }

    /// Completion percentage by batch count.
    pub fn percentage(&self) -> f64 {
        if self.total_batches == 0 {
            return 0.0;
        }
        (self.completed_batches as f64 / self.total_batches as f64) * 100.0
    }

    /// Estimated time remaining, formatted like "2m 15s".
    pub fn calculate_eta(&self) -> String {
        if self.durations.is_empty() {
            return "calculating...".to_string();
        }
        let remaining = self.remaining_batches();
        if remaining == 0 {
            return format_duration(Duration::ZERO);
        }
        let per_batch = self.average().saturating_add(self.pacing);
        format_duration(per_batch.saturating_mul(u32::try_from(remaining).unwrap_or(u32::MAX)))
    }

    /// Average processing time per batch, formatted.
    pub fn average_duration(&self) -> String {
        format_duration(self.average())
    }

    fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        self.durations.iter().sum::<Duration>() / self.durations.len() as u32
    }
}

/// Renders a one-line progress summary.
pub fn render_progress(progress: &RunProgress) -> String {
    format!(
        "batch {}/{} ({:.1}%) | found: {} | unresolved: {} | throttles: {} | ETA: {}",
        progress.completed_batches,
        progress.total_batches,
        progress.percentage(),
        progress.found,
        progress.unresolved,
        progress.throttles,
        progress.calculate_eta()
    )
}

/// Format duration as human-readable string.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if minutes > 0 { format!("{}m {}s", minutes, seconds) } else { format!("{}s", seconds) }
}
