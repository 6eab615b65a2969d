//! Rendering of run results for display and export.

use std::fmt::Write as _;
use std::path::Path;

use dialcheck_abstraction::Identifier;
use thiserror::Error;

use crate::batch::progress::format_duration;
use crate::batch::types::{FailureReason, RunResult};
use crate::error::Result as DialcheckResult;

/// Errors raised while exporting a result.
#[derive(Debug, Error)]
pub enum ReportError {
    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV writer could not be flushed.
    #[error("CSV export failed: {0}")]
    Generation(String),
}

/// Splits identifiers into text blocks of at most `page_size` lines.
///
/// A `page_size` of zero is treated as one.
pub fn paginate(identifiers: &[Identifier], page_size: usize) -> Vec<String> {
    identifiers
        .chunks(page_size.max(1))
        .map(|page| page.iter().map(Identifier::as_str).collect::<Vec<_>>().join("\n"))
        .collect()
}

/// Exports the result as `status,identifier` rows.
pub fn to_csv(result: &RunResult) -> Result<String, ReportError> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    writer.write_record(["status", "identifier"])?;

    let sections = [("found", &result.found), ("not_found", &result.not_found), ("unresolved", &result.unresolved)];
    for (status, ids) in sections {
        for id in ids {
            writer.write_record([status, id.as_str()])?;
        }
    }

    writer.flush().map_err(|e| ReportError::Generation(e.to_string()))?;
    let data = writer.into_inner().map_err(|e| ReportError::Generation(e.to_string()))?;
    String::from_utf8(data).map_err(|e| ReportError::Generation(e.to_string()))
}

/// Writes the CSV export of `result` to `path`, replacing any existing file.
pub fn write_csv(result: &RunResult, path: &Path) -> DialcheckResult<()> {
    let data = to_csv(result)?;
    std::fs::write(path, data)?;
    Ok(())
}

/// Human-readable summary of a run.
pub fn render_summary(result: &RunResult) -> String {
    let mut out = String::new();
    let total = result.total();
    let pct = |n: usize| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };

    let _ = writeln!(out, "Resolution Complete{}", if result.cancelled { " (cancelled)" } else { "" });
    let _ = writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let _ = writeln!(out, "Checked:    {}", total);
    let _ = writeln!(out, "Found:      {} ({:.1}%)", result.found.len(), pct(result.found.len()));
    let _ = writeln!(out, "Not found:  {} ({:.1}%)", result.not_found.len(), pct(result.not_found.len()));
    let _ = writeln!(out, "Unresolved: {} ({:.1}%)", result.unresolved.len(), pct(result.unresolved.len()));
    let _ = writeln!(out, "Batches:    {}", result.batches.len());
    let _ = writeln!(out, "Duration:   {}", format_duration(result.elapsed));

    if !result.failures.is_empty() {
        let _ = writeln!(out, "\nUnresolved batches:");
        for failure in &result.failures {
            let reason = match failure.reason {
                FailureReason::Remote => "remote error",
                FailureReason::Cancelled => "cancelled",
            };
            let _ = writeln!(
                out,
                "  #{}: {} identifiers ({}): {}",
                failure.batch_index,
                failure.identifiers.len(),
                reason,
                failure.error
            );
        }
    }

    if result.has_warnings() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &result.warnings {
            let _ = writeln!(
                out,
                "  #{}: rollback failed, {} transient contacts may remain: {}",
                warning.batch_index, warning.leaked_handles, warning.message
            );
        }
    }

    out
}
