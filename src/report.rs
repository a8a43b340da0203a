//! Run statistics, the machine-readable run report, and exit outcomes.
//!
//! Statistics are always derived from the outcome list; nothing increments
//! counters while a run is in flight.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::candidate::{CandidateRecord, DownloadOutcome, DownloadStatus};

/// Default report filename, written inside the destination directory.
pub const DEFAULT_REPORT_FILENAME: &str = "download_report.json";

/// Aggregate counts for one run.
///
/// `failed` counts every unsuccessful outcome; `not_found` and `timed_out`
/// are the subsets with those specific statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_found: usize,
    pub timed_out: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl RunStatistics {
    /// Derives statistics from a finished set of outcomes.
    #[must_use]
    pub fn from_outcomes(
        outcomes: &[DownloadOutcome],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let count = |status: DownloadStatus| outcomes.iter().filter(|o| o.status == status).count();
        let succeeded = count(DownloadStatus::Succeeded);
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            not_found: count(DownloadStatus::NotFound),
            timed_out: count(DownloadStatus::TimedOut),
            start_time,
            end_time,
        }
    }

    /// Percentage of outcomes that succeeded; 0.0 for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        (self.end_time - self.start_time).to_std().unwrap_or_default()
    }
}

/// Immutable output of the download stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Input candidates, annotated with processing state.
    pub candidates: Vec<CandidateRecord>,
    /// One outcome per processed candidate, in input order.
    pub outcomes: Vec<DownloadOutcome>,
    pub statistics: RunStatistics,
}

impl RunReport {
    /// Assembles a report and derives its statistics.
    #[must_use]
    pub fn new(
        candidates: Vec<CandidateRecord>,
        outcomes: Vec<DownloadOutcome>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let statistics = RunStatistics::from_outcomes(&outcomes, start_time, end_time);
        Self {
            candidates,
            outcomes,
            statistics,
        }
    }

    /// Looks up the outcome for a candidate id.
    #[must_use]
    pub fn outcome_for(&self, candidate_id: &str) -> Option<&DownloadOutcome> {
        self.outcomes.iter().find(|o| o.candidate_id == candidate_id)
    }

    /// Logs the one-line run summary.
    pub fn log_summary(&self) {
        let stats = &self.statistics;
        info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            not_found = stats.not_found,
            timed_out = stats.timed_out,
            success_rate = %format!("{:.1}%", stats.success_rate()),
            elapsed_secs = stats.elapsed().as_secs_f64(),
            "download run summary"
        );
    }
}

/// Errors writing the report file.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize run report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write run report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `report` as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns [`ReportError`] if serialization or the write fails.
#[instrument(skip(report), fields(path = %path.display()))]
pub async fn write_report(path: &Path, report: &RunReport) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!("run report written");
    Ok(())
}

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Success,
    Partial,
    Failure,
    Interrupted,
}

impl ProcessExit {
    /// Numeric process exit code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
            Self::Interrupted => 130,
        }
    }
}

/// Maps success and failure counts to an exit outcome.
#[must_use]
pub fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
