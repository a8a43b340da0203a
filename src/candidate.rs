//! Candidate records and per-candidate download outcomes.
//!
//! A [`CandidateRecord`] is produced by the extraction stage and owned by the
//! download coordinator for the duration of a run. The coordinator never
//! touches identity fields; it only annotates `processed`, `attempt_count`,
//! and `last_error`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entity discovered by extraction, with at most one resume document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Stable identifier assigned by the listing.
    pub id: String,
    /// Display name, used to derive the output filename.
    pub name: String,
    /// Opaque handle the URL resolver uses to find the download link.
    #[serde(alias = "url")]
    pub profile_reference: String,
    /// Set once the coordinator has produced a terminal outcome.
    #[serde(default)]
    pub processed: bool,
    /// Number of fetch attempts made for this candidate.
    #[serde(default)]
    pub attempt_count: u32,
    /// Message of the most recent failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl CandidateRecord {
    /// Creates an unprocessed record.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        profile_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile_reference: profile_reference.into(),
            processed: false,
            attempt_count: 0,
            last_error: None,
        }
    }

    /// Records the terminal state of this candidate from its outcome.
    pub(crate) fn mark_processed(&mut self, outcome: &DownloadOutcome) {
        self.processed = true;
        self.last_error.clone_from(&outcome.error_message);
    }
}

/// Terminal status of one candidate's download pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadStatus {
    /// File downloaded, validated, and saved under its final name.
    Succeeded,
    /// Any non-timeout failure: transport, HTTP status, integrity, filesystem.
    Failed,
    /// The resolver found no download link for the candidate.
    NotFound,
    /// Every attempt ended with the last one timing out.
    TimedOut,
}

impl DownloadStatus {
    /// Returns the stable label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::TimedOut => "TIMED_OUT",
        }
    }

    /// Returns true for [`DownloadStatus::Succeeded`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable result of one candidate's download pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub candidate_id: String,
    pub candidate_name: String,
    pub status: DownloadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Fetch attempts made before this outcome was recorded.
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

impl DownloadOutcome {
    /// Builds a successful outcome for a saved file.
    #[must_use]
    pub fn succeeded(candidate: &CandidateRecord, file_path: PathBuf) -> Self {
        Self::build(candidate, DownloadStatus::Succeeded, Some(file_path), None)
    }

    /// Builds a non-success outcome carrying an error message.
    #[must_use]
    pub fn unsuccessful(
        candidate: &CandidateRecord,
        status: DownloadStatus,
        error_message: impl Into<String>,
    ) -> Self {
        Self::build(candidate, status, None, Some(error_message.into()))
    }

    fn build(
        candidate: &CandidateRecord,
        status: DownloadStatus,
        file_path: Option<PathBuf>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            candidate_name: candidate.name.clone(),
            status,
            file_path,
            error_message,
            attempts: candidate.attempt_count,
            completed_at: Utc::now(),
        }
    }
}
