//! Session → extraction → download → finish, with early exit.
//!
//! Each stage takes the previous stage's output and returns a typed result;
//! a stage that cannot continue ends the run with [`WorkflowStatus::Failed`]
//! naming the stage. The finish stage writes the run report whenever the
//! download stage produced one (including partial reports after an
//! interruption or deadline).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, instrument, warn};

use crate::candidate::CandidateRecord;
use crate::download::{CoordinatorError, DownloadCoordinator, Fetcher};
use crate::listing::{
    CandidateSource, DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY, ExtractionOutcome, extract_candidates,
};
use crate::report::{ProcessExit, RunReport, determine_exit_outcome, write_report};
use crate::resolver::UrlResolver;
use crate::session::{SessionOutcome, check_session};

/// Reason recorded when the download stage saved nothing.
pub const NOTHING_DOWNLOADED: &str = "No resumes downloaded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Session,
    Extraction,
    Download,
    Finish,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::Extraction => "extraction",
            Self::Download => "download",
            Self::Finish => "finish",
        })
    }
}

/// Terminal status of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// At least one resume was saved.
    Completed,
    Failed { stage: WorkflowStage, reason: String },
    Interrupted,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct WorkflowRun {
    pub status: WorkflowStatus,
    /// Present once the download stage ran (possibly partial).
    pub report: Option<RunReport>,
    /// Where the report was written, if it was.
    pub report_path: Option<PathBuf>,
}

impl WorkflowRun {
    fn early_exit(stage: WorkflowStage, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(%stage, %reason, "workflow stopped");
        Self {
            status: WorkflowStatus::Failed { stage, reason },
            report: None,
            report_path: None,
        }
    }

    fn interrupted() -> Self {
        warn!("workflow interrupted");
        Self {
            status: WorkflowStatus::Interrupted,
            report: None,
            report_path: None,
        }
    }

    /// Process exit for this run.
    #[must_use]
    pub fn exit(&self) -> ProcessExit {
        match (&self.status, &self.report) {
            (WorkflowStatus::Interrupted, _) => ProcessExit::Interrupted,
            (WorkflowStatus::Completed, Some(report)) => {
                determine_exit_outcome(report.statistics.succeeded, report.statistics.failed)
            }
            _ => ProcessExit::Failure,
        }
    }
}

/// One configured run over a listing.
pub struct Workflow<'a> {
    source: &'a dyn CandidateSource,
    coordinator: &'a DownloadCoordinator,
    resolver: Arc<dyn UrlResolver>,
    fetcher: Arc<dyn Fetcher>,
    session_check: Option<(Client, String)>,
    max_pages: u32,
    page_delay: Duration,
    report_path: Option<PathBuf>,
}

impl<'a> Workflow<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn CandidateSource,
        coordinator: &'a DownloadCoordinator,
        resolver: Arc<dyn UrlResolver>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            source,
            coordinator,
            resolver,
            fetcher,
            session_check: None,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: DEFAULT_PAGE_DELAY,
            report_path: None,
        }
    }

    /// Probes `url` with `client` before extraction. Without this the
    /// session is assumed to be active.
    #[must_use]
    pub fn with_session_check(mut self, client: Client, url: impl Into<String>) -> Self {
        self.session_check = Some((client, url.into()));
        self
    }

    #[must_use]
    pub fn with_pagination(mut self, max_pages: u32, page_delay: Duration) -> Self {
        self.max_pages = max_pages;
        self.page_delay = page_delay;
        self
    }

    /// Writes the run report to `path` in the finish stage.
    #[must_use]
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Runs every stage, stopping early when one cannot continue or
    /// `interrupted` is set.
    #[instrument(skip_all)]
    pub async fn run(self, interrupted: Arc<AtomicBool>) -> WorkflowRun {
        if let Some((client, url)) = &self.session_check {
            match check_session(client, url).await {
                SessionOutcome::Active => {}
                other => return WorkflowRun::early_exit(WorkflowStage::Session, other.to_string()),
            }
        }
        if interrupted.load(Ordering::SeqCst) {
            return WorkflowRun::interrupted();
        }

        let candidates = match extract_candidates(self.source, self.max_pages, self.page_delay).await
        {
            ExtractionOutcome::Complete { candidates, .. } => candidates,
            ExtractionOutcome::Failed { reason } => {
                return WorkflowRun::early_exit(WorkflowStage::Extraction, reason);
            }
        };
        if interrupted.load(Ordering::SeqCst) {
            return WorkflowRun::interrupted();
        }

        let (status, report) = self.download(candidates, interrupted).await;
        let Some(report) = report else {
            return WorkflowRun {
                status,
                report: None,
                report_path: None,
            };
        };
        self.finish(status, report).await
    }

    async fn download(
        &self,
        candidates: Vec<CandidateRecord>,
        interrupted: Arc<AtomicBool>,
    ) -> (WorkflowStatus, Option<RunReport>) {
        if candidates.is_empty() {
            warn!("no candidates to download");
        }
        let result = self
            .coordinator
            .run_interruptible(
                candidates,
                Arc::clone(&self.resolver),
                Arc::clone(&self.fetcher),
                interrupted,
            )
            .await;

        match result {
            Ok(report) if report.statistics.succeeded > 0 => (WorkflowStatus::Completed, Some(report)),
            Ok(report) => (
                WorkflowStatus::Failed {
                    stage: WorkflowStage::Download,
                    reason: NOTHING_DOWNLOADED.to_string(),
                },
                Some(report),
            ),
            Err(CoordinatorError::Cancelled { report }) => {
                (WorkflowStatus::Interrupted, Some(*report))
            }
            Err(CoordinatorError::DeadlineExceeded { report }) => (
                WorkflowStatus::Failed {
                    stage: WorkflowStage::Download,
                    reason: format!(
                        "run deadline exceeded after {} of {} candidates",
                        report.outcomes.len(),
                        report.candidates.len()
                    ),
                },
                Some(*report),
            ),
            Err(error) => (
                WorkflowStatus::Failed {
                    stage: WorkflowStage::Download,
                    reason: error.to_string(),
                },
                None,
            ),
        }
    }

    async fn finish(&self, status: WorkflowStatus, report: RunReport) -> WorkflowRun {
        report.log_summary();

        let mut report_path = None;
        if let Some(path) = &self.report_path {
            match write_report(path, &report).await {
                Ok(()) => report_path = Some(path.clone()),
                Err(error) => {
                    error!(stage = %WorkflowStage::Finish, error = %error, "failed to write run report");
                }
            }
        }

        match &status {
            WorkflowStatus::Completed => info!(
                succeeded = report.statistics.succeeded,
                total = report.statistics.total,
                "workflow completed"
            ),
            WorkflowStatus::Failed { stage, reason } => error!(%stage, %reason, "workflow failed"),
            WorkflowStatus::Interrupted => warn!("workflow interrupted; partial report kept"),
        }

        WorkflowRun {
            status,
            report: Some(report),
            report_path,
        }
    }
}
