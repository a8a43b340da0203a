//! Download coordinator: bounded-concurrency resume downloads for a batch of
//! candidates.
//!
//! # Concurrency Model
//!
//! - Each candidate runs in its own Tokio task
//! - URL resolution is bounded by its own gate and never holds a download slot
//! - A download permit is acquired before the first fetch attempt and held
//!   across every retry of that candidate
//! - Permits are released automatically when a task finishes (RAII)
//! - A panicking task becomes a `FAILED` outcome; other tasks are unaffected
//!
//! # Cancellation
//!
//! The run stops early when the interrupt flag is raised or the optional run
//! deadline passes. In-flight tasks are aborted, their temporary files are
//! removed, and the outcomes that were already complete are returned inside
//! the error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use resume_downloader::CandidateRecord;
//! use resume_downloader::download::{DownloadCoordinator, HttpClient, RetryPolicy};
//! use resume_downloader::resolver::DirectResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = DownloadCoordinator::new(
//!     3,
//!     Duration::from_secs(120),
//!     RetryPolicy::default(),
//!     "./downloads",
//! )?;
//! let candidates = vec![CandidateRecord::new("c1", "Jane X", "https://ats.example/files/c1.pdf")];
//! let report = coordinator
//!     .run(candidates, Arc::new(DirectResolver::new()), Arc::new(HttpClient::new()?))
//!     .await?;
//! println!("{} of {} saved", report.statistics.succeeded, report.statistics.total);
//! # Ok(())
//! # }
//! ```

mod task;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use super::client::Fetcher;
use super::filename::FileNamer;
use super::retry::RetryPolicy;
use crate::candidate::{CandidateRecord, DownloadOutcome, DownloadStatus};
use crate::report::RunReport;
use crate::resolver::UrlResolver;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// How often the interrupt flag is polled.
const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fatal errors of a coordinator run. Per-candidate failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The destination directory could not be created or listed.
    #[error("destination directory {path} is not usable: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was interrupted. Carries the outcomes completed so far.
    #[error("download run interrupted after {} of {} candidates", .report.outcomes.len(), .report.candidates.len())]
    Cancelled {
        /// Partial report.
        report: Box<RunReport>,
    },

    /// The run deadline passed. Carries the outcomes completed so far.
    #[error("download run deadline exceeded after {} of {} candidates", .report.outcomes.len(), .report.candidates.len())]
    DeadlineExceeded {
        /// Partial report.
        report: Box<RunReport>,
    },
}

impl CoordinatorError {
    /// Partial report of a cancelled or timed-out run.
    #[must_use]
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            Self::Cancelled { report } | Self::DeadlineExceeded { report } => Some(report),
            Self::InvalidConcurrency { .. } | Self::Destination { .. } => None,
        }
    }
}

/// Runs the download stage for a batch of candidates.
///
/// Configuration is fixed at construction; one coordinator can run several
/// batches, each with its own naming scope.
#[derive(Debug)]
pub struct DownloadCoordinator {
    max_concurrency: usize,
    timeout: Duration,
    retry_policy: RetryPolicy,
    destination_dir: PathBuf,
    run_deadline: Option<Duration>,
    outcome_tx: Option<mpsc::UnboundedSender<DownloadOutcome>>,
}

enum StopReason {
    Interrupted,
    Deadline,
}

impl DownloadCoordinator {
    /// Creates a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidConcurrency`] if `max_concurrency`
    /// is outside 1-100.
    #[instrument(level = "debug", skip(retry_policy, destination_dir))]
    pub fn new(
        max_concurrency: usize,
        timeout: Duration,
        retry_policy: RetryPolicy,
        destination_dir: impl Into<PathBuf>,
    ) -> Result<Self, CoordinatorError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&max_concurrency) {
            return Err(CoordinatorError::InvalidConcurrency {
                value: max_concurrency,
            });
        }

        let destination_dir = destination_dir.into();
        debug!(
            max_concurrency,
            timeout_secs = timeout.as_secs_f64(),
            max_retries = retry_policy.max_retries(),
            destination = %destination_dir.display(),
            "creating download coordinator"
        );

        Ok(Self {
            max_concurrency,
            timeout,
            retry_policy,
            destination_dir,
            run_deadline: None,
            outcome_tx: None,
        })
    }

    /// Stops the whole run once `deadline` has elapsed.
    #[must_use]
    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = Some(deadline);
        self
    }

    /// Sends every outcome to `tx` as soon as it is recorded.
    #[must_use]
    pub fn with_outcome_sender(mut self, tx: mpsc::UnboundedSender<DownloadOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    #[must_use]
    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    /// Downloads every candidate's resume and returns the run report.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Destination`] if the destination cannot be
    /// prepared, or [`CoordinatorError::DeadlineExceeded`] if a run deadline
    /// is configured and passes.
    pub async fn run(
        &self,
        candidates: Vec<CandidateRecord>,
        resolver: Arc<dyn UrlResolver>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<RunReport, CoordinatorError> {
        self.run_interruptible(candidates, resolver, fetcher, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Same as [`Self::run`], stopping early when `interrupted` becomes `true`.
    ///
    /// # Errors
    ///
    /// As [`Self::run`], plus [`CoordinatorError::Cancelled`] on interruption.
    #[allow(clippy::too_many_lines)]
    #[instrument(skip_all, fields(candidates = candidates.len(), destination = %self.destination_dir.display()))]
    pub async fn run_interruptible(
        &self,
        candidates: Vec<CandidateRecord>,
        resolver: Arc<dyn UrlResolver>,
        fetcher: Arc<dyn Fetcher>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<RunReport, CoordinatorError> {
        let start_time = Utc::now();
        let namer = self.prepare_destination().await?;

        let ctx = Arc::new(task::TaskContext {
            download_gate: Semaphore::new(self.max_concurrency),
            resolve_gate: Semaphore::new(self.max_concurrency),
            namer: Arc::new(namer),
            resolver,
            fetcher,
            timeout: self.timeout,
            retry_policy: self.retry_policy.clone(),
            outcome_tx: self.outcome_tx.clone(),
        });

        info!(
            candidates = candidates.len(),
            max_concurrency = self.max_concurrency,
            "starting downloads"
        );

        let mut abort_handles = Vec::with_capacity(candidates.len());
        let mut pending = FuturesUnordered::new();
        for (index, candidate) in candidates.iter().cloned().enumerate() {
            let handle = tokio::spawn(task::process_candidate(Arc::clone(&ctx), index, candidate));
            abort_handles.push(handle.abort_handle());
            pending.push(async move { (index, handle.await) });
        }

        let mut results: Vec<Option<(CandidateRecord, DownloadOutcome)>> =
            vec![None; candidates.len()];
        let interrupt = wait_for_interrupt(&interrupted);
        let deadline = wait_for_deadline(self.run_deadline);
        tokio::pin!(interrupt);
        tokio::pin!(deadline);

        let stop = loop {
            tokio::select! {
                biased;
                () = &mut interrupt => break Some(StopReason::Interrupted),
                () = &mut deadline => break Some(StopReason::Deadline),
                joined = pending.next() => {
                    let Some((index, result)) = joined else {
                        break None;
                    };
                    record_result(&mut results, &candidates, index, result, ctx.outcome_tx.as_ref());
                }
            }
        };

        if stop.is_some() {
            warn!(
                in_flight = pending.len(),
                "stopping downloads; aborting in-flight candidates"
            );
            for handle in &abort_handles {
                handle.abort();
            }
            // Aborted tasks resolve once their futures are dropped, so partial
            // files are gone by the time this drains.
            while let Some((index, result)) = pending.next().await {
                record_result(&mut results, &candidates, index, result, ctx.outcome_tx.as_ref());
            }
        }

        let report = assemble_report(candidates, results, start_time);
        match stop {
            None => {
                info!(
                    succeeded = report.statistics.succeeded,
                    failed = report.statistics.failed,
                    "downloads complete"
                );
                Ok(report)
            }
            Some(StopReason::Interrupted) => Err(CoordinatorError::Cancelled {
                report: Box::new(report),
            }),
            Some(StopReason::Deadline) => Err(CoordinatorError::DeadlineExceeded {
                report: Box::new(report),
            }),
        }
    }

    async fn prepare_destination(&self) -> Result<FileNamer, CoordinatorError> {
        let destination_error = |source| CoordinatorError::Destination {
            path: self.destination_dir.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.destination_dir)
            .await
            .map_err(destination_error)?;
        FileNamer::new(&self.destination_dir).map_err(destination_error)
    }
}

fn record_result(
    results: &mut [Option<(CandidateRecord, DownloadOutcome)>],
    candidates: &[CandidateRecord],
    index: usize,
    result: Result<(CandidateRecord, DownloadOutcome), JoinError>,
    outcome_tx: Option<&mpsc::UnboundedSender<DownloadOutcome>>,
) {
    match result {
        Ok(finished) => results[index] = Some(finished),
        Err(join_error) if join_error.is_panic() => {
            let finished = task::panicked_outcome(&candidates[index], &join_error);
            if let Some(tx) = outcome_tx {
                let _ = tx.send(finished.1.clone());
            }
            results[index] = Some(finished);
        }
        Err(_) => {
            debug!(index, "candidate task cancelled before completion");
        }
    }
}

fn assemble_report(
    candidates: Vec<CandidateRecord>,
    results: Vec<Option<(CandidateRecord, DownloadOutcome)>>,
    start_time: chrono::DateTime<Utc>,
) -> RunReport {
    let mut annotated = Vec::with_capacity(candidates.len());
    let mut outcomes = Vec::with_capacity(candidates.len());
    for (original, result) in candidates.into_iter().zip(results) {
        match result {
            Some((candidate, outcome)) => {
                annotated.push(candidate);
                outcomes.push(outcome);
            }
            None => annotated.push(original),
        }
    }
    RunReport::new(annotated, outcomes, start_time, Utc::now())
}

fn wait_for_interrupt(flag: &AtomicBool) -> impl Future<Output = ()> + '_ {
    async move {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(INTERRUPT_POLL_INTERVAL).await;
        }
    }
}

async fn wait_for_deadline(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}

/// Final status for a candidate whose last attempt failed with `error`.
fn terminal_status(error: &super::DownloadError) -> DownloadStatus {
    if error.is_timeout() {
        DownloadStatus::TimedOut
    } else {
        DownloadStatus::Failed
    }
}
