use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use super::terminal_status;
use crate::candidate::{CandidateRecord, DownloadOutcome, DownloadStatus};
use crate::download::client::Fetcher;
use crate::download::filename::FileNamer;
use crate::download::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::download::validate::validate;
use crate::download::DownloadError;
use crate::resolver::UrlResolver;

/// State shared by every candidate task of one run.
pub(super) struct TaskContext {
    pub(super) download_gate: Semaphore,
    pub(super) resolve_gate: Semaphore,
    pub(super) namer: Arc<FileNamer>,
    pub(super) resolver: Arc<dyn UrlResolver>,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) timeout: Duration,
    pub(super) retry_policy: RetryPolicy,
    pub(super) outcome_tx: Option<mpsc::UnboundedSender<DownloadOutcome>>,
}

/// Attempts at finding an unused temporary name before giving up.
const TEMP_NAME_ATTEMPTS: usize = 8;

/// Temporary download target, removed on drop unless persisted.
///
/// Dropping happens on every exit path, including task abort, so an
/// interrupted run never leaves `.part` files behind.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    /// Creates a new, empty temporary file in `dir`.
    ///
    /// The name carries a random token and the file is opened with
    /// `create_new`, so runs sharing a directory never write to the same
    /// file. Creation is synchronous: there is no await point between the
    /// file appearing and the guard owning it.
    fn create(dir: &Path, index: usize) -> io::Result<(Self, std::fs::File)> {
        for _ in 0..TEMP_NAME_ATTEMPTS {
            let token: u64 = rand::random();
            let path = dir.join(format!(".resume-{index}-{token:016x}.part"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((Self { path, armed: true }, file)),
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(error),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free temporary file name in {}", dir.display()),
        ))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been renamed away; nothing left to clean up.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            remove_quietly(&self.path, "failed to remove partial download");
        }
    }
}

fn remove_quietly(path: &Path, message: &str) {
    if let Err(error) = std::fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %error, "{message}");
    }
}

/// Shared between [`persist`] and its blocking job.
#[derive(Debug, Default)]
struct Handoff {
    /// The awaiting task went away before the job reported back.
    abandoned: bool,
    /// Final path written by the job.
    saved: Option<PathBuf>,
}

/// Undoes the blocking job's work if the awaiting task is aborted.
struct HandoffGuard {
    handoff: Arc<Mutex<Handoff>>,
    delivered: bool,
}

impl Drop for HandoffGuard {
    fn drop(&mut self) {
        if self.delivered {
            return;
        }
        let mut handoff = self.handoff.lock().unwrap_or_else(PoisonError::into_inner);
        handoff.abandoned = true;
        if let Some(path) = handoff.saved.take() {
            // Saved, but the outcome will never be recorded.
            remove_quietly(&path, "failed to remove abandoned resume");
        }
    }
}

/// Moves a validated download to a reserved final name.
///
/// Reserve and rename run together on the blocking pool and always finish,
/// even when the calling task is aborted. An aborted caller leaves neither
/// a placeholder nor an unreported resume behind.
async fn persist(
    namer: Arc<FileNamer>,
    partial: PartialFile,
    candidate_name: String,
) -> Result<PathBuf, DownloadError> {
    let handoff = Arc::new(Mutex::new(Handoff::default()));
    let mut guard = HandoffGuard {
        handoff: Arc::clone(&handoff),
        delivered: false,
    };
    let dir = namer.dir().to_path_buf();

    let joined = tokio::task::spawn_blocking(move || {
        persist_blocking(&namer, partial, &candidate_name, &handoff)
    })
    .await;
    guard.delivered = true;

    joined.map_err(|join_error| DownloadError::io(dir, io::Error::other(join_error)))?
}

fn persist_blocking(
    namer: &FileNamer,
    mut partial: PartialFile,
    candidate_name: &str,
    handoff: &Mutex<Handoff>,
) -> Result<PathBuf, DownloadError> {
    let mut handoff = handoff.lock().unwrap_or_else(PoisonError::into_inner);
    if handoff.abandoned {
        // `partial` is dropped here and removes the temporary file.
        return Err(DownloadError::io(
            partial.path(),
            io::Error::from(io::ErrorKind::Interrupted),
        ));
    }

    let final_path = namer
        .reserve(candidate_name)
        .map_err(|e| DownloadError::io(namer.dir(), e))?;
    if let Err(error) = std::fs::rename(partial.path(), &final_path) {
        remove_quietly(&final_path, "failed to release reserved name");
        return Err(DownloadError::io(&final_path, error));
    }
    partial.disarm();
    handoff.saved = Some(final_path.clone());
    Ok(final_path)
}

/// Runs one candidate through resolve, fetch, validate, and name.
#[instrument(skip(ctx, candidate), fields(candidate_id = %candidate.id))]
pub(super) async fn process_candidate(
    ctx: Arc<TaskContext>,
    index: usize,
    mut candidate: CandidateRecord,
) -> (CandidateRecord, DownloadOutcome) {
    let outcome = match resolve_url(&ctx, &candidate).await {
        Ok(Some(url)) => download_resolved(&ctx, index, &mut candidate, &url).await,
        Ok(None) => {
            info!(name = %candidate.name, "no resume link found");
            DownloadOutcome::unsuccessful(
                &candidate,
                DownloadStatus::NotFound,
                "resume download URL not found",
            )
        }
        Err(outcome) => outcome,
    };

    candidate.mark_processed(&outcome);
    if let Some(tx) = &ctx.outcome_tx {
        let _ = tx.send(outcome.clone());
    }
    (candidate, outcome)
}

async fn resolve_url(
    ctx: &TaskContext,
    candidate: &CandidateRecord,
) -> Result<Option<String>, DownloadOutcome> {
    let Ok(_permit) = ctx.resolve_gate.acquire().await else {
        return Err(DownloadOutcome::unsuccessful(
            candidate,
            DownloadStatus::Failed,
            "resolve gate closed",
        ));
    };

    ctx.resolver.resolve(candidate).await.map_err(|error| {
        warn!(resolver = ctx.resolver.name(), error = %error, "URL resolution failed");
        DownloadOutcome::unsuccessful(
            candidate,
            DownloadStatus::Failed,
            format!("URL resolution failed: {error}"),
        )
    })
}

async fn download_resolved(
    ctx: &TaskContext,
    index: usize,
    candidate: &mut CandidateRecord,
    url: &str,
) -> DownloadOutcome {
    let Ok(_permit) = ctx.download_gate.acquire().await else {
        return DownloadOutcome::unsuccessful(
            candidate,
            DownloadStatus::Failed,
            "download gate closed",
        );
    };

    match download_with_retry(ctx, index, candidate, url).await {
        Ok(path) => {
            info!(name = %candidate.name, path = %path.display(), "resume saved");
            DownloadOutcome::succeeded(candidate, path)
        }
        Err(error) => {
            let status = terminal_status(&error);
            warn!(
                name = %candidate.name,
                attempts = candidate.attempt_count,
                status = %status,
                error = %error,
                "resume download failed"
            );
            DownloadOutcome::unsuccessful(candidate, status, error.to_string())
        }
    }
}

/// Fetches with retry. Every attempt re-fetches the same URL into a fresh
/// temporary file.
#[instrument(skip(ctx, candidate), fields(url = %url))]
async fn download_with_retry(
    ctx: &TaskContext,
    index: usize,
    candidate: &mut CandidateRecord,
    url: &str,
) -> Result<PathBuf, DownloadError> {
    loop {
        candidate.attempt_count += 1;
        let attempt = candidate.attempt_count;
        debug!(attempt, "attempting download");

        let error = match attempt_download(ctx, index, candidate, url).await {
            Ok(path) => return Ok(path),
            Err(error) => error,
        };
        candidate.last_error = Some(error.to_string());

        match ctx.retry_policy.should_retry(classify_error(&error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    attempt = next_attempt,
                    max_attempts = ctx.retry_policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "retrying download"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(%reason, "not retrying download");
                return Err(error);
            }
        }
    }
}

async fn attempt_download(
    ctx: &TaskContext,
    index: usize,
    candidate: &CandidateRecord,
    url: &str,
) -> Result<PathBuf, DownloadError> {
    let (partial, file) = PartialFile::create(ctx.namer.dir(), index)
        .map_err(|e| DownloadError::io(ctx.namer.dir(), e))?;
    let mut writer = BufWriter::new(tokio::fs::File::from_std(file));

    let fetched = tokio::time::timeout(ctx.timeout, ctx.fetcher.fetch(url, ctx.timeout, &mut writer))
        .await
        .map_err(|_| DownloadError::timeout(url))?;
    let bytes = fetched?;
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(partial.path(), e))?;
    drop(writer);
    debug!(bytes, "download attempt finished; validating");

    validate(partial.path())
        .await
        .map_err(|e| DownloadError::integrity(partial.path(), e))?;

    persist(Arc::clone(&ctx.namer), partial, candidate.name.clone()).await
}

/// Outcome for a task that panicked instead of returning.
pub(super) fn panicked_outcome(
    candidate: &CandidateRecord,
    join_error: &JoinError,
) -> (CandidateRecord, DownloadOutcome) {
    warn!(candidate_id = %candidate.id, error = %join_error, "download task panicked");
    let mut candidate = candidate.clone();
    let outcome = DownloadOutcome::unsuccessful(
        &candidate,
        DownloadStatus::Failed,
        format!("task panic: {join_error}"),
    );
    candidate.mark_processed(&outcome);
    (candidate, outcome)
}
