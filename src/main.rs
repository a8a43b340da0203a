//! CLI entry point for the resume downloader.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use resume_downloader::{
    DirectResolver, DownloadCoordinator, Fetcher, HttpClient, JsonListingSource,
    ProfilePageResolver, ProcessExit, RetryPolicy, UrlResolver, Workflow, WorkflowStatus,
    load_cookie_jar,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod cli;
mod config;
mod progress;

use config::Settings;

fn init_tracing(default_level: &str) {
    // RUST_LOG wins over -v/-q.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse before tracing so --help prints without log noise.
    let (cli, sources) = config::parse_cli_with_sources();
    init_tracing(config::default_log_level(cli.verbose, cli.quiet));
    debug!(?cli, "CLI arguments parsed");

    let settings = config::resolve_settings(cli, &sources, |name| std::env::var(name).ok())?;
    let exit = run(settings).await?;
    Ok(ExitCode::from(exit.code()))
}

async fn run(settings: Settings) -> Result<ProcessExit> {
    info!(listing = %settings.listing.display(), "resume downloader starting");

    let http = match &settings.cookies {
        Some(path) => {
            let jar = load_cookie_jar(path)
                .with_context(|| format!("cannot load session cookies from {}", path.display()))?;
            HttpClient::with_cookie_jar(jar)
        }
        None => {
            warn!("no session cookies configured; requests are sent without a session");
            HttpClient::new()
        }
    }
    .context("failed to initialise HTTP client")?;

    let resolver: Arc<dyn UrlResolver> = if settings.direct {
        Arc::new(DirectResolver::new())
    } else {
        let mut resolver = ProfilePageResolver::new(http.inner().clone())
            .with_page_timeout(settings.page_timeout);
        if let Some(base_url) = settings.base_url.clone() {
            resolver = resolver.with_base_url(base_url);
        }
        Arc::new(resolver)
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(http.clone());

    let source = JsonListingSource::from_path(&settings.listing)
        .await
        .context("cannot read candidate listing")?;

    let retry_policy = RetryPolicy::with_max_retries(settings.max_retries)
        .retry_integrity_failures(settings.retry_invalid);
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(
        settings.concurrency,
        settings.timeout,
        retry_policy,
        &settings.output_dir,
    )?
    .with_outcome_sender(outcome_tx);
    if let Some(deadline) = settings.run_timeout {
        coordinator = coordinator.with_run_deadline(deadline);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let progress_handle = progress::spawn_progress_ui(
        progress::should_use_spinner(settings.show_progress),
        outcome_rx,
    );

    let mut workflow = Workflow::new(&source, &coordinator, resolver, fetcher)
        .with_pagination(settings.max_pages, settings.page_delay)
        .with_report_path(&settings.report_path);
    if let Some(url) = &settings.session_check_url {
        workflow = workflow.with_session_check(http.inner().clone(), url.clone());
    }
    let outcome = workflow.run(Arc::clone(&interrupted)).await;

    // Dropping the coordinator closes the outcome channel.
    drop(coordinator);
    let _ = progress_handle.await;

    if let Some(path) = &outcome.report_path {
        info!(path = %path.display(), "report written");
    }
    match &outcome.status {
        WorkflowStatus::Completed => info!("workflow completed"),
        WorkflowStatus::Failed { stage, reason } => error!(%stage, %reason, "workflow failed"),
        WorkflowStatus::Interrupted => warn!("interrupted by user"),
    }

    Ok(outcome.exit())
}
