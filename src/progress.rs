//! Progress spinner fed by the coordinator's outcome channel.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use resume_downloader::{DownloadOutcome, DownloadStatus};
use tokio::sync::mpsc;

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_use_spinner(requested: bool) -> bool {
    requested && io::stderr().is_terminal() && !is_dumb_terminal()
}

/// Running tally shown next to the spinner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    saved: usize,
    not_found: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, status: DownloadStatus) {
        match status {
            DownloadStatus::Succeeded => self.saved += 1,
            DownloadStatus::NotFound => self.not_found += 1,
            DownloadStatus::Failed | DownloadStatus::TimedOut => self.failed += 1,
        }
    }

    fn message(self, last: &str) -> String {
        format!(
            "{} saved, {} without resume, {} failed (last: {last})",
            self.saved, self.not_found, self.failed
        )
    }
}

/// Draws a spinner until every sender of `outcomes` is dropped.
///
/// When `enabled` is false the channel is still drained so senders never
/// accumulate unread outcomes.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    mut outcomes: mpsc::UnboundedReceiver<DownloadOutcome>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !enabled {
            while outcomes.recv().await.is_some() {}
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed}] {pos} processed: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut tally = Tally::default();
        while let Some(outcome) = outcomes.recv().await {
            tally.record(outcome.status);
            spinner.inc(1);
            spinner.set_message(tally.message(&outcome.candidate_name));
        }
        spinner.finish_and_clear();
    })
}
