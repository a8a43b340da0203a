//! Retry logic with exponential backoff for failed resume downloads.
//!
//! A failed attempt is classified into a [`FailureType`], then
//! [`RetryPolicy::should_retry`] decides whether the same URL is fetched
//! again and after what delay.
//!
//! # Example
//!
//! ```
//! use resume_downloader::download::{
//!     DownloadError, RetryPolicy, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/cv.pdf", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("retrying in {delay:?} (attempt {attempt})");
//!     }
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a failed download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: attempt timeout, 5xx responses, connection refused.
    Transient,

    /// Server asked us to slow down (HTTP 429). Retried with backoff.
    RateLimited,

    /// Failure that will not change on retry: 404, invalid URL, disk errors.
    Permanent,

    /// The session is not accepted. Retrying without a new session cannot help.
    NeedsAuth,

    /// The body arrived but is not an acceptable PDF.
    Integrity,
}

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the download after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Attempt number of the retry (1-indexed, so the first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the download.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry configuration for one run.
///
/// A candidate gets at most `max_retries + 1` attempts. Delays follow
/// `min(base_delay * multiplier^(attempt - 1), max_delay) + jitter`; with
/// defaults that is roughly 1s, 2s, 4s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    retry_integrity_failures: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_integrity_failures: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom backoff settings.
    #[must_use]
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff_multiplier,
            retry_integrity_failures: false,
        }
    }

    /// Creates a policy with a custom retry count and default backoff.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Retries immediately with no backoff or jitter. Mostly useful in tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO, 1.0)
    }

    /// Also retry downloads that fail the PDF integrity check.
    #[must_use]
    pub fn retry_integrity_failures(mut self, enabled: bool) -> Self {
        self.retry_integrity_failures = enabled;
        self
    }

    /// Returns the configured number of retries.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed per candidate, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::NeedsAuth => {
                return RetryDecision::DoNotRetry {
                    reason: "session rejected - a fresh session is required".to_string(),
                };
            }
            FailureType::Integrity if !self.retry_integrity_failures => {
                return RetryDecision::DoNotRetry {
                    reason: "downloaded file failed the integrity check".to_string(),
                };
            }
            FailureType::Integrity | FailureType::Transient | FailureType::RateLimited => {}
        }

        if attempt >= self.max_attempts() {
            debug!(attempt, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + Self::jitter()
    }

    /// Random jitter between 0 and [`MAX_JITTER`], so candidates that failed
    /// together do not retry in lockstep.
    fn jitter() -> Duration {
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a download error for the retry decision.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (TLS/certificate) | Permanent |
/// | Network (other) | Transient |
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | HTTP other 4xx | Permanent |
/// | AuthRequired | NeedsAuth |
/// | Integrity | Integrity |
/// | Io, InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::Network { source, .. } => {
            if is_tls_error(source.as_ref()) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        DownloadError::AuthRequired { .. } => FailureType::NeedsAuth,
        DownloadError::Integrity { .. } => FailureType::Integrity,
        DownloadError::Io { .. } | DownloadError::Sink { .. } | DownloadError::InvalidUrl { .. } => {
            FailureType::Permanent
        }
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        401 | 403 | 407 => FailureType::NeedsAuth,
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        400..=499 => FailureType::Permanent,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn is_tls_error(error: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    let text = error.to_string().to_lowercase();
    text.contains("certificate")
        || text.contains("tls")
        || text.contains("ssl")
        || text.contains("handshake")
}
