//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so that the message
//! recorded on a [`DownloadOutcome`](crate::DownloadOutcome) is useful on its own.

use std::path::PathBuf;

use thiserror::Error;

use super::validate::IntegrityError;

/// Boxed source for transport failures, so non-reqwest fetchers can report them too.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, reset, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying transport error.
        #[source]
        source: TransportSource,
    },

    /// The attempt did not finish within the configured timeout.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-2xx HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The session was not accepted: 401/403/407 or a redirect to a login page.
    #[error("authentication required downloading {url} (HTTP {status}); the session may have expired")]
    AuthRequired {
        /// The URL that required authentication.
        url: String,
        /// The HTTP status code, or 0 for a detected login redirect.
        status: u16,
    },

    /// File system error while writing or moving the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination sink rejected bytes of the response body.
    #[error("failed to write body of {url}: {source}")]
    Sink {
        /// The URL whose body was being written.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The resolved URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The downloaded bytes are not an acceptable PDF.
    #[error("integrity check failed for {path}: {source}")]
    Integrity {
        /// Temporary file that failed validation (already removed).
        path: PathBuf,
        /// Why validation failed.
        #[source]
        source: IntegrityError,
    },
}

impl DownloadError {
    /// Creates a network error from any transport error.
    pub fn network(url: impl Into<String>, source: impl Into<TransportSource>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an authentication-required error.
    pub fn auth_required(url: impl Into<String>, status: u16) -> Self {
        Self::AuthRequired {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a sink write error.
    pub fn sink(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Sink {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an integrity error.
    pub fn integrity(path: impl Into<PathBuf>, source: IntegrityError) -> Self {
        Self::Integrity {
            path: path.into(),
            source,
        }
    }

    /// Returns true when this attempt failed by timing out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path, which the source errors do not carry.
