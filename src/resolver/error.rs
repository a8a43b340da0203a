//! Error types for resume URL resolution.

use thiserror::Error;

/// Errors that can occur while turning a candidate's profile reference into
/// a download URL.
///
/// "No link on the page" is not an error; resolvers return `Ok(None)` for it.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The profile reference is not a usable URL.
    #[error("invalid profile reference '{reference}'")]
    InvalidReference {
        /// The reference as given by the listing.
        reference: String,
    },

    /// The profile page could not be fetched.
    #[error("profile page {reference} unreachable: {reason}")]
    Unreachable {
        /// The profile URL.
        reference: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The profile page answered with a non-success status.
    #[error("profile page {reference} returned HTTP {status}")]
    HttpStatus {
        /// The profile URL.
        reference: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The session was not accepted while loading the profile page.
    #[error("authentication required for profile page {reference}; the session may have expired")]
    AuthRequired {
        /// The profile URL.
        reference: String,
    },

    /// Any other resolver-specific failure.
    #[error("resolution failed for '{reference}': {reason}")]
    Failed {
        /// The profile reference being resolved.
        reference: String,
        /// Why resolution failed.
        reason: String,
    },
}

impl ResolveError {
    /// Creates an `InvalidReference` error.
    #[must_use]
    pub fn invalid_reference(reference: &str) -> Self {
        Self::InvalidReference {
            reference: reference.to_string(),
        }
    }

    /// Creates an `Unreachable` error.
    #[must_use]
    pub fn unreachable(reference: &str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(reference: &str, status: u16) -> Self {
        Self::HttpStatus {
            reference: reference.to_string(),
            status,
        }
    }

    /// Creates an `AuthRequired` error.
    #[must_use]
    pub fn auth_required(reference: &str) -> Self {
        Self::AuthRequired {
            reference: reference.to_string(),
        }
    }

    /// Creates a generic `Failed` error.
    #[must_use]
    pub fn failed(reference: &str, reason: impl Into<String>) -> Self {
        Self::Failed {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}
