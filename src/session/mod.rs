//! Authenticated session handling.
//!
//! Sessions come from an exported browser cookie file ([`load_cookie_jar`]).
//! Before any extraction work, [`check_session`] confirms the cookies are
//! still accepted by the site.

mod cookies;

pub use cookies::{CookieError, CookieFile, SessionCookie, load_cookie_jar};

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::download::is_login_url;

/// How long the session probe may take.
pub const SESSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of probing the session check URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The site accepted the session.
    Active,
    /// The site answered but refused the session (expired or missing login).
    Rejected { reason: String },
    /// The site could not be reached.
    Unreachable { reason: String },
}

impl SessionOutcome {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("session active"),
            Self::Rejected { reason } => write!(f, "session rejected: {reason}"),
            Self::Unreachable { reason } => write!(f, "session check unreachable: {reason}"),
        }
    }
}

/// Issues one GET against `check_url` with the client's cookies.
///
/// A 401/403, or a redirect that lands on a login page, is a rejection.
/// Other non-2xx statuses are also rejections; transport failures are
/// reported as unreachable.
#[instrument(skip(client), fields(url = %check_url))]
pub async fn check_session(client: &Client, check_url: &str) -> SessionOutcome {
    let response = match client
        .get(check_url)
        .timeout(SESSION_CHECK_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(error) => {
            warn!(error = %error, "session check request failed");
            return SessionOutcome::Unreachable {
                reason: error.to_string(),
            };
        }
    };

    let status = response.status();
    let landed_on = response.url().as_str();
    let outcome = if matches!(status.as_u16(), 401 | 403) {
        SessionOutcome::Rejected {
            reason: format!("HTTP {}", status.as_u16()),
        }
    } else if landed_on != check_url && is_login_url(landed_on) {
        SessionOutcome::Rejected {
            reason: format!("redirected to login page {landed_on}"),
        }
    } else if !status.is_success() {
        SessionOutcome::Rejected {
            reason: format!("HTTP {}", status.as_u16()),
        }
    } else {
        SessionOutcome::Active
    };

    match &outcome {
        SessionOutcome::Active => info!("session active"),
        other => warn!(outcome = %other, "session not usable"),
    }
    outcome
}
