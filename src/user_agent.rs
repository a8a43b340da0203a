//! Shared User-Agent strings for download and profile-page HTTP clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/resume-downloader";

/// Default User-Agent for resume download requests.
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("resume-downloader/{version} (+{PROJECT_UA_URL})")
}

/// User-Agent for profile-page and session-check requests.
///
/// Same format as the download UA with a `page-fetch` token, so site
/// operators can tell the two kinds of traffic apart.
#[must_use]
pub(crate) fn default_page_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("resume-downloader/{version} (page-fetch; +{PROJECT_UA_URL})")
}
