//! HTTP fetching of resume documents.
//!
//! [`Fetcher`] is the seam the coordinator downloads through; [`HttpClient`]
//! is the reqwest-backed implementation used in production. A fetch streams
//! the response body chunk by chunk into a caller-supplied sink and never
//! buffers the whole document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::user_agent;

/// One HTTP GET for a resolved URL, streamed into `sink`.
///
/// Implementations report the transport-level result only. Retrying,
/// validation, and naming are the coordinator's job.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` into `sink`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for invalid URLs, transport failures,
    /// non-2xx responses, session rejection, timeouts, and sink write errors.
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, DownloadError>;
}

/// reqwest-backed [`Fetcher`] sharing one connection pool and cookie jar.
///
/// Create once per run and clone freely; clones share the pool.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use resume_downloader::download::{Fetcher, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let mut sink: Vec<u8> = Vec::new();
/// let bytes = client
///     .fetch("https://ats.example/files/42.pdf", Duration::from_secs(30), &mut sink)
///     .await?;
/// println!("fetched {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client without a session.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: base_client_builder(None).build()?,
        })
    }

    /// Creates a client that attaches cookies from `cookie_jar` to every
    /// matching request.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialised.
    #[instrument(level = "debug", skip(cookie_jar))]
    pub fn with_cookie_jar(cookie_jar: Arc<Jar>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: base_client_builder(Some(cookie_jar)).build()?,
        })
    }

    /// Returns the underlying reqwest client, for page fetches that should
    /// share this client's session and connection pool.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn send_request(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            if matches!(status_code, 401 | 403 | 407) {
                return Err(DownloadError::auth_required(url, status_code));
            }
            return Err(DownloadError::http_status(url, status_code));
        }

        if let Some(auth_err) = detect_login_redirect(url, &response) {
            return Err(auth_err);
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(skip(self, sink), fields(url = %url))]
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, DownloadError> {
        if Url::parse(url).is_err() {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self.send_request(url, timeout).await?;
        let bytes = stream_to_sink(response, url, sink).await?;
        debug!(bytes, "fetch complete");
        Ok(bytes)
    }
}

/// Streams the response body into `sink`, returning bytes written.
async fn stream_to_sink(
    response: reqwest::Response,
    url: &str,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<u64, DownloadError> {
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| map_transport_error(url, e))?;
        sink.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::sink(url, e))?;
        bytes_written += chunk.len() as u64;
    }

    sink.flush().await.map_err(|e| DownloadError::sink(url, e))?;
    Ok(bytes_written)
}

fn map_transport_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

fn base_client_builder(cookie_jar: Option<Arc<Jar>>) -> reqwest::ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .gzip(true)
        .user_agent(user_agent::default_download_user_agent());
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    builder
}

/// URL fragments that identify a login or SSO page.
pub(crate) const LOGIN_PATTERNS: &[&str] = &[
    "/login",
    "/signin",
    "/sign-in",
    "/auth/",
    "/sso",
    "/saml",
    "/oauth",
    "/session/new",
];

/// Returns true if `url` looks like a login or SSO page.
pub(crate) fn is_login_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    LOGIN_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// An HTML page served from a login URL where a resume was expected means
/// the session expired mid-run.
fn detect_login_redirect(original_url: &str, response: &reqwest::Response) -> Option<DownloadError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.to_ascii_lowercase().contains("text/html") {
        return None;
    }

    let response_url = response.url().as_str();
    if !is_login_url(response_url) {
        // Probably an error page; the validator will reject it.
        return None;
    }

    debug!(
        url = %original_url,
        response_url = %response_url,
        "login redirect detected"
    );
    Some(DownloadError::auth_required(original_url, 0))
}
