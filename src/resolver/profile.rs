//! Resolver that loads a candidate's profile page and picks the resume link.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, instrument};
use url::Url;

use super::matcher::{LinkMatcher, default_matchers, find_resume_link};
use super::utils::points_to_pdf;
use super::{ResolveError, UrlResolver};
use crate::candidate::CandidateRecord;
use crate::download::is_login_url;
use crate::user_agent;

/// Default timeout for loading one profile page.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches `profile_reference` as an HTML page and applies [`LinkMatcher`]s.
///
/// Shares the reqwest client (and therefore the session cookies) of the
/// download client. Relative profile references are joined onto `base_url`
/// when one is configured.
#[derive(Debug)]
pub struct ProfilePageResolver {
    client: Client,
    matchers: Vec<Box<dyn LinkMatcher>>,
    page_timeout: Duration,
    base_url: Option<Url>,
}

impl ProfilePageResolver {
    /// Creates a resolver with the default matcher list.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            matchers: default_matchers(),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            base_url: None,
        }
    }

    /// Replaces the matcher list. Order is priority order.
    #[must_use]
    pub fn with_matchers(mut self, matchers: Vec<Box<dyn LinkMatcher>>) -> Self {
        self.matchers = matchers;
        self
    }

    #[must_use]
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Base URL for profile references that are paths rather than full URLs.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn profile_url(&self, reference: &str) -> Result<Url, ResolveError> {
        let reference = reference.trim();
        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(_) => Err(ResolveError::invalid_reference(reference)),
            Err(_) => self
                .base_url
                .as_ref()
                .and_then(|base| base.join(reference).ok())
                .ok_or_else(|| ResolveError::invalid_reference(reference)),
        }
    }
}

#[async_trait]
impl UrlResolver for ProfilePageResolver {
    fn name(&self) -> &'static str {
        "profile-page"
    }

    #[instrument(skip(self, candidate), fields(candidate_id = %candidate.id))]
    async fn resolve(&self, candidate: &CandidateRecord) -> Result<Option<String>, ResolveError> {
        let reference = candidate.profile_reference.as_str();
        let page_url = self.profile_url(reference)?;

        if points_to_pdf(page_url.as_str()) {
            return Ok(Some(page_url.to_string()));
        }

        let response = self
            .client
            .get(page_url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(USER_AGENT, user_agent::default_page_user_agent())
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| ResolveError::unreachable(reference, e.to_string()))?;

        let status = response.status().as_u16();
        if matches!(status, 401 | 403) || is_login_url(response.url().as_str()) {
            return Err(ResolveError::auth_required(reference));
        }
        if !response.status().is_success() {
            return Err(ResolveError::http_status(reference, status));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| ResolveError::unreachable(reference, e.to_string()))?;

        let link = find_resume_link(&html, &final_url, &self.matchers);
        if link.is_none() {
            debug!(page = %final_url, "no resume link on profile page");
        }
        Ok(link)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("Content-Type", "text/html; charset=utf-8")
            .set_body_string(format!("<html><body>{body}</body></html>"))
    }

    #[tokio::test]
    async fn test_resolves_relative_resume_link() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/candidates/42"))
            .respond_with(html(r#"<a href="/files/resume_42.pdf">Resume</a>"#))
            .mount(&mock_server)
            .await;

        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new(
            "42",
            "Jane X",
            format!("{}/candidates/42", mock_server.uri()),
        );

        let url = resolver.resolve(&candidate).await.unwrap();
        assert_eq!(
            url,
            Some(format!("{}/files/resume_42.pdf", mock_server.uri()))
        );
    }

    #[tokio::test]
    async fn test_page_without_link_is_none() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(html("<p>No documents uploaded</p>"))
            .mount(&mock_server)
            .await;

        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new("7", "Bo", format!("{}/candidates/7", mock_server.uri()));

        assert_eq!(resolver.resolve(&candidate).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relative_reference_joined_to_base_url() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/candidates/9"))
            .respond_with(html(r#"<a class="cv-download" href="cv/9.pdf">CV</a>"#))
            .mount(&mock_server)
            .await;

        let base = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
        let resolver = ProfilePageResolver::new(Client::new()).with_base_url(base);
        let candidate = CandidateRecord::new("9", "Ana", "/candidates/9");

        assert_eq!(
            resolver.resolve(&candidate).await.unwrap(),
            Some(format!("{}/candidates/cv/9.pdf", mock_server.uri()))
        );
    }

    #[tokio::test]
    async fn test_forbidden_page_is_auth_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new("1", "A", format!("{}/candidates/1", mock_server.uri()));

        assert!(matches!(
            resolver.resolve(&candidate).await,
            Err(ResolveError::AuthRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_http_status() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new("1", "A", format!("{}/candidates/1", mock_server.uri()));

        assert!(matches!(
            resolver.resolve(&candidate).await,
            Err(ResolveError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_direct_pdf_reference_skips_page_fetch() {
        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new("1", "A", "https://files.example/cv/1.pdf");
        assert_eq!(
            resolver.resolve(&candidate).await.unwrap().as_deref(),
            Some("https://files.example/cv/1.pdf")
        );
    }

    #[tokio::test]
    async fn test_relative_reference_without_base_is_invalid() {
        let resolver = ProfilePageResolver::new(Client::new());
        let candidate = CandidateRecord::new("1", "A", "/candidates/1");
        assert!(matches!(
            resolver.resolve(&candidate).await,
            Err(ResolveError::InvalidReference { .. })
        ));
    }
}
