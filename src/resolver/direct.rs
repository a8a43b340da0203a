//! Direct resolver - the profile reference already is the download URL.
//!
//! Useful for listings that export document links rather than profile pages.

use async_trait::async_trait;
use url::Url;

use super::{ResolveError, UrlResolver};
use crate::candidate::CandidateRecord;

/// Passes `profile_reference` through unchanged.
///
/// An empty reference resolves to `None` (no document).
#[derive(Debug, Default)]
pub struct DirectResolver;

impl DirectResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UrlResolver for DirectResolver {
    fn name(&self) -> &'static str {
        "direct"
    }

    #[tracing::instrument(skip(self, candidate), fields(resolver = "direct", candidate_id = %candidate.id))]
    async fn resolve(&self, candidate: &CandidateRecord) -> Result<Option<String>, ResolveError> {
        let reference = candidate.profile_reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }
        Url::parse(reference).map_err(|_| ResolveError::invalid_reference(reference))?;
        Ok(Some(reference.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_resolver_passthrough() {
        let candidate = CandidateRecord::new("1", "A", "https://files.example/1.pdf");
        let url = DirectResolver::new().resolve(&candidate).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://files.example/1.pdf"));
    }

    #[tokio::test]
    async fn test_direct_resolver_empty_reference_is_none() {
        let candidate = CandidateRecord::new("1", "A", "  ");
        assert_eq!(DirectResolver::new().resolve(&candidate).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_direct_resolver_rejects_garbage() {
        let candidate = CandidateRecord::new("1", "A", "not a url");
        assert!(matches!(
            DirectResolver::new().resolve(&candidate).await,
            Err(ResolveError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_direct_resolver_name() {
        assert_eq!(DirectResolver::new().name(), "direct");
    }
}
