//! Extraction stage: paginated candidate listings.
//!
//! A [`CandidateSource`] serves one page of candidate records at a time.
//! [`extract_candidates`] walks pages until the source reports no next page
//! or the page bound is reached, pausing between pages and dropping
//! records whose id has already been seen.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::candidate::CandidateRecord;

/// Default page bound for one extraction.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Default pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(2);

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePage {
    pub candidates: Vec<CandidateRecord>,
    pub has_next: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("failed to read listing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("listing {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Page numbers start at 1.
    #[error("page {page} does not exist")]
    PageOutOfRange { page: u32 },
}

/// A listing that can be read one page at a time.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetches page `page` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] when the page cannot be produced.
    async fn fetch_page(&self, page: u32) -> Result<CandidatePage, ListingError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingFile {
    Flat(Vec<CandidateRecord>),
    Paged { pages: Vec<Vec<CandidateRecord>> },
}

/// Listing exported to a JSON file.
///
/// Accepts either a flat array of records (a single page) or an object of
/// the form `{"pages": [[...], [...]]}`.
#[derive(Debug, Clone)]
pub struct JsonListingSource {
    pages: Vec<Vec<CandidateRecord>>,
}

impl JsonListingSource {
    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::Io`] or [`ListingError::Parse`].
    #[instrument(fields(path = %path.display()))]
    pub async fn from_path(path: &Path) -> Result<Self, ListingError> {
        let raw = tokio::fs::read(path).await.map_err(|source| ListingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&raw).map_err(|source| ListingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses listing JSON already in memory.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let pages = match serde_json::from_slice::<ListingFile>(raw)? {
            ListingFile::Flat(records) => vec![records],
            ListingFile::Paged { pages } => pages,
        };
        debug!(pages = pages.len(), "listing parsed");
        Ok(Self { pages })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[async_trait]
impl CandidateSource for JsonListingSource {
    async fn fetch_page(&self, page: u32) -> Result<CandidatePage, ListingError> {
        let index = usize::try_from(page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .ok_or(ListingError::PageOutOfRange { page })?;
        // An empty listing still has one (empty) first page.
        if index == 0 && self.pages.is_empty() {
            return Ok(CandidatePage::default());
        }
        let records = self
            .pages
            .get(index)
            .ok_or(ListingError::PageOutOfRange { page })?;
        Ok(CandidatePage {
            candidates: records.clone(),
            has_next: index + 1 < self.pages.len(),
        })
    }
}

/// Result of the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Complete {
        candidates: Vec<CandidateRecord>,
        pages: u32,
    },
    Failed {
        reason: String,
    },
}

/// Reads pages `1..=max_pages` from `source`.
///
/// Stops early when a page reports `has_next == false`. Records whose id
/// already appeared on an earlier page (or earlier on the same page) are
/// skipped.
#[instrument(skip(source))]
pub async fn extract_candidates(
    source: &dyn CandidateSource,
    max_pages: u32,
    page_delay: Duration,
) -> ExtractionOutcome {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut pages = 0;

    for page in 1..=max_pages {
        if page > 1 && !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }

        let fetched = match source.fetch_page(page).await {
            Ok(fetched) => fetched,
            Err(error) => {
                warn!(page, error = %error, "listing page failed");
                return ExtractionOutcome::Failed {
                    reason: format!("page {page}: {error}"),
                };
            }
        };
        pages = page;

        let on_page = fetched.candidates.len();
        for record in fetched.candidates {
            if seen.insert(record.id.clone()) {
                candidates.push(record);
            } else {
                debug!(candidate_id = %record.id, page, "skipping duplicate candidate");
            }
        }
        debug!(page, records = on_page, "listing page read");

        if !fetched.has_next {
            break;
        }
        if page == max_pages {
            warn!(max_pages, "page limit reached; listing has more pages");
        }
    }

    info!(candidates = candidates.len(), pages, "extraction complete");
    ExtractionOutcome::Complete { candidates, pages }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(id: &str) -> CandidateRecord {
        CandidateRecord::new(id, format!("Name {id}"), format!("https://ats.example/p/{id}"))
    }

    struct CountingSource {
        pages: Vec<Vec<CandidateRecord>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CandidateSource for CountingSource {
        async fn fetch_page(&self, page: u32) -> Result<CandidatePage, ListingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = page as usize - 1;
            Ok(CandidatePage {
                candidates: self.pages.get(index).cloned().unwrap_or_default(),
                has_next: true,
            })
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl CandidateSource for BrokenSource {
        async fn fetch_page(&self, page: u32) -> Result<CandidatePage, ListingError> {
            Err(ListingError::PageOutOfRange { page })
        }
    }

    #[test]
    fn test_flat_listing_is_one_page() {
        let source = JsonListingSource::from_slice(
            br#"[{"id":"c1","name":"Jane X","url":"https://ats.example/p/c1"}]"#,
        )
        .unwrap();
        assert_eq!(source.page_count(), 1);
    }

    #[test]
    fn test_paged_listing() {
        let source = JsonListingSource::from_slice(
            br#"{"pages":[[{"id":"a","name":"A","profile_reference":"x"}],[{"id":"b","name":"B","profile_reference":"y"}]]}"#,
        )
        .unwrap();
        assert_eq!(source.page_count(), 2);
    }

    #[test]
    fn test_listing_rejects_missing_fields() {
        assert!(JsonListingSource::from_slice(br#"[{"id":"a"}]"#).is_err());
    }

    #[tokio::test]
    async fn test_json_source_pages_report_has_next() {
        let source = JsonListingSource::from_slice(
            br#"{"pages":[[{"id":"a","name":"A","url":"x"}],[{"id":"b","name":"B","url":"y"}]]}"#,
        )
        .unwrap();
        assert!(source.fetch_page(1).await.unwrap().has_next);
        assert!(!source.fetch_page(2).await.unwrap().has_next);
        assert!(matches!(
            source.fetch_page(3).await,
            Err(ListingError::PageOutOfRange { page: 3 })
        ));
        assert!(source.fetch_page(0).await.is_err());
    }

    #[tokio::test]
    async fn test_extract_stops_when_no_next_page() {
        let source = JsonListingSource::from_slice(
            br#"{"pages":[[{"id":"a","name":"A","url":"x"}],[{"id":"b","name":"B","url":"y"}]]}"#,
        )
        .unwrap();
        let outcome = extract_candidates(&source, 10, Duration::ZERO).await;
        let ExtractionOutcome::Complete { candidates, pages } = outcome else {
            panic!("extraction failed");
        };
        assert_eq!(pages, 2);
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_extract_respects_max_pages() {
        let source = CountingSource {
            pages: vec![vec![record("1")], vec![record("2")], vec![record("3")]],
            calls: AtomicU32::new(0),
        };
        let outcome = extract_candidates(&source, 2, Duration::ZERO).await;
        assert!(matches!(outcome, ExtractionOutcome::Complete { pages: 2, ref candidates } if candidates.len() == 2));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_extract_skips_duplicate_ids() {
        let source = CountingSource {
            pages: vec![vec![record("1"), record("2")], vec![record("2"), record("3")]],
            calls: AtomicU32::new(0),
        };
        let ExtractionOutcome::Complete { candidates, .. } =
            extract_candidates(&source, 2, Duration::ZERO).await
        else {
            panic!("extraction failed");
        };
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_extract_failure_reports_page() {
        let outcome = extract_candidates(&BrokenSource, 3, Duration::ZERO).await;
        match outcome {
            ExtractionOutcome::Failed { reason } => assert!(reason.starts_with("page 1")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_waits_between_pages() {
        let source = CountingSource {
            pages: vec![vec![record("1")], vec![record("2")], vec![record("3")]],
            calls: AtomicU32::new(0),
        };
        let started = std::time::Instant::now();
        let _ = extract_candidates(&source, 3, Duration::from_millis(40)).await;
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
