//! Resolution of candidate profile references into resume download URLs.
//!
//! # Architecture
//!
//! - [`UrlResolver`] - async trait the download coordinator resolves through
//! - [`ProfilePageResolver`] - loads the profile page and applies [`LinkMatcher`]s
//! - [`DirectResolver`] - passthrough for listings that already carry document URLs
//!
//! `Ok(None)` means "no resume for this candidate" and becomes a `NOT_FOUND`
//! outcome; an `Err` becomes `FAILED`.

mod direct;
mod error;
pub mod matcher;
mod profile;
mod utils;

pub use direct::DirectResolver;
pub use error::ResolveError;
pub use matcher::{Anchor, HasClass, HrefContains, LinkMatcher, default_matchers, find_resume_link};
pub use profile::{DEFAULT_PAGE_TIMEOUT, ProfilePageResolver};

use async_trait::async_trait;

use crate::candidate::CandidateRecord;

/// Turns a candidate into the URL of its resume document.
///
/// # Object Safety
///
/// Uses `async_trait` so the coordinator can hold an `Arc<dyn UrlResolver>`.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Returns the download URL, or `None` if the candidate has no resume.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the lookup itself fails.
    async fn resolve(&self, candidate: &CandidateRecord) -> Result<Option<String>, ResolveError>;
}
