//! Resume Downloader Library
//!
//! Bulk-downloads candidate resume PDFs from a web application the caller
//! already holds a session for, validating every file and naming it after
//! the candidate.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`candidate`] - Candidate records and per-candidate outcomes
//! - [`session`] - Cookie-file sessions and the session probe
//! - [`listing`] - Paginated candidate listings (extraction stage)
//! - [`resolver`] - Profile reference to resume URL resolution
//! - [`download`] - Fetching, validation, naming, and the download coordinator
//! - [`report`] - Run statistics, JSON report, and process exit mapping
//! - [`workflow`] - The staged run with early exit

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod candidate;
pub mod download;
pub mod listing;
pub mod report;
pub mod resolver;
pub mod session;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;
pub mod workflow;

// Re-export commonly used types
pub use candidate::{CandidateRecord, DownloadOutcome, DownloadStatus};
pub use download::{
    CoordinatorError, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DownloadCoordinator,
    DownloadError, Fetcher, FileNamer, HttpClient, IntegrityError, RetryPolicy,
};
pub use listing::{
    CandidatePage, CandidateSource, ExtractionOutcome, JsonListingSource, ListingError,
    extract_candidates,
};
pub use report::{ProcessExit, RunReport, RunStatistics, write_report};
pub use resolver::{DirectResolver, ProfilePageResolver, ResolveError, UrlResolver};
pub use session::{CookieError, SessionOutcome, check_session, load_cookie_jar};
pub use workflow::{Workflow, WorkflowRun, WorkflowStage, WorkflowStatus};
