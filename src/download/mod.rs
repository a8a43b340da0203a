//! Resume download pipeline: fetch, validate, name, and coordinate.
//!
//! # Features
//!
//! - Streaming fetches into temporary `.part` files (never buffered in memory)
//! - Size and `%PDF-` signature validation before anything is kept
//! - Collision-free, filesystem-safe output names derived from candidate names
//! - Bounded concurrency with per-candidate retry and failure isolation
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use resume_downloader::download::{is_valid_pdf, sanitize_candidate_name};
//!
//! # async fn example() {
//! assert_eq!(sanitize_candidate_name("Jane X"), "Jane_X");
//! let ok = is_valid_pdf(Path::new("./downloads/Jane_X.pdf")).await;
//! println!("valid: {ok}");
//! # }
//! ```

mod client;
pub mod constants;
mod coordinator;
mod error;
mod filename;
mod retry;
mod validate;

pub use client::{Fetcher, HttpClient};
pub(crate) use client::is_login_url;
pub use coordinator::{CoordinatorError, DEFAULT_CONCURRENCY, DownloadCoordinator};
pub use error::{DownloadError, TransportSource};
pub use filename::{FileNamer, resolve, sanitize_candidate_name};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
};
pub use validate::{IntegrityError, is_valid_pdf, validate};
