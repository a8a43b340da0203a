//! Constants for the download module (timeouts, validation thresholds).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-attempt download timeout (2 minutes).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Files at or below this size are rejected as truncated or placeholder content.
pub const MIN_RESUME_BYTES: u64 = 1024;

/// Leading bytes every accepted document must start with.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Maximum length of the sanitized filename stem.
pub const MAX_FILENAME_STEM_CHARS: usize = 50;

/// Extension given to every saved resume.
pub const RESUME_EXTENSION: &str = "pdf";

/// Upper bound on numeric suffixes tried when resolving a name collision.
pub const MAX_COLLISION_SUFFIX: usize = 10_000;
