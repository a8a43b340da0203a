//! Filename sanitization and collision-free path reservation.
//!
//! Saved resumes are named after the candidate: `{sanitized_name}.pdf`, then
//! `{sanitized_name}_1.pdf`, `{sanitized_name}_2.pdf`, ... on collision.
//! Reservation creates the file with `create_new`, so the existence check and
//! the creation are a single atomic filesystem operation, and an existing
//! file is never overwritten.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::constants::{MAX_COLLISION_SUFFIX, MAX_FILENAME_STEM_CHARS, RESUME_EXTENSION};

/// Maps a free-text candidate name to a filesystem-safe stem.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; spaces become `_`; anything
/// else is dropped. Runs of `_` collapse, leading and trailing `_`/`.` are
/// trimmed, and the result is capped at 50 characters. A name with nothing
/// usable left falls back to `candidate_<hash>`, stable for the same input.
#[must_use]
pub fn sanitize_candidate_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let mapped = match ch {
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') => c,
            '_' | ' ' => '_',
            _ => continue,
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = trim_separators(&out);
    let truncated: String = trimmed.chars().take(MAX_FILENAME_STEM_CHARS).collect();
    let stem = trim_separators(&truncated);

    if stem.is_empty() {
        fallback_stem(name)
    } else {
        stem.to_string()
    }
}

fn trim_separators(value: &str) -> &str {
    value.trim_matches(|c| c == '_' || c == '.')
}

fn fallback_stem(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let hex: String = digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("candidate_{hex}")
}

fn numbered_filename(stem: &str, suffix: usize) -> String {
    if suffix == 0 {
        format!("{stem}.{RESUME_EXTENSION}")
    } else {
        format!("{stem}_{suffix}.{RESUME_EXTENSION}")
    }
}

/// Run-scoped reservation of output names inside one destination directory.
///
/// Shared by all download tasks of a run. Names are compared
/// case-insensitively, so `Jane_X.pdf` and `jane_x.pdf` count as the same
/// slot on every filesystem.
#[derive(Debug)]
pub struct FileNamer {
    dir: PathBuf,
    claimed: Mutex<HashSet<String>>,
}

impl FileNamer {
    /// Creates a namer for `dir`, seeded with the names already present there.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory cannot be listed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        let mut claimed = HashSet::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            claimed.insert(entry.file_name().to_string_lossy().to_lowercase());
        }
        debug!(dir = %dir.display(), existing = claimed.len(), "file namer ready");
        Ok(Self {
            dir,
            claimed: Mutex::new(claimed),
        })
    }

    /// Destination directory this namer reserves paths in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves a free path for `candidate_name` by creating an empty file there.
    ///
    /// The caller is expected to replace the placeholder (for example with an
    /// atomic rename) or remove it.
    ///
    /// # Errors
    ///
    /// Returns the IO error from file creation, or `AlreadyExists` if every
    /// numeric suffix is taken.
    #[instrument(level = "debug", skip(self), fields(dir = %self.dir.display()))]
    pub fn reserve(&self, candidate_name: &str) -> io::Result<PathBuf> {
        let stem = sanitize_candidate_name(candidate_name);
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);

        for suffix in 0..MAX_COLLISION_SUFFIX {
            let filename = numbered_filename(&stem, suffix);
            let key = filename.to_lowercase();
            if claimed.contains(&key) {
                continue;
            }

            let path = self.dir.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    claimed.insert(key);
                    debug!(path = %path.display(), "reserved output path");
                    return Ok(path);
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                    // Created by someone outside this run since we listed the directory.
                    claimed.insert(key);
                }
                Err(error) => return Err(error),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free filename for stem '{stem}' in {}", self.dir.display()),
        ))
    }
}

/// Resolves and reserves a collision-free path for a single candidate.
///
/// Convenience form of [`FileNamer::reserve`] for one-off use; concurrent
/// callers inside one run should share a [`FileNamer`].
///
/// # Errors
///
/// Returns the IO error from listing the directory or creating the file.
pub fn resolve(candidate_name: &str, destination_dir: &Path) -> io::Result<PathBuf> {
    FileNamer::new(destination_dir)?.reserve(candidate_name)
}
