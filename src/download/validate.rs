//! Content-integrity checks for downloaded resumes.
//!
//! A download is accepted only if it is larger than [`MIN_RESUME_BYTES`] and
//! starts with the PDF signature. Failures here are content problems, not
//! transport problems, and are reported as [`IntegrityError`].

use std::path::Path;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use super::constants::{MIN_RESUME_BYTES, PDF_SIGNATURE};

/// Why a downloaded file was rejected.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// File is at or below the minimum accepted size.
    #[error("file is {size} bytes, expected more than {minimum}")]
    TooSmall {
        /// Actual size in bytes.
        size: u64,
        /// Minimum threshold in bytes (exclusive).
        minimum: u64,
    },

    /// Leading bytes are not `%PDF-`.
    #[error("missing PDF signature")]
    MissingSignature,

    /// File could not be inspected.
    #[error("file could not be read: {source}")]
    Unreadable {
        #[source]
        source: std::io::Error,
    },
}

/// Validates a downloaded file, returning its size on success.
///
/// # Errors
///
/// Returns [`IntegrityError::TooSmall`] when the file is 1024 bytes or less,
/// [`IntegrityError::MissingSignature`] when it does not begin with `%PDF-`,
/// and [`IntegrityError::Unreadable`] when it cannot be opened or read.
#[instrument(level = "debug", fields(path = %path.display()))]
pub async fn validate(path: &Path) -> Result<u64, IntegrityError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|source| IntegrityError::Unreadable { source })?
        .len();

    if size <= MIN_RESUME_BYTES {
        debug!(size, "rejecting undersized download");
        return Err(IntegrityError::TooSmall {
            size,
            minimum: MIN_RESUME_BYTES,
        });
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|source| IntegrityError::Unreadable { source })?;
    let mut header = [0u8; 5];
    file.read_exact(&mut header)
        .await
        .map_err(|source| IntegrityError::Unreadable { source })?;

    if header != PDF_SIGNATURE {
        debug!(size, "rejecting download without PDF signature");
        return Err(IntegrityError::MissingSignature);
    }

    Ok(size)
}

/// Boolean form of [`validate`].
pub async fn is_valid_pdf(path: &Path) -> bool {
    validate(path).await.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pdf_bytes(len: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(len, b'x');
        bytes
    }

    #[tokio::test]
    async fn test_validate_rejects_small_arbitrary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.part");
        std::fs::write(&path, vec![0xAB; 500]).unwrap();

        let result = validate(&path).await;
        assert!(matches!(
            result,
            Err(IntegrityError::TooSmall { size: 500, .. })
        ));
        assert!(!is_valid_pdf(&path).await);
    }

    #[tokio::test]
    async fn test_validate_accepts_pdf_over_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.part");
        std::fs::write(&path, pdf_bytes(1025)).unwrap();

        assert_eq!(validate(&path).await.unwrap(), 1025);
        assert!(is_valid_pdf(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_exactly_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge.part");
        std::fs::write(&path, pdf_bytes(1024)).unwrap();

        assert!(matches!(
            validate(&path).await,
            Err(IntegrityError::TooSmall { size: 1024, .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_html_body() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("login.part");
        let mut body = b"<!DOCTYPE html><html><body>Please sign in".to_vec();
        body.resize(4096, b' ');
        std::fs::write(&path, body).unwrap();

        assert!(matches!(
            validate(&path).await,
            Err(IntegrityError::MissingSignature)
        ));
    }

    #[tokio::test]
    async fn test_validate_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let result = validate(&dir.path().join("absent.part")).await;
        assert!(matches!(result, Err(IntegrityError::Unreadable { .. })));
    }
}
