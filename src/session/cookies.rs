//! Netscape cookie file loading.
//!
//! A session exported from a logged-in browser (`cookies.txt`, 7
//! TAB-separated fields per line) is parsed and loaded into a
//! `reqwest::cookie::Jar` shared by page and document fetches.

use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use reqwest::cookie::Jar;
use tracing::{debug, info, instrument, warn};
use url::Url;

const REDACTED: &str = "[REDACTED]";

/// One cookie from a session file. The value never appears in `Debug`.
#[derive(Clone)]
pub struct SessionCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds; 0 marks a session cookie.
    pub expires: u64,
    pub name: String,
    value: String,
}

impl SessionCookie {
    /// Cookie value. Do not log it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn origin(&self) -> Option<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        let host = self.domain.strip_prefix('.').unwrap_or(&self.domain);
        Url::parse(&format!("{scheme}://{host}{}", self.path)).ok()
    }

    fn set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if self.secure {
            header.push_str("; Secure");
        }
        if self.expires > 0 {
            match UNIX_EPOCH.checked_add(Duration::from_secs(self.expires)) {
                Some(at) => {
                    header.push_str("; Expires=");
                    header.push_str(&httpdate::fmt_http_date(at));
                }
                None => warn!(
                    name = %self.name,
                    expires = self.expires,
                    "cookie expiry out of range; keeping it for this session only"
                ),
            }
        }
        header
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("domain", &self.domain)
            .field("include_subdomains", &self.include_subdomains)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &REDACTED)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A data line could not be parsed. `content` has the value redacted.
    #[error("line {line}: {reason} (got: {content})")]
    Malformed {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("failed to read cookie file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file had data lines but none of them parsed.
    #[error("no usable cookies in {path} ({malformed} malformed lines)")]
    Empty { path: PathBuf, malformed: usize },
}

/// Parsed cookie file: the usable cookies and the reasons lines were skipped.
#[derive(Debug, Default)]
pub struct CookieFile {
    pub cookies: Vec<SessionCookie>,
    pub skipped: Vec<CookieError>,
}

impl CookieFile {
    /// Parses Netscape-format lines. Comments and blank lines are ignored;
    /// malformed lines land in `skipped`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if a line cannot be read.
    pub fn parse(reader: impl BufRead) -> std::io::Result<Self> {
        let mut file = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line, idx + 1) {
                Ok(cookie) => file.cookies.push(cookie),
                Err(error) => file.skipped.push(error),
            }
        }
        Ok(file)
    }

    /// Adds every cookie to a fresh jar.
    #[must_use]
    pub fn into_jar(self) -> Arc<Jar> {
        let jar = Arc::new(Jar::default());
        for cookie in &self.cookies {
            let Some(origin) = cookie.origin() else {
                warn!(domain = %cookie.domain, name = %cookie.name, "skipping cookie with unusable domain");
                continue;
            };
            jar.add_cookie_str(&cookie.set_cookie_header(), &origin);
            debug!(domain = %cookie.domain, name = %cookie.name, "cookie added to session");
        }
        jar
    }
}

/// Reads a cookie file and returns a jar holding its cookies.
///
/// # Errors
///
/// Returns [`CookieError::Io`] if the file cannot be read and
/// [`CookieError::Empty`] if it has data lines but none parse.
#[instrument(fields(path = %path.display()))]
pub fn load_cookie_jar(path: &Path) -> Result<Arc<Jar>, CookieError> {
    let io_error = |source| CookieError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = std::io::BufReader::new(std::fs::File::open(path).map_err(io_error)?);
    let file = CookieFile::parse(reader).map_err(io_error)?;

    for skipped in &file.skipped {
        warn!(error = %skipped, "skipping malformed cookie line");
    }
    if file.cookies.is_empty() && !file.skipped.is_empty() {
        return Err(CookieError::Empty {
            path: path.to_path_buf(),
            malformed: file.skipped.len(),
        });
    }

    info!(cookies = file.cookies.len(), "loaded session cookies");
    Ok(file.into_jar())
}

fn parse_line(line: &str, line_number: usize) -> Result<SessionCookie, CookieError> {
    let malformed = |reason: String| CookieError::Malformed {
        line: line_number,
        content: redact(line),
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    let &[domain, subdomains, path, secure, expires, name, value] = fields.as_slice() else {
        return Err(malformed(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    };

    let flag = |raw: &str, field: &str| match raw {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(malformed(format!("{field} must be TRUE or FALSE, got '{raw}'"))),
    };

    if domain.is_empty() {
        return Err(malformed("empty domain".to_string()));
    }
    if name.is_empty() {
        return Err(malformed("empty cookie name".to_string()));
    }

    Ok(SessionCookie {
        domain: domain.to_string(),
        include_subdomains: flag(subdomains, "include_subdomains")?,
        path: path.to_string(),
        secure: flag(secure, "secure")?,
        expires: expires
            .parse()
            .map_err(|_| malformed(format!("expires must be a Unix timestamp, got '{expires}'")))?,
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Replaces the value field so errors can be logged.
fn redact(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return line.to_string();
    }
    let mut redacted = fields[..6].join("\t");
    redacted.push('\t');
    redacted.push_str(REDACTED);
    redacted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;
    use std::io::Cursor;

    fn parse(input: &str) -> CookieFile {
        CookieFile::parse(Cursor::new(input.as_bytes())).unwrap()
    }

    #[test]
    fn test_parse_valid_lines() {
        let file = parse(
            "# Netscape HTTP Cookie File\n\
             .ats.example\tTRUE\t/\tTRUE\t0\tsid\tsecret1\n\
             ats.example\tFALSE\t/candidates\tFALSE\t1700000000\tcsrf\tsecret2\n",
        );
        assert_eq!(file.cookies.len(), 2);
        assert!(file.skipped.is_empty());
        assert_eq!(file.cookies[0].name, "sid");
        assert!(file.cookies[0].secure);
        assert_eq!(file.cookies[0].value(), "secret1");
        assert_eq!(file.cookies[1].path, "/candidates");
        assert_eq!(file.cookies[1].expires, 1_700_000_000);
    }

    #[test]
    fn test_parse_skips_comments_blank_and_crlf() {
        let file = parse("# comment\r\n\r\n.ats.example\tTRUE\t/\tFALSE\t0\tsid\tv\r\n");
        assert_eq!(file.cookies.len(), 1);
        assert_eq!(file.cookies[0].value(), "v");
    }

    #[test]
    fn test_malformed_lines_are_collected_with_line_numbers() {
        let file = parse(
            ".ats.example\tTRUE\t/\tFALSE\t0\tsid\tv\n\
             not a cookie\n\
             .ats.example\tMAYBE\t/\tFALSE\t0\tx\ty\n",
        );
        assert_eq!(file.cookies.len(), 1);
        assert_eq!(file.skipped.len(), 2);
        assert!(matches!(file.skipped[0], CookieError::Malformed { line: 2, .. }));
        assert!(matches!(file.skipped[1], CookieError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_errors_and_debug_redact_value() {
        let file = parse(".ats.example\tTRUE\t/\tFALSE\tsoon\tsid\ttopsecret\n");
        let message = file.skipped[0].to_string();
        assert!(!message.contains("topsecret"));
        assert!(message.contains(REDACTED));

        let file = parse(".ats.example\tTRUE\t/\tFALSE\t0\tsid\ttopsecret\n");
        let debug = format!("{:?}", file.cookies[0]);
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_jar_sends_cookie_to_matching_host() {
        let jar = parse(".ats.example\tTRUE\t/\tFALSE\t0\tsid\tabc\n").into_jar();
        let header = jar
            .cookies(&Url::parse("http://app.ats.example/profile/1").unwrap())
            .unwrap();
        assert_eq!(header.to_str().unwrap(), "sid=abc");
        assert!(jar.cookies(&Url::parse("http://other.example/").unwrap()).is_none());
    }

    #[test]
    fn test_load_cookie_jar_all_malformed_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "garbage\nmore garbage\n").unwrap();
        assert!(matches!(
            load_cookie_jar(&path),
            Err(CookieError::Empty { malformed: 2, .. })
        ));
    }

    #[test]
    fn test_load_cookie_jar_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            load_cookie_jar(&dir.path().join("absent.txt")),
            Err(CookieError::Io { .. })
        ));
    }

    #[test]
    fn test_load_cookie_jar_comment_only_file_is_empty_jar() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "# Netscape HTTP Cookie File\n").unwrap();
        assert!(load_cookie_jar(&path).is_ok());
    }
}
