//! Shared helpers for resolver modules: static regexes and URL handling.

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Returns true if the path of `value` ends in `.pdf`, ignoring query and fragment.
#[must_use]
pub fn points_to_pdf(value: &str) -> bool {
    let path = value.split(['?', '#']).next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Decodes the handful of HTML entities that show up inside attribute values.
#[must_use]
pub fn decode_attribute(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
