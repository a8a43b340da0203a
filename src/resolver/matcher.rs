//! Resume-link discovery on profile pages.
//!
//! A profile page is reduced to its anchors, then a prioritized list of
//! independent [`LinkMatcher`] strategies is applied. The first strategy
//! with a matching anchor that points at a PDF wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::utils::{absolutize_url, compile_static_regex, decode_attribute, points_to_pdf};

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<a\s[^>]*>"));
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
});

/// One `<a>` element reduced to the attributes matchers look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub classes: Vec<String>,
}

/// Extracts every anchor with an `href` from `html`, in document order.
#[must_use]
pub fn extract_anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_RE
        .find_iter(html)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let href = attribute_value(&HREF_RE, tag)?;
            let classes = attribute_value(&CLASS_RE, tag)
                .map(|value| value.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            Some(Anchor { href, classes })
        })
        .collect()
}

fn attribute_value(regex: &Regex, tag: &str) -> Option<String> {
    let caps = regex.captures(tag)?;
    let raw = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    let value = decode_attribute(raw.as_str().trim());
    (!value.is_empty()).then_some(value)
}

/// A single link-discovery strategy.
pub trait LinkMatcher: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Returns true if `anchor` is a resume link under this strategy.
    fn matches(&self, anchor: &Anchor) -> bool;
}

/// Matches anchors whose `href` contains a substring (case-insensitive).
#[derive(Debug, Clone)]
pub struct HrefContains {
    needle: String,
}

impl HrefContains {
    #[must_use]
    pub fn new(needle: &str) -> Self {
        Self {
            needle: needle.to_ascii_lowercase(),
        }
    }
}

impl LinkMatcher for HrefContains {
    fn name(&self) -> &str {
        &self.needle
    }

    fn matches(&self, anchor: &Anchor) -> bool {
        anchor.href.to_ascii_lowercase().contains(&self.needle)
    }
}

/// Matches anchors carrying a CSS class.
#[derive(Debug, Clone)]
pub struct HasClass {
    class: String,
}

impl HasClass {
    #[must_use]
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
        }
    }
}

impl LinkMatcher for HasClass {
    fn name(&self) -> &str {
        &self.class
    }

    fn matches(&self, anchor: &Anchor) -> bool {
        anchor.classes.iter().any(|c| c == &self.class)
    }
}

/// Strategies in priority order: href mentions resume, cv, .pdf, download;
/// then the `resume-download` and `cv-download` classes.
#[must_use]
pub fn default_matchers() -> Vec<Box<dyn LinkMatcher>> {
    vec![
        Box::new(HrefContains::new("resume")),
        Box::new(HrefContains::new("cv")),
        Box::new(HrefContains::new(".pdf")),
        Box::new(HrefContains::new("download")),
        Box::new(HasClass::new("resume-download")),
        Box::new(HasClass::new("cv-download")),
    ]
}

/// Finds the resume link on a profile page and returns it as an absolute URL.
///
/// Only anchors whose path ends in `.pdf` are accepted.
#[must_use]
pub fn find_resume_link(
    html: &str,
    page_url: &Url,
    matchers: &[Box<dyn LinkMatcher>],
) -> Option<String> {
    let anchors: Vec<Anchor> = extract_anchors(html)
        .into_iter()
        .filter(|a| points_to_pdf(&a.href))
        .collect();

    matchers.iter().find_map(|matcher| {
        let anchor = anchors.iter().find(|a| matcher.matches(a))?;
        tracing::debug!(matcher = matcher.name(), href = %anchor.href, "resume link matched");
        absolutize_url(&anchor.href, page_url)
    })
}
