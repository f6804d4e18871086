// ABOUTME: Selector cascade resolution: ordered extraction strategies tried until one yields a value.
// ABOUTME: Also picks the product container selector with the most matches on a page.

//! Selector cascade resolution.
//!
//! Key behaviors:
//! - Strategies are tried in declaration order; the first non-empty value wins.
//! - Each strategy looks only at the first element its selector matches.
//! - Text extraction collapses whitespace; attribute extraction trims.
//! - Invalid selectors never match.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::extractors::compiled::get_or_compile;

/// One way of extracting a field value from a DOM subtree.
///
/// Serialized as either a bare selector string (text) or a
/// `[selector, attribute]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Strategy {
    /// Inner text of the first element matching the selector.
    Text(String),
    /// Attribute value of the first element matching the selector.
    Attr(String, String),
}

impl Strategy {
    pub fn text(css: impl Into<String>) -> Self {
        Strategy::Text(css.into())
    }

    pub fn attr(css: impl Into<String>, attr: impl Into<String>) -> Self {
        Strategy::Attr(css.into(), attr.into())
    }

    /// The CSS selector this strategy queries.
    pub fn css(&self) -> &str {
        match self {
            Strategy::Text(css) | Strategy::Attr(css, _) => css,
        }
    }

    fn apply(&self, node: ElementRef<'_>) -> Option<String> {
        let selector = get_or_compile(self.css())?;
        let first = node.select(&selector).next()?;
        let value = match self {
            Strategy::Text(_) => normalize_whitespace(&first.text().collect::<String>()),
            Strategy::Attr(_, attr) => first.value().attr(attr)?.trim().to_string(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the first non-empty value produced by `strategies` under `node`.
pub fn resolve(node: ElementRef<'_>, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| s.apply(node))
}

/// Number of elements in the document matching `css`; zero for invalid selectors.
pub fn count_matches(doc: &Html, css: &str) -> usize {
    get_or_compile(css)
        .map(|sel| doc.select(&sel).count())
        .unwrap_or(0)
}

/// Picks the container selector with the largest positive match count.
///
/// Ties keep the earlier candidate. Returns the winning selector and its count,
/// or `None` when no candidate matches anything.
pub fn choose_container<'a>(doc: &Html, candidates: &'a [String]) -> Option<(&'a str, usize)> {
    let mut best: Option<(&'a str, usize)> = None;
    for css in candidates {
        let count = count_matches(doc, css);
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((css.as_str(), count));
        }
    }
    best
}
