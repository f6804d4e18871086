// ABOUTME: Pagination controller: builds listing page URLs, detects next-page signals and decides when to stop.
// ABOUTME: Traversal is bounded by a hard limit of 50 pages per source.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::extractors::compiled::get_or_compile;

/// Hard upper bound on pages visited for one source.
pub const MAX_PAGES: u32 = 50;

/// Why traversal of a source ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page request failed.
    FetchFailed,
    /// The last page yielded no valid records.
    NoRecords,
    /// No enabled next-page element was found.
    NoNextPage,
    /// The page limit was reached.
    PageLimit,
    /// The crawl was cancelled by the caller.
    Cancelled,
}

/// What happened to the page that was just requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    FetchFailed,
    Cancelled,
    Extracted { records: usize, has_next: bool },
}

/// Traversal state for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    FetchPage(u32),
    /// `last_page` is the last page fetched successfully, 0 if none.
    Done { last_page: u32, reason: StopReason },
}

/// Decides whether to advance to the next listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    max_pages: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
        }
    }
}

impl Paginator {
    /// Creates a paginator; `max_pages` is clamped to `1..=MAX_PAGES`.
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.clamp(1, MAX_PAGES),
        }
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// The initial state: fetch page 1.
    pub fn start(&self) -> PageState {
        PageState::FetchPage(1)
    }

    /// Transition after page `page` produced `outcome`.
    pub fn decide(&self, page: u32, outcome: PageOutcome) -> PageState {
        match outcome {
            PageOutcome::FetchFailed => PageState::Done {
                last_page: page.saturating_sub(1),
                reason: StopReason::FetchFailed,
            },
            PageOutcome::Cancelled => PageState::Done {
                last_page: page.saturating_sub(1),
                reason: StopReason::Cancelled,
            },
            PageOutcome::Extracted { records: 0, .. } => PageState::Done {
                last_page: page,
                reason: StopReason::NoRecords,
            },
            PageOutcome::Extracted {
                has_next: false, ..
            } => PageState::Done {
                last_page: page,
                reason: StopReason::NoNextPage,
            },
            PageOutcome::Extracted { .. } if page + 1 > self.max_pages => PageState::Done {
                last_page: page,
                reason: StopReason::PageLimit,
            },
            PageOutcome::Extracted { .. } => PageState::FetchPage(page + 1),
        }
    }
}

/// Builds the URL of listing page `page` for a source's base URL.
///
/// Page 1 is the base URL unchanged. Later pages set the `page` query
/// parameter; a base path ending in a named segment (other than a
/// `/productos` listing) first gets a trailing slash.
pub fn page_url(base_url: &str, page: u32) -> String {
    if page <= 1 {
        return base_url.to_string();
    }

    let Ok(mut url) = Url::parse(base_url) else {
        return format!("{}?page={}", base_url, page);
    };

    let path = url.path().to_string();
    if path != "/" && !path.contains("/productos") && !path.ends_with('/') {
        url.set_path(&format!("{}/", path));
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("page", &page.to_string());

    url.to_string()
}

/// True when any next-page candidate's first match is enabled.
pub fn has_next_page(doc: &Html, candidates: &[String]) -> bool {
    candidates.iter().any(|css| {
        get_or_compile(css)
            .and_then(|sel| doc.select(&sel).next())
            .is_some_and(|el| !is_disabled(el))
    })
}

/// A pagination control is disabled by attribute, class, ARIA state or inline `display: none`.
fn is_disabled(el: ElementRef<'_>) -> bool {
    let node = el.value();
    if node.attr("disabled").is_some() || node.classes().any(|c| c == "disabled") {
        return true;
    }
    if node.attr("aria-disabled") == Some("true") {
        return true;
    }
    node.attr("style").is_some_and(|style| {
        style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
            .contains("display:none")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::selectors::SelectorSet;
    use proptest::prelude::*;

    fn next_signal(html: &str) -> bool {
        let doc = Html::parse_document(html);
        has_next_page(&doc, &SelectorSet::default().next_page)
    }

    #[test]
    fn page_urls() {
        assert_eq!(page_url("https://store.com/", 1), "https://store.com/");
        assert_eq!(page_url("https://store.com/", 2), "https://store.com/?page=2");
        assert_eq!(
            page_url("https://store.com/productos", 3),
            "https://store.com/productos?page=3"
        );
        assert_eq!(
            page_url("https://store.com/deco", 2),
            "https://store.com/deco/?page=2"
        );
        assert_eq!(
            page_url("https://store.com/deco/", 2),
            "https://store.com/deco/?page=2"
        );
    }

    #[test]
    fn page_url_preserves_other_params_and_replaces_page() {
        assert_eq!(
            page_url("https://store.com/productos?sort=price&page=7", 4),
            "https://store.com/productos?sort=price&page=4"
        );
    }

    #[test]
    fn next_page_signal_detection() {
        assert!(next_signal(r#"<a class="pagination-next" href="?page=2">›</a>"#));
        assert!(next_signal(r#"<link rel="next"><a rel="next" href="?page=2">2</a>"#));
        assert!(!next_signal(r##"<a class="next disabled" href="#">›</a>"##));
        assert!(!next_signal(r#"<button class="next" disabled>›</button>"#));
        assert!(!next_signal(r#"<a class="next" aria-disabled="true">›</a>"#));
        assert!(!next_signal(r#"<a class="next" style="display: none">›</a>"#));
        assert!(!next_signal("<p>no pagination</p>"));
    }

    #[test]
    fn disabled_candidate_does_not_hide_later_enabled_one() {
        assert!(next_signal(
            r#"<span class="pagination-next disabled"></span><a rel="next" href="?page=2">2</a>"#
        ));
    }

    #[test]
    fn decide_transitions() {
        let p = Paginator::default();
        assert_eq!(p.start(), PageState::FetchPage(1));
        assert_eq!(
            p.decide(1, PageOutcome::FetchFailed),
            PageState::Done {
                last_page: 0,
                reason: StopReason::FetchFailed
            }
        );
        assert_eq!(
            p.decide(3, PageOutcome::Extracted { records: 0, has_next: true }),
            PageState::Done {
                last_page: 3,
                reason: StopReason::NoRecords
            }
        );
        assert_eq!(
            p.decide(2, PageOutcome::Extracted { records: 5, has_next: false }),
            PageState::Done {
                last_page: 2,
                reason: StopReason::NoNextPage
            }
        );
        assert_eq!(
            p.decide(2, PageOutcome::Extracted { records: 5, has_next: true }),
            PageState::FetchPage(3)
        );
        assert_eq!(
            p.decide(50, PageOutcome::Extracted { records: 5, has_next: true }),
            PageState::Done {
                last_page: 50,
                reason: StopReason::PageLimit
            }
        );
        assert_eq!(
            p.decide(4, PageOutcome::Cancelled),
            PageState::Done {
                last_page: 3,
                reason: StopReason::Cancelled
            }
        );
    }

    #[test]
    fn max_pages_is_clamped() {
        assert_eq!(Paginator::new(0).max_pages(), 1);
        assert_eq!(Paginator::new(500).max_pages(), MAX_PAGES);
        assert_eq!(Paginator::new(7).max_pages(), 7);
    }

    proptest! {
        #[test]
        fn traversal_is_bounded(max_pages in 0u32..500, records in 1usize..40) {
            let p = Paginator::new(max_pages);
            let mut state = p.start();
            let mut visited = 0u32;
            while let PageState::FetchPage(n) = state {
                visited += 1;
                prop_assert!(visited <= MAX_PAGES);
                state = p.decide(n, PageOutcome::Extracted { records, has_next: true });
            }
            prop_assert!(visited <= MAX_PAGES);
            prop_assert_eq!(
                state,
                PageState::Done { last_page: p.max_pages(), reason: StopReason::PageLimit }
            );
        }
    }
}
