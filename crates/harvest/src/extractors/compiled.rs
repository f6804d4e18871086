// ABOUTME: Pre-compiled CSS selector cache so every candidate selector is parsed once per process.
// ABOUTME: Invalid selectors are cached as None and behave as "matches nothing".

//! Selector caching for repeated DOM queries.
//!
//! Every listing item runs the same few dozen candidate selectors, so parsing
//! them per item would dominate extraction time. Selectors are compiled on
//! first use and shared afterwards.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use scraper::Selector;

static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector, caching the result.
///
/// Returns `None` for selectors that fail to parse.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Selector::parse(css).ok();
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(css.to_string())
        .or_insert_with(|| compiled)
        .clone()
}

/// Warms the cache with a batch of selectors.
pub fn precompile_selectors<I, S>(selectors: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    for css in selectors {
        let css = css.as_ref();
        if !cache.contains_key(css) {
            cache.insert(css.to_string(), Selector::parse(css).ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_selector_is_cached() {
        assert!(get_or_compile(".js-item-product").is_some());
        assert!(get_or_compile(".js-item-product").is_some());
    }

    #[test]
    fn invalid_selector_returns_none() {
        assert!(get_or_compile("[[[invalid").is_none());
        assert!(get_or_compile("[[[invalid").is_none());
    }

    #[test]
    fn precompile_warms_cache() {
        precompile_selectors(["h2 a", ".price", "a[rel=\"next\"]"]);
        assert!(get_or_compile("h2 a").is_some());
        assert!(get_or_compile(".price").is_some());
        assert!(get_or_compile("a[rel=\"next\"]").is_some());
    }
}
