// ABOUTME: Built-in candidate selector lists for storefront listing pages.
// ABOUTME: SelectorSet groups the ordered cascades per field and can be overridden from JSON.

use serde::{Deserialize, Serialize};

use crate::extractors::compiled::precompile_selectors;
use crate::extractors::select::Strategy;

const CONTAINER_SELECTORS: &[&str] = &[
    ".js-item-product",
    ".product-item",
    ".item-product",
    ".product-card",
    ".product",
    "[data-product-id]",
    ".item",
    ".grid-item",
];

const NAME_SELECTORS: &[&str] = &[
    ".js-item-name",
    ".item-name",
    ".product-name",
    ".product-title",
    "h2 a",
    "h3 a",
    ".name a",
    "h1",
    "h2",
    "h3",
    ".title",
];

const PRICE_SELECTORS: &[&str] = &[
    ".js-price-display",
    ".price-display",
    ".price",
    ".product-price",
    ".item-price",
    "[data-price]",
    ".money",
    ".amount",
    ".cost",
];

const IMAGE_SELECTORS: &[&str] = &[
    ".js-item-image img",
    ".item-image img",
    ".product-image img",
    ".image img",
    "img[src*=\"cdn\"]",
    "img",
];

const URL_SELECTORS: &[&str] = &[
    ".js-item-link",
    ".item-link",
    ".product-link",
    "a[href*=\"/products/\"]",
    "a[href*=\"/producto/\"]",
    "a",
];

const CATEGORY_SELECTORS: &[&str] = &[
    ".category",
    ".breadcrumb",
    "[data-category]",
    ".product-category",
];

const OUT_OF_STOCK_SELECTORS: &[&str] = &[
    ".js-item-no-stock",
    ".item-no-stock",
    ".label-no-stock",
    ".out-of-stock",
    ".sold-out",
    "[data-out-of-stock]",
];

const NEXT_PAGE_SELECTORS: &[&str] = &[
    ".pagination-next",
    ".next",
    "a[rel=\"next\"]",
    ".pager-next a",
    "[data-page=\"next\"]",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn text_strategies(list: &[&str]) -> Vec<Strategy> {
    list.iter().map(|s| Strategy::text(*s)).collect()
}

fn attr_strategies(list: &[&str], attr: &str) -> Vec<Strategy> {
    list.iter().map(|s| Strategy::attr(*s, attr)).collect()
}

/// Ordered candidate lists for every field read off a listing page.
///
/// Missing keys in a JSON override fall back to the built-in lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    /// Candidate product container selectors; the one with most matches wins.
    pub containers: Vec<String>,
    pub name: Vec<Strategy>,
    pub price: Vec<Strategy>,
    pub url: Vec<Strategy>,
    /// All `src` candidates come before all `data-src` candidates.
    pub image: Vec<Strategy>,
    pub category: Vec<Strategy>,
    /// Any match inside an item marks it out of stock.
    pub out_of_stock: Vec<String>,
    /// Page-level next-page signals.
    pub next_page: Vec<String>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        let mut image = attr_strategies(IMAGE_SELECTORS, "src");
        image.extend(attr_strategies(IMAGE_SELECTORS, "data-src"));

        Self {
            containers: owned(CONTAINER_SELECTORS),
            name: text_strategies(NAME_SELECTORS),
            price: text_strategies(PRICE_SELECTORS),
            url: attr_strategies(URL_SELECTORS, "href"),
            image,
            category: text_strategies(CATEGORY_SELECTORS),
            out_of_stock: owned(OUT_OF_STOCK_SELECTORS),
            next_page: owned(NEXT_PAGE_SELECTORS),
        }
    }
}

impl SelectorSet {
    /// Every CSS selector string referenced by this set.
    pub fn all_css(&self) -> Vec<&str> {
        let strategies = self
            .name
            .iter()
            .chain(&self.price)
            .chain(&self.url)
            .chain(&self.image)
            .chain(&self.category)
            .map(Strategy::css);
        self.containers
            .iter()
            .chain(&self.out_of_stock)
            .chain(&self.next_page)
            .map(String::as_str)
            .chain(strategies)
            .collect()
    }

    /// Compiles every selector of the set into the shared cache.
    pub fn precompile(&self) {
        precompile_selectors(self.all_css());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compiled::get_or_compile;

    #[test]
    fn builtin_selectors_all_compile() {
        let set = SelectorSet::default();
        set.precompile();
        for css in set.all_css() {
            assert!(get_or_compile(css).is_some(), "selector failed to compile: {}", css);
        }
    }

    #[test]
    fn image_cascade_prefers_src_over_data_src() {
        let set = SelectorSet::default();
        let first_data_src = set
            .image
            .iter()
            .position(|s| matches!(s, Strategy::Attr(_, a) if a == "data-src"))
            .unwrap();
        assert_eq!(first_data_src, IMAGE_SELECTORS.len());
        assert!(set.image[..first_data_src]
            .iter()
            .all(|s| matches!(s, Strategy::Attr(_, a) if a == "src")));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let set: SelectorSet =
            serde_json::from_str(r#"{"containers": [".card"], "price": [".precio"]}"#).unwrap();
        assert_eq!(set.containers, vec![".card".to_string()]);
        assert_eq!(set.price, vec![Strategy::text(".precio")]);
        assert_eq!(set.name, SelectorSet::default().name);
        assert_eq!(set.next_page, SelectorSet::default().next_page);
    }
}
