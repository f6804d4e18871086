// ABOUTME: Page extractor that turns one fetched listing page into validated canonical products.
// ABOUTME: Combines container selection, field cascades, price/URL normalization and identity resolution.

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::extractors::compiled::get_or_compile;
use crate::extractors::select::{choose_container, resolve};
use crate::extractors::selectors::SelectorSet;
use crate::normalize::{parse_price, resolve_url, PriceFormat};
use crate::pagination::has_next_page;
use crate::product::{CanonicalProduct, RawProductRecord};
use crate::source::ListingPage;

/// Category hints at or above this many characters are treated as noise.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Everything learned from one listing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtraction {
    /// The container selector chosen for this page, if any matched.
    pub container: Option<String>,
    /// How many elements the chosen container selector matched.
    pub elements_found: usize,
    /// Valid products in document order.
    pub products: Vec<CanonicalProduct>,
    /// Items that failed validation.
    pub rejected: usize,
    /// Whether an enabled next-page element is present.
    pub has_next_page: bool,
}

impl PageExtraction {
    /// True when no container selector matched, i.e. the page had no data.
    pub fn is_empty_page(&self) -> bool {
        self.container.is_none()
    }
}

/// Extracts products from listing pages using a selector set.
#[derive(Debug, Clone)]
pub struct PageExtractor<'a> {
    selectors: &'a SelectorSet,
    currency: &'a str,
    price_format: PriceFormat,
}

impl<'a> PageExtractor<'a> {
    pub fn new(selectors: &'a SelectorSet, currency: &'a str, price_format: PriceFormat) -> Self {
        Self {
            selectors,
            currency,
            price_format,
        }
    }

    /// Parses `html` and extracts every valid product on it.
    pub fn extract(&self, page: &ListingPage<'_>, html: &str) -> PageExtraction {
        let doc = Html::parse_document(html);
        self.extract_document(page, &doc)
    }

    /// Extracts from an already parsed document.
    pub fn extract_document(&self, page: &ListingPage<'_>, doc: &Html) -> PageExtraction {
        let has_next = has_next_page(doc, &self.selectors.next_page);

        let Some((container, elements_found)) = choose_container(doc, &self.selectors.containers)
        else {
            warn!(source = %page.source.name, page = page.number, "no product container selector matched");
            return PageExtraction {
                has_next_page: has_next,
                ..Default::default()
            };
        };
        debug!(
            source = %page.source.name,
            page = page.number,
            selector = container,
            elements = elements_found,
            "using product container selector"
        );

        let mut products = Vec::new();
        let mut rejected = 0;
        if let Some(sel) = get_or_compile(container) {
            for (index, item) in doc.select(&sel).enumerate() {
                let raw = self.extract_item(item, &page.source.base_url);
                match raw.into_canonical(page.source.id, self.currency) {
                    Ok(product) => products.push(product),
                    Err(reason) => {
                        rejected += 1;
                        debug!(page = page.number, item = index + 1, %reason, "discarding listing item");
                    }
                }
            }
        }

        PageExtraction {
            container: Some(container.to_string()),
            elements_found,
            products,
            rejected,
            has_next_page: has_next,
        }
    }

    fn extract_item(&self, item: ElementRef<'_>, base_url: &str) -> RawProductRecord {
        let sel = self.selectors;
        let name = resolve(item, &sel.name);
        let price_text = resolve(item, &sel.price);
        let price = price_text
            .as_deref()
            .and_then(|t| parse_price(t, &self.price_format));
        let url = resolve(item, &sel.url).and_then(|href| resolve_url(base_url, &href));
        let image = resolve(item, &sel.image).and_then(|src| resolve_url(base_url, &src));
        let category = sel
            .category
            .iter()
            .filter_map(|s| resolve(item, std::slice::from_ref(s)))
            .find(|c| c.chars().count() < MAX_CATEGORY_LEN);
        let in_stock = !sel.out_of_stock.iter().any(|css| {
            get_or_compile(css).is_some_and(|s| item.select(&s).next().is_some())
        });

        RawProductRecord {
            name,
            price_text,
            price,
            image,
            url,
            in_stock,
            category,
        }
    }
}
