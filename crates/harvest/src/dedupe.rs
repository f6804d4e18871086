// ABOUTME: Removes duplicate products sighted more than once while paging through one source.
// ABOUTME: The seen-set belongs to a single source crawl; the earliest sighting always wins.

use std::collections::HashSet;

use crate::product::CanonicalProduct;

/// Identity of a sighting: name, price and absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    name: String,
    price_bits: u64,
    url: Option<String>,
}

impl DedupKey {
    pub fn of(product: &CanonicalProduct) -> Self {
        Self {
            name: product.name.clone(),
            // -0.0 and 0.0 never reach here; prices are validated positive.
            price_bits: product.price.to_bits(),
            url: product.url.clone(),
        }
    }
}

/// Order-preserving duplicate filter scoped to one source crawl.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is observed.
    pub fn observe(&mut self, product: &CanonicalProduct) -> bool {
        self.seen.insert(DedupKey::of(product))
    }

    /// Keeps only products whose key has not been seen yet, in order.
    pub fn filter(&mut self, products: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
        products.into_iter().filter(|p| self.observe(p)).collect()
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Removes later duplicates from `products`, keeping the first occurrence of each key.
pub fn dedupe(products: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
    Deduplicator::new().filter(products)
}
