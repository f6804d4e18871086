// ABOUTME: Main library entry point for the storefront catalog crawler.
// ABOUTME: Re-exports the public API: Crawler, CrawlerBuilder, CrawlResult, CatalogSource, CrawlError, ErrorCode.

//! Catalog Harvest - a crawler for storefront product catalogs.
//!
//! For every configured source it walks the paginated listing pages, reads
//! product cards through ordered selector cascades, normalizes prices, URLs and
//! identifiers, and returns one deduplicated result per source.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::{load_builtin_sources, summarize, Crawler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let crawler = Crawler::builder().build();
//!     let results = crawler.crawl_all(&load_builtin_sources()).await;
//!     let summary = summarize(&results);
//!     println!("{} products from {} sources", summary.total_products, summary.successful_sources);
//! }
//! ```

pub mod crawler;
pub mod dedupe;
pub mod error;
pub mod extractors;
pub mod normalize;
pub mod options;
pub mod pagination;
pub mod product;
pub mod resource;
pub mod result;
pub mod source;

pub use crate::crawler::Crawler;
pub use crate::dedupe::{dedupe, DedupKey, Deduplicator};
pub use crate::error::{CrawlError, ErrorCode};
pub use crate::extractors::page::{PageExtraction, PageExtractor};
pub use crate::extractors::selectors::SelectorSet;
pub use crate::normalize::{normalize_price, parse_price, resolve_external_id, resolve_url, PriceFormat};
pub use crate::options::{CrawlOptions, CrawlerBuilder, RetryPolicy};
pub use crate::pagination::{StopReason, MAX_PAGES};
pub use crate::product::{CanonicalProduct, RawProductRecord, Rejection};
pub use crate::resource::{
    FetchSession, FetchedPage, HttpFetcher, HttpFetcherOptions, PageFetcher, ResourceKind,
    ResourcePolicy,
};
pub use crate::result::{summarize, CrawlResult, CrawlSummary};
pub use crate::source::{
    load_builtin_sources, load_sources_from_path, load_sources_from_str, CatalogSource,
};
