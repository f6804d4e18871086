// ABOUTME: Normalization helpers that turn scraped strings into canonical values.
// ABOUTME: Covers locale-formatted prices, relative URLs and stable external identifiers.

//! Normalization module.
//!
//! Submodules:
//! - `price`: locale-formatted price text to a number.
//! - `url`: relative link and image references to absolute URLs.
//! - `identity`: external identifiers derived from product URLs or names.

pub mod identity;
pub mod price;
pub mod url;

pub use identity::resolve_external_id;
pub use price::{normalize_price, parse_price, PriceFormat};
pub use url::resolve_url;
