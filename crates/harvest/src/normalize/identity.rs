// ABOUTME: Derives a stable external identifier for a product from its URL or, failing that, its name and price.
// ABOUTME: The synthesized fallback changes whenever the name or price changes.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRODUCTS_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/products/(\d+)").unwrap());
static PRODUCTO_SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/producto/([^/?#]+)").unwrap());

/// Maximum length of a synthesized identifier.
pub const MAX_SYNTHESIZED_ID_LEN: usize = 100;

/// Resolves the external id for a product.
///
/// Tried in order:
/// 1. the numeric segment after `/products/`
/// 2. the segment after `/producto/`
/// 3. the last non-empty path segment
///
/// When the URL is absent or none of these apply, falls back to
/// [`synthesize_id`].
pub fn resolve_external_id(url: Option<&str>, name: &str, price: f64) -> String {
    url.and_then(id_from_url)
        .unwrap_or_else(|| synthesize_id(name, price))
}

/// Extracts an id from the path of an absolute product URL.
pub fn id_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    if let Some(caps) = PRODUCTS_ID_RE.captures(&path) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = PRODUCTO_SLUG_RE.captures(&path) {
        return Some(caps[1].to_string());
    }
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .last()
        .map(str::to_string)
}

/// Builds `<slug>_<price>` where the slug is the lowercased name with every
/// character outside `[a-z0-9]` removed, truncated to 100 characters.
pub fn synthesize_id(name: &str, price: f64) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    format!("{}_{}", slug, price)
        .chars()
        .take(MAX_SYNTHESIZED_ID_LEN)
        .collect()
}
