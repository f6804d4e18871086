// ABOUTME: Catalog source definitions and loaders for source lists supplied as JSON.
// ABOUTME: Includes the transient ListingPage and the embedded built-in storefront list.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::normalize::PriceFormat;
use crate::pagination::page_url;

/// Embedded JSON containing the default storefront list.
const BUILTIN_SOURCES_JSON: &str = include_str!("../data/sources.json");

fn default_active() -> bool {
    true
}

/// One external storefront to crawl. Never mutated by the crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSource {
    pub id: u64,
    pub name: String,
    #[serde(alias = "url")]
    pub base_url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Currency code override for this source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Price separator convention override for this source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_format: Option<PriceFormat>,
}

impl CatalogSource {
    /// Creates an active source, deriving the domain from the base URL.
    pub fn new(id: u64, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let domain = domain_of(&base_url).unwrap_or_default();
        Self {
            id,
            name: name.into(),
            base_url,
            domain,
            active: true,
            currency: None,
            price_format: None,
        }
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Host of `url` without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// One page of a source's listing; exists only while that page is processed.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<'a> {
    pub source: &'a CatalogSource,
    /// 1-based page number.
    pub number: u32,
    pub url: String,
}

impl<'a> ListingPage<'a> {
    pub fn new(source: &'a CatalogSource, number: u32) -> Self {
        Self {
            source,
            number,
            url: page_url(&source.base_url, number),
        }
    }
}

/// Parses a JSON array of sources, filling in missing domains.
pub fn load_sources_from_str(json: &str) -> Result<Vec<CatalogSource>, serde_json::Error> {
    let mut sources: Vec<CatalogSource> = serde_json::from_str(json)?;
    for source in &mut sources {
        if source.domain.is_empty() {
            source.domain = domain_of(&source.base_url).unwrap_or_default();
        }
    }
    Ok(sources)
}

/// Reads and parses a JSON source list from disk.
pub fn load_sources_from_path(path: impl AsRef<Path>) -> anyhow::Result<Vec<CatalogSource>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    load_sources_from_str(&json)
        .map_err(|e| anyhow::anyhow!("invalid source list {}: {}", path.display(), e))
}

/// Loads the embedded built-in source list.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed.
pub fn load_builtin_sources() -> Vec<CatalogSource> {
    load_sources_from_str(BUILTIN_SOURCES_JSON).expect("failed to parse builtin sources")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_sources_load() {
        let sources = load_builtin_sources();
        assert_eq!(sources.len(), 8);
        assert!(sources.iter().all(|s| s.active));
        assert_eq!(sources[0].name, "Shiva Home");
        assert_eq!(sources[0].domain, "shivahome.com.ar");
    }

    #[test]
    fn registry_json_with_url_alias() {
        let json = r#"[
            {"id": 4, "name": "Vienna Hogar", "url": "https://viennahogar.com.ar/", "active": false},
            {"id": 9, "name": "Custom", "base_url": "https://www.custom.com/tienda",
             "currency": "USD", "price_format": {"thousands": ",", "decimal": "."}}
        ]"#;
        let sources = load_sources_from_str(json).unwrap();
        assert_eq!(sources[0].base_url, "https://viennahogar.com.ar/");
        assert_eq!(sources[0].domain, "viennahogar.com.ar");
        assert!(!sources[0].active);
        assert!(sources[1].active);
        assert_eq!(sources[1].domain, "custom.com");
        assert_eq!(sources[1].currency.as_deref(), Some("USD"));
        assert_eq!(
            sources[1].price_format,
            Some(PriceFormat {
                thousands: ',',
                decimal: '.'
            })
        );
    }

    #[test]
    fn listing_page_url() {
        let source = CatalogSource::new(1, "Duvet", "https://www.duvet.com.ar/");
        assert_eq!(ListingPage::new(&source, 1).url, "https://www.duvet.com.ar/");
        assert_eq!(
            ListingPage::new(&source, 2).url,
            "https://www.duvet.com.ar/?page=2"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_sources_from_path("/nonexistent/sources.json").is_err());
    }
}
