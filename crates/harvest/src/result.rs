// ABOUTME: CrawlResult holding the outcome of crawling one catalog source, plus a multi-source summary.
// ABOUTME: Serializable so callers can hand results to persistence or print them as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::StopReason;
use crate::product::CanonicalProduct;
use crate::source::CatalogSource;

/// The outcome of crawling one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub source: CatalogSource,
    pub success: bool,
    pub products: Vec<CanonicalProduct>,
    /// Pages fetched successfully, including a final page that yielded nothing.
    pub pages_traversed: u32,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub started_at: DateTime<Utc>,
}

impl CrawlResult {
    /// A failed crawl with no products.
    pub fn failed(
        source: CatalogSource,
        error: impl Into<String>,
        stop_reason: Option<StopReason>,
        started_at: DateTime<Utc>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            source,
            success: false,
            products: Vec::new(),
            pages_traversed: 0,
            duration_seconds,
            error: Some(error.into()),
            stop_reason,
            started_at,
        }
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// True when the crawl succeeded but stopped because a later page failed.
    pub fn is_partial(&self) -> bool {
        self.success
            && matches!(
                self.stop_reason,
                Some(StopReason::FetchFailed) | Some(StopReason::Cancelled)
            )
    }
}

/// Totals across a multi-source run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub total_sources: usize,
    pub successful_sources: usize,
    pub failed_sources: usize,
    pub total_products: usize,
}

/// Summarizes a list of results.
pub fn summarize(results: &[CrawlResult]) -> CrawlSummary {
    let successful_sources = results.iter().filter(|r| r.success).count();
    CrawlSummary {
        total_sources: results.len(),
        successful_sources,
        failed_sources: results.len() - successful_sources,
        total_products: results.iter().map(CrawlResult::product_count).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, products: usize, stop: Option<StopReason>) -> CrawlResult {
        let source = CatalogSource::new(1, "Nimba", "https://www.nimba.com.ar/");
        let product = CanonicalProduct {
            source_id: 1,
            external_id: "1".to_string(),
            name: "Mesa".to_string(),
            url: None,
            image_url: None,
            price: 10.0,
            currency: "ARS".to_string(),
            in_stock: true,
            category: None,
        };
        CrawlResult {
            source,
            success,
            products: vec![product; products],
            pages_traversed: 1,
            duration_seconds: 0.5,
            error: None,
            stop_reason: stop,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            result(true, 3, Some(StopReason::NoNextPage)),
            result(false, 0, Some(StopReason::FetchFailed)),
            result(true, 2, Some(StopReason::FetchFailed)),
        ];
        assert_eq!(
            summarize(&results),
            CrawlSummary {
                total_sources: 3,
                successful_sources: 2,
                failed_sources: 1,
                total_products: 5,
            }
        );
        assert!(!results[0].is_partial());
        assert!(!results[1].is_partial());
        assert!(results[2].is_partial());
    }

    #[test]
    fn serializes_without_empty_error() {
        let json = serde_json::to_value(result(true, 1, None)).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["pages_traversed"], 1);
        assert_eq!(json["products"][0]["name"], "Mesa");
    }
}
