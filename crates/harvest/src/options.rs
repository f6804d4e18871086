// ABOUTME: Configuration for the crawler: CrawlOptions, RetryPolicy and the fluent CrawlerBuilder.
// ABOUTME: Defaults reproduce a polite, strictly sequential crawl with a single attempt per page.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::crawler::Crawler;
use crate::extractors::selectors::SelectorSet;
use crate::pagination::MAX_PAGES;
use crate::resource::{HttpFetcher, HttpFetcherOptions, PageFetcher, ResourcePolicy};

/// Browser-like User-Agent; many storefronts serve bots a stripped page.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-page retry with exponential backoff.
///
/// Only transient failures are retried (see [`crate::CrawlError::is_transient`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one. Zero disables retries.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy retrying up to `max_retries` times with default backoff.
    pub fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Configuration options for a [`Crawler`].
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Per-fetch timeout.
    pub timeout: Duration,
    /// Pause between consecutive page requests and between sources.
    pub request_delay: Duration,
    /// Upper bound on pages per source, never above 50.
    pub max_pages: u32,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub resource_policy: ResourcePolicy,
    pub retry: RetryPolicy,
    /// Sources crawled at once; each source stays internally sequential.
    pub max_concurrent_sources: usize,
    /// Currency code for sources that do not set their own.
    pub currency: String,
    pub selectors: SelectorSet,
    pub headers: HashMap<String, String>,
    pub http_client: Option<reqwest::Client>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            request_delay: Duration::from_secs(2),
            max_pages: MAX_PAGES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
            resource_policy: ResourcePolicy::default(),
            retry: RetryPolicy::default(),
            max_concurrent_sources: 1,
            currency: "ARS".to_string(),
            selectors: SelectorSet::default(),
            headers: HashMap::new(),
            http_client: None,
        }
    }
}

/// Builder for constructing [`Crawler`] instances with custom configuration.
#[derive(Clone)]
pub struct CrawlerBuilder {
    opts: CrawlOptions,
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl CrawlerBuilder {
    /// Create a new CrawlerBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: CrawlOptions::default(),
            fetcher: None,
        }
    }

    /// Set the per-fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the pacing delay between requests.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.opts.request_delay = delay;
        self
    }

    /// Set the page limit per source (clamped to 1..=50).
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.opts.max_pages = max_pages.clamp(1, MAX_PAGES);
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    pub fn resource_policy(mut self, policy: ResourcePolicy) -> Self {
        self.opts.resource_policy = policy;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.opts.retry = retry;
        self
    }

    /// Number of sources crawled concurrently (at least 1).
    pub fn max_concurrent_sources(mut self, n: usize) -> Self {
        self.opts.max_concurrent_sources = n.max(1);
        self
    }

    /// Default currency code for products.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.opts.currency = currency.into();
        self
    }

    /// Replace the candidate selector lists.
    pub fn selectors(mut self, selectors: SelectorSet) -> Self {
        self.opts.selectors = selectors;
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Use a custom HTTP client for the default fetcher.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Use a custom page fetcher instead of the HTTP one.
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the Crawler with the configured options.
    pub fn build(self) -> Crawler {
        let fetcher = self.fetcher.unwrap_or_else(|| {
            Arc::new(HttpFetcher::new(HttpFetcherOptions {
                user_agent: self.opts.user_agent.clone(),
                headers: self.opts.headers.clone(),
                allow_private_networks: self.opts.allow_private_networks,
                http_client: self.opts.http_client.clone(),
            }))
        });
        Crawler::new(self.opts, fetcher)
    }
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
