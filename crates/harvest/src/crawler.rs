// ABOUTME: Crawl orchestrator that drives fetch, extract and paginate for each source, then across sources.
// ABOUTME: Applies pacing delays and per-page retries, isolates failures per source and honors cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dedupe::Deduplicator;
use crate::error::CrawlError;
use crate::extractors::page::{PageExtraction, PageExtractor};
use crate::options::{CrawlOptions, CrawlerBuilder};
use crate::pagination::{PageOutcome, PageState, Paginator, StopReason};
use crate::product::CanonicalProduct;
use crate::resource::{FetchSession, FetchedPage, PageFetcher};
use crate::result::{summarize, CrawlResult};
use crate::source::{CatalogSource, ListingPage};

/// What a finished traversal of one source produced.
struct Traversal {
    products: Vec<CanonicalProduct>,
    last_page: u32,
    reason: StopReason,
    error: Option<CrawlError>,
}

/// The catalog crawler.
pub struct Crawler {
    opts: CrawlOptions,
    fetcher: Arc<dyn PageFetcher>,
    paginator: Paginator,
}

impl Crawler {
    /// Create a new CrawlerBuilder for configuring the crawler.
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    /// Create a crawler from options and a page fetcher.
    pub fn new(opts: CrawlOptions, fetcher: Arc<dyn PageFetcher>) -> Self {
        opts.selectors.precompile();
        let paginator = Paginator::new(opts.max_pages);
        Self {
            opts,
            fetcher,
            paginator,
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.opts
    }

    /// Extracts products from a listing page that was already fetched.
    pub fn extract_page(&self, source: &CatalogSource, page_number: u32, html: &str) -> PageExtraction {
        let page = ListingPage::new(source, page_number);
        self.extractor_for(source).extract(&page, html)
    }

    fn extractor_for<'a>(&'a self, source: &'a CatalogSource) -> PageExtractor<'a> {
        let currency = source.currency.as_deref().unwrap_or(&self.opts.currency);
        PageExtractor::new(
            &self.opts.selectors,
            currency,
            source.price_format.unwrap_or_default(),
        )
    }

    /// Crawls every active source in order.
    pub async fn crawl_all(&self, sources: &[CatalogSource]) -> Vec<CrawlResult> {
        self.crawl_all_with_cancel(sources, &CancellationToken::new())
            .await
    }

    /// Crawls every active source, stopping early once `cancel` fires.
    ///
    /// Inactive sources are skipped without any request and produce no result.
    /// Results are returned in input order regardless of concurrency.
    pub async fn crawl_all_with_cancel(
        &self,
        sources: &[CatalogSource],
        cancel: &CancellationToken,
    ) -> Vec<CrawlResult> {
        let active: Vec<&CatalogSource> = sources
            .iter()
            .filter(|s| {
                if !s.active {
                    info!(source = %s.name, "skipping inactive source");
                }
                s.active
            })
            .collect();
        info!(sources = active.len(), "starting catalog crawl");

        let results: Vec<CrawlResult> = if self.opts.max_concurrent_sources <= 1 {
            let mut results = Vec::with_capacity(active.len());
            for (i, source) in active.iter().enumerate() {
                if i > 0 {
                    debug!(delay = ?self.opts.request_delay, "pausing before next source");
                    self.pause(self.opts.request_delay, cancel).await;
                }
                results.push(self.crawl_source_with_cancel(source, cancel).await);
            }
            results
        } else {
            stream::iter(
                active
                    .iter()
                    .map(|source| self.crawl_source_with_cancel(source, cancel)),
            )
            .buffered(self.opts.max_concurrent_sources)
            .collect()
            .await
        };

        let summary = summarize(&results);
        info!(
            successful = summary.successful_sources,
            total = summary.total_sources,
            products = summary.total_products,
            "catalog crawl finished"
        );
        results
    }

    /// Crawls a single source.
    pub async fn crawl_source(&self, source: &CatalogSource) -> CrawlResult {
        self.crawl_source_with_cancel(source, &CancellationToken::new())
            .await
    }

    /// Crawls a single source, checking `cancel` at every fetch and pause.
    pub async fn crawl_source_with_cancel(
        &self,
        source: &CatalogSource,
        cancel: &CancellationToken,
    ) -> CrawlResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(source = %source.name, url = %source.base_url, "crawling source");

        if cancel.is_cancelled() {
            let err = CrawlError::cancelled(&source.base_url, "Crawl");
            return CrawlResult::failed(
                source.clone(),
                err.to_string(),
                Some(StopReason::Cancelled),
                started_at,
                clock.elapsed().as_secs_f64(),
            );
        }

        let mut session = match self.fetcher.open_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(source = %source.name, error = %err, "could not open fetch session");
                return CrawlResult::failed(
                    source.clone(),
                    err.to_string(),
                    Some(StopReason::FetchFailed),
                    started_at,
                    clock.elapsed().as_secs_f64(),
                );
            }
        };
        let traversal = self.traverse(source, session.as_mut(), cancel).await;
        session.close().await;

        let duration_seconds = clock.elapsed().as_secs_f64();
        if traversal.last_page == 0 {
            let error = traversal
                .error
                .unwrap_or_else(|| CrawlError::cancelled(&source.base_url, "Crawl"));
            warn!(source = %source.name, error = %error, "source crawl failed");
            return CrawlResult::failed(
                source.clone(),
                error.to_string(),
                Some(traversal.reason),
                started_at,
                duration_seconds,
            );
        }

        info!(
            source = %source.name,
            products = traversal.products.len(),
            pages = traversal.last_page,
            reason = ?traversal.reason,
            seconds = duration_seconds,
            "source crawl completed"
        );
        CrawlResult {
            source: source.clone(),
            success: true,
            products: traversal.products,
            pages_traversed: traversal.last_page,
            duration_seconds,
            error: None,
            stop_reason: Some(traversal.reason),
            started_at,
        }
    }

    /// Runs the pagination state machine for one source.
    async fn traverse(
        &self,
        source: &CatalogSource,
        session: &mut dyn FetchSession,
        cancel: &CancellationToken,
    ) -> Traversal {
        let extractor = self.extractor_for(source);
        let mut dedup = Deduplicator::new();
        let mut products = Vec::new();
        let mut error = None;
        let mut state = self.paginator.start();

        loop {
            let page_number = match state {
                PageState::FetchPage(n) => n,
                PageState::Done { last_page, reason } => {
                    return Traversal {
                        products,
                        last_page,
                        reason,
                        error,
                    }
                }
            };

            if page_number > 1 && !self.pause(self.opts.request_delay, cancel).await {
                state = self.paginator.decide(page_number, PageOutcome::Cancelled);
                continue;
            }

            let page = ListingPage::new(source, page_number);
            info!(source = %source.name, page = page_number, url = %page.url, "fetching listing page");

            let outcome = match self.fetch_page(session, &page.url, cancel).await {
                Ok(fetched) => {
                    let extraction = extractor.extract(&page, &fetched.html);
                    let found = extraction.products.len();
                    let fresh = dedup.filter(extraction.products);
                    info!(
                        source = %source.name,
                        page = page_number,
                        found,
                        duplicates = found - fresh.len(),
                        rejected = extraction.rejected,
                        "extracted listing page"
                    );
                    products.extend(fresh);
                    PageOutcome::Extracted {
                        records: found,
                        has_next: extraction.has_next_page,
                    }
                }
                Err(err) if err.is_cancelled() => PageOutcome::Cancelled,
                Err(err) => {
                    warn!(source = %source.name, page = page_number, error = %err, "listing page fetch failed");
                    error = Some(err);
                    PageOutcome::FetchFailed
                }
            };
            state = self.paginator.decide(page_number, outcome);
        }
    }

    /// Fetches one page, retrying transient failures per the retry policy.
    async fn fetch_page(
        &self,
        session: &mut dyn FetchSession,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, CrawlError> {
        let mut retries = 0;
        loop {
            let attempt = tokio::time::timeout(
                self.opts.timeout,
                session.fetch(url, self.opts.timeout, &self.opts.resource_policy),
            );
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CrawlError::cancelled(url, "Fetch")),
                r = attempt => r.unwrap_or_else(|_| {
                    Err(CrawlError::timeout(
                        url,
                        "Fetch",
                        Some(anyhow::anyhow!("no response within {:?}", self.opts.timeout)),
                    ))
                }),
            };
            // Fetchers may report a response status instead of failing.
            let result = result.and_then(|page| {
                if (200..300).contains(&page.status) {
                    Ok(page)
                } else {
                    Err(CrawlError::http_status(url, "Fetch", page.status))
                }
            });

            match result {
                Err(err) if err.is_transient() && retries < self.opts.retry.max_retries => {
                    retries += 1;
                    let backoff = self.opts.retry.backoff(retries);
                    warn!(url, retry = retries, backoff = ?backoff, error = %err, "retrying page fetch");
                    if !self.pause(backoff, cancel).await {
                        return Err(CrawlError::cancelled(url, "Fetch"));
                    }
                }
                other => return other,
            }
        }
    }

    /// Sleeps for `delay`; returns false if cancelled first.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
