// ABOUTME: CLI binary for the storefront catalog crawler.
// ABOUTME: Crawls configured or ad-hoc sources, or extracts one saved listing page, and prints JSON.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use catalog_harvest::{
    load_builtin_sources, load_sources_from_path, summarize, CatalogSource, CrawlResult, Crawler,
    RetryPolicy, MAX_PAGES,
};
use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crawl storefront product listings and print the results as JSON.
#[derive(Parser, Debug)]
#[command(name = "catalog-cli")]
#[command(about = "Crawl storefront product catalogs and print JSON", long_about = None)]
struct Args {
    /// JSON file with an array of sources
    #[arg(long = "sources")]
    sources: Option<PathBuf>,

    /// Crawl the built-in storefront list
    #[arg(long = "builtin")]
    builtin: bool,

    /// Only crawl the source with this id
    #[arg(long = "only")]
    only: Option<u64>,

    /// Saved listing page to extract offline (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// Base URL the saved page was fetched from (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// Maximum listing pages per source (1-50)
    #[arg(long = "max-pages", default_value_t = MAX_PAGES)]
    max_pages: u32,

    /// Pause between requests in milliseconds
    #[arg(long = "delay-ms", default_value_t = 2000)]
    delay_ms: u64,

    /// Per-page timeout in seconds
    #[arg(long = "timeout-secs", default_value_t = 120)]
    timeout_secs: u64,

    /// Retries for transient page failures
    #[arg(long = "retries", default_value_t = 0)]
    retries: u32,

    /// Sources crawled at the same time
    #[arg(long = "concurrency", default_value_t = 1)]
    concurrency: usize,

    /// Currency code for sources without their own
    #[arg(long = "currency", default_value = "ARS")]
    currency: String,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Wrap results with run totals
    #[arg(long = "summary")]
    summary: bool,

    /// Debug logging for the crawler
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Listing URLs to crawl as ad-hoc sources
    #[arg()]
    urls: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,catalog_harvest=debug"
    } else {
        "info,catalog_harvest=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn validate(args: &Args) -> Result<()> {
    if args.html.is_some() && args.url.is_none() {
        bail!("--url is required when using --html");
    }
    let crawl_inputs =
        usize::from(args.sources.is_some()) + usize::from(args.builtin) + usize::from(!args.urls.is_empty());
    if args.html.is_some() && crawl_inputs > 0 {
        bail!("cannot combine --html with sources or URLs");
    }
    if args.html.is_none() && crawl_inputs == 0 {
        bail!("nothing to crawl: pass URLs, --sources FILE, --builtin, or --html with --url");
    }
    if !(1..=MAX_PAGES).contains(&args.max_pages) {
        bail!("--max-pages must be between 1 and {}", MAX_PAGES);
    }
    if args.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }
    Ok(())
}

/// Collects the sources named by the arguments, in order.
fn collect_sources(args: &Args) -> Result<Vec<CatalogSource>> {
    let mut sources = Vec::new();
    if let Some(path) = &args.sources {
        sources.extend(load_sources_from_path(path)?);
    }
    if args.builtin {
        sources.extend(load_builtin_sources());
    }
    let mut last_id = sources.iter().map(|s| s.id).max().unwrap_or(0);
    for url in &args.urls {
        last_id = last_id
            .checked_add(1)
            .ok_or_else(|| anyhow!("no free source id left for {}", url))?;
        let source = CatalogSource::new(last_id, "", url.as_str());
        if source.domain.is_empty() {
            bail!("invalid URL: {}", url);
        }
        let name = source.domain.clone();
        sources.push(CatalogSource { name, ..source });
    }

    if let Some(only) = args.only {
        sources.retain(|s| s.id == only);
        if sources.is_empty() {
            bail!("no source with id {}", only);
        }
    }
    Ok(sources)
}

fn build_crawler(args: &Args) -> Crawler {
    Crawler::builder()
        .max_pages(args.max_pages)
        .request_delay(Duration::from_millis(args.delay_ms))
        .timeout(Duration::from_secs(args.timeout_secs))
        .retry(RetryPolicy::retries(args.retries))
        .max_concurrent_sources(args.concurrency)
        .currency(args.currency.as_str())
        .allow_private_networks(args.allow_private_networks)
        .build()
}

fn extract_file(crawler: &Crawler, html_path: &PathBuf, url: &str) -> Result<serde_json::Value> {
    let html = fs::read_to_string(html_path)
        .map_err(|e| anyhow!("error reading file {:?}: {}", html_path, e))?;
    let source = CatalogSource::new(1, "", url);
    if source.domain.is_empty() {
        bail!("invalid URL: {}", url);
    }
    let page = crawler.extract_page(&source, 1, &html);
    Ok(json!({
        "container": page.container,
        "elements_found": page.elements_found,
        "rejected": page.rejected,
        "has_next_page": page.has_next_page,
        "products": page.products,
    }))
}

fn format_results(results: &[CrawlResult], with_summary: bool) -> Result<String> {
    let value = if with_summary {
        let summary = summarize(results);
        json!({
            "sources_crawled": summary.successful_sources,
            "total_products": summary.total_products,
            "summary": summary,
            "results": results,
        })
    } else {
        serde_json::to_value(results)?
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

fn write_output(args: &Args, output: &str) -> Result<()> {
    match &args.output {
        Some(path) => {
            fs::write(path, output).map_err(|e| anyhow!("error writing to {:?}: {}", path, e))
        }
        None => {
            println!("{}", output);
            Ok(())
        }
    }
}

async fn run(args: &Args) -> Result<bool> {
    let crawler = build_crawler(args);

    if let Some(html_path) = &args.html {
        let url = args.url.as_deref().unwrap_or_default();
        let value = extract_file(&crawler, html_path, url)?;
        write_output(args, &serde_json::to_string_pretty(&value)?)?;
        return Ok(true);
    }

    let sources = collect_sources(args)?;
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing current page");
            on_interrupt.cancel();
        }
    });

    let results = crawler.crawl_all_with_cancel(&sources, &cancel).await;
    write_output(args, &format_results(&results, args.summary)?)?;
    Ok(results.iter().all(|r| r.success))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = validate(&args) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}
