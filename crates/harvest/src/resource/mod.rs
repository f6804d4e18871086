// ABOUTME: Page fetching: the PageFetcher/FetchSession seam and the reqwest-backed HttpFetcher.
// ABOUTME: Handles URL validation, private-network blocking, size limits, status checks and charset decoding.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use once_cell::sync::Lazy;
use tracing::debug;
use url::Url;

use crate::error::CrawlError;

/// Maximum allowed body size (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Accept header sent for listing pages; only the document itself is wanted.
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

/// Kinds of sub-resources a page may pull in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Script,
    Image,
    Stylesheet,
    Font,
    Media,
}

/// Which sub-resources a fetcher may skip while loading a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePolicy {
    pub skip: Vec<ResourceKind>,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            skip: vec![
                ResourceKind::Image,
                ResourceKind::Stylesheet,
                ResourceKind::Font,
            ],
        }
    }
}

impl ResourcePolicy {
    /// A policy that loads everything.
    pub fn load_all() -> Self {
        Self { skip: Vec::new() }
    }

    pub fn allows(&self, kind: ResourceKind) -> bool {
        !self.skip.contains(&kind)
    }
}

/// A fetched listing page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub html: String,
}

/// Source of fetch sessions. One session is opened per source crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, CrawlError>;
}

/// A live fetch resource. `close` must be called once the crawl is done with it.
#[async_trait]
pub trait FetchSession: Send {
    /// Fetches `url`. Non-2xx responses, transport failures and timeouts are errors.
    async fn fetch(
        &mut self,
        url: &str,
        timeout: Duration,
        policy: &ResourcePolicy,
    ) -> Result<FetchedPage, CrawlError>;

    /// Releases the session. Fetching afterwards fails.
    async fn close(&mut self);
}

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherOptions {
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    /// Shared client to use instead of building one per session.
    pub http_client: Option<reqwest::Client>,
}

impl Default for HttpFetcherOptions {
    fn default() -> Self {
        Self {
            user_agent: crate::options::DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
            allow_private_networks: false,
            http_client: None,
        }
    }
}

/// Plain HTTP fetcher.
///
/// No sub-resources are ever requested, so every [`ResourcePolicy`] is
/// satisfied; only the HTML document is downloaded.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    opts: HttpFetcherOptions,
}

impl HttpFetcher {
    pub fn new(opts: HttpFetcherOptions) -> Self {
        Self { opts }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, CrawlError> {
        let client = match &self.opts.http_client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder()
                .user_agent(&self.opts.user_agent)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .map_err(|e| {
                    CrawlError::fetch("", "OpenSession", Some(anyhow::anyhow!("failed to build HTTP client: {}", e)))
                })?,
        };
        Ok(Box::new(HttpSession {
            client: Some(client),
            headers: self.opts.headers.clone(),
            allow_private_networks: self.opts.allow_private_networks,
        }))
    }
}

/// One HTTP client with its own cookie store.
pub struct HttpSession {
    client: Option<reqwest::Client>,
    headers: HashMap<String, String>,
    allow_private_networks: bool,
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch(
        &mut self,
        url: &str,
        timeout: Duration,
        _policy: &ResourcePolicy,
    ) -> Result<FetchedPage, CrawlError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("session closed"))))?;
        fetch(client, url, timeout, &self.headers, self.allow_private_networks).await
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

static PRIVATE_NETS: Lazy<Vec<IpNet>> = Lazy::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .filter_map(|n| n.parse().ok())
    .collect()
});

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    PRIVATE_NETS.iter().any(|net| net.contains(addr))
}

/// Rejects hosts that are, or resolve to, private addresses.
async fn ensure_public_host(target: &Url, url: &str) -> Result<(), CrawlError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(CrawlError::ssrf(
                url,
                "Fetch",
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
        return Ok(());
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("DNS lookup failed: {}", e)))
    })?;
    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(CrawlError::ssrf(
                url,
                "Fetch",
                Some(anyhow::anyhow!("{} resolves to a private address", host)),
            ));
        }
    }
    Ok(())
}

/// Decode body bytes using the Content-Type charset, falling back to detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
    {
        let (decoded, _, _) = encoding.decode(body);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract the charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .to_lowercase()
        .split(';')
        .find_map(|part| {
            part.trim()
                .strip_prefix("charset=")
                .map(|c| c.trim_matches('"').trim_matches('\'').to_string())
        })
}

/// Fetch one page with a plain GET.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    headers: &HashMap<String, String>,
    allow_private_networks: bool,
) -> Result<FetchedPage, CrawlError> {
    if url.is_empty() {
        return Err(CrawlError::invalid_url(url, "Fetch", None));
    }
    let parsed = Url::parse(url).map_err(|e| {
        CrawlError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CrawlError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }
    if !allow_private_networks {
        ensure_public_host(&parsed, url).await?;
    }

    let mut request = client
        .get(url)
        .timeout(timeout)
        .header(reqwest::header::ACCEPT, HTML_ACCEPT);
    for (key, value) in headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            CrawlError::timeout(url, "Fetch", Some(anyhow::anyhow!("request timed out after {:?}", timeout)))
        } else {
            CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
        }
    })?;

    if !allow_private_networks {
        ensure_public_host(response.url(), url).await?;
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("content too large"))));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    if !(200..300).contains(&status) {
        return Err(CrawlError::http_status(url, "Fetch", status));
    }

    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            CrawlError::timeout(url, "Fetch", Some(anyhow::anyhow!("body read timed out")))
        } else {
            CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("failed to read body: {}", e)))
        }
    })?;
    if body.len() > MAX_CONTENT_LENGTH {
        return Err(CrawlError::fetch(url, "Fetch", Some(anyhow::anyhow!("content too large"))));
    }

    debug!(url, status, bytes = body.len(), "fetched page");
    Ok(FetchedPage {
        status,
        url: url.to_string(),
        final_url,
        html: decode_body(&body, content_type.as_deref()),
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn open_options() -> HttpFetcherOptions {
        HttpFetcherOptions {
            allow_private_networks: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn session_fetches_html() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/").header("accept", HTML_ACCEPT);
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body>hola</body></html>");
        });

        let fetcher = HttpFetcher::new(open_options());
        let mut session = fetcher.open_session().await.unwrap();
        let page = session
            .fetch(&server.url("/"), Duration::from_secs(5), &ResourcePolicy::default())
            .await
            .expect("fetch should succeed");
        session.close().await;
        mock.assert();

        assert_eq!(page.status, 200);
        assert!(page.html.contains("hola"));
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn non_2xx_is_a_fetch_error_with_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404).body("not found");
        });

        let fetcher = HttpFetcher::new(open_options());
        let mut session = fetcher.open_session().await.unwrap();
        let err = session
            .fetch(&server.url("/gone"), Duration::from_secs(5), &ResourcePolicy::default())
            .await
            .expect_err("404 must fail");
        assert!(err.is_fetch());
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(500)).body("late");
        });

        let fetcher = HttpFetcher::new(open_options());
        let mut session = fetcher.open_session().await.unwrap();
        let err = session
            .fetch(&server.url("/slow"), Duration::from_millis(50), &ResourcePolicy::default())
            .await
            .expect_err("must time out");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn closed_session_refuses_to_fetch() {
        let fetcher = HttpFetcher::new(open_options());
        let mut session = fetcher.open_session().await.unwrap();
        session.close().await;
        let err = session
            .fetch("https://store.com/", Duration::from_secs(1), &ResourcePolicy::default())
            .await
            .expect_err("closed");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn private_ip_blocked_by_default() {
        let fetcher = HttpFetcher::default();
        let mut session = fetcher.open_session().await.unwrap();
        let err = session
            .fetch("http://127.0.0.1:9/", Duration::from_secs(1), &ResourcePolicy::default())
            .await
            .expect_err("private address");
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn invalid_scheme_rejected() {
        let client = reqwest::Client::new();
        let err = fetch(&client, "ftp://store.com/", Duration::from_secs(1), &HashMap::new(), true)
            .await
            .expect_err("ftp");
        assert!(err.is_invalid_url());
    }

    #[test]
    fn private_ranges() {
        for ip in ["10.1.2.3", "172.16.0.1", "192.168.1.1", "127.0.0.1", "169.254.0.1", "::1", "fd00::1", "fe80::1"] {
            assert!(is_private_ip(&ip.parse().unwrap()), "{} should be private", ip);
        }
        for ip in ["8.8.8.8", "172.32.0.1", "2001:4860:4860::8888"] {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[test]
    fn charset_handling() {
        assert_eq!(extract_charset("text/html; charset=\"ISO-8859-1\""), Some("iso-8859-1".to_string()));
        assert_eq!(extract_charset("text/html"), None);
        let latin1: &[u8] = &[0x4c, 0xe1, 0x6d, 0x70, 0x61, 0x72, 0x61];
        assert_eq!(decode_body(latin1, Some("text/html; charset=iso-8859-1")), "Lámpara");
    }

    #[test]
    fn default_policy_skips_heavy_resources() {
        let policy = ResourcePolicy::default();
        assert!(!policy.allows(ResourceKind::Image));
        assert!(!policy.allows(ResourceKind::Stylesheet));
        assert!(!policy.allows(ResourceKind::Font));
        assert!(policy.allows(ResourceKind::Script));
        assert!(ResourcePolicy::load_all().allows(ResourceKind::Image));
    }
}
