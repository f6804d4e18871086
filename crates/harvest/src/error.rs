// ABOUTME: Error types for the catalog crawler including the ErrorCode enum and CrawlError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing different categories of crawl failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Fetch,
    Timeout,
    Ssrf,
    Cancelled,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Ssrf => "SSRF blocked",
            ErrorCode::Cancelled => "crawl cancelled",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for fetch and crawl operations.
#[derive(Debug, thiserror::Error)]
pub struct CrawlError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl CrawlError {
    fn with_code(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            status: None,
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Fetch, url, op, source)
    }

    /// Create a Fetch error for a response with a non-success status.
    pub fn http_status(url: impl Into<String>, op: impl Into<String>, status: u16) -> Self {
        let mut err = Self::with_code(
            ErrorCode::Fetch,
            url,
            op,
            Some(anyhow::anyhow!("HTTP status {}", status)),
        );
        err.status = Some(status);
        err
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Timeout, url, op, source)
    }

    /// Create an SSRF error.
    pub fn ssrf(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Ssrf, url, op, source)
    }

    /// Create a Cancelled error.
    pub fn cancelled(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Cancelled, url, op, None)
    }

    /// HTTP status of the failed response, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if this is an SSRF error.
    pub fn is_ssrf(&self) -> bool {
        self.code == ErrorCode::Ssrf
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is an InvalidUrl error.
    pub fn is_invalid_url(&self) -> bool {
        self.code == ErrorCode::InvalidUrl
    }

    /// Returns true if the crawl was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport failures, timeouts, 5xx and 429 responses are transient; bad
    /// URLs, blocked addresses and other 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self.code {
            ErrorCode::Timeout => true,
            ErrorCode::Fetch => match self.status {
                Some(status) => status == 429 || (500..600).contains(&status),
                None => true,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_url_code_and_source() {
        let err = CrawlError::http_status("https://store.com/", "Fetch", 503);
        assert_eq!(
            err.to_string(),
            "Fetch https://store.com/: fetch error: HTTP status 503"
        );
        assert_eq!(err.status(), Some(503));
        assert!(err.is_fetch());
    }

    #[test]
    fn transient_classification() {
        assert!(CrawlError::http_status("u", "Fetch", 500).is_transient());
        assert!(CrawlError::http_status("u", "Fetch", 429).is_transient());
        assert!(!CrawlError::http_status("u", "Fetch", 404).is_transient());
        assert!(CrawlError::timeout("u", "Fetch", None).is_transient());
        assert!(CrawlError::fetch("u", "Fetch", Some(anyhow::anyhow!("reset"))).is_transient());
        assert!(!CrawlError::invalid_url("u", "Fetch", None).is_transient());
        assert!(!CrawlError::ssrf("u", "Fetch", None).is_transient());
        assert!(!CrawlError::cancelled("u", "Crawl").is_transient());
    }

    #[test]
    fn cancelled_has_no_source() {
        let err = CrawlError::cancelled("https://store.com/", "Crawl");
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Crawl https://store.com/: crawl cancelled");
    }
}
