//! HTTP fetcher with rate limiting and Japanese encoding support
//!
//! This module provides the page fetcher used for Kakuyomu with features
//! including:
//! - A minimum interval between requests with governor
//! - Automatic retry with exponential backoff and jitter
//! - Charset detection with Shift_JIS / EUC-JP fallback
//! - Browser-like request headers

use crate::config::ScraperConfig;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT},
    Client, Response,
};
use std::time::Duration;

/// Random delay added to each backoff, in milliseconds
const RETRY_JITTER_MS: u64 = 1000;

/// Kakuyomu page fetcher
///
/// Requests are spaced by the configured interval and retried on rate
/// limiting, server errors and timeouts. Client errors are final.
pub struct SiteFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Spacing between requests; `None` when the interval is zero
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    /// Backoff schedule for failed requests
    retry: RetryConfig,

    /// User agent sent with every request
    user_agent: String,
}

impl SiteFetcher {
    /// Create a fetcher with default scraper settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::from_config(&ScraperConfig::default())
    }

    /// Create a fetcher from scraper configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &ScraperConfig) -> Result<Self, FetchError> {
        Self::with_config(
            config.request_interval(),
            RetryConfig::new(config.max_retries).with_jitter(RETRY_JITTER_MS),
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )
    }

    /// Create a fetcher with explicit settings
    ///
    /// # Arguments
    ///
    /// * `interval` - Minimum time between two requests
    /// * `retry` - Backoff schedule
    /// * `timeout` - Request timeout duration
    /// * `user_agent` - User-Agent header value
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        interval: Duration,
        retry: RetryConfig,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate_limiter = Quota::with_period(interval).map(RateLimiter::direct);

        Ok(Self {
            client,
            rate_limiter,
            retry,
            user_agent: user_agent.to_string(),
        })
    }

    /// Fetch a page as text, waiting for the rate limiter and retrying
    ///
    /// # Errors
    ///
    /// Returns the last `FetchError` once retries are exhausted, or the
    /// first non-retryable one
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        with_retry_if(&self.retry, || self.fetch_once(url), FetchError::is_retryable).await
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        tracing::debug!(url, "Fetching page");

        let response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return self.decode_response(response).await;
        }

        let code = status.as_u16();
        if code == 429 {
            Err(FetchError::RateLimit)
        } else if Self::should_retry(code) {
            Err(FetchError::ServerError(code))
        } else {
            Err(FetchError::ClientError(code))
        }
    }

    /// Determine if a status code should trigger a retry
    ///
    /// Retry on 429, 500, 502, 503 and 504; everything else is final.
    fn should_retry(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    async fn decode_response(&self, response: Response) -> Result<String, FetchError> {
        // Get Content-Type header and convert to owned String before consuming response
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;

        self.decode_bytes(&bytes, &content_type)
    }

    /// Decode bytes to a string with encoding detection
    ///
    /// Strategies, in order:
    /// 1. Charset named in the Content-Type header
    /// 2. Strict UTF-8
    /// 3. Charset named in an HTML meta tag
    /// 4. Shift_JIS, then EUC-JP
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if decoding fails with all strategies
    pub fn decode_bytes(&self, bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
        if let Some(encoding) = charset_label(content_type).and_then(Encoding::for_label) {
            return decode_strict(encoding, bytes);
        }

        if let Ok(text) = decode_strict(UTF_8, bytes) {
            return Ok(text);
        }

        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_lowercase();
        if let Some(encoding) = charset_label(&head).and_then(Encoding::for_label) {
            if let Ok(text) = decode_strict(encoding, bytes) {
                return Ok(text);
            }
        }

        for encoding in [SHIFT_JIS, EUC_JP] {
            if let Ok(text) = decode_strict(encoding, bytes) {
                tracing::debug!(encoding = encoding.name(), "Decoded with fallback encoding");
                return Ok(text);
            }
        }

        Err(FetchError::Decode(
            "Failed to decode content with UTF-8, Shift_JIS or EUC-JP".to_string(),
        ))
    }

    /// Build browser-like headers for site requests
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(user_agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, user_agent);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ja-JP,ja;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        headers
    }
}

/// `charset=` value from a Content-Type header or meta tag
fn charset_label(text: &str) -> Option<&[u8]> {
    let lower_start = text.to_ascii_lowercase().find("charset=")?;
    let rest = &text[lower_start + "charset=".len()..];
    let rest = rest.trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let label = &rest[..end];
    (!label.is_empty()).then_some(label.as_bytes())
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, FetchError> {
    let (cow, _encoding, had_errors) = encoding.decode(bytes);

    if had_errors {
        return Err(FetchError::Decode(format!(
            "{} decoding errors",
            encoding.name()
        )));
    }

    Ok(cow.into_owned())
}
