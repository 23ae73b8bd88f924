//! HTTP fetch client with conditional retrieval
//!
//! All feed and page retrieval goes through [`FetchClient`]. Requests carry
//! prior cache validators (ETag / Last-Modified) when available; a 304
//! response surfaces as [`FetchOutcome::NotModified`] so callers can skip
//! unchanged feeds without touching the stored validators. Transient
//! failures are retried with exponential backoff; 4xx responses other than
//! 429 are definitive for the request.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{
        HeaderMap, HeaderValue, ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
        USER_AGENT,
    },
    Client, StatusCode,
};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Opaque cache validators from a prior fetch of the same resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    /// Whether any validator is present
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Result of a conditional fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// Origin reported the resource unchanged; prior validators stay valid
    NotModified,

    /// Fresh payload with the validators to persist for the next fetch
    Fetched { body: String, validators: Validators },
}

/// HTTP client with rate limiting, retry, and conditional GET support
pub struct FetchClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    retry: RetryConfig,
}

impl FetchClient {
    /// Create a client from fetch configuration
    ///
    /// The request timeout bounds every individual attempt; retries are
    /// counted separately by the backoff controller.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Self::with_retry(config, RetryConfig::default())
    }

    /// Create a client with a custom retry policy
    pub fn with_retry(config: &FetchConfig, retry: RetryConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.rate_limit).unwrap_or(NonZeroU32::new(1).unwrap());
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry,
        })
    }

    /// Fetch a URL unconditionally and return its body
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        match self.get_conditional(url, &Validators::default()).await? {
            FetchOutcome::Fetched { body, .. } => Ok(body),
            // no validators were sent, so a 304 is an origin quirk; treat
            // the payload as absent rather than failing the request
            FetchOutcome::NotModified => Ok(String::new()),
        }
    }

    /// Fetch a URL, honoring prior cache validators
    pub async fn get_conditional(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<FetchOutcome, FetchError> {
        with_retry_if(
            &self.retry,
            || self.attempt(url, validators),
            FetchError::is_retryable,
        )
        .await
    }

    /// One rate-limited request attempt
    async fn attempt(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<FetchOutcome, FetchError> {
        self.rate_limiter.until_ready().await;

        let mut headers = self.build_headers();
        if let Some(etag) = &validators.etag {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }
        if let Some(lm) = &validators.last_modified {
            if let Ok(value) = HeaderValue::from_str(lm) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let response = self
            .client
            .get(url)
            .headers(headers)
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

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }

        if status.is_success() {
            let validators = Validators {
                etag: header_string(response.headers(), ETAG),
                last_modified: header_string(response.headers(), LAST_MODIFIED),
            };
            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;
            return Ok(FetchOutcome::Fetched { body, validators });
        }

        if status.is_server_error() {
            Err(FetchError::ServerError(status.as_u16()))
        } else {
            Err(FetchError::ClientError(status.as_u16()))
        }
    }

    /// Build request headers with a rotated User-Agent
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/html;q=0.8,*/*;q=0.7",
            ),
        );

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
