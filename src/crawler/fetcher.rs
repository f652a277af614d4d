//! HTTP fetcher implementation
//!
//! Every network request in the crate goes through [`Fetcher::fetch`]:
//! - A hard per-request timeout covering both the send and the body read
//! - Bounded retry with linear backoff (`retry_delay * attempt`) for
//!   transport failures and timeouts
//! - Non-2xx responses are returned as-is and never retried; callers turn
//!   them into skip reasons
//! - An optional body ceiling, checked against `Content-Length` before the
//!   read and against the running total while reading

use crate::config::GenerateOptions;
use crate::{ConfigError, HarvestError};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A completed HTTP exchange, whatever its status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for `text/html` and `application/xhtml+xml`; a missing header counts as HTML
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml+xml")
            }
            None => true,
        }
    }
}

/// Timeout and retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_options(options: &GenerateOptions) -> Self {
        Self {
            timeout: Duration::from_millis(options.timeout_ms),
            retries: options.retries,
            retry_delay: Duration::from_millis(options.retry_delay_ms),
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * attempt
    }
}

/// Shared HTTP client plus retry policy
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    body_limit: Option<usize>,
}

/// Builds an HTTP client with the configured user agent and headers
///
/// # Example
///
/// ```no_run
/// use llms_harvest::config::GenerateOptions;
/// use llms_harvest::crawler::build_http_client;
///
/// let options = GenerateOptions::for_site("https://example.com");
/// let client = build_http_client(&options).unwrap();
/// ```
pub fn build_http_client(options: &GenerateOptions) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        headers.insert(name, value);
    }

    let timeout = Duration::from_millis(options.timeout_ms);

    Ok(Client::builder()
        .user_agent(options.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()?)
}

impl Fetcher {
    pub fn new(options: &GenerateOptions) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(options)?,
            policy: RetryPolicy::from_options(options),
            body_limit: None,
        })
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            body_limit: None,
        }
    }

    /// Rejects 2xx bodies larger than `limit` bytes with
    /// [`HarvestError::ContentTooLarge`], without buffering past the limit
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a URL, retrying transport failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Any HTTP status | Returned immediately |
    /// | Timeout | Retry, `retry_delay * attempt` |
    /// | Connection / transport error | Retry, `retry_delay * attempt` |
    /// | Body over the limit | `ContentTooLarge`, not retried |
    /// | Retries exhausted | Last error returned verbatim |
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, HarvestError> {
        let attempts = self.policy.retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Fetch attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchResponse, HarvestError> {
        let request = async {
            let mut response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;

            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = header_string(response.headers(), CONTENT_TYPE);
            let last_modified = header_string(response.headers(), LAST_MODIFIED)
                .and_then(|v| DateTime::parse_from_rfc2822(&v).ok())
                .map(|dt| dt.with_timezone(&Utc));

            let limit = self
                .body_limit
                .filter(|_| response.status().is_success());

            if let (Some(limit), Some(declared)) = (limit, response.content_length()) {
                if declared > limit as u64 {
                    return Err(too_large(url, declared as usize, limit));
                }
            }

            let mut bytes = Vec::new();
            while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, e))? {
                bytes.extend_from_slice(&chunk);
                if let Some(limit) = limit.filter(|limit| bytes.len() > *limit) {
                    return Err(too_large(url, bytes.len(), limit));
                }
            }

            Ok(FetchResponse {
                url: final_url,
                status,
                content_type,
                last_modified,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        };

        match tokio::time::timeout(self.policy.timeout, request).await {
            Ok(Ok(response)) => {
                tracing::trace!("Fetched {} ({})", url, response.status);
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(HarvestError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

fn too_large(url: &str, size: usize, limit: usize) -> HarvestError {
    HarvestError::ContentTooLarge {
        url: url.to_string(),
        size,
        limit,
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
