//! Single-page fetcher.
//!
//! One GET per attempt, bounded by a request deadline and a streamed body cap,
//! classified into a [`PageStatus`]. [`PageFetcher::fetch_with_retry`] retries
//! transient outcomes with jittered exponential backoff.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::StreamExt;
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use sitescout_shared::{FetchConfig, PageResult, PageStatus, Result, SiteScoutError};

/// `Accept` header sent with page requests.
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

// ---------------------------------------------------------------------------
// PageSource
// ---------------------------------------------------------------------------

/// Anything that can turn a URL into a classified [`PageResult`].
///
/// Implementations must never panic or error: every failure is a `PageResult`.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(&self, url: &str) -> impl Future<Output = PageResult> + Send;
}

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// HTTP page fetcher. Stateless per call; the client is shared for connection reuse.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
}

impl PageFetcher {
    /// Create a fetcher with the given limits.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                SiteScoutError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Fetch `url`, retrying `failed`/`timeout` outcomes up to `max_retries` times.
    pub async fn fetch_with_retry(&self, url: &str) -> PageResult {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let result = self.fetch(url).await;
            attempts += 1;
            let retries_used = attempts - 1;

            if !result.status.is_retryable() || retries_used >= self.config.max_retries {
                debug!(url, status = %result.status, attempts, "fetch finished");
                return result.with_attempts(attempts, start.elapsed());
            }

            let delay = backoff_delay(
                retries_used,
                self.config.backoff_base(),
                self.config.backoff_max(),
            );
            warn!(
                url,
                status = %result.status,
                error = result.error.as_deref().unwrap_or_default(),
                attempt = attempts,
                delay_ms = delay.as_millis(),
                "transient fetch failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One attempt, no retry.
    pub async fn fetch(&self, url: &str) -> PageResult {
        let start = Instant::now();

        match tokio::time::timeout(self.config.request_timeout(), self.attempt(url, start)).await {
            Ok(result) => result,
            Err(_) => PageResult::failure(
                url,
                PageStatus::Timeout,
                format!("request timed out after {}ms", self.config.request_timeout_ms),
                None,
                start.elapsed(),
            ),
        }
    }

    async fn attempt(&self, url: &str, start: Instant) -> PageResult {
        let response = match self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return network_failure(url, &e, None, start),
        };

        let status = response.status();
        let code = Some(status.as_u16());

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return PageResult::failure(
                url,
                PageStatus::Blocked,
                format!("HTTP {status}"),
                code,
                start.elapsed(),
            );
        }

        if !status.is_success() {
            return PageResult::failure(
                url,
                PageStatus::Failed,
                format!("HTTP {status}"),
                code,
                start.elapsed(),
            );
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !is_html_content_type(&content_type) {
            let error = if content_type.is_empty() {
                "missing content-type".to_string()
            } else {
                format!("non-HTML content-type: {content_type}")
            };
            return PageResult::failure(url, PageStatus::Failed, error, code, start.elapsed());
        }

        let max = self.config.max_body_bytes;

        if let Some(declared) = response.content_length() {
            if declared > max as u64 {
                return PageResult::failure(
                    url,
                    PageStatus::TooLarge,
                    format!("declared body of {declared} bytes exceeds {max} byte limit"),
                    code,
                    start.elapsed(),
                );
            }
        }

        let mut body: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return network_failure(url, &e, code, start),
            };

            if body.len() + chunk.len() > max {
                return PageResult::failure(
                    url,
                    PageStatus::TooLarge,
                    format!("body exceeded {max} byte limit"),
                    code,
                    start.elapsed(),
                );
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body).into_owned();
        PageResult::ok(url, html, status.as_u16(), start.elapsed())
    }
}

impl PageSource for PageFetcher {
    fn fetch_page(&self, url: &str) -> impl Future<Output = PageResult> + Send {
        self.fetch_with_retry(url)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Delay before retry number `retry` (0-based): `base * 2^retry`, capped at `max`, then ±50% jitter.
pub fn backoff_delay(retry: u32, base: Duration, max: Duration) -> Duration {
    let exponential = base
        .saturating_mul(2u32.saturating_pow(retry))
        .min(max);
    let factor: f64 = rand::rng().random_range(0.5..1.5);
    exponential.mul_f64(factor)
}

fn is_html_content_type(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

fn network_failure(
    url: &str,
    error: &reqwest::Error,
    http_status: Option<u16>,
    start: Instant,
) -> PageResult {
    let status = if error.is_timeout() {
        PageStatus::Timeout
    } else {
        PageStatus::Failed
    };
    PageResult::failure(url, status, error.to_string(), http_status, start.elapsed())
}
