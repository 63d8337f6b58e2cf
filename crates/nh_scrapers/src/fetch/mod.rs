//! Page acquisition: one [`Transport`] per fetch mode, wrapped by a [`Fetcher`]
//! that owns the rate-limit clock and the retry policy.

use std::time::Duration;

use async_trait::async_trait;
use nh_core::config::Settings;
use nh_core::retry::{with_retry, Backoff, RetryConfig, RetryFailure};
use nh_core::{CancellationToken, FetchError, FetchMode};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

pub mod http;
pub mod rendered;

pub use http::HttpTransport;
pub use rendered::{RenderOptions, RenderedTransport};

/// Raw response of a single successful request.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl RawPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request attempt against a remote site. Retrying and pacing live in [`Fetcher`].
#[async_trait]
pub trait Transport: Send + Sync {
    fn mode(&self) -> FetchMode;

    async fn get(&self, url: &str) -> Result<RawPage, FetchError>;

    /// Release any long-lived resources. The transport must stay usable afterwards.
    async fn shutdown(&self) {}
}

/// Single-flight minimum spacing between requests.
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous call returned.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub min_request_interval: Duration,
    pub retry: RetryConfig,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for FetcherConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            min_request_interval: settings.min_request_interval,
            retry: RetryConfig::new(
                settings.fetch_attempts,
                Duration::from_secs(2),
                Backoff::Linear,
            ),
        }
    }
}

pub struct Fetcher {
    transport: Box<dyn Transport>,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, config: FetcherConfig) -> Self {
        Self {
            transport,
            limiter: RateLimiter::new(config.min_request_interval),
            retry: config.retry,
        }
    }

    pub fn mode(&self) -> FetchMode {
        self.transport.mode()
    }

    /// Fetch `url`, retrying throttling and transient failures. `Forbidden` and
    /// malformed responses are returned after the first attempt.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let result = with_retry(&self.retry, FetchError::is_retryable, |attempt| async move {
            self.limiter.acquire().await;
            let result = self.transport.get(url).await;
            if let Err(e) = &result {
                tracing::debug!(url, attempt, error = %e, "fetch attempt failed");
            }
            result
        })
        .await;

        match result {
            Ok(page) => Ok(page),
            Err(RetryFailure { attempts, error }) if error.is_retryable() => {
                tracing::warn!(url, attempts, error = %error, "giving up on fetch");
                Err(FetchError::Exhausted {
                    attempts,
                    last: Box::new(error),
                })
            }
            Err(RetryFailure { error, .. }) => Err(error),
        }
    }

    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}
