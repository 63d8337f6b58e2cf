use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nh_core::retry::{with_retry, Backoff, RetryConfig, RetryFailure};
use nh_core::storage::ArticleStorage;
use nh_core::{Article, Error, Result, SaveOutcome, Stats};

/// Retries `ConnectionLost` failures of the wrapped store. Other errors pass straight through.
pub struct RetryingStorage<S> {
    inner: S,
    retry: RetryConfig,
}

impl<S: ArticleStorage> RetryingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, RetryConfig::new(3, Duration::from_millis(500), Backoff::Exponential))
    }

    pub fn with_config(inner: S, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.retry, Error::is_retryable_persistence, call)
            .await
            .map_err(|RetryFailure { attempts, error }| {
                if attempts > 1 {
                    tracing::warn!(operation, attempts, error = %error, "storage operation failed after retries");
                }
                error
            })
    }
}

#[async_trait]
impl<S: ArticleStorage> ArticleStorage for RetryingStorage<S> {
    async fn save_article(&self, article: &Article) -> Result<SaveOutcome> {
        self.retrying("save_article", |_| self.inner.save_article(article))
            .await
    }

    async fn last_scrape_time(&self, source: &str) -> Result<Option<DateTime<Utc>>> {
        self.retrying("last_scrape_time", |_| self.inner.last_scrape_time(source))
            .await
    }

    async fn update_scrape_time(&self, source: &str, at: DateTime<Utc>) -> Result<()> {
        self.retrying("update_scrape_time", |_| self.inner.update_scrape_time(source, at))
            .await
    }

    async fn stats(&self) -> Result<Stats> {
        self.retrying("stats", |_| self.inner.stats()).await
    }

    async fn ping(&self) -> Result<()> {
        self.retrying("ping", |_| self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use nh_core::PersistenceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` saves with the given error.
    struct Flaky {
        inner: MemoryStorage,
        failures: u32,
        error: fn() -> PersistenceError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ArticleStorage for Flaky {
        async fn save_article(&self, article: &Article) -> Result<SaveOutcome> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err((self.error)().into());
            }
            self.inner.save_article(article).await
        }

        async fn last_scrape_time(&self, source: &str) -> Result<Option<DateTime<Utc>>> {
            self.inner.last_scrape_time(source).await
        }

        async fn update_scrape_time(&self, source: &str, at: DateTime<Utc>) -> Result<()> {
            self.inner.update_scrape_time(source, at).await
        }

        async fn stats(&self) -> Result<Stats> {
            self.inner.stats().await
        }
    }

    fn flaky(failures: u32, error: fn() -> PersistenceError) -> RetryingStorage<Flaky> {
        RetryingStorage::with_config(
            Flaky {
                inner: MemoryStorage::new(),
                failures,
                error,
                calls: AtomicU32::new(0),
            },
            RetryConfig::new(3, Duration::from_millis(10), Backoff::Fixed),
        )
    }

    fn article() -> Article {
        Article {
            url: "https://a.test/1".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            source: "A".to_string(),
            published_at: Utc::now(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_loss_is_retried() {
        let storage = flaky(2, || PersistenceError::ConnectionLost("reset".into()));
        assert_eq!(storage.save_article(&article()).await.unwrap(), SaveOutcome::Inserted);
        assert_eq!(storage.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let storage = flaky(5, || PersistenceError::ConnectionLost("reset".into()));
        let err = storage.save_article(&article()).await.unwrap_err();
        assert!(err.is_retryable_persistence());
        assert_eq!(storage.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_retried() {
        let storage = flaky(1, || PersistenceError::Unavailable("disk full".into()));
        assert!(storage.save_article(&article()).await.is_err());
        assert_eq!(storage.inner().calls.load(Ordering::SeqCst), 1);
    }
}
