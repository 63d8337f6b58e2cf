use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use nh_core::retry::{with_retry, Backoff, RetryConfig};
use nh_core::storage::ArticleStorage;
use nh_core::{Error, PersistenceError, Result};

pub mod backends;
pub mod retrying;

pub use backends::*;
pub use retrying::RetryingStorage;

/// Storage backends selectable at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(Error::Config(format!(
                "unknown storage backend `{}` (expected memory or sqlite)",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

async fn open(kind: StorageKind, url: &str) -> Result<Arc<dyn ArticleStorage>> {
    let storage: Arc<dyn ArticleStorage> = match kind {
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Arc::new(RetryingStorage::new(SqliteStorage::connect(url).await?)),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(Error::Config(format!(
                "cannot open {}: built without the `sqlite` feature",
                url
            )))
        }
    };
    storage.ping().await?;
    Ok(storage)
}

/// Connect to the selected backend. Each attempt is bounded by `timeout`;
/// persistence failures are retried 3 times with backoff, configuration errors are not.
pub async fn create_storage(kind: StorageKind, url: &str, timeout: Duration) -> Result<Arc<dyn ArticleStorage>> {
    let retry = RetryConfig::new(3, Duration::from_secs(2), Backoff::Exponential);
    let max_attempts = retry.max_attempts;
    let is_retryable = |e: &Error| matches!(e, Error::Persistence(_));

    let result = with_retry(&retry, is_retryable, |attempt| async move {
        let outcome = match tokio::time::timeout(timeout, open(kind, url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PersistenceError::Unavailable(format!(
                "{} storage did not answer within {:?}",
                kind, timeout
            ))
            .into()),
        };
        if let Err(e) = &outcome {
            tracing::warn!("Storage initialization attempt {}/{} failed: {}", attempt, max_attempts, e);
        }
        outcome
    })
    .await;

    match result {
        Ok(storage) => {
            tracing::info!("🏦 Storage backend initialized (using {})", kind);
            Ok(storage)
        }
        Err(failure) => Err(failure.error),
    }
}
