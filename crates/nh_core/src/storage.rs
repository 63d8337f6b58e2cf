use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Article, SaveOutcome, Stats};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert an article unless one with the same url is already stored
    async fn save_article(&self, article: &Article) -> Result<SaveOutcome>;

    /// Last recorded harvest time of a source
    async fn last_scrape_time(&self, source: &str) -> Result<Option<DateTime<Utc>>>;

    /// Upsert the harvest time of a source
    async fn update_scrape_time(&self, source: &str, at: DateTime<Utc>) -> Result<()>;

    /// Aggregate counts, computed on demand
    async fn stats(&self) -> Result<Stats>;

    /// Cheap round trip used to check connectivity
    async fn ping(&self) -> Result<()> {
        self.stats().await.map(|_| ())
    }
}
