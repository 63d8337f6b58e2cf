use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nh_core::storage::ArticleStorage;
use nh_core::{Article, Result, SaveOutcome, SourceStats, Stats};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryStore {
    articles: HashMap<String, Article>,
    scrape_times: HashMap<String, DateTime<Utc>>,
}

impl MemoryStore {
    fn save(&mut self, article: &Article) -> SaveOutcome {
        if self.articles.contains_key(&article.url) {
            return SaveOutcome::AlreadyExists;
        }
        self.articles.insert(article.url.clone(), article.clone());
        SaveOutcome::Inserted
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats {
            total_articles: self.articles.len() as u64,
            ..Stats::default()
        };
        for article in self.articles.values() {
            stats
                .sources
                .entry(article.source.clone())
                .or_insert_with(SourceStats::default)
                .article_count += 1;
        }
        for (source, at) in &self.scrape_times {
            stats.sources.entry(source.clone()).or_default().last_scrape = Some(*at);
        }
        stats
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: RwLock<MemoryStore>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<Article> {
        self.store.read().await.articles.get(url).cloned()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn save_article(&self, article: &Article) -> Result<SaveOutcome> {
        Ok(self.store.write().await.save(article))
    }

    async fn last_scrape_time(&self, source: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.store.read().await.scrape_times.get(source).copied())
    }

    async fn update_scrape_time(&self, source: &str, at: DateTime<Utc>) -> Result<()> {
        self.store
            .write()
            .await
            .scrape_times
            .insert(source.to_string(), at);
        Ok(())
    }

    async fn stats(&self) -> Result<Stats> {
        Ok(self.store.read().await.stats())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(url: &str, source: &str, title: &str) -> Article {
        Article {
            url: url.to_string(),
            title: title.to_string(),
            content: "Body text".to_string(),
            source: source.to_string(),
            published_at: Utc::now(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let storage = MemoryStorage::new();
        let first = article("https://a.test/1", "A", "First title");
        let second = article("https://a.test/1", "A", "Second title");

        assert_eq!(storage.save_article(&first).await.unwrap(), SaveOutcome::Inserted);
        assert_eq!(storage.save_article(&second).await.unwrap(), SaveOutcome::AlreadyExists);
        assert_eq!(storage.get("https://a.test/1").await.unwrap().title, "First title");
    }

    #[tokio::test]
    async fn test_stats_merge_articles_and_scrape_times() {
        let storage = MemoryStorage::new();
        storage.save_article(&article("https://a.test/1", "A", "t")).await.unwrap();
        storage.save_article(&article("https://a.test/2", "A", "t")).await.unwrap();
        storage.save_article(&article("https://b.test/1", "B", "t")).await.unwrap();
        let at = Utc::now() - Duration::minutes(3);
        storage.update_scrape_time("A", at).await.unwrap();
        storage.update_scrape_time("C", at).await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.sources["A"].article_count, 2);
        assert_eq!(stats.sources["A"].last_scrape, Some(at));
        assert_eq!(stats.sources["B"].last_scrape, None);
        assert_eq!(stats.sources["C"].article_count, 0);
    }

    #[tokio::test]
    async fn test_scrape_time_upserts() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.last_scrape_time("A").await.unwrap(), None);
        let earlier = Utc::now() - Duration::hours(1);
        let later = Utc::now();
        storage.update_scrape_time("A", earlier).await.unwrap();
        storage.update_scrape_time("A", later).await.unwrap();
        assert_eq!(storage.last_scrape_time("A").await.unwrap(), Some(later));
    }
}
