use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nh_core::storage::ArticleStorage;
use nh_core::{Article, Error, PersistenceError, Result, SaveOutcome, ScrapeStatus, SourceStats, Stats};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        source TEXT NOT NULL,
        published_at TEXT NOT NULL,
        scraped_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles (source)",
    r#"
    CREATE TABLE IF NOT EXISTS scraping_status (
        source TEXT PRIMARY KEY,
        last_scrape TEXT NOT NULL
    )
    "#,
];

/// Map a driver error onto the persistence taxonomy.
fn persistence_error(context: &str, e: sqlx::Error) -> Error {
    let message = format!("{}: {}", context, e);
    let kind = match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PersistenceError::ConnectionLost(message),
        sqlx::Error::Database(db) if db.is_unique_violation() => PersistenceError::DuplicateKey(message),
        _ => PersistenceError::Unavailable(message),
    };
    Error::Persistence(kind)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::Persistence(PersistenceError::Unavailable(format!(
                "stored timestamp `{}` is not RFC 3339: {}",
                raw, e
            )))
        })
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database behind a `sqlite:` URL or a plain path.
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{}", url)
        };
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| Error::Config(format!("invalid database url `{}`: {}", url, e)))?
            .create_if_missing(true);

        // Every connection to `:memory:` opens its own database, so keep exactly one alive.
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| persistence_error("failed to connect to database", e))?;

        let storage = Self { pool };
        storage.migrate().await?;
        tracing::debug!("SQLite storage ready at {}", url);
        Ok(storage)
    }

    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::connect(&format!("sqlite:{}", db_path.display())).await
    }

    async fn migrate(&self) -> Result<()> {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|e| persistence_error(&format!("failed to run migration {}", i), e))?;
        }
        Ok(())
    }

    async fn scrape_statuses(&self) -> Result<Vec<ScrapeStatus>> {
        let rows = sqlx::query("SELECT source, last_scrape FROM scraping_status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence_error("failed to read scrape status", e))?;

        rows.iter()
            .map(|row| {
                Ok(ScrapeStatus {
                    source_name: row.get("source"),
                    last_scrape: parse_timestamp(row.get::<&str, _>("last_scrape"))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ArticleStorage for SqliteStorage {
    async fn save_article(&self, article: &Article) -> Result<SaveOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (url, title, content, source, published_at, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.source)
        .bind(article.published_at.to_rfc3339())
        .bind(article.scraped_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| persistence_error("failed to store article", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveOutcome::AlreadyExists
        } else {
            SaveOutcome::Inserted
        })
    }

    async fn last_scrape_time(&self, source: &str) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT last_scrape FROM scraping_status WHERE source = ?")
            .bind(source)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence_error("failed to read scrape status", e))?;

        row.map(|row| parse_timestamp(row.get::<&str, _>("last_scrape")))
            .transpose()
    }

    async fn update_scrape_time(&self, source: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scraping_status (source, last_scrape) VALUES (?, ?)
            ON CONFLICT(source) DO UPDATE SET last_scrape = excluded.last_scrape
            "#,
        )
        .bind(source)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| persistence_error("failed to update scrape status", e))?;
        Ok(())
    }

    async fn stats(&self) -> Result<Stats> {
        let rows = sqlx::query("SELECT source, COUNT(*) AS n FROM articles GROUP BY source")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence_error("failed to count articles", e))?;

        let mut stats = Stats::default();
        for row in rows {
            let count = row.get::<i64, _>("n").max(0) as u64;
            stats.total_articles += count;
            stats.sources.insert(
                row.get("source"),
                SourceStats {
                    last_scrape: None,
                    article_count: count,
                },
            );
        }
        for status in self.scrape_statuses().await? {
            stats.sources.entry(status.source_name).or_default().last_scrape = Some(status.last_scrape);
        }
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| persistence_error("ping failed", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn article(url: &str, source: &str) -> Article {
        Article {
            url: url.to_string(),
            title: "Test Article".to_string(),
            content: "Test content".to_string(),
            source: source.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_once_per_url() {
        let temp_dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(&temp_dir.path().join("nested/test.db"))
            .await
            .unwrap();

        let a = article("https://a.test/1", "A");
        assert_eq!(storage.save_article(&a).await.unwrap(), SaveOutcome::Inserted);
        assert_eq!(storage.save_article(&a).await.unwrap(), SaveOutcome::AlreadyExists);
        storage.save_article(&article("https://a.test/2", "A")).await.unwrap();
        storage.save_article(&article("https://b.test/1", "B")).await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.sources["A"].article_count, 2);
        assert_eq!(stats.sources["B"].article_count, 1);
    }

    #[tokio::test]
    async fn test_scrape_status_round_trip_and_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("test.db");
        let at = Utc::now() - Duration::minutes(20);
        {
            let storage = SqliteStorage::new_with_path(&path).await.unwrap();
            assert_eq!(storage.last_scrape_time("A").await.unwrap(), None);
            storage.update_scrape_time("A", Utc::now() - Duration::days(1)).await.unwrap();
            storage.update_scrape_time("A", at).await.unwrap();
        }

        let storage = SqliteStorage::connect(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();
        let stored = storage.last_scrape_time("A").await.unwrap().unwrap();
        assert_eq!(stored.timestamp_micros(), at.timestamp_micros());

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.total_articles, 0);
        assert_eq!(stats.sources["A"].article_count, 0);
        assert!(stats.sources["A"].last_scrape.is_some());
    }

    #[tokio::test]
    async fn test_in_memory_url() {
        let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
        storage.ping().await.unwrap();
        storage.save_article(&article("https://a.test/1", "A")).await.unwrap();
        assert_eq!(storage.stats().await.unwrap().total_articles, 1);
    }
}
