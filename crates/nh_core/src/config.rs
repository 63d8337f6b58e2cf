use std::str::FromStr;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::{Error, Result};

/// Runtime knobs shared by the harvesting pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Minimum time between two harvests of the same source
    pub freshness_window: ChronoDuration,
    /// Maximum accepted article age
    pub recency_window: ChronoDuration,
    pub article_delay: Duration,
    pub page_delay: Duration,
    pub min_request_interval: Duration,
    pub request_timeout: Duration,
    pub fetch_attempts: u32,
    /// Hard bound on listing pages walked per section
    pub max_pages: u32,
    pub database_url: String,
    pub storage_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            freshness_window: ChronoDuration::minutes(15),
            recency_window: ChronoDuration::hours(48),
            article_delay: Duration::from_millis(2000),
            page_delay: Duration::from_millis(2000),
            min_request_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            fetch_attempts: 3,
            max_pages: 50,
            database_url: "sqlite:articles.db".to_string(),
            storage_timeout: Duration::from_secs(5),
        }
    }
}

impl Settings {
    /// Read settings from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let freshness_minutes: i64 = parse_or(&get, "NH_FRESHNESS_MINUTES", 15)?;
        let recency_hours: i64 = parse_or(&get, "NH_RECENCY_HOURS", 48)?;
        let article_delay_ms: u64 = parse_or(&get, "NH_ARTICLE_DELAY_MS", 2000)?;
        let page_delay_ms: u64 = parse_or(&get, "NH_PAGE_DELAY_MS", 2000)?;
        let interval_ms: u64 = parse_or(&get, "NH_MIN_REQUEST_INTERVAL_MS", 1000)?;
        let timeout_secs: u64 = parse_or(&get, "NH_REQUEST_TIMEOUT_SECS", 10)?;
        let fetch_attempts: u32 = parse_or(&get, "NH_FETCH_ATTEMPTS", 3)?;
        let max_pages: u32 = parse_or(&get, "NH_MAX_PAGES", 50)?;
        let storage_timeout_secs: u64 = parse_or(&get, "NH_STORAGE_TIMEOUT_SECS", 5)?;

        if freshness_minutes < 0 || recency_hours <= 0 {
            return Err(Error::Config(
                "freshness and recency windows must be positive".to_string(),
            ));
        }
        if fetch_attempts == 0 || max_pages == 0 {
            return Err(Error::Config(
                "NH_FETCH_ATTEMPTS and NH_MAX_PAGES must be at least 1".to_string(),
            ));
        }

        let freshness_window = ChronoDuration::try_minutes(freshness_minutes)
            .ok_or_else(|| Error::Config("NH_FRESHNESS_MINUTES is out of range".to_string()))?;
        let recency_window = ChronoDuration::try_hours(recency_hours)
            .ok_or_else(|| Error::Config("NH_RECENCY_HOURS is out of range".to_string()))?;

        Ok(Self {
            freshness_window,
            recency_window,
            article_delay: Duration::from_millis(article_delay_ms),
            page_delay: Duration::from_millis(page_delay_ms),
            min_request_interval: Duration::from_millis(interval_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            fetch_attempts,
            max_pages,
            database_url: get("NH_DATABASE_URL").unwrap_or(defaults.database_url),
            storage_timeout: Duration::from_secs(storage_timeout_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
