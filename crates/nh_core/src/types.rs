use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A harvested, validated article ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
}

/// Extracted but not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub title: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Stamp the candidate into an article. Returns `None` when there is no publish date.
    pub fn into_article(self, source: &str, scraped_at: DateTime<Utc>) -> Option<Article> {
        let published_at = self.published_at?;
        Some(Article {
            url: self.url,
            title: self.title,
            content: self.content,
            source: source.to_string(),
            published_at,
            scraped_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Static,
    Rendered,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Static => write!(f, "static"),
            FetchMode::Rendered => write!(f, "rendered"),
        }
    }
}

impl FromStr for FetchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(FetchMode::Static),
            "rendered" | "dynamic" => Ok(FetchMode::Rendered),
            other => Err(Error::Config(format!("unknown fetch mode: {}", other))),
        }
    }
}

/// Static description of one site to harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub base_url: String,
    pub section_paths: Vec<String>,
    pub url_pattern: String,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    pub max_links: usize,
    #[serde(default)]
    pub fetch_mode: FetchMode,
}

impl SourceDescriptor {
    /// Absolute section URLs, resolved against `base_url`.
    pub fn section_urls(&self) -> crate::Result<Vec<String>> {
        let base = url::Url::parse(&self.base_url)?;
        self.section_paths
            .iter()
            .map(|path| Ok(base.join(path)?.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeStatus {
    pub source_name: String,
    pub last_scrape: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub last_scrape: Option<DateTime<Utc>>,
    pub article_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_articles: u64,
    pub sources: BTreeMap<String, SourceStats>,
}
