//! One generic source adapter, parameterized by a [`SiteProfile`].

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use nh_core::config::Settings;
use nh_core::{Article, CancellationToken, Error, FetchError, FetchMode, Result, SourceDescriptor};
use url::Url;

use crate::discover::{Discoverer, LinkRules, LinkSet, Pagination};
use crate::extract::{extract, ExtractRules};
use crate::fetch::{Fetcher, FetcherConfig, HttpTransport, RenderOptions, RenderedTransport, Transport};
use crate::logging::Logger;
use crate::validate::{Validator, DEFAULT_SPAM_PATTERNS, MIN_TITLE_CHARS};

/// Where in the per-article pipeline a URL was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Extract => write!(f, "extract"),
            Stage::Validate => write!(f, "validate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Harvested(Article),
    Skipped { stage: Stage, reason: String },
}

impl ExtractOutcome {
    fn skipped(stage: Stage, reason: impl ToString) -> Self {
        ExtractOutcome::Skipped {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Harvesting contract the orchestrator drives.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Display name of the source
    fn source(&self) -> &str;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Article URLs across every section, deduplicated, in first-seen order
    async fn discover_all(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Fetch, extract and validate one URL. Per-article problems come back as
    /// [`ExtractOutcome::Skipped`]; `Err` means the source cannot continue.
    async fn extract_one(&self, url: &str, cancel: &CancellationToken) -> Result<ExtractOutcome>;

    /// Release per-pass resources. Called on every exit path of a harvest.
    async fn close(&self) {}
}

/// Site data plus the small set of per-site hooks.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Module id used by the sources file
    pub id: String,
    pub descriptor: SourceDescriptor,
    pub pagination: Pagination,
    pub link_scope: Option<String>,
    pub use_library: bool,
    pub title_selectors: Vec<String>,
    pub content_selectors: Vec<String>,
    pub strip_selectors: Vec<String>,
    pub date_selectors: Vec<String>,
    pub date_formats: Vec<String>,
    pub enforce_title_length: bool,
    pub readiness_selectors: Vec<String>,
    pub scroll_listing_pages: bool,
}

impl SiteProfile {
    pub fn new(id: &str, descriptor: SourceDescriptor) -> Self {
        Self {
            id: id.to_string(),
            descriptor,
            pagination: Pagination::Query("page".to_string()),
            link_scope: None,
            use_library: true,
            title_selectors: vec!["h1".to_string()],
            content_selectors: vec!["article".to_string()],
            strip_selectors: vec!["script".to_string(), "style".to_string()],
            date_selectors: Vec::new(),
            date_formats: Vec::new(),
            enforce_title_length: true,
            readiness_selectors: Vec::new(),
            scroll_listing_pages: false,
        }
    }

    fn extract_rules(&self) -> Result<ExtractRules> {
        fn refs(v: &[String]) -> Vec<&str> {
            v.iter().map(String::as_str).collect()
        }
        ExtractRules::builder()
            .library(self.use_library)
            .titles(&refs(&self.title_selectors))
            .contents(&refs(&self.content_selectors))
            .strip(&refs(&self.strip_selectors))
            .dates(&refs(&self.date_selectors))
            .date_formats(&refs(&self.date_formats))
            .build()
    }

    fn link_rules(&self) -> Result<LinkRules> {
        LinkRules::new(
            &self.descriptor.base_url,
            &self.descriptor.url_pattern,
            &self.descriptor.exclude_keywords,
            self.descriptor.max_links,
            self.link_scope.as_deref(),
        )
    }

    /// Transport matching the descriptor's fetch mode.
    pub fn transport(&self, settings: &Settings) -> Result<Box<dyn Transport>> {
        match self.descriptor.fetch_mode {
            FetchMode::Static => Ok(Box::new(HttpTransport::new(settings.request_timeout)?)),
            FetchMode::Rendered => {
                let mut options = RenderOptions {
                    scroll_listing_pages: self.scroll_listing_pages,
                    article_pattern: Some(self.link_rules()?.pattern),
                    ..RenderOptions::default()
                };
                if !self.readiness_selectors.is_empty() {
                    options.readiness_selectors = self.readiness_selectors.clone();
                }
                Ok(Box::new(RenderedTransport::new(options)))
            }
        }
    }
}

pub struct SiteAdapter {
    profile: SiteProfile,
    host: Option<String>,
    sections: Vec<String>,
    links: LinkRules,
    rules: ExtractRules,
    validator: Validator,
    fetcher: Fetcher,
    max_pages: u32,
    page_delay: std::time::Duration,
    logger: Logger,
}

impl fmt::Debug for SiteAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteAdapter")
            .field("source", &self.profile.descriptor.name)
            .field("mode", &self.fetcher.mode())
            .finish()
    }
}

impl SiteAdapter {
    pub fn new(profile: SiteProfile, settings: &Settings) -> Result<Self> {
        let transport = profile.transport(settings)?;
        let fetcher = Fetcher::new(transport, FetcherConfig::from(settings));
        Self::with_fetcher(profile, settings, fetcher)
    }

    /// Build an adapter around an existing fetcher.
    pub fn with_fetcher(profile: SiteProfile, settings: &Settings, fetcher: Fetcher) -> Result<Self> {
        let validator = Validator::new(
            settings.recency_window,
            profile.enforce_title_length.then_some(MIN_TITLE_CHARS),
            DEFAULT_SPAM_PATTERNS,
        )?;
        let host = Url::parse(&profile.descriptor.base_url)?
            .host_str()
            .map(strip_www);
        Ok(Self {
            host,
            sections: profile.descriptor.section_urls()?,
            links: profile.link_rules()?,
            rules: profile.extract_rules()?,
            validator,
            fetcher,
            max_pages: settings.max_pages,
            page_delay: settings.page_delay,
            logger: Logger::for_source(&profile.descriptor.name),
            profile,
        })
    }
}

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase()
}

#[async_trait]
impl Scraper for SiteAdapter {
    fn source(&self) -> &str {
        &self.profile.descriptor.name
    }

    fn can_handle(&self, url: &str) -> bool {
        let Some(host) = &self.host else {
            return false;
        };
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(strip_www))
            .is_some_and(|h| &h == host)
    }

    async fn discover_all(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let discoverer = Discoverer::new(&self.fetcher, &self.profile.pagination, self.max_pages, self.page_delay);
        let mut links = LinkSet::new();

        for section in &self.sections {
            if links.len() >= self.links.cap || cancel.is_cancelled() {
                break;
            }
            let before = links.len();
            discoverer.discover_into(section, &self.links, &mut links, cancel).await?;
            self.logger
                .debug(&format!("{} new links from {}", links.len() - before, section));
        }

        self.logger.info(&format!(
            "Found {} candidate articles across {} sections",
            links.len(),
            self.sections.len()
        ));
        Ok(links.into_vec())
    }

    async fn extract_one(&self, url: &str, cancel: &CancellationToken) -> Result<ExtractOutcome> {
        let page = match self.fetcher.fetch(url, cancel).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(Error::Fetch(e)),
            Err(e @ FetchError::Forbidden) => {
                self.logger.warn(&format!("{} is forbidden, skipping", url));
                return Ok(ExtractOutcome::skipped(Stage::Fetch, e));
            }
            Err(e) => return Ok(ExtractOutcome::skipped(Stage::Fetch, e)),
        };
        if !page.is_success() {
            return Ok(ExtractOutcome::skipped(
                Stage::Fetch,
                format!("HTTP status {}", page.status),
            ));
        }

        let Some(candidate) = extract(&page, &self.rules) else {
            return Ok(ExtractOutcome::skipped(
                Stage::Extract,
                Error::ExtractionMiss(url.to_string()),
            ));
        };

        if let Err(reason) = self.validator.validate(&candidate) {
            return Ok(ExtractOutcome::skipped(Stage::Validate, reason));
        }

        match candidate.into_article(self.source(), Utc::now()) {
            Some(article) => Ok(ExtractOutcome::Harvested(article)),
            None => Ok(ExtractOutcome::skipped(
                Stage::Validate,
                nh_core::RejectReason::MissingDate,
            )),
        }
    }

    async fn close(&self) {
        self.fetcher.shutdown().await;
    }
}
