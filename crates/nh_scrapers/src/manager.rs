use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use nh_core::config::Settings;
use nh_core::storage::ArticleStorage;
use nh_core::{CancellationToken, Error, PersistenceError, Result, SaveOutcome, Stats};
use serde::Serialize;

use crate::adapter::{ExtractOutcome, Scraper, SiteAdapter, SiteProfile};
use crate::logging::Logger;

type BoxedScraper = Box<dyn Scraper>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum SourceState {
    /// Harvested recently enough to skip
    Fresh,
    Harvested,
    /// Discovery produced nothing
    Empty,
    /// The source's transport or discovery failed
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub state: SourceState,
    pub discovered: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub save_failures: usize,
}

impl SourceReport {
    fn new(source: &str, state: SourceState) -> Self {
        Self {
            source: source.to_string(),
            state,
            discovered: 0,
            saved: 0,
            duplicates: 0,
            skipped: 0,
            save_failures: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub cancelled: bool,
    pub stats_before: Option<Stats>,
    pub stats_after: Option<Stats>,
}

impl RunReport {
    pub fn total_saved(&self) -> usize {
        self.sources.iter().map(|s| s.saved).sum()
    }
}

/// Drives every configured source through discover, extract and save.
pub struct HarvestManager {
    storage: Arc<dyn ArticleStorage>,
    scrapers: Vec<BoxedScraper>,
    freshness_window: ChronoDuration,
    article_delay: Duration,
    logger: Logger,
}

impl HarvestManager {
    pub fn new(storage: Arc<dyn ArticleStorage>, settings: &Settings) -> Self {
        Self {
            storage,
            scrapers: Vec::new(),
            freshness_window: settings.freshness_window,
            article_delay: settings.article_delay,
            logger: Logger::new(),
        }
    }

    /// Build one adapter per profile.
    pub fn from_profiles(
        storage: Arc<dyn ArticleStorage>,
        profiles: Vec<SiteProfile>,
        settings: &Settings,
    ) -> Result<Self> {
        let mut manager = Self::new(storage, settings);
        for profile in profiles {
            manager.add_scraper(Box::new(SiteAdapter::new(profile, settings)?));
        }
        Ok(manager)
    }

    pub fn add_scraper(&mut self, scraper: BoxedScraper) {
        self.scrapers.push(scraper);
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    pub fn sources(&self) -> Vec<&str> {
        self.scrapers.iter().map(|s| s.source()).collect()
    }

    /// Keep only the named sources (case-insensitive).
    pub fn retain_sources(&mut self, names: &[String]) -> Result<()> {
        if let Some(missing) = names
            .iter()
            .find(|n| !self.scrapers.iter().any(|s| s.source().eq_ignore_ascii_case(n)))
        {
            return Err(Error::Config(format!("unknown source `{}`", missing)));
        }
        self.scrapers
            .retain(|s| names.iter().any(|n| s.source().eq_ignore_ascii_case(n)));
        Ok(())
    }

    pub fn scraper_for(&self, url: &str, source: Option<&str>) -> Result<&dyn Scraper> {
        let found = match source {
            Some(name) => self
                .scrapers
                .iter()
                .find(|s| s.source().eq_ignore_ascii_case(name)),
            None => self.scrapers.iter().find(|s| s.can_handle(url)),
        };
        found
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::Config(format!("no source configured for {}", url)))
    }

    /// Run the single-URL pipeline without touching storage.
    pub async fn extract_url(
        &self,
        url: &str,
        source: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ExtractOutcome> {
        let scraper = self.scraper_for(url, source)?;
        let outcome = scraper.extract_one(url, cancel).await;
        scraper.close().await;
        outcome
    }

    async fn stats_snapshot(&self) -> Option<Stats> {
        match self.storage.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                self.logger.warn(&format!("Could not read stats: {}", e));
                None
            }
        }
    }

    /// Indexes of scrapers, least recently harvested first; never-harvested sources lead.
    async fn staleness_order(&self) -> Vec<(usize, Option<DateTime<Utc>>)> {
        let mut order = Vec::with_capacity(self.scrapers.len());
        for (index, scraper) in self.scrapers.iter().enumerate() {
            let last = match self.storage.last_scrape_time(scraper.source()).await {
                Ok(last) => last,
                Err(e) => {
                    self.logger.warn(&format!(
                        "Could not read last scrape time for {}: {}",
                        scraper.source(),
                        e
                    ));
                    None
                }
            };
            order.push((index, last));
        }
        order.sort_by_key(|(_, last)| *last);
        order
    }

    /// One orchestrator pass over every source.
    pub async fn run(&self, cancel: &CancellationToken) -> RunReport {
        let mut report = RunReport {
            stats_before: self.stats_snapshot().await,
            ..RunReport::default()
        };
        self.logger.info("Starting harvest run");
        if let Some(stats) = &report.stats_before {
            self.logger.info(&format!(
                "Current stats: {} articles across {} sources",
                stats.total_articles,
                stats.sources.len()
            ));
        }

        for (index, last_scrape) in self.staleness_order().await {
            if cancel.is_cancelled() {
                self.logger.info("Shutdown requested, stopping before next source");
                report.cancelled = true;
                break;
            }

            let scraper = self.scrapers[index].as_ref();
            if let Some(last) = last_scrape {
                if Utc::now() - last < self.freshness_window {
                    self.logger
                        .info(&format!("Skipping {}: harvested at {}", scraper.source(), last));
                    report
                        .sources
                        .push(SourceReport::new(scraper.source(), SourceState::Fresh));
                    continue;
                }
            }

            let source_report = self.harvest_source(scraper, cancel).await;
            if source_report.state == SourceState::Cancelled {
                report.cancelled = true;
            }
            report.sources.push(source_report);
        }

        report.stats_after = self.stats_snapshot().await;
        self.logger.info(&format!(
            "Harvest run finished: {} new articles",
            report.total_saved()
        ));
        report
    }

    /// Harvest one source. The scraper is closed on every path out.
    pub async fn harvest_source(&self, scraper: &dyn Scraper, cancel: &CancellationToken) -> SourceReport {
        let logger = Logger::for_source(scraper.source());
        logger.info("Starting harvest");

        let report = self.harvest_inner(scraper, &logger, cancel).await;
        scraper.close().await;

        if report.saved > 0 {
            if let Err(e) = self
                .storage
                .update_scrape_time(scraper.source(), Utc::now())
                .await
            {
                logger.error(&format!("Could not record scrape time: {}", e));
            }
        }
        logger.info(&format!(
            "Completed: {} discovered, {} new, {} already stored, {} skipped",
            report.discovered, report.saved, report.duplicates, report.skipped
        ));
        report
    }

    async fn harvest_inner(
        &self,
        scraper: &dyn Scraper,
        logger: &Logger,
        cancel: &CancellationToken,
    ) -> SourceReport {
        let source = scraper.source();
        let mut report = SourceReport::new(source, SourceState::Harvested);

        let urls = match scraper.discover_all(cancel).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(source, stage = "discover", error = %e, "discovery failed");
                report.state = SourceState::Failed(e.to_string());
                return report;
            }
        };
        report.discovered = urls.len();
        if urls.is_empty() {
            logger.warn("No articles discovered");
            report.state = SourceState::Empty;
            return report;
        }

        for (i, url) in urls.iter().enumerate() {
            if cancel.is_cancelled() || (i > 0 && !self.pause(cancel).await) {
                logger.info("Shutdown requested, stopping source");
                report.state = SourceState::Cancelled;
                break;
            }

            let article = match scraper.extract_one(url, cancel).await {
                Ok(ExtractOutcome::Harvested(article)) => article,
                Ok(ExtractOutcome::Skipped { stage, reason }) => {
                    tracing::info!(url = url.as_str(), source, stage = %stage, reason = %reason, "skipping article");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(url = url.as_str(), source, stage = "fetch", error = %e, "aborting source");
                    report.state = SourceState::Failed(e.to_string());
                    break;
                }
            };

            match self.storage.save_article(&article).await {
                Ok(SaveOutcome::Inserted) => {
                    report.saved += 1;
                    if report.saved % 10 == 0 {
                        logger.info(&format!("Saved {} articles", report.saved));
                    }
                }
                Ok(SaveOutcome::AlreadyExists)
                | Err(Error::Persistence(PersistenceError::DuplicateKey(_))) => {
                    report.duplicates += 1;
                }
                Err(e) => {
                    tracing::warn!(url = url.as_str(), source, stage = "save", error = %e, "article not saved");
                    report.save_failures += 1;
                }
            }
        }

        report
    }

    /// Inter-article politeness delay. Returns false when cancelled while waiting.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.article_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.article_delay) => true,
        }
    }
}
