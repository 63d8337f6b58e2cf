use clap::{Args, Subcommand};
use nh_core::config::Settings;
use nh_core::{CancellationToken, Error, Result, SaveOutcome};

use crate::adapter::{ExtractOutcome, SiteProfile};
use crate::fetch::{Fetcher, FetcherConfig, HttpTransport};
use crate::manager::{HarvestManager, RunReport, SourceState};

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Run one harvest pass over every configured source
    Harvest {
        /// Restrict the run to these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// List configured sources
    List,
    /// Fetch, extract and validate a single article URL
    Url {
        url: String,
        /// Source to use; inferred from the URL host when omitted
        #[arg(long)]
        source: Option<String>,
        /// Store the article when it validates
        #[arg(long)]
        save: bool,
    },
    /// Check that every source's home page is reachable
    Probe,
}

pub async fn handle_command(
    args: ScraperArgs,
    manager: &mut HarvestManager,
    profiles: &[SiteProfile],
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    match args.command {
        ScraperCommands::Harvest { sources } => {
            if !sources.is_empty() {
                manager.retain_sources(&sources)?;
            }
            let report = manager.run(cancel).await;
            print_report(&report);
        }
        ScraperCommands::List => {
            println!("Available sources:");
            for profile in profiles {
                let d = &profile.descriptor;
                println!(
                    "  {:<28} {:<9} {} ({} sections, max {} links)",
                    d.name,
                    d.fetch_mode,
                    d.base_url,
                    d.section_paths.len(),
                    d.max_links
                );
            }
        }
        ScraperCommands::Url { url, source, save } => {
            match manager.extract_url(&url, source.as_deref(), cancel).await? {
                ExtractOutcome::Harvested(article) => {
                    println!("✅ {}", article.title);
                    println!("   source:    {}", article.source);
                    println!("   published: {}", article.published_at.to_rfc3339());
                    println!("   content:   {} chars", article.content.chars().count());
                    if save {
                        match manager.storage().save_article(&article).await? {
                            SaveOutcome::Inserted => println!("💾 saved"),
                            SaveOutcome::AlreadyExists => println!("⏭️  already stored"),
                        }
                    }
                }
                ExtractOutcome::Skipped { stage, reason } => {
                    println!("⏭️  skipped at {}: {}", stage, reason);
                }
            }
        }
        ScraperCommands::Probe => {
            let failures = probe(profiles, settings, cancel).await?;
            if failures > 0 {
                return Err(Error::Config(format!("{} sources unreachable", failures)));
            }
        }
    }
    Ok(())
}

/// Fetch every profile's base URL over the static transport. Returns the number of failures.
pub async fn probe(profiles: &[SiteProfile], settings: &Settings, cancel: &CancellationToken) -> Result<usize> {
    let fetcher = Fetcher::new(
        Box::new(HttpTransport::new(settings.request_timeout)?),
        FetcherConfig::from(settings),
    );
    let mut failures = 0;
    for profile in profiles {
        let d = &profile.descriptor;
        match fetcher.fetch(&d.base_url, cancel).await {
            Ok(page) if page.is_success() => {
                println!("✅ {:<28} {} ({} bytes)", d.name, page.status, page.body.len());
            }
            Ok(page) => {
                failures += 1;
                println!("❌ {:<28} HTTP {}", d.name, page.status);
            }
            Err(e) => {
                failures += 1;
                println!("❌ {:<28} {}", d.name, e);
            }
        }
    }
    Ok(failures)
}

pub fn print_report(report: &RunReport) {
    println!("Harvest summary:");
    for source in &report.sources {
        let state = match &source.state {
            SourceState::Fresh => "fresh, skipped".to_string(),
            SourceState::Harvested => "harvested".to_string(),
            SourceState::Empty => "nothing discovered".to_string(),
            SourceState::Failed(e) => format!("failed: {}", e),
            SourceState::Cancelled => "cancelled".to_string(),
        };
        println!(
            "  {:<28} {:>4} found {:>4} new {:>4} dup {:>4} skipped {:>3} unsaved  [{}]",
            source.source,
            source.discovered,
            source.saved,
            source.duplicates,
            source.skipped,
            source.save_failures,
            state
        );
    }
    if let Some(stats) = &report.stats_after {
        println!("Total articles stored: {}", stats.total_articles);
    }
    if report.cancelled {
        println!("Run interrupted before completion");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ScraperArgs,
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = TestCli::parse_from(["nh", "harvest", "--source", "CNBC", "--source", "NBA"]);
        match cli.args.command {
            ScraperCommands::Harvest { sources } => assert_eq!(sources, vec!["CNBC", "NBA"]),
            other => panic!("unexpected {:?}", other),
        }

        let cli = TestCli::parse_from(["nh", "url", "https://www.nba.com/news/x", "--save"]);
        match cli.args.command {
            ScraperCommands::Url { url, source, save } => {
                assert_eq!(url, "https://www.nba.com/news/x");
                assert!(source.is_none());
                assert!(save);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_harvest_with_unknown_source_is_config_error() {
        let storage = std::sync::Arc::new(nh_storage::MemoryStorage::new());
        let settings = Settings::default();
        let profiles = crate::sites::builtin_profiles();
        let mut manager = HarvestManager::from_profiles(storage, profiles.clone(), &settings).unwrap();

        let args = ScraperArgs {
            command: ScraperCommands::Harvest {
                sources: vec!["espn".to_string()],
            },
        };
        let result = handle_command(args, &mut manager, &profiles, &settings, &CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
