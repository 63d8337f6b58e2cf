use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nh_core::config::Settings;
use nh_core::storage::ArticleStorage;
use nh_core::CancellationToken;
use nh_scrapers::cli::print_report;
use nh_scrapers::{handle_command, init_logging, load_sources, HarvestManager, ScraperArgs, ScraperCommands as NhScraperCommands};
use nh_storage::{MemoryStorage, StorageKind};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too long".to_string())?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds
        if !current_number.is_empty() {
            let secs = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(secs)
                .ok_or_else(|| "Duration is too long".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be positive".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            write!(f, "{}h", h)?;
        }
        if m > 0 {
            write!(f, "{}m", m)?;
        }
        if s > 0 || secs == 0 {
            write!(f, "{}s", s)?;
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Harvest news articles into a local store", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "sqlite", global = true)]
    storage: String,
    /// Database URL; defaults to NH_DATABASE_URL
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Sources file (JSON); the built-in sources are used when omitted
    #[arg(long, env = "NH_SOURCES", global = true)]
    sources: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Harvest every source once, or periodically with --interval
    Harvest {
        /// Restrict the run to these sources (repeatable)
        #[arg(long = "source", id = "harvest_sources", value_name = "SOURCES")]
        sources: Vec<String>,
        /// Re-run with this interval (e.g. 30m, 1h, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// List configured sources
    List,
    /// Run the pipeline on a single article URL
    Url {
        url: String,
        #[arg(long)]
        source: Option<String>,
        /// Store the article when it validates
        #[arg(long)]
        save: bool,
    },
    /// Serve the health/stats endpoint while harvesting periodically
    Serve {
        #[arg(long, default_value = "0.0.0.0:10000")]
        bind: SocketAddr,
        #[arg(long, default_value = "30m")]
        interval: HumanDuration,
    },
    /// Print storage stats as JSON
    Stats,
    /// Check that every source's home page is reachable
    Probe,
}

impl Commands {
    fn needs_storage(&self) -> bool {
        !matches!(self, Commands::List | Commands::Probe)
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    error!("Could not install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("🛑 Shutdown requested, finishing the current article");
        token.cancel();
    });
}

async fn run_periodically(manager: &HarvestManager, interval: HumanDuration, cancel: &CancellationToken) {
    info!("Running in periodic mode with {} interval", interval);
    loop {
        info!("Starting harvest cycle");
        let report = manager.run(cancel).await;
        print_report(&report);
        if cancel.is_cancelled() {
            break;
        }
        info!("Waiting {} before next harvest", interval);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval.0) => {}
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    let profiles = load_sources(cli.sources.as_deref())?;

    let storage: Arc<dyn ArticleStorage> = if cli.command.needs_storage() {
        let kind: StorageKind = cli.storage.parse()?;
        let url = cli.backend_url.as_deref().unwrap_or(&settings.database_url);
        info!("💾 Connecting to {} storage", kind);
        nh_storage::create_storage(kind, url, settings.storage_timeout).await?
    } else {
        Arc::new(MemoryStorage::new())
    };

    let mut manager = HarvestManager::from_profiles(storage.clone(), profiles.clone(), &settings)?;
    info!("🦗 Sources initialized: {}", manager.sources().join(", "));

    let scraper_command = match cli.command {
        Commands::Harvest {
            sources,
            interval: Some(interval),
        } => {
            if !sources.is_empty() {
                manager.retain_sources(&sources)?;
            }
            run_periodically(&manager, interval, &cancel).await;
            return Ok(());
        }
        Commands::Harvest { sources, interval: None } => NhScraperCommands::Harvest { sources },
        Commands::List => NhScraperCommands::List,
        Commands::Url { url, source, save } => NhScraperCommands::Url { url, source, save },
        Commands::Probe => NhScraperCommands::Probe,
        Commands::Serve { bind, interval } => {
            let server_cancel = cancel.clone();
            let server = async {
                let result = nh_web::serve(nh_web::AppState { storage }, bind, server_cancel.clone()).await;
                if result.is_err() {
                    server_cancel.cancel();
                }
                result
            };
            let (served, ()) = tokio::join!(server, run_periodically(&manager, interval, &cancel));
            served?;
            return Ok(());
        }
        Commands::Stats => {
            let stats = storage.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }
    };

    handle_command(
        ScraperArgs {
            command: scraper_command,
        },
        &mut manager,
        &profiles,
        &settings,
        &cancel,
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
