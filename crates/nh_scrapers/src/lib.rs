pub mod adapter;
pub mod cli;
pub mod config;
pub mod discover;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod manager;
pub mod sites;
pub mod validate;

pub use adapter::{ExtractOutcome, Scraper, SiteAdapter, SiteProfile, Stage};
pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use config::load_sources;
pub use logging::init_logging;
pub use manager::{HarvestManager, RunReport, SourceReport, SourceState};
