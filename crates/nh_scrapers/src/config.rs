use std::path::Path;

use nh_core::{Error, FetchMode, Result};
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::adapter::SiteProfile;
use crate::sites::{builtin_profiles, profile_for};

/// One record of the sources file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub module: String,
    pub base_url: String,
    pub article_url_pattern: String,
    #[serde(default)]
    pub sections: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub max_links: Option<usize>,
    #[serde(default)]
    pub fetch_mode: Option<FetchMode>,
}

impl SourceEntry {
    /// Merge this entry onto the built-in profile its module names.
    pub fn into_profile(self) -> Result<SiteProfile> {
        let mut profile = profile_for(&self.module).ok_or_else(|| {
            Error::Config(format!("source `{}`: unknown module `{}`", self.name, self.module))
        })?;

        Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("source `{}`: invalid base_url `{}`: {}", self.name, self.base_url, e))
        })?;
        Regex::new(&self.article_url_pattern).map_err(|e| {
            Error::Config(format!("source `{}`: invalid article_url_pattern: {}", self.name, e))
        })?;

        let d = &mut profile.descriptor;
        d.name = self.name;
        d.base_url = self.base_url;
        d.url_pattern = self.article_url_pattern;
        if let Some(sections) = self.sections {
            if sections.is_empty() {
                return Err(Error::Config(format!("source `{}`: empty section list", d.name)));
            }
            d.section_paths = sections;
        }
        if let Some(exclude) = self.exclude_keywords {
            d.exclude_keywords = exclude;
        }
        if let Some(max_links) = self.max_links {
            d.max_links = max_links;
        }
        if let Some(mode) = self.fetch_mode {
            d.fetch_mode = mode;
        }
        Ok(profile)
    }
}

pub fn parse_sources(json: &str) -> Result<Vec<SiteProfile>> {
    let entries: Vec<SourceEntry> = serde_json::from_str(json)
        .map_err(|e| Error::Config(format!("malformed sources file: {}", e)))?;
    if entries.is_empty() {
        return Err(Error::Config("sources file lists no sources".to_string()));
    }
    entries.into_iter().map(SourceEntry::into_profile).collect()
}

/// Profiles from a sources file, or every built-in profile when `path` is `None`.
pub fn load_sources(path: Option<&Path>) -> Result<Vec<SiteProfile>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("cannot read sources file {}: {}", path.display(), e))
            })?;
            let profiles = parse_sources(&raw)?;
            tracing::info!("Loaded {} sources from {}", profiles.len(), path.display());
            Ok(profiles)
        }
        None => Ok(builtin_profiles()),
    }
}
