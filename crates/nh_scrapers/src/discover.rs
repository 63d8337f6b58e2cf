use std::collections::HashSet;
use std::time::Duration;

use nh_core::{CancellationToken, Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::Fetcher;

/// How the n-th listing page of a section is addressed. Page 1 is always the
/// section URL itself.
#[derive(Clone)]
pub enum Pagination {
    /// Single page, no pagination
    None,
    /// `section?<param>=N`
    Query(String),
    /// `section/page/N` with the section's trailing slash trimmed
    PathSegment,
    /// `section` + `page/N/`, for sections ending in a slash
    TrailingPath,
    Custom(fn(&str, u32) -> Option<String>),
}

impl std::fmt::Debug for Pagination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pagination::None => write!(f, "None"),
            Pagination::Query(param) => write!(f, "Query({})", param),
            Pagination::PathSegment => write!(f, "PathSegment"),
            Pagination::TrailingPath => write!(f, "TrailingPath"),
            Pagination::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl Pagination {
    pub fn page_url(&self, section_url: &str, page: u32) -> Option<String> {
        if page <= 1 {
            return Some(section_url.to_string());
        }
        match self {
            Pagination::None => None,
            Pagination::Query(param) => {
                let mut url = Url::parse(section_url).ok()?;
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(k, _)| *k != *param)
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair(param, &page.to_string());
                Some(url.to_string())
            }
            Pagination::PathSegment => {
                Some(format!("{}/page/{}", section_url.trim_end_matches('/'), page))
            }
            Pagination::TrailingPath => {
                let base = if section_url.ends_with('/') {
                    section_url.to_string()
                } else {
                    format!("{}/", section_url)
                };
                Some(format!("{}page/{}/", base, page))
            }
            Pagination::Custom(build) => build(section_url, page),
        }
    }
}

/// Which hyperlinks count as article links.
#[derive(Debug, Clone)]
pub struct LinkRules {
    pub base_url: Url,
    /// Anchored at the start of the URL
    pub pattern: Regex,
    /// Lower-cased
    pub exclude_keywords: Vec<String>,
    pub cap: usize,
    /// When set, only anchors inside (or wrapping) matching containers are considered
    pub link_scope: Option<Selector>,
}

impl LinkRules {
    pub fn new(
        base_url: &str,
        pattern: &str,
        exclude_keywords: &[String],
        cap: usize,
        link_scope: Option<&str>,
    ) -> Result<Self> {
        let link_scope = link_scope
            .map(|css| {
                Selector::parse(css)
                    .map_err(|e| Error::Config(format!("invalid link scope `{}`: {}", css, e)))
            })
            .transpose()?;
        Ok(Self {
            base_url: Url::parse(base_url)?,
            pattern: anchored(pattern)?,
            exclude_keywords: exclude_keywords.iter().map(|k| k.to_lowercase()).collect(),
            cap,
            link_scope,
        })
    }

    /// Resolve `href` and return it if it is an acceptable article URL.
    pub fn accept(&self, href: &str) -> Option<String> {
        let mut url = self.base_url.join(href.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);
        let url = url.to_string();

        if !self.pattern.is_match(&url) {
            return None;
        }
        let lower = url.to_lowercase();
        if self.exclude_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return None;
        }
        Some(url)
    }

    /// Accepted links of a listing page, in document order.
    pub fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let hrefs: Vec<&str> = match &self.link_scope {
            None => document
                .select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .collect(),
            Some(scope) => {
                let mut hrefs = Vec::new();
                for container in document.select(scope) {
                    if container.value().name() == "a" {
                        hrefs.extend(container.value().attr("href"));
                    }
                    hrefs.extend(
                        container
                            .select(&anchors)
                            .filter_map(|a: ElementRef| a.value().attr("href")),
                    );
                }
                hrefs
            }
        };

        hrefs.into_iter().filter_map(|href| self.accept(href)).collect()
    }
}

fn anchored(pattern: &str) -> Result<Regex> {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    Ok(Regex::new(&format!("^(?:{})", pattern))?)
}

/// Accumulates article URLs in first-seen order across sections.
#[derive(Debug, Default)]
pub struct LinkSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the URL was not seen before.
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

pub struct Discoverer<'a> {
    fetcher: &'a Fetcher,
    pagination: &'a Pagination,
    max_pages: u32,
    page_delay: Duration,
}

impl<'a> Discoverer<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        pagination: &'a Pagination,
        max_pages: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            pagination,
            max_pages,
            page_delay,
        }
    }

    /// Discover article links of a single section.
    pub async fn discover(
        &self,
        section_url: &str,
        rules: &LinkRules,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let mut links = LinkSet::new();
        self.discover_into(section_url, rules, &mut links, cancel).await?;
        Ok(links.into_vec())
    }

    /// Walk the pages of one section, adding new links to `links` until the
    /// cap is hit, a page adds nothing new, a page fails or pages run out.
    /// A fatal fetch error (the transport cannot run at all) is returned.
    pub async fn discover_into(
        &self,
        section_url: &str,
        rules: &LinkRules,
        links: &mut LinkSet,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for page in 1..=self.max_pages {
            if links.len() >= rules.cap || cancel.is_cancelled() {
                return Ok(());
            }
            let Some(page_url) = self.pagination.page_url(section_url, page) else {
                return Ok(());
            };
            if page > 1 && !self.pause(cancel).await {
                return Ok(());
            }

            let raw = match self.fetcher.fetch(&page_url, cancel).await {
                Ok(raw) if raw.is_success() => raw,
                Ok(raw) => {
                    tracing::warn!(url = %page_url, status = raw.status, stage = "discover", "listing page returned error status");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(Error::Fetch(e)),
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, stage = "discover", "listing page fetch failed");
                    return Ok(());
                }
            };

            let mut added = 0;
            for url in rules.extract_links(&raw.body) {
                if links.len() >= rules.cap {
                    tracing::debug!(section = section_url, cap = rules.cap, "link cap reached");
                    return Ok(());
                }
                if links.insert(url) {
                    added += 1;
                }
            }
            tracing::debug!(url = %page_url, added, total = links.len(), "listing page processed");

            if added == 0 {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.page_delay.is_zero() {
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.page_delay) => true,
        }
    }
}
