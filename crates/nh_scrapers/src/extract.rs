//! Article extraction.
//!
//! Title and body come from a readability pass first and from site selectors
//! when that pass leaves a field empty. The publish date has its own chain:
//! metadata tags, JSON-LD, `<time datetime>`, free-text date elements, and
//! finally a `/YYYY/MM/DD/` triple in the URL. Every timestamp ends up in UTC.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use nh_core::{Candidate, Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::RawPage;

/// Selector content shorter than this is not treated as the article body
/// unless nothing better is found.
const MIN_SELECTOR_CONTENT: usize = 100;

const META_DATE_SELECTORS: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[name="article:published_time"]"#,
    r#"meta[name="pubdate"]"#,
    r#"meta[property="og:published_time"]"#,
    r#"meta[itemprop="datePublished"]"#,
    r#"meta[name="date"]"#,
];

const DEFAULT_DATE_SELECTORS: &[&str] = &[
    r#"[class*="timestamp"]"#,
    r#"[class*="published"]"#,
    r#"[class*="date"]"#,
];

pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%A, %B %d, %Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M",
    "%A %d %B %Y %H:%M",
    "%d/%m/%Y, %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%A, %B %d, %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d/%m/%Y",
    "%Y-%m-%d",
];

/// Compiled selector and date rules of one site.
#[derive(Debug, Clone)]
pub struct ExtractRules {
    pub use_library: bool,
    pub title_selectors: Vec<Selector>,
    pub content_selectors: Vec<Selector>,
    /// Subtrees removed from the content container before reading text
    pub strip_selectors: Vec<Selector>,
    pub date_selectors: Vec<Selector>,
    pub date_formats: Vec<String>,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self::builder()
            .build()
            .unwrap_or_else(|_| Self::empty())
    }
}

impl ExtractRules {
    fn empty() -> Self {
        Self {
            use_library: true,
            title_selectors: Vec::new(),
            content_selectors: Vec::new(),
            strip_selectors: Vec::new(),
            date_selectors: Vec::new(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn builder() -> ExtractRulesBuilder {
        ExtractRulesBuilder::default()
    }
}

/// Collects raw CSS strings and compiles them once in [`ExtractRulesBuilder::build`].
#[derive(Debug, Clone)]
pub struct ExtractRulesBuilder {
    use_library: bool,
    title: Vec<String>,
    content: Vec<String>,
    strip: Vec<String>,
    dates: Vec<String>,
    date_formats: Vec<String>,
}

impl Default for ExtractRulesBuilder {
    fn default() -> Self {
        Self {
            use_library: true,
            title: vec!["h1".to_string()],
            content: vec!["article".to_string()],
            strip: vec!["script".to_string(), "style".to_string()],
            dates: DEFAULT_DATE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl ExtractRulesBuilder {
    pub fn library(mut self, enabled: bool) -> Self {
        self.use_library = enabled;
        self
    }

    pub fn titles(mut self, selectors: &[&str]) -> Self {
        self.title = owned(selectors);
        self
    }

    pub fn contents(mut self, selectors: &[&str]) -> Self {
        self.content = owned(selectors);
        self
    }

    pub fn strip(mut self, selectors: &[&str]) -> Self {
        self.strip = owned(selectors);
        self
    }

    /// Free-text date elements tried before the generic ones.
    pub fn dates(mut self, selectors: &[&str]) -> Self {
        let mut dates = owned(selectors);
        dates.extend(DEFAULT_DATE_SELECTORS.iter().map(|s| s.to_string()));
        self.dates = dates;
        self
    }

    /// Date formats tried before the generic ones.
    pub fn date_formats(mut self, formats: &[&str]) -> Self {
        let mut all = owned(formats);
        all.extend(DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()));
        self.date_formats = all;
        self
    }

    pub fn build(self) -> Result<ExtractRules> {
        Ok(ExtractRules {
            use_library: self.use_library,
            title_selectors: compile(&self.title)?,
            content_selectors: compile(&self.content)?,
            strip_selectors: compile(&self.strip)?,
            date_selectors: compile(&self.dates)?,
            date_formats: self.date_formats,
        })
    }
}

pub fn compile(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|css| {
            Selector::parse(css)
                .map_err(|e| Error::Config(format!("invalid selector `{}`: {}", css, e)))
        })
        .collect()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produce a candidate from a fetched page, or `None` when no strategy finds
/// both a title and a body.
pub fn extract(page: &RawPage, rules: &ExtractRules) -> Option<Candidate> {
    let page_url = if page.final_url.is_empty() {
        &page.url
    } else {
        &page.final_url
    };

    let (mut title, mut content) = if rules.use_library {
        library_extract(&page.body, page_url).unwrap_or_default()
    } else {
        Default::default()
    };

    let document = Html::parse_document(&page.body);
    let published_at = extract_date(&document, &page.url, &rules.date_selectors, &rules.date_formats);

    let complete = !title.is_empty() && !content.is_empty() && published_at.is_some();
    if !complete {
        let (selector_title, selector_content) = selector_extract(&document, rules);
        if let Some(t) = selector_title {
            title = t;
        }
        if let Some(c) = selector_content {
            content = c;
        }
    }

    if title.is_empty() || content.is_empty() {
        tracing::debug!(url = %page.url, stage = "extract", "no strategy produced title and content");
        return None;
    }

    Some(Candidate {
        url: page.url.clone(),
        title,
        content,
        published_at,
    })
}

/// Readability pass. Returns normalized `(title, text)`.
fn library_extract(html: &str, page_url: &str) -> Option<(String, String)> {
    let url = Url::parse(page_url).ok()?;
    match readability::extractor::extract(&mut html.as_bytes(), &url) {
        Ok(product) => Some((
            normalize_whitespace(&product.title),
            normalize_whitespace(&product.text),
        )),
        Err(e) => {
            tracing::debug!(url = page_url, error = ?e, "readability extraction failed");
            None
        }
    }
}

/// Selector pass. Returns whichever of `(title, content)` it could find.
pub fn selector_extract(document: &Html, rules: &ExtractRules) -> (Option<String>, Option<String>) {
    let title = rules
        .title_selectors
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .or_else(|| meta_title(document));

    let mut best: Option<String> = None;
    for sel in &rules.content_selectors {
        let Some(container) = document.select(sel).next() else {
            continue;
        };
        let text = container_text(container, &rules.strip_selectors);
        if text.chars().count() >= MIN_SELECTOR_CONTENT {
            return (title, Some(text));
        }
        if !text.is_empty() && best.as_ref().map_or(true, |b| text.len() > b.len()) {
            best = Some(text);
        }
    }

    (title, best)
}

fn meta_title(document: &Html) -> Option<String> {
    let sel = selector(r#"meta[property="og:title"]"#)?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(normalize_whitespace)
        .find(|t| !t.is_empty())
}

/// Paragraph and sub-heading text of `container`, skipping stripped subtrees,
/// joined with single spaces.
pub fn container_text(container: ElementRef, strip: &[Selector]) -> String {
    let stripped: HashSet<_> = strip
        .iter()
        .flat_map(|sel| container.select(sel))
        .map(|el| el.id())
        .collect();

    let Some(blocks) = selector("p, h2, h3, h4") else {
        return String::new();
    };

    container
        .select(&blocks)
        .filter(|el| {
            !stripped.contains(&el.id())
                && !el
                    .ancestors()
                    .take_while(|node| node.id() != container.id())
                    .any(|node| stripped.contains(&node.id()))
        })
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Publish date chain; first strategy that parses wins.
pub fn extract_date(
    document: &Html,
    url: &str,
    date_selectors: &[Selector],
    formats: &[String],
) -> Option<DateTime<Utc>> {
    meta_date(document)
        .or_else(|| json_ld_date(document))
        .or_else(|| time_element_date(document))
        .or_else(|| text_date(document, date_selectors, formats))
        .or_else(|| url_date(url))
}

fn meta_date(document: &Html) -> Option<DateTime<Utc>> {
    META_DATE_SELECTORS
        .iter()
        .filter_map(|css| selector(css))
        .flat_map(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("content").map(str::to_string))
                .collect::<Vec<_>>()
        })
        .find_map(|value| parse_datetime(&value))
}

fn json_ld_date(document: &Html) -> Option<DateTime<Utc>> {
    let sel = selector(r#"script[type="application/ld+json"]"#)?;
    document.select(&sel).find_map(|script| {
        let raw = script.text().collect::<String>();
        let json: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
        json_ld_value_date(&json)
    })
}

fn json_ld_value_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(json_ld_value_date),
        serde_json::Value::Object(map) => ["datePublished", "dateCreated"]
            .iter()
            .filter_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .find_map(parse_datetime)
            .or_else(|| map.get("@graph").and_then(json_ld_value_date)),
        _ => None,
    }
}

fn time_element_date(document: &Html) -> Option<DateTime<Utc>> {
    let sel = selector("time[datetime]")?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("datetime"))
        .find_map(parse_datetime)
}

fn text_date(document: &Html, selectors: &[Selector], formats: &[String]) -> Option<DateTime<Utc>> {
    selectors.iter().find_map(|sel| {
        document.select(sel).find_map(|el| {
            let text = normalize_whitespace(&el.text().collect::<String>());
            if text.is_empty() || text.len() > 120 {
                return None;
            }
            parse_free_text_date(&text, formats)
        })
    })
}

fn url_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").expect("static regex"))
}

pub fn url_date(url: &str) -> Option<DateTime<Utc>> {
    let caps = url_date_regex().captures(url)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Machine-readable timestamps (ISO 8601, RFC 2822 and close relatives).
/// Naive values are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn zone_offset(abbr: &str) -> Option<i32> {
    let hours = match abbr {
        "UTC" | "GMT" | "Z" => 0,
        "BST" | "CET" => 1,
        "CEST" => 2,
        "ET" | "EST" => -5,
        "EDT" => -4,
        "CT" | "CST" => -6,
        "CDT" => -5,
        "MT" | "MST" => -7,
        "MDT" => -6,
        "PT" | "PST" => -8,
        "PDT" => -7,
        "ICT" => 7,
        _ => return None,
    };
    Some(hours * 3600)
}

fn gmt_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(?(?:GMT|UTC)\s*([+-])\s*(\d{1,2})(?::?(\d{2}))?\)?\s*$")
            .expect("static regex")
    })
}

/// Split a trailing zone marker (`ET`, `GMT+7`, `(UTC-04:00)`) off `text`.
fn split_zone(text: &str) -> (String, Option<FixedOffset>) {
    if let Some(caps) = gmt_offset_regex().captures(text) {
        let sign = if &caps[1] == "-" { -1 } else { 1 };
        let hours: i32 = caps[2].parse().unwrap_or(0);
        let minutes: i32 = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60));
        let rest = text[..caps.get(0).map_or(text.len(), |m| m.start())].trim();
        return (rest.to_string(), offset);
    }
    if let Some((rest, last)) = text.rsplit_once(' ') {
        if let Some(secs) = zone_offset(last.trim_matches(|c: char| !c.is_ascii_alphabetic())) {
            return (rest.trim().to_string(), FixedOffset::east_opt(secs));
        }
    }
    (text.to_string(), None)
}

/// Human-written dates such as "Published Mon, Jan 8 2024 9:15 AM ET".
pub fn parse_free_text_date(text: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_datetime(text) {
        return Some(dt);
    }

    let mut cleaned = text.trim().trim_end_matches('.').replace(" at ", " ");
    for prefix in ["Published:", "Published", "Updated:", "Updated", "Posted:", "Posted", "Last updated:"] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim().to_string();
        }
    }
    let (cleaned, offset) = split_zone(cleaned.trim_end_matches(|c: char| c == ',' || c.is_whitespace()));
    let offset = offset.unwrap_or_else(|| Utc.fix());

    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page(url: &str, html: &str) -> RawPage {
        RawPage {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            body: html.to_string(),
        }
    }

    fn cnbc_like_rules() -> ExtractRules {
        ExtractRules::builder()
            .library(false)
            .titles(&["h1.article-title", "h1"])
            .contents(&["div.article__body", "article"])
            .strip(&["div.related-content", "script", "style", ".article-video"])
            .build()
            .unwrap()
    }

    fn long_paragraph(word: &str) -> String {
        std::iter::repeat(word).take(30).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_selector_fallback_when_library_yields_nothing() {
        let body = long_paragraph("goal");
        let html = format!(
            r#"<html><head><meta property="article:published_time" content="2024-05-01T10:00:00Z"></head>
            <body><h1 class="article-title">  Late winner seals title  </h1>
            <div class="article__body"><p>{}</p><h2>Reaction</h2></div></body></html>"#,
            body
        );
        let candidate = extract(&page("https://news.test/a", &html), &cnbc_like_rules()).unwrap();
        assert_eq!(candidate.title, "Late winner seals title");
        assert_eq!(candidate.content, format!("{} Reaction", body));
        assert_eq!(
            candidate.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }

    fn library_page(head: &str) -> String {
        let paragraphs = (0..5)
            .map(|i| format!("<p>Paragraph {} of the report, with the goal, the celebrations, and the reaction of the manager after the final whistle.</p>", i))
            .collect::<String>();
        format!(
            r#"<html><head>{}</head><body><nav><a href="/">Home</a></nav>
            <h1 class="article-title">Late winner seals title</h1>
            <div class="article__body">{}</div></body></html>"#,
            head, paragraphs
        )
    }

    fn library_rules() -> ExtractRules {
        ExtractRules::builder()
            .titles(&["h1.article-title"])
            .contents(&["div.article__body"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_library_result_is_kept_when_complete() {
        let html = library_page(
            r#"<title>Late winner seals title | Site</title>
            <meta property="article:published_time" content="2024-05-01T10:00:00Z">"#,
        );
        let candidate = extract(&page("https://news.test/lib", &html), &library_rules()).unwrap();
        assert_eq!(candidate.title, "Late winner seals title | Site");
        assert!(candidate.content.contains("Paragraph 4 of the report"));
        assert!(candidate.published_at.is_some());
    }

    #[test]
    fn test_selectors_fill_in_when_library_result_is_incomplete() {
        let html = library_page("<title>Late winner seals title | Site</title>");
        let candidate = extract(&page("https://news.test/lib", &html), &library_rules()).unwrap();
        assert_eq!(candidate.title, "Late winner seals title");
        assert!(candidate.content.starts_with("Paragraph 0 of the report"));
        assert!(candidate.published_at.is_none());
    }

    #[test]
    fn test_stripped_subtrees_are_excluded() {
        let body = long_paragraph("match");
        let html = format!(
            r#"<html><body><h1>Headline for the story</h1><div class="article__body">
            <p>{}</p>
            <div class="related-content"><p>Related: read this other story</p></div>
            <div class="article-video"><h3>Watch the video</h3></div>
            </div></body></html>"#,
            body
        );
        let candidate = extract(&page("https://news.test/b", &html), &cnbc_like_rules()).unwrap();
        assert_eq!(candidate.content, body);
        assert!(candidate.published_at.is_none());
    }

    #[test]
    fn test_og_title_fallback_and_short_content_kept_as_best_effort() {
        let html = r#"<html><head><meta property="og:title" content="Meta headline here"></head>
            <body><article><p>Short body.</p></article></body></html>"#;
        let candidate = extract(&page("https://news.test/c", html), &ExtractRules::builder().library(false).titles(&["h1.missing"]).build().unwrap()).unwrap();
        assert_eq!(candidate.title, "Meta headline here");
        assert_eq!(candidate.content, "Short body.");
    }

    #[test]
    fn test_no_title_or_content_yields_none() {
        let html = "<html><body><div>nothing here</div></body></html>";
        assert!(extract(&page("https://news.test/d", html), &cnbc_like_rules()).is_none());
    }

    #[test]
    fn test_date_chain_order() {
        let rules = ExtractRules::default();
        let json_ld = r#"<html><head><script type="application/ld+json">
            [{"@type":"BreadcrumbList"},{"@type":"NewsArticle","datePublished":"2024-03-02T08:30:00+01:00"}]
            </script></head><body><time datetime="2020-01-01T00:00:00Z"></time></body></html>"#;
        let doc = Html::parse_document(json_ld);
        assert_eq!(
            extract_date(&doc, "https://x.test/2019/01/01/a", &rules.date_selectors, &rules.date_formats),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 7, 30, 0).unwrap())
        );

        let time_only = Html::parse_document(r#"<html><body><time datetime="2024-02-01T12:00:00"></time></body></html>"#);
        assert_eq!(
            extract_date(&time_only, "https://x.test/a", &rules.date_selectors, &rules.date_formats),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap())
        );

        let graph = Html::parse_document(r#"<html><head><script type="application/ld+json">
            {"@graph":[{"dateCreated":"2024-04-04"}]}</script></head></html>"#);
        assert_eq!(
            extract_date(&graph, "https://x.test/a", &rules.date_selectors, &rules.date_formats),
            Some(Utc.with_ymd_and_hms(2024, 4, 4, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_free_text_and_url_fallbacks() {
        let rules = ExtractRules::default();
        let doc = Html::parse_document(
            r#"<html><body><span class="article-timestamp">Published Mon, Jan 8 2024</span>
            <div class="byline-date">January 8, 2024 9:15 AM ET</div></body></html>"#,
        );
        assert_eq!(
            extract_date(&doc, "https://x.test/a", &rules.date_selectors, &rules.date_formats),
            Some(Utc.with_ymd_and_hms(2024, 1, 8, 14, 15, 0).unwrap())
        );

        let empty = Html::parse_document("<html><body></body></html>");
        assert_eq!(
            extract_date(&empty, "https://x.test/2023/12/31/story/", &rules.date_selectors, &rules.date_formats),
            Some(Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap())
        );
        assert_eq!(url_date("https://x.test/2023/13/40/story/"), None);
    }

    #[test]
    fn test_parse_free_text_with_offsets() {
        let formats: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            parse_free_text_date("Saturday, 4/5/2024, 10:30 (GMT+7)", &["%A, %d/%m/%Y, %H:%M".to_string()]),
            Some(Utc.with_ymd_and_hms(2024, 5, 4, 3, 30, 0).unwrap())
        );
        assert_eq!(
            parse_free_text_date("12 March 2024 18:05 GMT", &formats),
            Some(Utc.with_ymd_and_hms(2024, 3, 12, 18, 5, 0).unwrap())
        );
        assert_eq!(
            parse_free_text_date("Updated: March 12, 2024", &formats),
            Some(Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_free_text_date("yesterday-ish", &formats), None);
    }

    #[test]
    fn test_parse_datetime_normalizes_to_utc() {
        assert_eq!(
            parse_datetime("2024-06-01T09:00:00-04:00"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap())
        );
        assert_eq!(
            parse_datetime("Sat, 01 Jun 2024 09:00:00 +0000"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(
            parse_datetime("2024-06-01T09:00:00.123"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(123))
        );
        assert_eq!(parse_datetime("not a date"), None);
    }
}
