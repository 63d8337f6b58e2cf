//! Built-in site profiles. Each one is data for the generic adapter; the only
//! per-site behavior is the pagination convention and the selector lists.

use nh_core::{FetchMode, SourceDescriptor};

use crate::adapter::SiteProfile;
use crate::discover::Pagination;

const CNBC_PATTERN: &str = concat!(
    r"https://www\.cnbc\.com/(?:\d{4}/\d{2}/\d{2}/|select/|markets/|business/|technology/|",
    r"politics/|economy/|investing/|personal-finance/|health-and-science/|wealth/|sports/|",
    r"life/|small-business/|fintech/|earnings/|media/|white-house/|policy/|world-politics/).+"
);

const RENDERED_LISTING_SCOPE: &str = concat!(
    r#"[class*="article-list-item"], [class*="article-card"], [class*="news-card"], "#,
    r#"[class*="story-card"], [class*="content-list-item"], [class*="article-list"], "#,
    r#"[class*="content-list"]"#
);

const RENDERED_READINESS: &[&str] = &[
    ".article-list",
    ".article-list-item",
    ".article-card",
    ".news-card",
    ".story-card",
    ".content-list",
    ".content-list-item",
    "article",
    ".article-body",
    ".article-content",
    ".story-body",
    "body",
];

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn descriptor(
    name: &str,
    base_url: &str,
    sections: &[&str],
    pattern: &str,
    exclude: &[&str],
    max_links: usize,
) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        base_url: base_url.to_string(),
        section_paths: strings(sections),
        url_pattern: pattern.to_string(),
        exclude_keywords: strings(exclude),
        max_links,
        fetch_mode: FetchMode::Static,
    }
}

pub fn cnbc() -> SiteProfile {
    let mut p = SiteProfile::new(
        "cnbc",
        descriptor(
            "CNBC",
            "https://www.cnbc.com",
            &[
                "/sports/",
                "/sports/football/",
                "/sports/basketball/",
                "/sports/tennis/",
                "/sports/golf/",
                "/sports/baseball/",
                "/sports/hockey/",
            ],
            CNBC_PATTERN,
            &["video", "slideshow", "watch", "live", "tv", "subscribe"],
            3000,
        ),
    );
    p.title_selectors = strings(&[
        "h1.article-title",
        r#"h1[data-testid="article-title"]"#,
        "h1.article__title",
        "h1",
    ]);
    p.content_selectors = strings(&[
        "div.article__body",
        "div.group",
        r#"div[data-module="ArticleBody"]"#,
        "div.article-content",
        "article",
    ]);
    p.strip_selectors = strings(&[
        "div.related-content",
        "div.article-tags",
        "div.article-share",
        "script",
        "style",
        ".article-video",
        ".article-image",
        ".article-related",
    ]);
    p.date_selectors = strings(&["time.article-timestamp", "span.article-timestamp"]);
    p
}

pub fn skysports() -> SiteProfile {
    let mut p = SiteProfile::new(
        "skysports",
        descriptor(
            "Sky Sports",
            "https://www.skysports.com",
            &[
                "/football/news/",
                "/f1/news/",
                "/cricket/news/",
                "/tennis/news/",
                "/boxing/news/",
                "/golf/news/",
                "/rugby-union/news/",
                "/rugby-league/news/",
                "/nfl/news/",
                "/racing/news/",
                "/darts/news/",
                "/netball/news/",
                "/mma/news/",
            ],
            r"https://www\.skysports\.com/(?:football|f1|cricket|tennis|boxing|golf|rugby-union|rugby-league|nfl|racing|darts|netball|mma|news)/news/\d+/.+",
            &["video", "podcast", "live-blog", "watch", "tv", "live", "highlights"],
            3000,
        ),
    );
    p.pagination = Pagination::PathSegment;
    p.title_selectors = strings(&["h1.article__headline", "h1.article__title", "h1.headline", "h1"]);
    p.content_selectors = strings(&[
        "div.sdc-article-body",
        "section.sdc-article-body",
        "div.sdc-article-main",
        "div.article__body",
        "div.article-content",
        "div.article__content",
        "article",
    ]);
    p.strip_selectors = strings(&[
        "div.related-content",
        "div.article-tags",
        "div.article-share",
        "script",
        "style",
        ".article-video",
        ".article-image",
        ".article-related",
        "aside",
        "figure",
        ".sdc-article-widget",
    ]);
    p.date_selectors = strings(&[".sdc-article-date__date-time", r#"[class*="article-info"]"#]);
    p.date_formats = strings(&["%d/%m/%y %I:%M%p", "%d/%m/%y %H:%M"]);
    p
}

pub fn vnexpress() -> SiteProfile {
    let mut p = SiteProfile::new(
        "vnexpress",
        descriptor(
            "VnExpress International",
            "https://e.vnexpress.net",
            &[
                "/news/sports",
                "/news/football",
                "/news/tennis",
                "/news/golf",
                "/news/othersports",
            ],
            r"https://e\.vnexpress\.net/news/.+",
            &[],
            100,
        ),
    );
    p.title_selectors = strings(&["h1.title-detail", "h1"]);
    p.content_selectors = strings(&["article.fck_detail", "div.fck_detail", "article"]);
    p.date_selectors = strings(&["span.date", "div.date"]);
    p.date_formats = strings(&["%B %d, %Y | %I:%M %p", "%A, %d/%m/%Y, %H:%M"]);
    p
}

pub fn nba() -> SiteProfile {
    let mut p = SiteProfile::new(
        "nba",
        descriptor(
            "NBA.com",
            "https://www.nba.com",
            &["/news/", "/stats/news/", "/standings/", "/schedule/"],
            r"https://www\.nba\.com/(?:news|stats/news)/[a-z0-9-]+-\d{4}",
            &[],
            5000,
        ),
    );
    p.content_selectors = strings(&[r#"div[class*="ArticleContent"]"#, "article"]);
    p
}

pub fn motorsport() -> SiteProfile {
    let mut p = SiteProfile::new(
        "motorsport",
        descriptor(
            "Motorsport.com",
            "https://www.motorsport.com",
            &["/f1/news/", "/motogp/news/", "/indycar/news/", "/nascar/news/", "/wec/news/", "/wrc/news/"],
            r"https://www\.motorsport\.com/(?:f1|motogp|indycar|nascar|wec|wrc)/news/[a-z0-9-]+/\d+/",
            &[],
            5000,
        ),
    );
    p.pagination = Pagination::TrailingPath;
    p.content_selectors = strings(&["div.ms-article-content", "div.ms-article__body", "article"]);
    p
}

pub fn transfermarkt() -> SiteProfile {
    let mut p = SiteProfile::new(
        "transfermarkt",
        descriptor(
            "Transfermarkt",
            "https://www.transfermarkt.com",
            &["/transfers/news/", "/news/", "/rumours/", "/statistics/", "/international/"],
            r"https://www\.transfermarkt\.com/(?:transfers/)?news/(?:view/)?news/\d+",
            &[],
            5000,
        ),
    );
    p.content_selectors = strings(&["div.news-content", "div.artikel", "article"]);
    p.date_formats = strings(&["%b %d, %Y - %I:%M %p", "%d.%m.%Y - %H:%M"]);
    p
}

pub fn atptour() -> SiteProfile {
    let mut p = SiteProfile::new(
        "atptour",
        descriptor(
            "ATP Tour",
            "https://www.atptour.com",
            &["/en/news/", "/en/media/", "/en/video/"],
            r"https://www\.atptour\.com/en/(?:news|media|video)/[a-z0-9-]+-\d{4}",
            &[],
            5000,
        ),
    );
    p.descriptor.fetch_mode = FetchMode::Rendered;
    p.content_selectors = strings(&["div.article-body", "div.article-content", "article"]);
    p.readiness_selectors = strings(RENDERED_READINESS);
    p.scroll_listing_pages = true;
    p
}

pub fn cbssports() -> SiteProfile {
    let mut p = SiteProfile::new(
        "cbssports",
        descriptor(
            "CBS Sports",
            "https://www.cbssports.com",
            &[
                "/nba/",
                "/soccer/",
                "/nfl/",
                "/mlb/",
                "/tennis/",
                "/golf/",
                "/nhl/",
                "/mma/",
                "/boxing/",
                "/nascar/",
                "/wnba/",
                "/college-football/",
                "/college-basketball/",
            ],
            r"https://www\.cbssports\.com/.+/(?:news|recap|preview)/[a-z0-9-]+/?",
            &[],
            5000,
        ),
    );
    p.descriptor.fetch_mode = FetchMode::Rendered;
    p.link_scope = Some(RENDERED_LISTING_SCOPE.to_string());
    p.title_selectors = strings(&[
        r#"h1[class*="article-title"]"#,
        r#"h1[class*="headline"]"#,
        r#"h1[class*="title"]"#,
        "h1",
    ]);
    p.content_selectors = strings(&[
        r#"div[class*="article-body"]"#,
        r#"div[class*="article-content"]"#,
        r#"div[class*="story-body"]"#,
        "article",
    ]);
    p.readiness_selectors = strings(RENDERED_READINESS);
    p.scroll_listing_pages = true;
    p
}

/// Every built-in profile, in harvest order.
pub fn builtin_profiles() -> Vec<SiteProfile> {
    vec![
        cnbc(),
        skysports(),
        vnexpress(),
        nba(),
        motorsport(),
        transfermarkt(),
        atptour(),
        cbssports(),
    ]
}

/// Profile for a module id from the sources file.
pub fn profile_for(module: &str) -> Option<SiteProfile> {
    let module = module.trim().to_ascii_lowercase().replace(['-', '_'], "");
    builtin_profiles().into_iter().find(|p| p.id == module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::LinkRules;

    fn rules(profile: &SiteProfile) -> LinkRules {
        let d = &profile.descriptor;
        LinkRules::new(&d.base_url, &d.url_pattern, &d.exclude_keywords, d.max_links, profile.link_scope.as_deref()).unwrap()
    }

    #[test]
    fn test_every_builtin_profile_compiles() {
        for profile in builtin_profiles() {
            rules(&profile);
            profile.descriptor.section_urls().unwrap();
            assert!(!profile.descriptor.section_paths.is_empty(), "{}", profile.id);
        }
    }

    #[test]
    fn test_site_url_grammars() {
        let sky = rules(&skysports());
        assert!(sky.accept("/football/news/11095/13150000/arsenal-win").is_some());
        assert!(sky.accept("/football/news/11095/13150000/live-blog-arsenal").is_none());
        assert!(sky.accept("/football/teams/arsenal").is_none());

        let motorsport = rules(&motorsport());
        assert!(motorsport
            .accept("https://www.motorsport.com/f1/news/verstappen-wins-again/10612345/")
            .is_some());

        let nba = rules(&nba());
        assert!(nba.accept("https://www.nba.com/news/celtics-rally-2024").is_some());
        assert!(nba.accept("https://www.nba.com/schedule/").is_none());

        let tm = rules(&transfermarkt());
        assert!(tm.accept("/transfers/news/view/news/431234").is_some());
        assert!(tm.accept("/news/news/431234").is_some());
        assert!(tm.accept("/rumours/some-player/431234").is_none());

        let cbs = rules(&cbssports());
        assert!(cbs.accept("https://www.cbssports.com/nba/news/lakers-trade-rumors/").is_some());
    }

    #[test]
    fn test_pagination_per_site() {
        assert_eq!(
            skysports().pagination.page_url("https://www.skysports.com/football/news/", 2).as_deref(),
            Some("https://www.skysports.com/football/news/page/2")
        );
        assert_eq!(
            motorsport().pagination.page_url("https://www.motorsport.com/f1/news/", 3).as_deref(),
            Some("https://www.motorsport.com/f1/news/page/3/")
        );
        assert_eq!(
            cnbc().pagination.page_url("https://www.cnbc.com/sports/", 2).as_deref(),
            Some("https://www.cnbc.com/sports/?page=2")
        );
    }

    #[test]
    fn test_profile_lookup() {
        assert_eq!(profile_for("SkySports").unwrap().descriptor.name, "Sky Sports");
        assert_eq!(profile_for("cbs_sports").unwrap().id, "cbssports");
        assert!(profile_for("espn").is_none());
        assert_eq!(atptour().descriptor.fetch_mode, FetchMode::Rendered);
    }
}
