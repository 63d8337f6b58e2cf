//! Script-rendering transport backed by a headless Chromium session.
//!
//! The session is launched lazily on the first request, marked unhealthy when a
//! navigation fails and relaunched on the next request. `shutdown` drops it.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "rendered")]
use anyhow::Context;
use async_trait::async_trait;
use nh_core::retry::{with_retry, Backoff, RetryConfig};
use nh_core::{FetchError, FetchMode};
use regex::Regex;
use tokio::sync::Mutex;

use super::http::classify_response;
use super::{RawPage, Transport};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// CSS selectors signalling that the page is usable, most specific first
    pub readiness_selectors: Vec<String>,
    pub readiness_timeout: Duration,
    pub page_timeout: Duration,
    /// Scroll down and back up to trigger lazy loading on listing pages
    pub scroll_listing_pages: bool,
    /// Pages matching this are articles and never scrolled
    pub article_pattern: Option<Regex>,
    pub launch_retry: RetryConfig,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            readiness_selectors: vec!["article".to_string(), "body".to_string()],
            readiness_timeout: Duration::from_secs(5),
            page_timeout: Duration::from_secs(20),
            scroll_listing_pages: true,
            article_pattern: None,
            launch_retry: RetryConfig::new(3, Duration::from_secs(5), Backoff::Fixed),
        }
    }
}

impl RenderOptions {
    pub(crate) fn should_scroll(&self, url: &str) -> bool {
        self.scroll_listing_pages
            && !self
                .article_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(url))
    }
}

enum SessionState {
    Idle,
    Healthy(Session),
    Unhealthy,
}

pub struct RenderedTransport {
    options: Arc<RenderOptions>,
    state: Mutex<SessionState>,
}

impl RenderedTransport {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options: Arc::new(options),
            state: Mutex::new(SessionState::Idle),
        }
    }

    async fn launch(&self) -> Result<Session, FetchError> {
        with_retry(&self.options.launch_retry, |_| true, |attempt| async move {
            tracing::info!(attempt, "starting rendering session");
            let launched = tokio::task::spawn_blocking(Session::launch)
                .await
                .map_err(|e| e.to_string())
                .and_then(|r| r.map_err(|e| format!("{:#}", e)));
            if let Err(e) = &launched {
                tracing::warn!(attempt, error = %e, "rendering session failed to start");
            }
            launched
        })
        .await
        .map_err(|failure| {
            FetchError::TransportUnavailable(format!(
                "rendering session did not start after {} attempts: {}",
                failure.attempts, failure.error
            ))
        })
    }
}

/// Map a browser-side failure onto the fetch taxonomy.
pub(crate) fn navigation_error(message: &str) -> FetchError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FetchError::Timeout
    } else {
        FetchError::Connection(message.to_string())
    }
}

#[async_trait]
impl Transport for RenderedTransport {
    fn mode(&self) -> FetchMode {
        FetchMode::Rendered
    }

    async fn get(&self, url: &str) -> Result<RawPage, FetchError> {
        let mut state = self.state.lock().await;

        let existing = match &*state {
            SessionState::Healthy(session) => Some(session.clone()),
            SessionState::Idle | SessionState::Unhealthy => None,
        };
        let session = match existing {
            Some(session) => session,
            None => {
                let session = self.launch().await?;
                *state = SessionState::Healthy(session.clone());
                session
            }
        };

        let options = self.options.clone();
        let scroll = options.should_scroll(url);
        let target = url.to_string();
        let rendered =
            tokio::task::spawn_blocking(move || session.render(&target, &options, scroll))
                .await
                .map_err(|e| e.to_string())
                .and_then(|r| r.map_err(|e| format!("{:#}", e)));

        match rendered {
            Ok((final_url, html)) => classify_response(url, &final_url, 200, None, html),
            Err(message) => {
                tracing::warn!(url, error = %message, "navigation failed, session marked unhealthy");
                *state = SessionState::Unhealthy;
                Err(navigation_error(&message))
            }
        }
    }

    async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, SessionState::Healthy(_)) {
            tracing::info!("closing rendering session");
        }
        *state = SessionState::Idle;
    }
}

#[cfg(feature = "rendered")]
#[derive(Clone)]
struct Session {
    _browser: Arc<headless_chrome::Browser>,
    tab: Arc<headless_chrome::Tab>,
}

#[cfg(feature = "rendered")]
impl Session {
    fn launch() -> anyhow::Result<Self> {
        let options = headless_chrome::LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .build()?;
        let browser = headless_chrome::Browser::new(options).context("launching chromium")?;
        let tab = browser.new_tab().context("opening tab")?;
        Ok(Self {
            _browser: Arc::new(browser),
            tab,
        })
    }

    fn render(
        &self,
        url: &str,
        options: &RenderOptions,
        scroll: bool,
    ) -> anyhow::Result<(String, String)> {
        let tab = &self.tab;
        tab.set_default_timeout(options.page_timeout);
        tab.navigate_to(url).with_context(|| format!("navigating to {}", url))?;
        tab.wait_until_navigated()?;

        let ready = options.readiness_selectors.iter().find(|selector| {
            tab.wait_for_element_with_custom_timeout(selector, options.readiness_timeout)
                .is_ok()
        });
        if ready.is_none() {
            tracing::debug!(url, "no readiness signal matched, capturing page as is");
        }

        if scroll {
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)?;
            std::thread::sleep(Duration::from_secs(2));
            tab.evaluate("window.scrollTo(0, 0);", false)?;
            std::thread::sleep(Duration::from_secs(1));
        }

        let html = tab.get_content()?;
        Ok((tab.get_url(), html))
    }
}

#[cfg(not(feature = "rendered"))]
#[derive(Clone)]
struct Session;

#[cfg(not(feature = "rendered"))]
impl Session {
    fn launch() -> anyhow::Result<Self> {
        anyhow::bail!("built without the `rendered` feature")
    }

    fn render(&self, _: &str, _: &RenderOptions, _: bool) -> anyhow::Result<(String, String)> {
        anyhow::bail!("built without the `rendered` feature")
    }
}
