use std::time::Duration;

use async_trait::async_trait;
use nh_core::{FetchError, FetchMode};
use reqwest::header::{self, HeaderMap, HeaderValue};

use super::{RawPage, Transport};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Statuses worth another attempt.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Bodies shorter than this are logged as suspicious.
const SMALL_BODY_BYTES: usize = 100;

/// Plain HTTP GET with browser-like headers.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::TransportUnavailable(e.to_string()))?;

        Ok(Self { client })
    }
}

fn map_request_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(err.to_string())
    }
}

/// Turn a completed response into a page or a typed failure.
pub(crate) fn classify_response(
    url: &str,
    final_url: &str,
    status: u16,
    content_type: Option<&str>,
    body: String,
) -> Result<RawPage, FetchError> {
    if status == 403 {
        return Err(FetchError::Forbidden);
    }
    if TRANSIENT_STATUSES.contains(&status) {
        return Err(FetchError::TransientServer(status));
    }

    let page = RawPage {
        url: url.to_string(),
        final_url: final_url.to_string(),
        status,
        body,
    };
    if !page.is_success() {
        // Other error statuses are data for the caller.
        return Ok(page);
    }

    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("javascript")) {
        return Err(FetchError::MalformedResponse(
            "received JavaScript instead of HTML".to_string(),
        ));
    }
    if page.body.len() < SMALL_BODY_BYTES {
        tracing::warn!(url, bytes = page.body.len(), "response body is suspiciously small");
    }
    if !page.body.to_ascii_lowercase().contains("<html") {
        return Err(FetchError::MalformedResponse(
            "response has no <html> root".to_string(),
        ));
    }

    Ok(page)
}

#[async_trait]
impl Transport for HttpTransport {
    fn mode(&self) -> FetchMode {
        FetchMode::Static
    }

    async fn get(&self, url: &str) -> Result<RawPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_request_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(map_request_error)?;

        classify_response(url, &final_url, status, content_type.as_deref(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://site.test/a";

    fn html() -> String {
        format!("<html><body>{}</body></html>", "x".repeat(200))
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_response(URL, URL, 403, None, html()),
            Err(FetchError::Forbidden)
        );
        for status in TRANSIENT_STATUSES {
            assert_eq!(
                classify_response(URL, URL, status, None, html()),
                Err(FetchError::TransientServer(status))
            );
        }
        let not_found = classify_response(URL, URL, 404, None, String::new()).unwrap();
        assert_eq!(not_found.status, 404);
        assert!(!not_found.is_success());
    }

    #[test]
    fn test_javascript_content_type_is_malformed() {
        let result = classify_response(URL, URL, 200, Some("application/javascript"), html());
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_body_without_html_root_is_malformed() {
        let result = classify_response(URL, URL, 200, Some("text/html"), "{\"a\":1}".into());
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_html_page_passes() {
        let page = classify_response(URL, "https://site.test/b", 200, Some("text/html"), html()).unwrap();
        assert_eq!(page.final_url, "https://site.test/b");
        assert!(page.is_success());
    }
}
