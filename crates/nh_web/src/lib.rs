use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use nh_core::{CancellationToken, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(state: AppState, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Stats endpoint listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use nh_core::storage::ArticleStorage;
    use nh_core::{Article, PersistenceError, SaveOutcome, Stats};
    use nh_storage::MemoryStorage;
    use serde_json::Value;
    use tower::ServiceExt;

    struct DownStorage;

    #[async_trait]
    impl ArticleStorage for DownStorage {
        async fn save_article(&self, _article: &Article) -> nh_core::Result<SaveOutcome> {
            Err(PersistenceError::Unavailable("down".into()).into())
        }

        async fn last_scrape_time(&self, _source: &str) -> nh_core::Result<Option<DateTime<Utc>>> {
            Err(PersistenceError::Unavailable("down".into()).into())
        }

        async fn update_scrape_time(&self, _source: &str, _at: DateTime<Utc>) -> nh_core::Result<()> {
            Err(PersistenceError::Unavailable("down".into()).into())
        }

        async fn stats(&self) -> nh_core::Result<Stats> {
            Err(PersistenceError::ConnectionLost("socket closed".into()).into())
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save_article(&Article {
                url: "https://a.test/1".to_string(),
                title: "Title".to_string(),
                content: "Body".to_string(),
                source: "A".to_string(),
                published_at: Utc::now(),
                scraped_at: Utc::now(),
            })
            .await
            .unwrap();
        let app = create_app(AppState { storage });

        let (status, body) = get(app.clone(), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_articles"], 1);
        assert_eq!(body["sources"]["A"]["article_count"], 1);

        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let app = create_app(AppState {
            storage: Arc::new(DownStorage),
        });

        let (status, body) = get(app.clone(), "/stats").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "unhealthy");
        assert!(body["error"].as_str().unwrap().contains("socket closed"));

        let (status, _) = get(app, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
