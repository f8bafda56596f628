//! Admin API.
//!
//! Authenticated JSON endpoints for operators:
//! - `GET /admin/status`: version, endpoint counts, gate usage
//! - `GET /admin/endpoints`: status snapshot of every endpoint
//! - `GET /admin/cache`: cache statistics
//! - `POST /admin/cache/purge`: drop every cached response

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::cache::ResponseCache;
use crate::registry::EndpointRegistry;
use crate::resilience::ConcurrencyGate;

const ADMIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<EndpointRegistry>,
    pub cache: Arc<ResponseCache>,
    pub gate: Arc<ConcurrencyGate>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/endpoints", get(get_endpoints))
        .route("/admin/cache", get(get_cache))
        .route("/admin/cache/purge", post(purge_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(ADMIN_REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until the shutdown broadcast fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Admin API shutting down");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::CacheConfig;
    use crate::dispatch::RequestOptions;
    use crate::registry::{Capability, Endpoint};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use url::Url;

    const KEY: &str = "test-admin-key";

    fn state() -> AdminState {
        let endpoints = vec![
            Arc::new(Endpoint::new(
                "alpha",
                Url::parse("http://alpha.test").unwrap(),
                [Capability::new("manga")],
                "/health",
                3,
            )),
            Arc::new(Endpoint::new(
                "beta",
                Url::parse("http://beta.test").unwrap(),
                [Capability::new("manga")],
                "/health",
                1,
            )),
        ];
        endpoints[1].mark_failure();

        AdminState {
            registry: Arc::new(EndpointRegistry::from_endpoints(endpoints)),
            cache: Arc::new(ResponseCache::new(&CacheConfig::default())),
            gate: Arc::new(ConcurrencyGate::new(2)),
            api_key: Arc::from(KEY),
        }
    }

    fn authed(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_auth() {
        let app = setup_admin_router(state());

        let missing = Request::builder()
            .uri("/admin/status")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .uri("/admin/status")
            .header("Authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status() {
        let app = setup_admin_router(state());
        let response = app.oneshot(authed("GET", "/admin/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["endpoints"], 2);
        assert_eq!(body["healthy_endpoints"], 1);
        assert_eq!(body["max_concurrent_requests"], 2);
    }

    #[tokio::test]
    async fn test_endpoints() {
        let app = setup_admin_router(state());
        let response = app.oneshot(authed("GET", "/admin/endpoints")).await.unwrap();
        let body = json(response).await;

        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "alpha");
        assert_eq!(list[0]["is_healthy"], true);
        assert_eq!(list[1]["name"], "beta");
        assert_eq!(list[1]["is_healthy"], false);
        assert_eq!(list[1]["state"], "unhealthy");
    }

    #[tokio::test]
    async fn test_cache_stats_and_purge() {
        let state = state();
        let key = CacheKey::new(&Capability::new("manga"), "/x", &RequestOptions::default());
        state.cache.put(key, "{}");
        let app = setup_admin_router(state.clone());

        let body = json(app.clone().oneshot(authed("GET", "/admin/cache")).await.unwrap()).await;
        assert_eq!(body["entries"], 1);
        assert_eq!(body["max_entries"], 100);

        let body = json(
            app.oneshot(authed("POST", "/admin/cache/purge"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["removed"], 1);
        assert!(state.cache.is_empty());
    }
}
