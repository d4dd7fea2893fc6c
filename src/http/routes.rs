//! Route table and middleware stack.
//!
//! # Routes
//! ```text
//! GET  {root}/ping    → {"message": "pong!"}
//! POST {root}/ping    → {"message": "hey <name>"}
//! GET  {root}/health  → identity of this instance
//! *    anything else  → static assets from `listener.static_dir`
//! ```
//!
//! Handlers only ever see [`ServiceInfo`]; discovery state (backend, registration id)
//! stays with the lifecycle orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ListenerConfig, TimeoutConfig};
use crate::discovery::ServiceRecord;
use crate::http::ping::{get_ping, post_ping};

/// Read-only description of the running instance.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub host: String,
    pub root: String,
    /// Locally bound port.
    pub port: u16,
    /// Port published to discovery.
    pub advertised_port: u16,
    pub metadata: BTreeMap<String, String>,
}

impl ServiceInfo {
    pub fn new(advertised: &ServiceRecord, bound_port: u16) -> Self {
        Self {
            name: advertised.name().to_string(),
            host: advertised.host().to_string(),
            root: advertised.root().to_string(),
            port: bound_port,
            advertised_port: advertised.port(),
            metadata: advertised.metadata().clone(),
        }
    }
}

/// State injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceInfo>,
}

#[derive(Serialize)]
struct HealthReport {
    status: &'static str,
    #[serde(flatten)]
    service: ServiceInfo,
}

async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "UP",
        service: state.service.as_ref().clone(),
    })
}

/// Join the API root and a route path without doubling slashes.
pub fn mount(root: &str, path: &str) -> String {
    format!("{}{}", root.trim_end_matches('/'), path)
}

/// Build the router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, listener: &ListenerConfig, timeouts: &TimeoutConfig) -> Router {
    let root = state.service.root.clone();

    Router::new()
        .route(&mount(&root, "/ping"), get(get_ping).post(post_ping))
        .route(&mount(&root, "/health"), get(get_health))
        .fallback_service(ServeDir::new(&listener.static_dir))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(RequestBodyLimitLayer::new(listener.max_body_bytes))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(root: &str, static_dir: &str) -> Router {
        let record = ServiceRecord::new("hey", "localhost", 80, root);
        let state = AppState {
            service: Arc::new(ServiceInfo::new(&record, 8080)),
        };
        let listener = ListenerConfig {
            static_dir: static_dir.to_string(),
            ..ListenerConfig::default()
        };
        build_router(state, &listener, &TimeoutConfig::default())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_mount() {
        assert_eq!(mount("/api", "/ping"), "/api/ping");
        assert_eq!(mount("/api/", "/ping"), "/api/ping");
        assert_eq!(mount("/", "/ping"), "/ping");
    }

    #[tokio::test]
    async fn test_ping_routes_under_root() {
        let app = router("/api", "webroot");

        let response = app
            .clone()
            .oneshot(Request::get("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await["message"], "pong!");

        let response = app
            .oneshot(
                Request::post("/api/ping")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Ada"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["message"], "hey Ada");
    }

    #[tokio::test]
    async fn test_health_reports_both_ports() {
        let response = router("/v2", "webroot")
            .oneshot(Request::get("/v2/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "UP");
        assert_eq!(body["name"], "hey");
        assert_eq!(body["port"], 8080);
        assert_eq!(body["advertised_port"], 80);
        assert!(body.get("registration").is_none());
    }

    #[tokio::test]
    async fn test_unmatched_paths_fall_back_to_static_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hey</h1>").unwrap();
        let app = router("/api", dir.path().to_str().unwrap());

        let response = app
            .clone()
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/missing.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
