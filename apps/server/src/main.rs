// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BuildView Server - hosts viewer sessions over HTTP.
//!
//! Each session is a viewer shell: it loads one model reference at a time
//! (remote URL or uploaded file), discards stale results when the reference
//! changes, and recolors elements from a construction-status mapping.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/viewers` - Start a viewer session
//! - `GET /api/v1/viewers/:id` - Snapshot (`?wait=true` waits for the load)
//! - `PUT /api/v1/viewers/:id/model` - Set or clear the model URL
//! - `POST /api/v1/viewers/:id/file` - Upload a local model file
//! - `DELETE /api/v1/viewers/:id/file` - Drop the local file
//! - `PUT /api/v1/viewers/:id/status` - Replace the status mapping
//! - `POST /api/v1/viewers/:id/reload` - Reload, bypassing the scene cache
//! - `POST /api/v1/viewers/:id/camera` - Orbit camera interaction
//! - `DELETE /api/v1/viewers/:id` - Close the session

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use buildview_loader::SceneLoader;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize logging
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,tower_http=debug,buildview_server=debug,buildview_loader=debug".into());
    if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }

    tracing::info!(
        port = config.port,
        max_file_size_mb = config.max_file_size_mb,
        model_base_url = ?config.model_base_url,
        ifc_worker_threads = config.effective_worker_threads(),
        "Starting BuildView Server"
    );

    let loader = SceneLoader::new(config.loader_config()).context("failed to build scene loader")?;
    let state = AppState {
        sessions: Arc::new(SessionStore::new(loader)),
        config: Arc::new(config.clone()),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Build the router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Viewer sessions
        .route("/api/v1/viewers", post(routes::viewers::create))
        .route(
            "/api/v1/viewers/:id",
            get(routes::viewers::snapshot).delete(routes::viewers::remove),
        )
        .route("/api/v1/viewers/:id/model", put(routes::viewers::set_model))
        .route(
            "/api/v1/viewers/:id/file",
            post(routes::viewers::select_file).delete(routes::viewers::clear_file),
        )
        .route("/api/v1/viewers/:id/status", put(routes::viewers::set_status))
        .route("/api/v1/viewers/:id/reload", post(routes::viewers::reload))
        .route("/api/v1/viewers/:id/camera", post(routes::viewers::camera))
        // Middleware
        .layer(DefaultBodyLimit::max(config.max_file_size_bytes()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use buildview_loader::{IfcParserSettings, MemoryFetcher, ObjectUrlRegistry};
    use buildview_scene::PALETTE;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const PLAN_URL: &str = "https://models.example.com/plan.ifc";
    const SLOW_URL: &str = "https://models.example.com/slow.ifc";
    const WALL_IFC: &[u8] = include_bytes!("../tests/fixtures/wall.ifc");

    fn test_app() -> Router {
        let objects = ObjectUrlRegistry::new();
        let fetcher = MemoryFetcher::new(objects.clone())
            .with_body(PLAN_URL, WALL_IFC)
            .with_body(SLOW_URL, WALL_IFC)
            .with_delay(SLOW_URL, Duration::from_secs(5));
        let loader = SceneLoader::with_fetcher(Arc::new(fetcher), objects, IfcParserSettings::default());
        app(AppState {
            sessions: Arc::new(SessionStore::new(loader)),
            config: Arc::new(Config::default()),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_viewer(app: &Router) -> String {
        let (status, body) = send(app, Method::POST, "/api/v1/viewers", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn node<'a>(snapshot: &'a Value, name: &str) -> &'a Value {
        snapshot["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["name"] == name)
            .unwrap()
    }

    fn color(node: &Value) -> [f32; 4] {
        let c: Vec<f32> = node["color"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap() as f32)
            .collect();
        [c[0], c[1], c[2], c[3]]
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&test_app(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_url_load_and_status_overlay() {
        let app = test_app();
        let id = create_viewer(&app).await;

        let (status, body) = send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/model"), Some(json!({ "url": PLAN_URL }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "loading");

        let (_, snapshot) = send(&app, Method::GET, &format!("/api/v1/viewers/{id}?wait=true"), None).await;
        assert_eq!(snapshot["state"], "ready");
        assert_eq!(snapshot["nodes"][0]["name"], "Site Works");

        let (status, snapshot) = send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/status"), Some(json!({ "Wall-01": "completed" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["status_entries"], 1);
        assert_eq!(color(node(&snapshot, "Wall-01")), PALETTE.completed);

        let (_, snapshot) = send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/status"), Some(Value::Null)).await;
        assert_eq!(snapshot["status_entries"], 0);
        assert_ne!(color(node(&snapshot, "Wall-01")), PALETTE.completed);
    }

    #[tokio::test]
    async fn test_waiting_snapshot_does_not_block_new_model() {
        let app = test_app();
        let id = create_viewer(&app).await;
        send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/model"), Some(json!({ "url": SLOW_URL }))).await;

        let waiting = tokio::spawn({
            let app = app.clone();
            let uri = format!("/api/v1/viewers/{id}?wait=true");
            async move { send(&app, Method::GET, &uri, None).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The slow load is still pending; switching models must not wait for it
        let (status, body) = tokio::time::timeout(
            Duration::from_secs(1),
            send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/model"), Some(json!({ "url": PLAN_URL }))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generation"], 2);

        let (_, snapshot) = waiting.await.unwrap();
        assert_eq!(snapshot["state"], "ready");
        assert_eq!(snapshot["model_url"], PLAN_URL);
        assert_eq!(snapshot["generation"], 2);
    }

    #[tokio::test]
    async fn test_file_upload() {
        let app = test_app();
        let id = create_viewer(&app).await;

        let boundary = "buildview-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"plan.ifc\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(WALL_IFC);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/viewers/{id}/file"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, snapshot) = send(&app, Method::GET, &format!("/api/v1/viewers/{id}?wait=true"), None).await;
        assert_eq!(snapshot["state"], "ready");
        assert_eq!(snapshot["file_name"], "plan.ifc");
        assert!(snapshot["model_url"].is_null());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let app = test_app();
        let id = create_viewer(&app).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/viewers/{id}/file"))
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
            .body(Body::from("--x\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--x--\r\n"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_failed_load_snapshot() {
        let app = test_app();
        let id = create_viewer(&app).await;
        send(&app, Method::PUT, &format!("/api/v1/viewers/{id}/model"), Some(json!({ "url": "https://models.example.com/missing.glb" }))).await;

        let (_, snapshot) = send(&app, Method::GET, &format!("/api/v1/viewers/{id}?wait=true"), None).await;
        assert_eq!(snapshot["state"], "failed");
        assert_eq!(snapshot["error"]["origin"], "load");
    }

    #[tokio::test]
    async fn test_camera_commands() {
        let app = test_app();
        let id = create_viewer(&app).await;

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/viewers/{id}/camera"), Some(json!({ "action": "frame" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/viewers/{id}/camera"), Some(json!({ "action": "zoom", "factor": 2.0 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["camera"]["distance"].as_f64(), Some(20.0));
    }

    #[tokio::test]
    async fn test_unknown_and_closed_viewer() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, &format!("/api/v1/viewers/{}", uuid::Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "VIEWER_NOT_FOUND");

        let id = create_viewer(&app).await;
        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/viewers/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/viewers/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
