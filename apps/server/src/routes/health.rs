// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    /// Open viewer sessions
    pub sessions: usize,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "buildview-server",
        sessions: state.sessions.len().await,
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    const ENDPOINTS: [(&str, &str, &str); 10] = [
        ("GET", "/api/v1/health", "Health check endpoint"),
        ("POST", "/api/v1/viewers", "Start a viewer session"),
        ("GET", "/api/v1/viewers/:id", "Viewer snapshot (?wait=true waits for the load)"),
        ("PUT", "/api/v1/viewers/:id/model", "Set or clear the model URL"),
        ("POST", "/api/v1/viewers/:id/file", "Upload a local model file"),
        ("DELETE", "/api/v1/viewers/:id/file", "Fall back to the model URL"),
        ("PUT", "/api/v1/viewers/:id/status", "Replace the construction-status mapping"),
        ("POST", "/api/v1/viewers/:id/reload", "Reload the model, bypassing the cache"),
        ("POST", "/api/v1/viewers/:id/camera", "Orbit camera interaction"),
        ("DELETE", "/api/v1/viewers/:id", "Close the session"),
    ];

    Json(ApiInfoResponse {
        service: "buildview-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "3D model viewer sessions with construction-status overlays",
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, description)| EndpointInfo {
                method,
                path,
                description,
            })
            .collect(),
    })
}
