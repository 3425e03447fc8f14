// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer session endpoints.
//!
//! Each mutating endpoint answers with the snapshot taken right after the
//! change, so a new submission reports `loading` until polled again.

use crate::error::ApiError;
use crate::services::ViewerHandle;
use crate::types::{CameraCommand, CreateViewerResponse, ModelRequest, SnapshotOptions, ViewerSnapshot};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use buildview_loader::LocalFile;
use buildview_scene::StatusMapping;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Pause between polls while a snapshot waits for a load
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Extract the uploaded model from a multipart request.
async fn extract_file(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default();
        tracing::debug!(field_name = %field_name, "Processing multipart field");

        if field_name == "file" {
            let name = field.file_name().unwrap_or("model").to_string();
            let bytes = field.bytes().await?;
            tracing::debug!(name = %name, size = bytes.len(), "Extracted file from multipart");
            return Ok((name, bytes));
        }
    }

    tracing::warn!("No 'file' field found in multipart request");
    Err(ApiError::MissingFile)
}

async fn viewer(state: &AppState, id: Uuid) -> Result<ViewerHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::ViewerNotFound(id.to_string()))
}

/// POST /api/v1/viewers - Start an idle viewer session.
pub async fn create(State(state): State<AppState>) -> (StatusCode, Json<CreateViewerResponse>) {
    let id = state.sessions.create().await;
    (StatusCode::CREATED, Json(CreateViewerResponse { id }))
}

/// GET /api/v1/viewers/:id - Current state, optionally waiting for the load.
///
/// Waiting polls the viewer and releases the session lock between polls, so
/// a newer model reference can supersede the one being waited on.
pub async fn snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(options): Query<SnapshotOptions>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let deadline = Instant::now() + Duration::from_secs(state.config.load_wait_secs);
    loop {
        {
            let mut viewer = handle.lock().await;
            let loading = viewer.poll().is_loading();
            let expired = Instant::now() >= deadline;
            if !options.wait || !loading || expired {
                if loading && options.wait {
                    tracing::debug!(viewer = %id, "Load still running after wait limit");
                }
                return Ok(Json(ViewerSnapshot::capture(id, &viewer, options.nodes)));
            }
        }
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }
}

/// PUT /api/v1/viewers/:id/model - Set or clear the remote model URL.
pub async fn set_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ModelRequest>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let mut viewer = handle.lock().await;
    viewer.set_model_url(request.url);
    Ok(Json(ViewerSnapshot::capture(id, &viewer, false)))
}

/// POST /api/v1/viewers/:id/file - Load an uploaded file in place of the URL.
pub async fn select_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let (name, data) = extract_file(&mut multipart).await?;

    if data.len() > state.config.max_file_size_bytes() {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    tracing::info!(viewer = %id, name = %name, size = data.len(), "Local file selected");
    let mut viewer = handle.lock().await;
    viewer.select_file(LocalFile::new(name, data));
    Ok(Json(ViewerSnapshot::capture(id, &viewer, false)))
}

/// DELETE /api/v1/viewers/:id/file - Fall back to the remote URL.
pub async fn clear_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let mut viewer = handle.lock().await;
    viewer.clear_file();
    Ok(Json(ViewerSnapshot::capture(id, &viewer, false)))
}

/// PUT /api/v1/viewers/:id/status - Replace the status mapping (null clears it).
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mapping): Json<Option<StatusMapping>>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let mut viewer = handle.lock().await;
    tracing::debug!(viewer = %id, entries = mapping.as_ref().map_or(0, |m| m.len()), "Status mapping updated");
    viewer.poll();
    viewer.set_status_mapping(mapping.map(Arc::new));
    Ok(Json(ViewerSnapshot::capture(id, &viewer, true)))
}

/// POST /api/v1/viewers/:id/reload - Load the active reference again.
pub async fn reload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let mut viewer = handle.lock().await;
    viewer.reload();
    Ok(Json(ViewerSnapshot::capture(id, &viewer, false)))
}

/// POST /api/v1/viewers/:id/camera - Orbit, zoom, pan or reframe.
pub async fn camera(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(command): Json<CameraCommand>,
) -> Result<Json<ViewerSnapshot>, ApiError> {
    let handle = viewer(&state, id).await?;
    let mut viewer = handle.lock().await;
    viewer.poll();
    match command {
        CameraCommand::Rotate { yaw, pitch } => viewer.camera_mut().rotate(yaw, pitch),
        CameraCommand::Zoom { factor } => viewer.camera_mut().zoom(factor),
        CameraCommand::Pan { dx, dy } => viewer.camera_mut().pan(dx, dy),
        CameraCommand::Frame => {
            let bounds = viewer.state().scene().and_then(|root| root.bounds());
            match bounds {
                Some(bounds) => viewer.camera_mut().frame(&bounds),
                None => return Err(ApiError::InvalidRequest("no scene to frame".to_string())),
            }
        }
        CameraCommand::Reset => viewer.camera_mut().reset(),
    }
    Ok(Json(ViewerSnapshot::capture(id, &viewer, false)))
}

/// DELETE /api/v1/viewers/:id - Close the session.
pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ViewerNotFound(id.to_string()))
    }
}
