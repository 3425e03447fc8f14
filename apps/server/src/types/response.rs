// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use buildview_loader::{ErrorDescriptor, Progress};
use buildview_scene::{Material, NodeId, Rgba, SceneNode};
use buildview_viewer::{OrbitCamera, Viewer, ViewerView};
use serde::Serialize;
use uuid::Uuid;

/// Response to viewer creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateViewerResponse {
    pub id: Uuid,
}

/// Download progress of a loading model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressInfo {
    pub received: u64,
    pub total: Option<u64>,
}

impl From<Progress> for ProgressInfo {
    fn from(progress: Progress) -> Self {
        Self {
            received: progress.received,
            total: progress.total,
        }
    }
}

/// Flattened scene node, in depth-first order.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    pub depth: usize,
    pub drawable: bool,
    /// Displayed color of a drawable node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

/// Current state of a viewer session.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerSnapshot {
    pub id: Uuid,
    /// idle, loading, ready or failed
    pub state: &'static str,
    pub generation: u64,
    pub model_url: Option<String>,
    pub file_name: Option<String>,
    pub status_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    pub camera: OrbitCamera,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeSummary>,
}

impl ViewerSnapshot {
    pub fn capture(id: Uuid, viewer: &Viewer, with_nodes: bool) -> Self {
        let mut snapshot = Self {
            id,
            state: viewer.state().kind(),
            generation: viewer.generation(),
            model_url: viewer.model_url().map(str::to_string),
            file_name: viewer.file_name().map(str::to_string),
            status_entries: viewer.status_mapping().map_or(0, |m| m.len()),
            progress: None,
            error: None,
            camera: *viewer.camera(),
            node_count: None,
            nodes: Vec::new(),
        };

        match viewer.view() {
            ViewerView::Nothing => {}
            ViewerView::Loading { progress } => snapshot.progress = progress.map(ProgressInfo::from),
            ViewerView::Error(error) => snapshot.error = Some(error.clone()),
            ViewerView::Scene(root) => {
                snapshot.node_count = Some(root.node_count());
                if with_nodes {
                    flatten(root, 0, &mut snapshot.nodes);
                }
            }
        }
        snapshot
    }
}

fn flatten(node: &SceneNode, depth: usize, out: &mut Vec<NodeSummary>) {
    let material = node.material();
    out.push(NodeSummary {
        id: node.id(),
        name: node.name.clone(),
        secondary_id: node.secondary_id.clone(),
        type_label: node.type_label.clone(),
        depth,
        drawable: node.is_drawable(),
        color: material.map(|m| m.color),
        material: material.and_then(|m: &Material| m.name.clone()),
    });
    for child in &node.children {
        flatten(child, depth + 1, out);
    }
}
