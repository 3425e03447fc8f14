// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use serde::Deserialize;

/// Body of `PUT /api/v1/viewers/:id/model`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelRequest {
    /// Remote model URL; null or blank clears it.
    #[serde(default)]
    pub url: Option<String>,
}

/// Query options for snapshot requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotOptions {
    /// Wait for the current load attempt to finish before answering.
    #[serde(default)]
    pub wait: bool,
    /// Include the node list of a ready scene.
    #[serde(default = "default_true")]
    pub nodes: bool,
}

fn default_true() -> bool {
    true
}

/// Orbit camera interaction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CameraCommand {
    Rotate { yaw: f32, pitch: f32 },
    Zoom { factor: f32 },
    Pan { dx: f32, dy: f32 },
    /// Frame the loaded scene again
    Frame,
    Reset,
}
