// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Load state of a viewer

use buildview_loader::{ErrorDescriptor, Progress};
use buildview_scene::SceneNode;

/// Where the current model reference is in its lifecycle.
///
/// `Idle` until a reference is submitted, `Loading` while the attempt for the
/// current reference runs, then `Ready` with the overlaid scene or `Failed`.
/// A new submission always returns to `Loading` (or `Idle` when there is
/// nothing to load) and clears the previous scene.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready(SceneNode),
    Failed(ErrorDescriptor),
}

impl LoadState {
    pub fn is_idle(&self) -> bool {
        matches!(self, LoadState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn scene(&self) -> Option<&SceneNode> {
        match self {
            LoadState::Ready(root) => Some(root),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            LoadState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Lower-case state name for logs and API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// What the viewer should currently display
#[derive(Debug, Clone, Copy)]
pub enum ViewerView<'a> {
    Nothing,
    Loading { progress: Option<Progress> },
    Error(&'a ErrorDescriptor),
    Scene(&'a SceneNode),
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildview_loader::LoadError;

    #[test]
    fn test_accessors() {
        assert!(LoadState::default().is_idle());
        assert_eq!(LoadState::Loading.kind(), "loading");

        let ready = LoadState::Ready(SceneNode::group("Site"));
        assert_eq!(ready.scene().map(|root| root.name.as_str()), Some("Site"));
        assert!(ready.error().is_none());

        let failed = LoadState::Failed(LoadError::Encoding.descriptor());
        assert_eq!(failed.kind(), "failed");
        assert!(failed.scene().is_none());
        assert!(failed.error().is_some());
    }
}
