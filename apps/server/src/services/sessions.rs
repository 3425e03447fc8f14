// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer sessions sharing one scene loader.

use buildview_loader::SceneLoader;
use buildview_viewer::Viewer;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Shared handle to one viewer session.
pub type ViewerHandle = Arc<Mutex<Viewer>>;

/// Live viewer sessions keyed by id.
///
/// All sessions share the loader, so its scene cache and object-URL
/// registry are process-wide. Removing a session drops its viewer, which
/// aborts any in-flight load and releases its local-file URL.
pub struct SessionStore {
    loader: SceneLoader,
    viewers: RwLock<HashMap<Uuid, ViewerHandle>>,
}

impl SessionStore {
    pub fn new(loader: SceneLoader) -> Self {
        Self {
            loader,
            viewers: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new idle viewer session.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let viewer = Arc::new(Mutex::new(Viewer::new(self.loader.clone())));
        self.viewers.write().await.insert(id, viewer);
        tracing::debug!(viewer = %id, "Viewer session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<ViewerHandle> {
        self.viewers.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.viewers.write().await.remove(&id);
        if removed.is_some() {
            tracing::debug!(viewer = %id, "Viewer session closed");
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.viewers.read().await.len()
    }
}
