// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory cache of loaded direct-format scenes

use buildview_scene::SceneNode;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Pristine scene roots keyed by model URL.
///
/// Every `get` hands out an independent deep copy; the cached root itself is
/// never exposed for mutation.
#[derive(Debug, Clone, Default)]
pub struct SceneCache {
    entries: Arc<Mutex<FxHashMap<String, Arc<SceneNode>>>>,
}

impl SceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Arc<SceneNode>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, url: &str) -> Option<SceneNode> {
        let root = self.entries().get(url).cloned()?;
        Some(SceneNode::clone(&root))
    }

    pub fn insert(&self, url: impl Into<String>, root: SceneNode) {
        self.entries().insert(url.into(), Arc::new(root));
    }

    /// Forget one URL; returns whether it was cached
    pub fn remove(&self, url: &str) -> bool {
        self.entries().remove(url).is_some()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
