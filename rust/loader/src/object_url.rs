// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporary object URLs for local files
//!
//! A local file is handed to the fetcher as a `blob:` URL that lives only as
//! long as the load attempt holding its [`ObjectUrl`] guard. The guard
//! releases on [`ObjectUrl::release`] or on drop, whichever comes first, so
//! success, failure, task abort and viewer teardown all release exactly once.

use crate::reference::LocalFile;
use bytes::Bytes;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Scheme prefix of object URLs
pub const OBJECT_URL_SCHEME: &str = "blob:";

#[derive(Debug)]
struct Entry {
    name: String,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Mutex<FxHashMap<String, Entry>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Shared table of live object URLs
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    inner: Arc<Inner>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, FxHashMap<String, Entry>> {
        // Entries stay consistent even if a holder panicked
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a file and return the guard that owns its URL
    pub fn acquire(&self, file: &LocalFile) -> ObjectUrl {
        let url = format!("{OBJECT_URL_SCHEME}buildview/{}", Uuid::new_v4());
        self.entries().insert(
            url.clone(),
            Entry {
                name: file.name.clone(),
                bytes: file.bytes.clone(),
            },
        );
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(url = %url, file = %file.name, bytes = file.bytes.len(), "Acquired object URL");

        ObjectUrl {
            url,
            registry: self.clone(),
            released: false,
        }
    }

    /// Revoke a URL. Returns false if it was already released or never existed.
    pub fn release(&self, url: &str) -> bool {
        let removed = self.entries().remove(url);
        match removed {
            Some(entry) => {
                self.inner.released.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(url = %url, file = %entry.name, "Released object URL");
                true
            }
            None => false,
        }
    }

    /// Bytes behind a live URL
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.entries().get(url).map(|entry| entry.bytes.clone())
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    /// Total URLs ever acquired
    pub fn acquired_count(&self) -> usize {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    /// Total effective releases
    pub fn released_count(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }
}

/// Scoped object URL; released when dropped
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: ObjectUrlRegistry,
    released: bool,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Release now; later calls and the eventual drop are no-ops
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.registry.release(&self.url)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.release();
    }
}
