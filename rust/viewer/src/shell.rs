// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer shell
//!
//! Owns the active model reference, runs one load at a time on the tokio
//! runtime, and keeps the displayed scene in sync with the status mapping.
//! Every submission bumps a generation counter; results tagged with an older
//! generation are dropped, and the superseded task is aborted so any object
//! URL it holds is released.

use crate::camera::OrbitCamera;
use crate::state::{LoadState, ViewerView};
use buildview_loader::{LoadError, LocalFile, ModelReference, Progress, ProgressFn, SceneLoader};
use buildview_scene::{apply_overlay, SceneNode, StatusMapping};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// Messages from load tasks, tagged with the generation that started them
#[derive(Debug)]
enum LoadEvent {
    Progress {
        generation: u64,
        progress: Progress,
    },
    Finished {
        generation: u64,
        result: Result<SceneNode, LoadError>,
    },
}

/// Model viewer state machine.
///
/// Loads are spawned with [`tokio::spawn`], so submitting operations must be
/// called from within a tokio runtime.
pub struct Viewer {
    loader: SceneLoader,
    url: Option<String>,
    file: Option<LocalFile>,
    mapping: Option<Arc<StatusMapping>>,
    state: LoadState,
    /// Root as loaded, before any overlay
    pristine: Option<Arc<SceneNode>>,
    progress: Option<Progress>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<LoadEvent>,
    events_rx: mpsc::UnboundedReceiver<LoadEvent>,
    camera: OrbitCamera,
}

impl Viewer {
    pub fn new(loader: SceneLoader) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            loader,
            url: None,
            file: None,
            mapping: None,
            state: LoadState::Idle,
            pristine: None,
            progress: None,
            generation: 0,
            task: None,
            events_tx,
            events_rx,
            camera: OrbitCamera::new(),
        }
    }

    /// Set the remote model URL. Blank URLs count as no URL. A selected local
    /// file keeps precedence, so the URL only loads once the file is cleared.
    pub fn set_model_url(&mut self, url: Option<String>) {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        if url == self.url {
            return;
        }
        self.url = url;
        if self.file.is_none() {
            self.submit();
        }
    }

    /// Load a local file in place of the URL
    pub fn select_file(&mut self, file: LocalFile) {
        self.file = Some(file);
        self.submit();
    }

    /// Drop the local file and fall back to the URL
    pub fn clear_file(&mut self) {
        if self.file.take().is_some() {
            self.submit();
        }
    }

    /// Load the active reference again, bypassing the scene cache
    pub fn reload(&mut self) {
        if let (None, Some(url)) = (&self.file, &self.url) {
            self.loader.cache().remove(url);
        }
        self.submit();
    }

    /// Replace the status mapping. The overlay is recomputed on a fresh copy
    /// of the loaded root when the mapping identity changes.
    pub fn set_status_mapping(&mut self, mapping: Option<Arc<StatusMapping>>) {
        let unchanged = match (&self.mapping, &mapping) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        self.mapping = mapping;
        self.refresh_overlay();
    }

    pub fn status_mapping(&self) -> Option<&Arc<StatusMapping>> {
        self.mapping.as_ref()
    }

    pub fn model_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Name of the selected local file, for the chrome label
    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.name.as_str())
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn view(&self) -> ViewerView<'_> {
        match &self.state {
            LoadState::Idle => ViewerView::Nothing,
            LoadState::Loading => ViewerView::Loading {
                progress: self.progress,
            },
            LoadState::Failed(error) => ViewerView::Error(error),
            LoadState::Ready(root) => ViewerView::Scene(root),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn loader(&self) -> &SceneLoader {
        &self.loader
    }

    /// Apply finished loads without waiting
    pub fn poll(&mut self) -> &LoadState {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
        if self.state.is_loading() && self.task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(Err(err)) = self.task.take().and_then(FutureExt::now_or_never) {
                self.fail_task(err);
            }
        }
        &self.state
    }

    /// Wait until the current load has finished
    pub async fn settle(&mut self) -> &LoadState {
        loop {
            self.poll();
            if !self.state.is_loading() {
                break;
            }
            match self.task.as_mut() {
                Some(task) => {
                    tokio::select! {
                        biased;
                        Some(event) = self.events_rx.recv() => self.handle_event(event),
                        joined = task => {
                            self.task = None;
                            if let Err(err) = joined {
                                self.fail_task(err);
                            }
                        }
                    }
                }
                None => {
                    if let Some(event) = self.events_rx.recv().await {
                        self.handle_event(event);
                    }
                }
            }
        }
        &self.state
    }

    fn reference(&self) -> Option<ModelReference> {
        match (&self.file, &self.url) {
            (Some(file), _) => Some(ModelReference::File(file.clone())),
            (None, Some(url)) => Some(ModelReference::Url(url.clone())),
            (None, None) => None,
        }
    }

    /// Start a load for the active reference, superseding any running one
    fn submit(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.pristine = None;
        self.progress = None;

        let Some(reference) = self.reference() else {
            tracing::debug!(generation = self.generation, "No model reference");
            self.state = LoadState::Idle;
            return;
        };
        tracing::debug!(generation = self.generation, reference = reference.label(), "Submitting model");
        self.state = LoadState::Loading;

        let generation = self.generation;
        let loader = self.loader.clone();
        let events = self.events_tx.clone();
        let progress_events = self.events_tx.clone();
        let progress: ProgressFn = Arc::new(move |progress| {
            let _ = progress_events.send(LoadEvent::Progress { generation, progress });
        });
        self.task = Some(tokio::spawn(async move {
            let result = loader.load(&reference, Some(progress)).await;
            let _ = events.send(LoadEvent::Finished { generation, result });
        }));
    }

    fn handle_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress { generation, progress } => {
                if generation == self.generation && self.state.is_loading() {
                    self.progress = Some(progress);
                }
            }
            LoadEvent::Finished { generation, .. } if generation != self.generation => {
                tracing::debug!(generation, current = self.generation, "Discarding stale load result");
            }
            LoadEvent::Finished { result, .. } => {
                self.task = None;
                self.progress = None;
                match result {
                    Ok(root) => {
                        if let Some(bounds) = root.bounds() {
                            self.camera.frame(&bounds);
                        }
                        self.pristine = Some(Arc::new(root));
                        self.refresh_overlay();
                    }
                    Err(err) => {
                        tracing::warn!(generation = self.generation, error = %err, "Load failed");
                        self.state = LoadState::Failed(err.descriptor());
                    }
                }
            }
        }
    }

    fn fail_task(&mut self, err: JoinError) {
        tracing::error!(generation = self.generation, error = %err, "Load task did not complete");
        self.progress = None;
        self.state = LoadState::Failed(LoadError::Task(err.to_string()).descriptor());
    }

    /// Re-run the overlay on a fresh copy of the pristine root
    fn refresh_overlay(&mut self) {
        let Some(pristine) = &self.pristine else {
            return;
        };
        let mut root = SceneNode::clone(pristine);
        let report = apply_overlay(&mut root, self.mapping.as_deref());
        tracing::debug!(
            visited = report.visited,
            drawable = report.drawable,
            recolored = report.recolored,
            "Applied status overlay"
        );
        self.state = LoadState::Ready(root);
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("url", &self.url)
            .field("file", &self.file_name())
            .field("state", &self.state.kind())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildview_loader::{IfcParserSettings, MemoryFetcher, ObjectUrlRegistry};

    fn viewer() -> Viewer {
        let objects = ObjectUrlRegistry::new();
        let fetcher = MemoryFetcher::new(objects.clone());
        Viewer::new(SceneLoader::with_fetcher(Arc::new(fetcher), objects, IfcParserSettings::default()))
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let mut viewer = viewer();
        viewer.set_model_url(Some("https://models.example.com/missing.glb".to_string()));
        let stale = viewer.generation() - 1;
        viewer
            .events_tx
            .send(LoadEvent::Finished {
                generation: stale,
                result: Ok(SceneNode::group("Stale")),
            })
            .unwrap();
        viewer
            .events_tx
            .send(LoadEvent::Progress {
                generation: stale,
                progress: Progress {
                    received: 1,
                    total: None,
                },
            })
            .unwrap();
        viewer.poll();
        assert!(viewer.state().is_loading());
        assert!(matches!(viewer.view(), ViewerView::Loading { progress: None }));

        // The real result for the current generation is a 404
        assert!(matches!(viewer.settle().await, LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_blank_url_is_idle() {
        let mut viewer = viewer();
        viewer.set_model_url(Some("   ".to_string()));
        assert!(viewer.state().is_idle());
        assert_eq!(viewer.generation(), 0);
        assert!(matches!(viewer.view(), ViewerView::Nothing));
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_load_error() {
        let mut viewer = viewer();
        viewer.generation += 1;
        viewer.state = LoadState::Loading;
        viewer.task = Some(tokio::spawn(async { panic!("parser crashed") }));
        let error = viewer.settle().await.error().cloned().unwrap();
        assert_eq!(error.origin, buildview_loader::ErrorOrigin::Load);
    }
}
