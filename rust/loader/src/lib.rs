// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BuildView Scene Loader
//!
//! Turns a [`ModelReference`] into a renderable [`SceneNode`] tree:
//!
//! - [`resolve`] picks the strategy from the reference alone
//! - glTF / GLB models go through [`load_direct`] and are cached by URL
//! - IFC models go through [`load_semantic`]; local files are exposed to the
//!   fetcher as scoped `blob:` object URLs for the duration of the attempt
//!
//! ```rust,ignore
//! use buildview_loader::{LoaderConfig, ModelReference, SceneLoader};
//!
//! let loader = SceneLoader::new(LoaderConfig::default())?;
//! let root = loader.load(&ModelReference::url("https://example.com/plan.ifc"), None).await?;
//! println!("{} nodes", root.node_count());
//! ```

pub mod cache;
pub mod direct;
pub mod error;
pub mod fetch;
pub mod ifc_scene;
pub mod object_url;
pub mod reference;
pub mod resolver;
pub mod semantic;

pub use cache::SceneCache;
pub use direct::load_direct;
pub use error::{ErrorDescriptor, ErrorOrigin, FetchError, LoadError};
pub use fetch::{Fetch, HttpFetcher, MemoryFetcher, Progress, ProgressFn};
pub use object_url::{ObjectUrl, ObjectUrlRegistry, OBJECT_URL_SCHEME};
pub use reference::{LocalFile, ModelReference};
pub use resolver::{resolve, Strategy, DIRECT_FORMAT_SUFFIXES};
pub use semantic::{load_semantic, IfcParser, IfcParserSettings};

use buildview_scene::SceneNode;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scene loader configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Base for relative model URLs
    pub base_url: Option<String>,
    pub fetch_timeout: Duration,
    pub parser: IfcParserSettings,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fetch_timeout: Duration::from_secs(120),
            parser: IfcParserSettings::default(),
        }
    }
}

/// Loads model references with the strategy the resolver picks
#[derive(Clone)]
pub struct SceneLoader {
    fetcher: Arc<dyn Fetch>,
    objects: ObjectUrlRegistry,
    parser: IfcParserSettings,
    cache: SceneCache,
}

impl SceneLoader {
    /// Loader fetching over HTTP(S)
    pub fn new(config: LoaderConfig) -> Result<Self, LoadError> {
        let objects = ObjectUrlRegistry::new();
        let fetcher = HttpFetcher::new(objects.clone(), config.fetch_timeout, config.base_url.as_deref())?;
        Ok(Self::with_fetcher(Arc::new(fetcher), objects, config.parser))
    }

    /// Loader over a custom fetcher. The fetcher must resolve object URLs
    /// from the same registry.
    pub fn with_fetcher(fetcher: Arc<dyn Fetch>, objects: ObjectUrlRegistry, parser: IfcParserSettings) -> Self {
        Self {
            fetcher,
            objects,
            parser,
            cache: SceneCache::new(),
        }
    }

    pub fn objects(&self) -> &ObjectUrlRegistry {
        &self.objects
    }

    pub fn cache(&self) -> &SceneCache {
        &self.cache
    }

    /// Load a reference into a fresh scene tree
    pub async fn load(&self, reference: &ModelReference, progress: Option<ProgressFn>) -> Result<SceneNode, LoadError> {
        let started = Instant::now();
        let strategy = match reference {
            ModelReference::File(_) => Strategy::SemanticFormat,
            ModelReference::Url(_) => resolve(Some(reference)).unwrap_or(Strategy::SemanticFormat),
        };
        tracing::info!(reference = reference.label(), strategy = %strategy, "Loading model");

        let result = match (strategy, reference) {
            (Strategy::DirectFormat, ModelReference::Url(url)) => self.load_direct_cached(url, progress).await,
            (_, reference) => self.load_semantic(reference, progress).await,
        };

        match &result {
            Ok(root) => tracing::info!(
                reference = reference.label(),
                nodes = root.node_count(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Model loaded"
            ),
            Err(err) => tracing::warn!(reference = reference.label(), error = %err, "Model load failed"),
        }
        result
    }

    async fn load_direct_cached(&self, url: &str, progress: Option<ProgressFn>) -> Result<SceneNode, LoadError> {
        if let Some(root) = self.cache.get(url) {
            tracing::debug!(url = %url, "Scene cache hit");
            return Ok(root);
        }
        let root = load_direct(self.fetcher.as_ref(), url, progress).await?;
        self.cache.insert(url, root.clone());
        Ok(root)
    }

    async fn load_semantic(&self, reference: &ModelReference, progress: Option<ProgressFn>) -> Result<SceneNode, LoadError> {
        // Setup failures surface before any object URL exists
        let parser = IfcParser::new(&self.parser)?;
        match reference {
            ModelReference::Url(url) => load_semantic(self.fetcher.as_ref(), parser, url, progress).await,
            ModelReference::File(file) => {
                let mut object_url = self.objects.acquire(file);
                let result = load_semantic(self.fetcher.as_ref(), parser, object_url.as_str(), progress).await;
                object_url.release();
                result
            }
        }
    }
}

impl std::fmt::Debug for SceneLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneLoader")
            .field("objects", &self.objects)
            .field("parser", &self.parser)
            .field("cached_scenes", &self.cache.len())
            .finish_non_exhaustive()
    }
}
