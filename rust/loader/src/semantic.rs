// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic-format (IFC) loading

use crate::error::LoadError;
use crate::fetch::{Fetch, ProgressFn};
use crate::ifc_scene::build_scene;
use buildview_core::{read_header, schema_supported};
use buildview_scene::SceneNode;
use bytes::Bytes;
use std::sync::Arc;

/// Schemas accepted when none are configured
pub const DEFAULT_SCHEMAS: [&str; 3] = ["IFC2X3", "IFC4", "IFC4X3"];

/// IFC parser settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfcParserSettings {
    /// Accepted `FILE_SCHEMA` identifiers
    pub schemas: Vec<String>,
    /// Geometry worker threads; 0 picks one per core
    pub worker_threads: usize,
}

impl Default for IfcParserSettings {
    fn default() -> Self {
        Self {
            schemas: DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect(),
            worker_threads: 0,
        }
    }
}

/// IFC parser with its own geometry worker pool
#[derive(Clone)]
pub struct IfcParser {
    schemas: Arc<[String]>,
    pool: Arc<rayon::ThreadPool>,
}

impl std::fmt::Debug for IfcParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfcParser")
            .field("schemas", &self.schemas)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl IfcParser {
    /// Set up the parser. Failures here are setup errors, not load errors.
    pub fn new(settings: &IfcParserSettings) -> Result<Self, LoadError> {
        if settings.schemas.is_empty() {
            return Err(LoadError::Setup("no IFC schemas enabled".to_string()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads)
            .thread_name(|i| format!("buildview-ifc-{i}"))
            .build()
            .map_err(|e| LoadError::Setup(e.to_string()))?;
        Ok(Self {
            schemas: settings.schemas.iter().map(|s| s.to_ascii_uppercase()).collect(),
            pool: Arc::new(pool),
        })
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Parse IFC bytes into a scene tree. CPU-bound; run off the async runtime.
    pub fn parse(&self, bytes: &[u8]) -> Result<SceneNode, LoadError> {
        let content = std::str::from_utf8(bytes).map_err(|_| LoadError::Encoding)?;
        let header = read_header(content)?;
        if !schema_supported(&header.schema, &self.schemas) {
            return Err(buildview_core::Error::UnsupportedSchema(header.schema).into());
        }
        tracing::debug!(schema = %header.schema, bytes = bytes.len(), "Parsing IFC");
        build_scene(content, &self.pool)
    }
}

/// Fetch and parse an IFC model
pub async fn load_semantic(
    fetcher: &dyn Fetch,
    parser: IfcParser,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<SceneNode, LoadError> {
    let bytes: Bytes = fetcher.fetch(url, progress).await?;
    tokio::task::spawn_blocking(move || parser.parse(&bytes))
        .await
        .map_err(|e| LoadError::Task(e.to_string()))?
}
