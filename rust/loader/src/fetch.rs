// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fetching model bytes

use crate::error::FetchError;
use crate::object_url::{ObjectUrlRegistry, OBJECT_URL_SCHEME};
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use reqwest::Url;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;

/// Bytes received so far and the announced total, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub total: Option<u64>,
}

/// Progress callback; purely informational
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Source of model bytes
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str, progress: Option<ProgressFn>) -> BoxFuture<'a, Result<Bytes, FetchError>>;
}

fn report(progress: &Option<ProgressFn>, received: u64, total: Option<u64>) {
    if let Some(progress) = progress {
        progress(Progress { received, total });
    }
}

/// Resolve a possibly relative URL against an optional base
pub fn resolve_url(base: Option<&Url>, url: &str) -> Result<Url, FetchError> {
    let parsed = match (Url::parse(url), base) {
        (Ok(parsed), _) => Ok(parsed),
        (Err(_), Some(base)) => base.join(url),
        (Err(e), None) => Err(e),
    };
    parsed.map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a resource URI relative to the document that references it
pub fn join_relative(document_url: &str, uri: &str) -> String {
    if Url::parse(uri).is_ok() {
        return uri.to_string();
    }
    if let Ok(base) = Url::parse(document_url) {
        if let Ok(joined) = base.join(uri) {
            return joined.to_string();
        }
    }
    match document_url.rfind('/') {
        Some(slash) => format!("{}{}", &document_url[..=slash], uri),
        None => uri.to_string(),
    }
}

/// HTTP(S) fetcher that also serves `blob:` URLs from an object URL registry
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    objects: ObjectUrlRegistry,
    base_url: Option<Url>,
}

impl HttpFetcher {
    pub fn new(objects: ObjectUrlRegistry, timeout: Duration, base_url: Option<&str>) -> Result<Self, FetchError> {
        let base_url = base_url
            .map(|base| {
                Url::parse(base).map_err(|e| FetchError::InvalidUrl {
                    url: base.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::from_reqwest("client", e))?;
        Ok(Self {
            client,
            objects,
            base_url,
        })
    }

    async fn fetch_http(&self, url: &str, progress: Option<ProgressFn>) -> Result<Bytes, FetchError> {
        let target = resolve_url(self.base_url.as_ref(), url)?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", target.scheme()),
            });
        }

        let response = self
            .client
            .get(target)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let total = response.content_length();
        // Announced length is only a hint; cap the preallocation
        let mut body = BytesMut::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
            body.extend_from_slice(&chunk);
            report(&progress, body.len() as u64, total);
        }

        tracing::debug!(url = %url, bytes = body.len(), "Fetched model");
        Ok(body.freeze())
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str, progress: Option<ProgressFn>) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        async move {
            if url.starts_with(OBJECT_URL_SCHEME) {
                let bytes = self
                    .objects
                    .resolve(url)
                    .ok_or_else(|| FetchError::UnknownObjectUrl(url.to_string()))?;
                report(&progress, bytes.len() as u64, Some(bytes.len() as u64));
                return Ok(bytes);
            }
            self.fetch_http(url, progress).await
        }
        .boxed()
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Body(Bytes),
    Status(u16),
}

/// Fetcher serving canned responses from memory, with optional per-URL delays.
///
/// Unknown URLs answer 404. `blob:` URLs resolve through the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    objects: ObjectUrlRegistry,
    responses: FxHashMap<String, Canned>,
    delays: FxHashMap<String, Duration>,
}

impl MemoryFetcher {
    pub fn new(objects: ObjectUrlRegistry) -> Self {
        Self {
            objects,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.into(), Canned::Body(body.into()));
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Canned::Status(status));
        self
    }

    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

impl Fetch for MemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a str, progress: Option<ProgressFn>) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        async move {
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            let bytes = if url.starts_with(OBJECT_URL_SCHEME) {
                self.objects
                    .resolve(url)
                    .ok_or_else(|| FetchError::UnknownObjectUrl(url.to_string()))?
            } else {
                match self.responses.get(url) {
                    Some(Canned::Body(bytes)) => bytes.clone(),
                    Some(Canned::Status(status)) => {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: *status,
                        })
                    }
                    None => {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: 404,
                        })
                    }
                }
            };
            report(&progress, bytes.len() as u64, Some(bytes.len() as u64));
            Ok(bytes)
        }
        .boxed()
    }
}
