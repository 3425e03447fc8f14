// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loader errors and their display form

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors from fetching model bytes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Object URL {0} is not registered")]
    UnknownObjectUrl(String),

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout(url.to_string());
        }
        match err.status() {
            Some(status) => FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
            None => FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Errors from one load attempt
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    /// The semantic-format parser could not be constructed
    #[error("IFC parser setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid glTF: {0}")]
    Gltf(String),

    #[error("Model is not valid UTF-8 text")]
    Encoding,

    #[error("IFC parse error: {0}")]
    Ifc(#[from] buildview_core::Error),

    #[error("Load task failed: {0}")]
    Task(String),
}

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        LoadError::Gltf(err.to_string())
    }
}

impl LoadError {
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            LoadError::Setup(_) => ErrorOrigin::Setup,
            _ => ErrorOrigin::Load,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            message: self.to_string(),
            origin: self.origin(),
        }
    }
}

/// Where a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Setup,
    Load,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorOrigin::Setup => "setup",
            ErrorOrigin::Load => "load",
        })
    }
}

/// Human-readable failure shown in the error panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub message: String,
    pub origin: ErrorOrigin,
}

impl From<LoadError> for ErrorDescriptor {
    fn from(err: LoadError) -> Self {
        err.descriptor()
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.origin, self.message)
    }
}
