// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model references

use bytes::Bytes;

/// Locally supplied model file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// What to load: a remote URL or a local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    Url(String),
    File(LocalFile),
}

impl ModelReference {
    pub fn url(url: impl Into<String>) -> Self {
        ModelReference::Url(url.into())
    }

    pub fn file(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        ModelReference::File(LocalFile::new(name, bytes))
    }

    /// URL or file name, for logs and labels
    pub fn label(&self) -> &str {
        match self {
            ModelReference::Url(url) => url,
            ModelReference::File(file) => &file.name,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ModelReference::File(_))
    }
}
