// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for STEP parsing
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading STEP/IFC content
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Not a STEP file: missing ISO-10303-21 header")]
    MissingHeader,

    #[error("Missing DATA section")]
    MissingDataSection,

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} is {actual}, expected {expected}")]
    UnexpectedType {
        id: u32,
        expected: &'static str,
        actual: String,
    },
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }
}
