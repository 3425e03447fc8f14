// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Format resolution

use crate::reference::ModelReference;
use serde::Serialize;
use std::fmt;

/// Suffixes of pre-triangulated interchange assets (matched case-sensitively)
pub const DIRECT_FORMAT_SUFFIXES: [&str; 2] = [".glb", ".gltf"];

/// Loading strategy for a model reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// glTF / GLB
    DirectFormat,
    /// IFC
    SemanticFormat,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::DirectFormat => "direct",
            Strategy::SemanticFormat => "semantic",
        })
    }
}

/// Pick the strategy for a reference; `None` means nothing to render.
///
/// Local files always go to the semantic strategy. URLs whose final path
/// segment ends in a direct-format suffix go to the direct strategy, and
/// every other URL is attempted as a semantic model.
pub fn resolve(reference: Option<&ModelReference>) -> Option<Strategy> {
    match reference? {
        ModelReference::File(_) => Some(Strategy::SemanticFormat),
        ModelReference::Url(url) => {
            let segment = final_path_segment(url);
            if DIRECT_FORMAT_SUFFIXES.iter().any(|suffix| segment.ends_with(suffix)) {
                Some(Strategy::DirectFormat)
            } else {
                Some(Strategy::SemanticFormat)
            }
        }
    }
}

/// Last `/`-separated segment of a URL path, without query or fragment
pub fn final_path_segment(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Option<Strategy> {
        resolve(Some(&ModelReference::url(s)))
    }

    #[test]
    fn test_direct_suffixes() {
        assert_eq!(url("model.glb"), Some(Strategy::DirectFormat));
        assert_eq!(url("https://cdn.example.com/site/tower.gltf"), Some(Strategy::DirectFormat));
        assert_eq!(url("https://cdn.example.com/tower.glb?token=abc#view"), Some(Strategy::DirectFormat));
    }

    #[test]
    fn test_everything_else_is_semantic() {
        assert_eq!(url("plan.ifc"), Some(Strategy::SemanticFormat));
        assert_eq!(url("https://example.com/models/42"), Some(Strategy::SemanticFormat));
        assert_eq!(url("MODEL.GLB"), Some(Strategy::SemanticFormat));
        assert_eq!(url("https://example.com/glb/model.ifc"), Some(Strategy::SemanticFormat));
        assert_eq!(url("https://example.com/a.glb/"), Some(Strategy::SemanticFormat));
        assert_eq!(url("not a url at all"), Some(Strategy::SemanticFormat));
        assert_eq!(url(""), Some(Strategy::SemanticFormat));
    }

    #[test]
    fn test_files_are_semantic_regardless_of_name() {
        let file = ModelReference::file("model.glb", vec![0u8; 4]);
        assert_eq!(resolve(Some(&file)), Some(Strategy::SemanticFormat));
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(resolve(None), None);
    }

    #[test]
    fn test_final_path_segment() {
        assert_eq!(final_path_segment("https://a.b/c/d.glb?x=1"), "d.glb");
        assert_eq!(final_path_segment("d.gltf#frag"), "d.gltf");
        assert_eq!(final_path_segment("https://a.b/c/"), "");
    }
}
