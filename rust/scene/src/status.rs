// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction status labels and element → status mappings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed set of construction-progress states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Completed,
    InProgress,
    NotStarted,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 3] = [Self::Completed, Self::InProgress, Self::NotStarted];

    /// Exact, case-sensitive match on the wire label
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "completed" => Some(Self::Completed),
            "in_progress" => Some(Self::InProgress),
            "not_started" => Some(Self::NotStarted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::NotStarted => "not_started",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element key → status label, as supplied by the status data provider.
///
/// Labels are kept as raw strings: anything outside [`StatusLabel`] still
/// counts as a match and renders with the palette default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMapping(HashMap<String, String>);

impl StatusMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, label: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), label.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for StatusMapping {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatusMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        for label in StatusLabel::ALL {
            assert_eq!(StatusLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(StatusLabel::parse("Completed"), None);
        assert_eq!(StatusLabel::parse(""), None);
    }

    #[test]
    fn test_mapping_from_json() {
        let mapping: StatusMapping =
            serde_json::from_str(r#"{"Wall-01": "completed", "Slab": "demolished"}"#).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("Wall-01"), Some("completed"));
        assert_eq!(mapping.get("Slab"), Some("demolished"));
        assert_eq!(mapping.get("wall-01"), None);
    }

    #[test]
    fn test_empty_mapping() {
        let mapping: StatusMapping = serde_json::from_str("{}").unwrap();
        assert!(mapping.is_empty());
    }
}
