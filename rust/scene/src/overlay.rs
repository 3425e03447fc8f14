// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status overlay
//!
//! Recolors drawable nodes whose identity resolves to an entry in a
//! [`StatusMapping`]. Keys are tried in the order of [`KEY_STRATEGIES`] and
//! the first one present in the mapping wins. Nodes without a match keep
//! their original material.

use crate::node::{Material, SceneNode};
use crate::palette::PALETTE;
use crate::status::StatusMapping;
use serde::Serialize;
use std::borrow::Cow;

/// One way of deriving a mapping key from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    DisplayName,
    SecondaryId,
    UniqueId,
}

/// Key strategies in precedence order
pub const KEY_STRATEGIES: [KeyStrategy; 3] = [
    KeyStrategy::DisplayName,
    KeyStrategy::SecondaryId,
    KeyStrategy::UniqueId,
];

impl KeyStrategy {
    pub fn key<'a>(&self, node: &'a SceneNode) -> Option<Cow<'a, str>> {
        match self {
            Self::DisplayName => Some(Cow::Borrowed(node.name.as_str())),
            Self::SecondaryId => node.secondary_id.as_deref().map(Cow::Borrowed),
            Self::UniqueId => Some(Cow::Owned(node.id().to_string())),
        }
    }
}

/// Winning key and the raw label it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMatch<'m> {
    pub strategy: KeyStrategy,
    pub key: String,
    pub label: &'m str,
}

/// First-match scan over [`KEY_STRATEGIES`]
pub fn resolve_status<'m>(node: &SceneNode, mapping: &'m StatusMapping) -> Option<StatusMatch<'m>> {
    KEY_STRATEGIES.iter().find_map(|strategy| {
        let key = strategy.key(node)?;
        let label = mapping.get(&key)?;
        Some(StatusMatch {
            strategy: *strategy,
            key: key.into_owned(),
            label,
        })
    })
}

/// Counts from one overlay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReport {
    pub visited: usize,
    pub drawable: usize,
    pub recolored: usize,
}

/// Apply status colors to `root` in place.
///
/// An absent or empty mapping leaves every material untouched. Applying the
/// same mapping twice yields the same materials as applying it once.
pub fn apply_overlay(root: &mut SceneNode, mapping: Option<&StatusMapping>) -> OverlayReport {
    let mapping = mapping.filter(|m| !m.is_empty());
    let mut report = OverlayReport::default();

    root.walk_mut(&mut |node| {
        report.visited += 1;
        if !node.is_drawable() {
            return;
        }
        report.drawable += 1;

        let Some(mapping) = mapping else {
            return;
        };
        let Some(found) = resolve_status(node, mapping) else {
            return;
        };
        let color = PALETTE.color_for_label(found.label);
        node.set_material(Material::named(format!("status:{}", found.label), color));
        report.recolored += 1;
    });

    tracing::debug!(
        visited = report.visited,
        drawable = report.drawable,
        recolored = report.recolored,
        "Applied status overlay"
    );
    report
}
