// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BuildView Scene
//!
//! The renderable scene graph both loaders produce, plus the status overlay
//! that recolors it from a construction-status mapping.
//!
//! ```rust,ignore
//! use buildview_scene::{apply_overlay, StatusMapping};
//!
//! let mapping: StatusMapping = serde_json::from_str(r#"{"Wall-01": "completed"}"#)?;
//! let mut scene = pristine.clone();
//! let report = apply_overlay(&mut scene, Some(&mapping));
//! ```

pub mod node;
pub mod overlay;
pub mod palette;
pub mod status;

pub use node::{Material, NodeId, SceneNode};
pub use overlay::{apply_overlay, resolve_status, KeyStrategy, OverlayReport, StatusMatch, KEY_STRATEGIES};
pub use palette::{Palette, PALETTE};
pub use status::{StatusLabel, StatusMapping};

/// RGBA color, components in 0..=1
pub use buildview_geometry::Rgba;
