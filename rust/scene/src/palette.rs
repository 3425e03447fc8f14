// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status palette

use crate::status::StatusLabel;
use crate::Rgba;
use serde::Serialize;

/// Color per status label plus a fallback for anything unrecognized
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Palette {
    pub completed: Rgba,
    pub in_progress: Rgba,
    pub not_started: Rgba,
    pub default: Rgba,
}

/// Process-wide status palette
pub static PALETTE: Palette = Palette {
    // #22c55e
    completed: [0.133, 0.773, 0.369, 1.0],
    // #f59e0b
    in_progress: [0.961, 0.620, 0.043, 1.0],
    // #ef4444
    not_started: [0.937, 0.267, 0.267, 1.0],
    // #9ca3af
    default: [0.612, 0.639, 0.686, 1.0],
};

impl Palette {
    pub fn color(&self, label: StatusLabel) -> Rgba {
        match label {
            StatusLabel::Completed => self.completed,
            StatusLabel::InProgress => self.in_progress,
            StatusLabel::NotStarted => self.not_started,
        }
    }

    /// Color for a raw mapping label; unknown labels get the default
    pub fn color_for_label(&self, label: &str) -> Rgba {
        StatusLabel::parse(label).map_or(self.default, |label| self.color(label))
    }
}
