// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BuildView Viewer
//!
//! The shell around the scene loader: tracks which model reference is
//! active, discards results that arrive for superseded references, keeps the
//! status overlay applied, and owns the orbit camera.

pub mod camera;
pub mod shell;
pub mod state;

pub use camera::OrbitCamera;
pub use shell::Viewer;
pub use state::{LoadState, ViewerView};
