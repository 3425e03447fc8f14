// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orbit camera around a target point (Y-up, right-handed)

use buildview_geometry::Aabb;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::Serialize;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

const MIN_DISTANCE: f32 = 0.05;
const MAX_DISTANCE: f32 = 50_000.0;
/// Keeps the eye off the poles so the up vector stays defined
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
/// Extra room around a framed model
const FRAME_MARGIN: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitCamera {
    target: [f32; 3],
    distance: f32,
    /// Radians around +Y, 0 looks down -Z
    yaw: f32,
    /// Radians above the horizon
    pitch: f32,
    /// Vertical field of view in radians
    fov_y: f32,
    near: f32,
    far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: [0.0; 3],
            distance: 10.0,
            yaw: PI / 4.0,
            pitch: PI / 6.0,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Point3<f32> {
        Point3::from(self.target)
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
        self.target() + offset * self.distance
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye(), &self.target(), &Vector3::y())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect.max(f32::EPSILON), self.fov_y, self.near, self.far)
    }

    /// Orbit by yaw and pitch deltas in radians; pitch is clamped short of the poles
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Scale the distance to the target; factors below 1 move closer
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
        }
    }

    /// Move the target in the view plane, in units of the current distance
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target() - self.eye()).normalize();
        let right = forward.cross(&Vector3::y()).normalize();
        let up = right.cross(&forward);
        let offset = (right * dx + up * dy) * self.distance;
        self.target = (self.target() + offset).coords.into();
    }

    /// Aim at the center of the bounds from far enough to see all of it
    pub fn frame(&mut self, bounds: &Aabb) {
        let radius = (bounds.diagonal() * 0.5).max(MIN_DISTANCE);
        self.target = bounds.center().coords.into();
        self.distance = (radius / (self.fov_y * 0.5).sin() * FRAME_MARGIN).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.near = (self.distance - radius).max(self.distance * 0.001).max(0.01);
        self.far = self.distance + radius * 2.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
