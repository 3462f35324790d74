// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor camera.
//!
//! Left-handed, +Y up. Free-fly mode moves the eye with WASD / Space /
//! Control and looks around while the middle button is held. Orbit mode
//! keeps the eye on a pivot and pans, dollies or rotates around it.

use crate::input::{InputSource, Key};
use crate::math::Ray;
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Near plane slider range
pub const NEAR_RANGE: RangeInclusive<f32> = 0.01..=10.0;
/// Far plane slider range
pub const FAR_RANGE: RangeInclusive<f32> = 1.0..=5000.0;
/// Field of view slider range, in degrees
pub const FOV_RANGE: RangeInclusive<f32> = 1.0..=179.0;

/// Eye position after a reset
pub const RESET_POSITION: Vec3 = Vec3::new(0.0, 2.0, -10.0);

const PITCH_LIMIT: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;
const MIN_DISTANCE: f32 = 0.1;

/// Camera control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraMode {
    /// First-person fly camera
    #[default]
    FreeFly,
    /// Orbit around a pivot
    Orbit,
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Control mode
    pub mode: CameraMode,
    /// Movement speed in units per second
    pub move_speed: f32,
    /// Movement speed while Shift is held
    pub fast_move_speed: f32,
    /// Look sensitivity; pointer pixels are scaled by `sensitivity / 60`
    pub pointer_sensitivity: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            mode: CameraMode::FreeFly,
            move_speed: 10.0,
            fast_move_speed: 40.0,
            pointer_sensitivity: 0.3,
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraSettings {
    /// Copy with the projection values clamped to their slider ranges
    pub fn clamped(&self) -> Self {
        let clamp = |value: f32, range: &RangeInclusive<f32>| value.clamp(*range.start(), *range.end());
        Self {
            fov_degrees: clamp(self.fov_degrees, &FOV_RANGE),
            near: clamp(self.near, &NEAR_RANGE),
            far: clamp(self.far, &FAR_RANGE),
            ..self.clone()
        }
    }
}

/// Editor camera
#[derive(Debug, Clone, PartialEq)]
pub struct EditorCamera {
    /// Eye position
    pub position: Vec3,
    /// Yaw around +Y in radians
    pub yaw: f32,
    /// Pitch around the camera's right axis in radians; positive looks down
    pub pitch: f32,
    /// Orbit pivot
    pub pivot: Vec3,
    /// Orbit distance from the pivot
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl Default for EditorCamera {
    fn default() -> Self {
        let settings = CameraSettings::default();
        let mut camera = Self {
            position: RESET_POSITION,
            yaw: 0.0,
            pitch: 0.0,
            pivot: Vec3::ZERO,
            distance: 10.0,
            fov_degrees: settings.fov_degrees,
            near: settings.near,
            far: settings.far,
        };
        camera.reset();
        camera
    }
}

impl EditorCamera {
    /// Create a new editor camera
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the reset position, looking down +Z
    pub fn reset(&mut self) {
        self.position = RESET_POSITION;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.distance = 10.0;
        self.pivot = self.position + self.forward() * self.distance;
    }

    fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Get the camera forward direction
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    /// Get the camera right direction
    pub fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    /// Get the camera up direction
    pub fn up(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_lh(self.position, self.forward(), self.up())
    }

    /// View to clip transform, depth in [0, 1]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_lh(self.fov_degrees.to_radians(), aspect.max(f32::EPSILON), self.near, self.far)
    }

    /// World ray through a pointer position in viewport pixels
    pub fn ray(&self, pointer: Vec2, viewport: Vec2) -> Ray {
        let size = viewport.max(Vec2::ONE);
        let ndc = Vec2::new(pointer.x / size.x * 2.0 - 1.0, 1.0 - pointer.y / size.y * 2.0);
        let inverse = (self.projection_matrix(size.x / size.y) * self.view_matrix()).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    fn look(&mut self, delta: Vec2) {
        self.yaw += delta.x;
        self.pitch = (self.pitch + delta.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Advance one frame
    pub fn update(&mut self, input: &dyn InputSource, dt: f32, settings: &CameraSettings) {
        let settings = settings.clamped();
        self.fov_degrees = settings.fov_degrees;
        self.near = settings.near;
        self.far = settings.far;

        let look = if input.down(Key::MouseMiddle) {
            input.pointer_delta() * settings.pointer_sensitivity / 60.0
        } else {
            Vec2::ZERO
        };

        match settings.mode {
            CameraMode::FreeFly => {
                self.look(look);
                let speed = if input.down(Key::Shift) {
                    settings.fast_move_speed
                } else {
                    settings.move_speed
                };
                let mut direction = Vec3::ZERO;
                for (key, axis) in [
                    (Key::W, self.forward()),
                    (Key::S, -self.forward()),
                    (Key::D, self.right()),
                    (Key::A, -self.right()),
                    (Key::Space, Vec3::Y),
                    (Key::Control, -Vec3::Y),
                ] {
                    if input.down(key) {
                        direction += axis;
                    }
                }
                self.position += direction.normalize_or_zero() * speed * dt;
                self.pivot = self.position + self.forward() * self.distance;
            }
            CameraMode::Orbit => {
                if input.down(Key::Shift) {
                    self.pivot += (self.up() * look.y - self.right() * look.x) * self.distance;
                } else if input.down(Key::Control) {
                    self.distance = (self.distance * (1.0 + look.y)).clamp(MIN_DISTANCE, self.far);
                } else {
                    self.look(look);
                }
                self.position = self.pivot - self.forward() * self.distance;
            }
        }
    }
}
