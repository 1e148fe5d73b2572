//! Yaw accumulation, camera forwarding and the body-forward transform.
//!
//! Axis convention: +Z is forward, +X is right, +Y is up. Positive yaw turns
//! the view to the right.

use crate::config::Tuning;
use crate::intent::MoveIntent;
use glam::{Quat, Vec3};
use log::warn;
use thiserror::Error;

/// Keyboard yaw runs at half rate to reduce discomfort.
pub const KEY_YAW_RATE: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("scale multiplier must be finite and greater than zero, got {0}")]
    NotPositive(f32),
}

/// Camera or view collaborator fed once per tick.
pub trait CameraView {
    fn set_orientation_offset(&mut self, offset: Quat);
    fn set_yaw(&mut self, yaw: f32);
    /// Current world-space facing of the view.
    fn facing(&self) -> Quat;
}

/// A view with no rendering attached. Facing is the offset rotated by yaw.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessCamera {
    offset: Quat,
    yaw: f32,
}

impl Default for HeadlessCamera {
    fn default() -> Self {
        Self {
            offset: Quat::IDENTITY,
            yaw: 0.0,
        }
    }
}

impl HeadlessCamera {
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn orientation_offset(&self) -> Quat {
        self.offset
    }
}

impl CameraView for HeadlessCamera {
    fn set_orientation_offset(&mut self, offset: Quat) {
        self.offset = offset;
    }

    fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    fn facing(&self) -> Quat {
        self.offset * Quat::from_rotation_y(self.yaw)
    }
}

/// Transform that movement is expressed relative to. Carries the body's
/// facing, which may diverge from the head later on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    pub rotation: Quat,
}

impl Default for BodyTransform {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
        }
    }
}

impl BodyTransform {
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }
}

pub struct OrientationRig {
    orientation_offset: Quat,
    yaw: f32,
    move_scale_multiplier: f32,
    rotation_scale_multiplier: f32,
    filtered_mouse_yaw: f32,
    rotation_amount: f32,
    mouse_sensitivity: f32,
    mouse_smoothing: f32,
    mouse_rotation: bool,
    stick_rotation: bool,
    camera: Option<Box<dyn CameraView + Send + Sync>>,
    body: Option<BodyTransform>,
    warned_no_camera: bool,
    warned_no_body: bool,
}

impl OrientationRig {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            orientation_offset: Quat::IDENTITY,
            yaw: 0.0,
            move_scale_multiplier: 1.0,
            rotation_scale_multiplier: 1.0,
            filtered_mouse_yaw: 0.0,
            rotation_amount: tuning.rotation_amount,
            mouse_sensitivity: tuning.mouse_sensitivity,
            mouse_smoothing: tuning.mouse_smoothing,
            mouse_rotation: tuning.mouse_rotation,
            stick_rotation: tuning.stick_rotation,
            camera: None,
            body: None,
            warned_no_camera: false,
            warned_no_body: false,
        }
    }

    pub fn with_camera(mut self, camera: Box<dyn CameraView + Send + Sync>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn set_camera(&mut self, camera: Box<dyn CameraView + Send + Sync>) {
        self.camera = Some(camera);
    }

    pub fn with_body(mut self, body: BodyTransform) -> Self {
        self.body = Some(body);
        self
    }

    /// Takes the starting facing as the orientation offset and clears yaw.
    pub fn initialize(&mut self, start_rotation: Quat) {
        self.orientation_offset = start_rotation;
        self.yaw = 0.0;
        self.filtered_mouse_yaw = 0.0;
    }

    /// Folds this tick's rotation input into yaw and forwards the result.
    pub fn update(&mut self, dt: f32, intent: &MoveIntent) {
        self.integrate_yaw(dt, intent);
        self.set_cameras();
    }

    /// Folds this tick's rotation input into yaw without touching the camera.
    pub fn integrate_yaw(&mut self, dt: f32, intent: &MoveIntent) {
        if dt > 0.0 {
            let rotate_influence = dt * self.rotation_amount * self.rotation_scale_multiplier;

            self.yaw += intent.yaw_delta * rotate_influence;

            let raw_mouse = if self.mouse_rotation {
                intent.mouse_yaw * rotate_influence * self.mouse_sensitivity
            } else {
                0.0
            };
            let filtered = self.filtered_mouse_yaw * self.mouse_smoothing
                + raw_mouse * (1.0 - self.mouse_smoothing);
            self.yaw += filtered;
            self.filtered_mouse_yaw = filtered;

            if self.stick_rotation {
                self.yaw += intent.axes.right_x * rotate_influence;
            }
        }
    }

    /// Publishes orientation offset and yaw to the camera.
    pub fn set_cameras(&mut self) {
        match self.camera.as_mut() {
            Some(camera) => {
                camera.set_orientation_offset(self.orientation_offset);
                camera.set_yaw(self.yaw);
            }
            None => self.warn_no_camera(),
        }
    }

    /// Copies the camera facing onto the body-forward transform.
    pub fn update_body_forward(&mut self) {
        let Some(facing) = self.camera.as_ref().map(|camera| camera.facing()) else {
            self.warn_no_camera();
            if self.body.is_none() {
                self.warn_no_body();
            }
            return;
        };

        match self.body.as_mut() {
            Some(body) => body.rotation = facing,
            None => self.warn_no_body(),
        }
    }

    fn warn_no_camera(&mut self) {
        if !std::mem::replace(&mut self.warned_no_camera, true) {
            warn!("Orientation rig has no camera attached; continuing without it");
        }
    }

    fn warn_no_body(&mut self) {
        if !std::mem::replace(&mut self.warned_no_body, true) {
            warn!("Orientation rig has no body-forward transform attached; continuing without it");
        }
    }

    /// Whether each missing collaborator has been reported, camera first.
    pub fn reported_missing(&self) -> (bool, bool) {
        (self.warned_no_camera, self.warned_no_body)
    }

    /// Rotation that direction-local movement vectors are expressed in.
    pub fn forward_basis(&self) -> Option<Quat> {
        self.body.map(|body| body.rotation)
    }

    pub fn body(&self) -> Option<&BodyTransform> {
        self.body.as_ref()
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn orientation_offset(&self) -> Quat {
        self.orientation_offset
    }

    pub fn move_scale_multiplier(&self) -> f32 {
        self.move_scale_multiplier
    }

    pub fn set_move_scale_multiplier(&mut self, value: f32) -> Result<(), ScaleError> {
        self.move_scale_multiplier = Self::checked_scale(value)?;
        Ok(())
    }

    pub fn rotation_scale_multiplier(&self) -> f32 {
        self.rotation_scale_multiplier
    }

    pub fn set_rotation_scale_multiplier(&mut self, value: f32) -> Result<(), ScaleError> {
        self.rotation_scale_multiplier = Self::checked_scale(value)?;
        Ok(())
    }

    fn checked_scale(value: f32) -> Result<f32, ScaleError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ScaleError::NotPositive(value))
        }
    }
}
