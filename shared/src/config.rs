//! Tuning parameters shared by the integrator and the orientation rig.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_ACCELERATION: f32 = 0.1;
pub const DEFAULT_DAMPING: f32 = 0.15;
pub const DEFAULT_BACK_AND_SIDE_DAMPEN: f32 = 0.5;
pub const DEFAULT_JUMP_FORCE: f32 = 0.3;
pub const DEFAULT_ROTATION_AMOUNT: f32 = 1.5;
pub const DEFAULT_GRAVITY_MODIFIER: f32 = 0.379;
pub const DEFAULT_GRAVITY_Y: f32 = -9.81;
pub const DEFAULT_MOUSE_SENSITIVITY: f32 = 3.25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning value `{name}` is invalid: {value}")]
    Invalid { name: &'static str, value: f32 },
}

/// Externally supplied tuning. Not runtime state; every entity gets its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub acceleration: f32,
    pub damping: f32,
    pub back_and_side_dampen: f32,
    pub jump_force: f32,
    pub rotation_amount: f32,
    pub gravity_modifier: f32,
    pub gravity_y: f32,
    pub mouse_sensitivity: f32,
    /// Weight of the previous sample in the mouse yaw filter, `[0, 1)`.
    pub mouse_smoothing: f32,
    pub mouse_rotation: bool,
    pub stick_rotation: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            acceleration: DEFAULT_ACCELERATION,
            damping: DEFAULT_DAMPING,
            back_and_side_dampen: DEFAULT_BACK_AND_SIDE_DAMPEN,
            jump_force: DEFAULT_JUMP_FORCE,
            rotation_amount: DEFAULT_ROTATION_AMOUNT,
            gravity_modifier: DEFAULT_GRAVITY_MODIFIER,
            gravity_y: DEFAULT_GRAVITY_Y,
            mouse_sensitivity: DEFAULT_MOUSE_SENSITIVITY,
            mouse_smoothing: 0.0,
            mouse_rotation: true,
            stick_rotation: false,
        }
    }
}

impl Tuning {
    /// Loads tuning from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("acceleration", self.acceleration),
            ("back_and_side_dampen", self.back_and_side_dampen),
            ("jump_force", self.jump_force),
            ("rotation_amount", self.rotation_amount),
            ("gravity_modifier", self.gravity_modifier),
            ("gravity_y", self.gravity_y),
            ("mouse_sensitivity", self.mouse_sensitivity),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid { name, value });
            }
        }

        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(ConfigError::Invalid {
                name: "damping",
                value: self.damping,
            });
        }

        if !(0.0..1.0).contains(&self.mouse_smoothing) {
            return Err(ConfigError::Invalid {
                name: "mouse_smoothing",
                value: self.mouse_smoothing,
            });
        }

        Ok(())
    }
}
