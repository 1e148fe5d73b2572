//! Device sampling into movement intents

use macroquad::prelude::*;
use shared::{MoveIntent, RawAxes};

/// Per-key contribution to keyboard yaw.
pub const KEY_YAW_STEP: f32 = 0.5;

/// Digital device state read once per sample.
pub trait InputDevice {
    fn key_down(&self, key: KeyCode) -> bool;
    /// Horizontal mouse movement since the last frame, positive to the right.
    fn mouse_dx(&self) -> f32;
}

/// Analog gamepad state.
pub trait AxisProvider {
    fn axes(&self) -> RawAxes;
}

/// Stand-in when no gamepad is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGamepad;

impl AxisProvider for NoGamepad {
    fn axes(&self) -> RawAxes {
        RawAxes::default()
    }
}

/// Keyboard and mouse through macroquad's global input state.
#[derive(Debug, Default)]
pub struct MacroquadDevice {
    pub mouse_look: bool,
}

impl InputDevice for MacroquadDevice {
    fn key_down(&self, key: KeyCode) -> bool {
        is_key_down(key)
    }

    fn mouse_dx(&self) -> f32 {
        if !self.mouse_look {
            return 0.0;
        }
        // macroquad reports previous minus current.
        -mouse_delta_position().x
    }
}

pub struct IntentSource<D: InputDevice, A: AxisProvider> {
    device: D,
    gamepad: Option<A>,
}

impl<D: InputDevice, A: AxisProvider> IntentSource<D, A> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            gamepad: None,
        }
    }

    pub fn with_gamepad(mut self, gamepad: A) -> Self {
        self.gamepad = Some(gamepad);
        self
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn any_down(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|&key| self.device.key_down(key))
    }

    /// Reads current device state into an intent. Nothing is latched between calls.
    pub fn sample(&self) -> MoveIntent {
        let mut yaw_delta = 0.0;
        if self.device.key_down(KeyCode::Q) {
            yaw_delta -= KEY_YAW_STEP;
        }
        if self.device.key_down(KeyCode::E) {
            yaw_delta += KEY_YAW_STEP;
        }

        MoveIntent {
            forward: self.any_down(&[KeyCode::W, KeyCode::Up]),
            back: self.any_down(&[KeyCode::S, KeyCode::Down]),
            left: self.any_down(&[KeyCode::A, KeyCode::Left]),
            right: self.any_down(&[KeyCode::D, KeyCode::Right]),
            run: self.any_down(&[KeyCode::LeftShift, KeyCode::RightShift]),
            jump: self.device.key_down(KeyCode::Space),
            yaw_delta,
            mouse_yaw: self.device.mouse_dx(),
            axes: self
                .gamepad
                .as_ref()
                .map(AxisProvider::axes)
                .unwrap_or_default(),
        }
    }
}
