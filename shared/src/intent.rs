//! Per-tick movement intent and its authoritative copy.

use serde::{Deserialize, Serialize};

/// Raw analog axes sampled from a gamepad.
///
/// Sticks are in `[-1, 1]`, the trigger in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAxes {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub trigger_l: f32,
}

impl RawAxes {
    pub fn is_zero(&self) -> bool {
        self.left_x == 0.0 && self.left_y == 0.0 && self.right_x == 0.0 && self.trigger_l == 0.0
    }
}

/// Normalized movement intent for a single simulation tick.
///
/// Produced by the input-sensing peer once per tick and never mutated after
/// publication. `yaw_delta` carries keyboard yaw (already halved per key) and
/// `mouse_yaw` the raw horizontal mouse delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub jump: bool,
    pub yaw_delta: f32,
    pub mouse_yaw: f32,
    pub axes: RawAxes,
}

impl MoveIntent {
    /// True when nothing is pressed and every axis is at rest.
    pub fn is_idle(&self) -> bool {
        !self.has_direction()
            && !self.run
            && !self.jump
            && self.yaw_delta == 0.0
            && self.mouse_yaw == 0.0
            && self.axes.is_zero()
    }

    pub fn has_direction(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }

    /// Two adjacent directions held together (forward/back with left/right).
    pub fn is_diagonal(&self) -> bool {
        (self.forward || self.back) && (self.left || self.right)
    }
}

/// Authoritative copy of a peer's intent, owned by the simulating side.
///
/// Only [`IntentReceiver`](crate::channel::IntentReceiver) can replace the
/// inner value; everything else gets read access.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuthoritativeIntent {
    pub(crate) intent: MoveIntent,
}

impl AuthoritativeIntent {
    pub fn intent(&self) -> &MoveIntent {
        &self.intent
    }
}

impl std::ops::Deref for AuthoritativeIntent {
    type Target = MoveIntent;

    fn deref(&self) -> &MoveIntent {
        &self.intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intent_is_idle() {
        assert!(MoveIntent::default().is_idle());
    }

    #[test]
    fn test_any_flag_breaks_idle() {
        let intent = MoveIntent {
            left: true,
            ..Default::default()
        };
        assert!(!intent.is_idle());

        let intent = MoveIntent {
            mouse_yaw: 0.25,
            ..Default::default()
        };
        assert!(!intent.is_idle());

        let intent = MoveIntent {
            axes: RawAxes {
                trigger_l: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!intent.is_idle());
    }

    #[test]
    fn test_diagonal_detection() {
        let forward_left = MoveIntent {
            forward: true,
            left: true,
            ..Default::default()
        };
        assert!(forward_left.is_diagonal());

        let back_right = MoveIntent {
            back: true,
            right: true,
            ..Default::default()
        };
        assert!(back_right.is_diagonal());

        let opposite = MoveIntent {
            forward: true,
            back: true,
            ..Default::default()
        };
        assert!(!opposite.is_diagonal());

        let sideways = MoveIntent {
            left: true,
            right: true,
            ..Default::default()
        };
        assert!(!sideways.is_diagonal());
    }

    #[test]
    fn test_authoritative_intent_derefs() {
        let auth = AuthoritativeIntent {
            intent: MoveIntent {
                forward: true,
                ..Default::default()
            },
        };
        assert!(auth.forward);
        assert!(auth.intent().forward);
    }
}
