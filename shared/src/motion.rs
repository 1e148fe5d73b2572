//! Character motion integration.
//!
//! Each tick the integrator folds the authoritative intent into a throttle
//! vector, damps it, adds gravity, biases the move downward while grounded so
//! the body hugs uneven ground, sweeps the collision body and finally feeds
//! any horizontal clipping back into the throttle.

use crate::collision::CollisionBody;
use crate::config::Tuning;
use crate::intent::AuthoritativeIntent;
use glam::{Quat, Vec2, Vec3};
use log::{debug, warn};

/// Scales gravity into a per-tick fall impulse.
pub const TIME_CONSTANT: f32 = 0.002;
/// Scales acceleration into a per-tick throttle contribution.
pub const MOVE_SCALE_CONSTANT: f32 = 0.1;
/// Normalizes diagonal key movement to the speed of a single direction.
pub const DIAGONAL_SCALE: f32 = 0.70710678;
pub const RUN_MULTIPLIER: f32 = 2.0;
/// Vertical throttle at or below this counts as "not jumping".
pub const GROUNDED_THROTTLE_EPSILON: f32 = 0.001;

/// Simulation-owned motion state. Never shared across entities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    pub throttle: Vec3,
    pub fall_speed: f32,
    pub last_yaw: f32,
}

pub struct MotionIntegrator {
    acceleration: f32,
    damping: f32,
    back_and_side_dampen: f32,
    jump_force: f32,
    gravity_modifier: f32,
    gravity_y: f32,
    state: MotionState,
    warned_missing_basis: bool,
}

impl MotionIntegrator {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            acceleration: tuning.acceleration,
            damping: tuning.damping,
            back_and_side_dampen: tuning.back_and_side_dampen,
            jump_force: tuning.jump_force,
            gravity_modifier: tuning.gravity_modifier,
            gravity_y: tuning.gravity_y,
            state: MotionState::default(),
            warned_missing_basis: false,
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Fall impulse applied on the first grounded tick.
    pub fn gravity_step(&self) -> f32 {
        self.gravity_y * self.gravity_modifier * TIME_CONSTANT
    }

    /// Full tick: accumulate intent against the body's current grounding,
    /// then integrate and move. Returns the requested move delta.
    pub fn tick(
        &mut self,
        dt: f32,
        intent: &AuthoritativeIntent,
        body: &mut dyn CollisionBody,
        basis: Option<Quat>,
        move_scale_multiplier: f32,
    ) -> Vec3 {
        let grounded = body.is_grounded();
        self.accumulate(dt, intent, grounded, basis, move_scale_multiplier);
        self.step(dt, body)
    }

    pub fn record_yaw(&mut self, yaw: f32) {
        self.state.last_yaw = yaw;
    }

    /// Adds this tick's directional contribution to the throttle.
    ///
    /// Key flags and analog axes are independent paths. Airborne bodies get
    /// no directional contribution from either.
    pub fn accumulate(
        &mut self,
        dt: f32,
        intent: &AuthoritativeIntent,
        grounded: bool,
        basis: Option<Quat>,
        move_scale_multiplier: f32,
    ) {
        if dt <= 0.0 {
            return;
        }

        let Some(basis) = basis else {
            if intent.has_direction() && !self.warned_missing_basis {
                warn!("No forward basis available; ignoring directional input");
                self.warned_missing_basis = true;
            }
            return;
        };

        let grounded_scale = if grounded { 1.0 } else { 0.0 };
        let key_scale = if intent.is_diagonal() {
            DIAGONAL_SCALE * grounded_scale
        } else {
            grounded_scale
        };

        let base = self.acceleration * MOVE_SCALE_CONSTANT * dt * move_scale_multiplier;

        let mut influence = base * key_scale;
        if intent.run {
            influence *= RUN_MULTIPLIER;
        }

        let dampen = self.back_and_side_dampen;
        if intent.forward {
            self.state.throttle += basis * (Vec3::Z * influence);
        }
        if intent.back {
            self.state.throttle += basis * (Vec3::NEG_Z * influence) * dampen;
        }
        if intent.left {
            self.state.throttle += basis * (Vec3::NEG_X * influence) * dampen;
        }
        if intent.right {
            self.state.throttle += basis * (Vec3::X * influence) * dampen;
        }

        let axes = intent.axes;
        let influence = base * grounded_scale * (1.0 + axes.trigger_l);
        if axes.left_y > 0.0 {
            self.state.throttle += axes.left_y * (basis * (Vec3::Z * influence));
        }
        if axes.left_y < 0.0 {
            self.state.throttle += axes.left_y.abs() * (basis * (Vec3::NEG_Z * influence)) * dampen;
        }
        if axes.left_x < 0.0 {
            self.state.throttle += axes.left_x.abs() * (basis * (Vec3::NEG_X * influence)) * dampen;
        }
        if axes.left_x > 0.0 {
            self.state.throttle += axes.left_x * (basis * (Vec3::X * influence)) * dampen;
        }
    }

    /// Integrates one tick and moves the body. Returns the requested delta.
    pub fn step(&mut self, dt: f32, body: &mut dyn CollisionBody) -> Vec3 {
        if dt <= 0.0 {
            return Vec3::ZERO;
        }

        let grounded = body.is_grounded();
        let throttle = &mut self.state.throttle;

        let motor_damp = 1.0 + self.damping * dt;
        throttle.x /= motor_damp;
        if throttle.y > 0.0 {
            throttle.y /= motor_damp;
        }
        throttle.z /= motor_damp;

        let mut move_delta = *throttle * dt;

        let gravity_step = self.gravity_y * self.gravity_modifier * TIME_CONSTANT;
        if grounded && self.state.fall_speed <= 0.0 {
            self.state.fall_speed = gravity_step;
        } else {
            self.state.fall_speed += gravity_step * dt;
        }
        move_delta.y += self.state.fall_speed * dt;

        // Pre-bias downward so the sweep keeps contact on uneven ground.
        if grounded && self.state.throttle.y <= GROUNDED_THROTTLE_EPSILON {
            let horizontal = Vec2::new(move_delta.x, move_delta.z).length();
            move_delta.y -= body.step_offset().max(horizontal);
        }

        let start = body.position();
        let predicted = Vec2::new(start.x + move_delta.x, start.z + move_delta.z);

        body.move_by(move_delta);

        let end = body.position();
        let actual = Vec2::new(end.x, end.z);

        if actual != predicted {
            let correction = (actual - predicted) / dt;
            debug!(
                "Collision clipped move by ({:.4}, {:.4}); folding into throttle",
                actual.x - predicted.x,
                actual.y - predicted.y
            );
            self.state.throttle.x += correction.x;
            self.state.throttle.z += correction.y;
        }

        move_delta
    }

    /// Adds the jump impulse when grounded.
    pub fn jump(&mut self, grounded: bool) -> bool {
        if !grounded {
            return false;
        }

        self.state.throttle += Vec3::new(0.0, self.jump_force, 0.0);
        true
    }

    /// Halts the body in place and clears all accumulated motion.
    pub fn stop(&mut self, body: &mut dyn CollisionBody) {
        body.move_by(Vec3::ZERO);
        self.state.throttle = Vec3::ZERO;
        self.state.fall_speed = 0.0;
    }
}
