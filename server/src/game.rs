use glam::{Quat, Vec3};
use log::{debug, info};
use shared::collision::Aabb;
use shared::{
    AvatarSnapshot, BodyTransform, CollisionBody, HeadlessCamera, IntentReceiver, KinematicBody,
    MotionIntegrator, MoveIntent, OrientationRig, OwnershipGate, ScaleError, Tuning,
};
use std::collections::HashMap;

/// Horizontal spacing between spawn points.
const SPAWN_SPACING: f32 = 2.0;

/// One simulated character. Everything here is owned by the server and
/// mutated only from the tick loop.
pub struct Avatar {
    pub id: u32,
    gate: OwnershipGate,
    receiver: IntentReceiver,
    motion: MotionIntegrator,
    rig: OrientationRig,
    body: KinematicBody,
}

impl Avatar {
    pub fn new(id: u32, spawn: Vec3, facing: Quat, tuning: &Tuning, level: &[Aabb]) -> Self {
        let mut rig = OrientationRig::new(tuning)
            .with_camera(Box::new(HeadlessCamera::default()))
            .with_body(BodyTransform { rotation: facing });
        rig.initialize(facing);

        Self {
            id,
            gate: OwnershipGate::new(id),
            receiver: IntentReceiver::new(),
            motion: MotionIntegrator::new(tuning),
            rig,
            body: KinematicBody::new(spawn).with_obstacles(level.to_vec()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn motion(&self) -> &MotionIntegrator {
        &self.motion
    }

    pub fn rig(&self) -> &OrientationRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut OrientationRig {
        &mut self.rig
    }

    pub fn current_intent(&self) -> &MoveIntent {
        self.receiver.current().intent()
    }

    /// Advances this avatar by one tick from its authoritative intent.
    pub fn update(&mut self, dt: f32) {
        if !self.gate.is_enabled() || dt <= 0.0 {
            return;
        }

        let intent = *self.receiver.current();
        self.rig.integrate_yaw(dt, &intent);

        if self.receiver.take_jump() && self.motion.jump(self.body.is_grounded()) {
            debug!("Avatar {} jumped", self.id);
        }

        self.motion.tick(
            dt,
            &intent,
            &mut self.body,
            self.rig.forward_basis(),
            self.rig.move_scale_multiplier(),
        );
        self.motion.record_yaw(self.rig.yaw());
        self.rig.set_cameras();
        self.rig.update_body_forward();
    }

    pub fn stop(&mut self) {
        self.motion.stop(&mut self.body);
    }

    pub fn snapshot(&self) -> AvatarSnapshot {
        AvatarSnapshot {
            id: self.id,
            position: self.body.position(),
            throttle: self.motion.state().throttle,
            yaw: self.rig.yaw(),
            grounded: self.body.is_grounded(),
        }
    }
}

pub struct GameState {
    pub tick: u32,
    avatars: HashMap<u32, Avatar>,
    tuning: Tuning,
    level: Vec<Aabb>,
}

impl GameState {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tick: 0,
            avatars: HashMap::new(),
            tuning,
            level: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: Vec<Aabb>) -> Self {
        self.level = level;
        self
    }

    /// A walled yard with a low step and a ledge too high to climb.
    pub fn default_level() -> Vec<Aabb> {
        vec![
            Aabb::new(Vec3::new(-20.0, 0.0, 20.0), Vec3::new(20.0, 3.0, 21.0)),
            Aabb::new(Vec3::new(-20.0, 0.0, -21.0), Vec3::new(20.0, 3.0, -20.0)),
            Aabb::new(Vec3::new(20.0, 0.0, -20.0), Vec3::new(21.0, 3.0, 20.0)),
            Aabb::new(Vec3::new(-21.0, 0.0, -20.0), Vec3::new(-20.0, 3.0, 20.0)),
            Aabb::new(Vec3::new(-4.0, 0.0, 5.0), Vec3::new(4.0, 0.2, 8.0)),
            Aabb::new(Vec3::new(-4.0, 0.0, 10.0), Vec3::new(4.0, 1.0, 12.0)),
        ]
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn add_avatar(&mut self, client_id: u32) {
        let spawn = Vec3::new(
            (client_id as f32 * SPAWN_SPACING) % 30.0 - 15.0,
            0.0,
            0.0,
        );

        let avatar = Avatar::new(client_id, spawn, Quat::IDENTITY, &self.tuning, &self.level);

        info!(
            "Spawned avatar {} at ({:.2}, {:.2}, {:.2})",
            client_id, spawn.x, spawn.y, spawn.z
        );
        self.avatars.insert(client_id, avatar);
    }

    pub fn remove_avatar(&mut self, client_id: &u32) {
        if self.avatars.remove(client_id).is_some() {
            info!("Removed avatar {}", client_id);
        }
    }

    pub fn avatar(&self, client_id: u32) -> Option<&Avatar> {
        self.avatars.get(&client_id)
    }

    pub fn avatar_mut(&mut self, client_id: u32) -> Option<&mut Avatar> {
        self.avatars.get_mut(&client_id)
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    /// Delivers an enable signal to every avatar present right now.
    ///
    /// Returns true if some avatar transitioned to enabled.
    pub fn enable(&mut self, identity: u32) -> bool {
        let mut transitioned = false;
        for avatar in self.avatars.values_mut() {
            transitioned |= avatar.gate.enable(identity);
        }
        transitioned
    }

    /// Identities whose avatars have been enabled, for replay to late joiners.
    pub fn enabled_identities(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .avatars
            .values()
            .filter(|a| a.is_enabled())
            .map(|a| a.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The only path by which a peer's intent reaches the simulation.
    pub fn apply_intent(&mut self, client_id: u32, intent: MoveIntent) -> bool {
        match self.avatars.get_mut(&client_id) {
            Some(avatar) => {
                avatar.receiver.on_receive(intent);
                true
            }
            None => false,
        }
    }

    pub fn set_move_scale_multiplier(&mut self, client_id: u32, value: f32) -> Result<(), ScaleError> {
        match self.avatars.get_mut(&client_id) {
            Some(avatar) => avatar.rig.set_move_scale_multiplier(value),
            None => Ok(()),
        }
    }

    pub fn update(&mut self, dt: f32) {
        for avatar in self.avatars.values_mut() {
            avatar.update(dt);
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.update(dt);
        self.tick += 1;
    }

    pub fn snapshots(&self) -> Vec<AvatarSnapshot> {
        let mut avatars: Vec<AvatarSnapshot> =
            self.avatars.values().map(Avatar::snapshot).collect();
        avatars.sort_unstable_by_key(|a| a.id);
        avatars
    }
}
