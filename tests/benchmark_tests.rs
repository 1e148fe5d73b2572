//! Performance benchmarks for the movement simulation

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::game::GameState;
use shared::{
    decode, encode, AvatarSnapshot, IntentReceiver, IntentSender, KinematicBody, Loopback,
    MotionIntegrator, MoveIntent, Packet, RawAxes, Tuning,
};
use std::time::Instant;

const DT: f32 = 1.0 / 60.0;

fn random_intent(rng: &mut StdRng) -> MoveIntent {
    MoveIntent {
        forward: rng.gen_bool(0.5),
        back: rng.gen_bool(0.2),
        left: rng.gen_bool(0.3),
        right: rng.gen_bool(0.3),
        run: rng.gen_bool(0.25),
        jump: rng.gen_bool(0.05),
        yaw_delta: [-0.5, 0.0, 0.5][rng.gen_range(0..3)],
        mouse_yaw: rng.gen_range(-0.05..0.05),
        axes: RawAxes {
            left_x: rng.gen_range(-1.0..1.0),
            left_y: rng.gen_range(-1.0..1.0),
            right_x: rng.gen_range(-1.0..1.0),
            trigger_l: rng.gen_range(0.0..1.0),
        },
    }
}

/// Benchmarks integrator ticks against a kinematic body with obstacles
#[test]
fn benchmark_integrator_ticks() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut motion = MotionIntegrator::new(&Tuning::default());
    let mut body = KinematicBody::new(Vec3::ZERO).with_obstacles(GameState::default_level());
    let mut receiver = IntentReceiver::new();

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        receiver.on_receive(random_intent(&mut rng));
        if receiver.take_jump() {
            motion.jump(shared::CollisionBody::is_grounded(&body));
        }
        motion.tick(DT, receiver.current(), &mut body, Some(Quat::IDENTITY), 1.0);
    }

    let duration = start.elapsed();
    println!(
        "Integrator: {} ticks in {:?} ({:.2} ns/tick)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    let state = motion.state();
    assert!(state.throttle.is_finite());
    assert!(state.fall_speed.is_finite());
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks a full world tick with many avatars
#[test]
fn benchmark_world_update() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut world = GameState::new(Tuning::default()).with_level(GameState::default_level());

    let avatars = 32;
    for id in 1..=avatars {
        world.add_avatar(id);
        world.enable(id);
    }

    let ticks = 1_000;
    let start = Instant::now();

    for _ in 0..ticks {
        for id in 1..=avatars {
            world.apply_intent(id, random_intent(&mut rng));
        }
        world.step(DT);
    }

    let duration = start.elapsed();
    println!(
        "World update: {} ticks x {} avatars in {:?} ({:.2} μs/tick)",
        ticks,
        avatars,
        duration,
        duration.as_micros() as f64 / ticks as f64
    );

    assert_eq!(world.tick, ticks);
    for snapshot in world.snapshots() {
        assert!(snapshot.position.is_finite());
        assert!(snapshot.position.y >= 0.0);
    }
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the sender state machine under mostly idle input
#[test]
fn benchmark_idle_suppression() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut sender = IntentSender::new(Loopback::default());

    let iterations = 100_000;
    let mut published = 0u64;
    let start = Instant::now();

    for _ in 0..iterations {
        let intent = if rng.gen_bool(0.1) {
            random_intent(&mut rng)
        } else {
            MoveIntent::default()
        };
        if sender.publish(intent).unwrap_or(false) {
            published += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Idle suppression: {} publishes, {} sent in {:?}",
        iterations, published, duration
    );

    assert!(published < iterations / 4);
    assert_eq!(published, sender.transport_mut().receiver.received());
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot encoding for a full server
#[test]
fn benchmark_snapshot_serialization() {
    let avatars: Vec<AvatarSnapshot> = (0..32)
        .map(|i| AvatarSnapshot {
            id: i,
            position: Vec3::new(i as f32, 0.0, -(i as f32)),
            throttle: Vec3::new(0.01, 0.0, 0.02),
            yaw: i as f32 * 0.1,
            grounded: i % 2 == 0,
        })
        .collect();

    let packet = Packet::Snapshot {
        tick: 12345,
        timestamp: 1234567890,
        avatars,
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = encode(&packet).unwrap();
        assert!(bytes.len() < shared::MAX_PACKET_SIZE);
        let _decoded = decode(&bytes).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}
