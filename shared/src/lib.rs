use serde::{Deserialize, Serialize};

pub mod channel;
pub mod collision;
pub mod config;
pub mod intent;
pub mod motion;
pub mod orientation;
pub mod ownership;

pub use channel::{
    IntentReceiver, IntentSender, Loopback, SendState, Transport, TransportError,
    IDLE_RESEND_TICKS,
};
pub use collision::{Aabb, CollisionBody, KinematicBody};
pub use config::{ConfigError, Tuning};
pub use intent::{AuthoritativeIntent, MoveIntent, RawAxes};
pub use motion::{MotionIntegrator, MotionState};
pub use orientation::{BodyTransform, CameraView, HeadlessCamera, OrientationRig, ScaleError};
pub use ownership::OwnershipGate;

use glam::Vec3;

pub const CLIENT_VERSION: u32 = 1;
pub const DEFAULT_TICK_RATE: u32 = 60;
pub const MAX_PACKET_SIZE: usize = 2048;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    MovementInput {
        intent: MoveIntent,
    },
    DebugLog {
        message: String,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    Enable {
        identity: u32,
    },
    Snapshot {
        tick: u32,
        timestamp: u64,
        avatars: Vec<AvatarSnapshot>,
    },
    Disconnected {
        reason: String,
    },
}

/// Authoritative view of one avatar, broadcast every server tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct AvatarSnapshot {
    pub id: u32,
    pub position: Vec3,
    pub throttle: Vec3,
    pub yaw: f32,
    pub grounded: bool,
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, TransportError> {
    Ok(bincode::serialize(packet)?)
}

pub fn decode(bytes: &[u8]) -> Result<Packet, TransportError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect { client_version: 42 };
        let serialized = encode(&packet).unwrap();
        let deserialized = decode(&serialized).unwrap();

        match deserialized {
            Packet::Connect { client_version } => assert_eq!(client_version, 42),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_movement_input() {
        let intent = MoveIntent {
            forward: true,
            right: true,
            run: true,
            yaw_delta: -0.5,
            axes: RawAxes {
                left_x: 0.25,
                trigger_l: 0.75,
                ..Default::default()
            },
            ..Default::default()
        };

        let serialized = encode(&Packet::MovementInput { intent }).unwrap();

        match decode(&serialized).unwrap() {
            Packet::MovementInput { intent: received } => {
                assert_eq!(received, intent);
                assert!(received.forward && received.right && received.run);
                assert!(!received.back && !received.left);
                assert_approx_eq!(received.axes.trigger_l, 0.75);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_snapshot() {
        let avatars = vec![
            AvatarSnapshot {
                id: 1,
                position: Vec3::new(1.0, 0.0, 2.0),
                throttle: Vec3::ZERO,
                yaw: 0.5,
                grounded: true,
            },
            AvatarSnapshot {
                id: 2,
                position: Vec3::new(-3.0, 1.5, 0.0),
                throttle: Vec3::new(0.0, 0.3, 0.0),
                yaw: 0.0,
                grounded: false,
            },
        ];

        let packet = Packet::Snapshot {
            tick: 42,
            timestamp: 123456789,
            avatars,
        };

        match decode(&encode(&packet).unwrap()).unwrap() {
            Packet::Snapshot {
                tick,
                timestamp,
                avatars,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(timestamp, 123456789);
                assert_eq!(avatars.len(), 2);
                assert_eq!(avatars[1].position, Vec3::new(-3.0, 1.5, 0.0));
                assert!(!avatars[1].grounded);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_movement_input_fits_in_one_datagram() {
        let packet = Packet::MovementInput {
            intent: MoveIntent::default(),
        };
        assert!(encode(&packet).unwrap().len() < MAX_PACKET_SIZE);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff, 0xff, 0xff]),
            Err(TransportError::Codec(_))
        ));
    }
}
