//! Client session state and the UDP network task
//!
//! The window loop never touches the socket. It publishes packets into an
//! unbounded channel drained by [`run_network`], and receives
//! [`NetworkEvent`]s back through another.

use log::{debug, error, info, warn};
use shared::{
    decode, encode, AvatarSnapshot, HeadlessCamera, IntentSender, MoveIntent, OrientationRig,
    OwnershipGate, Packet, SendState, Transport, TransportError, Tuning, MAX_PACKET_SIZE,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Events forwarded from the network task to the frame loop
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Connected { client_id: u32 },
    Enable { identity: u32 },
    Snapshot { tick: u32, avatars: Vec<AvatarSnapshot> },
    Disconnected { reason: String },
}

impl NetworkEvent {
    fn from_packet(packet: Packet) -> Option<Self> {
        match packet {
            Packet::Connected { client_id } => Some(Self::Connected { client_id }),
            Packet::Enable { identity } => Some(Self::Enable { identity }),
            Packet::Snapshot { tick, avatars, .. } => Some(Self::Snapshot { tick, avatars }),
            Packet::Disconnected { reason } => Some(Self::Disconnected { reason }),
            _ => None,
        }
    }
}

pub struct NetworkConfig {
    pub server_addr: SocketAddr,
    pub client_version: u32,
    /// Artificial round-trip latency in milliseconds, split across both legs
    pub fake_ping_ms: u64,
}

/// Connects, then shuttles packets until the outgoing channel closes.
///
/// Dropping every sender for `outgoing` ends the task after a best-effort
/// `Disconnect`.
pub async fn run_network(
    config: NetworkConfig,
    mut outgoing: mpsc::UnboundedReceiver<Packet>,
    events: mpsc::UnboundedSender<NetworkEvent>,
) -> Result<(), TransportError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let half_ping = Duration::from_millis(config.fake_ping_ms / 2);

    info!("Connecting to {}...", config.server_addr);
    send_packet(
        &socket,
        &Packet::Connect {
            client_version: config.client_version,
        },
        config.server_addr,
    )
    .await?;

    let mut buffer = [0u8; MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((len, from)) if from == config.server_addr => {
                        if !half_ping.is_zero() {
                            sleep(half_ping).await;
                        }

                        match decode(&buffer[..len]) {
                            Ok(packet) => match NetworkEvent::from_packet(packet) {
                                Some(event) => {
                                    if events.send(event).is_err() {
                                        debug!("Frame loop gone; stopping network task");
                                        break;
                                    }
                                }
                                None => warn!("Unexpected packet type from server"),
                            },
                            Err(e) => warn!("Dropping undecodable packet: {}", e),
                        }
                    }
                    Ok((_, from)) => debug!("Ignoring datagram from {}", from),
                    Err(e) => error!("Error receiving packet: {}", e),
                }
            },

            packet = outgoing.recv() => {
                let Some(packet) = packet else {
                    break;
                };

                if !half_ping.is_zero() {
                    sleep(half_ping).await;
                }

                if let Err(e) = send_packet(&socket, &packet, config.server_addr).await {
                    error!("Failed to send packet: {}", e);
                }
            },
        }
    }

    let _ = send_packet(&socket, &Packet::Disconnect, config.server_addr).await;
    info!("Network task stopped");
    Ok(())
}

async fn send_packet(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), TransportError> {
    let data = encode(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

/// Frame-loop side of a connection
///
/// Intents are only published once the server has enabled this peer's
/// avatar. A local orientation rig mirrors the server's yaw integration so
/// the view can turn without waiting for a snapshot.
pub struct Session {
    client_id: Option<u32>,
    gate: Option<OwnershipGate>,
    sender: IntentSender<mpsc::UnboundedSender<Packet>>,
    rig: OrientationRig,
    tick: u32,
    avatars: Vec<AvatarSnapshot>,
    status: String,
}

impl Session {
    pub fn new(outgoing: mpsc::UnboundedSender<Packet>, tuning: &Tuning) -> Self {
        Self {
            client_id: None,
            gate: None,
            sender: IntentSender::new(outgoing),
            rig: OrientationRig::new(tuning).with_camera(Box::new(HeadlessCamera::default())),
            tick: 0,
            avatars: Vec::new(),
            status: "Connecting".to_string(),
        }
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_some_and(|gate| gate.is_enabled())
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn avatars(&self) -> &[AvatarSnapshot] {
        &self.avatars
    }

    pub fn own_avatar(&self) -> Option<&AvatarSnapshot> {
        let id = self.client_id?;
        self.avatars.iter().find(|avatar| avatar.id == id)
    }

    pub fn view_yaw(&self) -> f32 {
        self.rig.yaw()
    }

    pub fn send_state(&self) -> SendState {
        self.sender.state()
    }

    pub fn intents_sent(&self) -> u64 {
        self.sender.sent()
    }

    pub fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.gate = Some(OwnershipGate::new(client_id));
                self.status = format!("Connected as {}", client_id);
            }
            NetworkEvent::Enable { identity } => match self.gate.as_mut() {
                Some(gate) => {
                    if gate.enable(identity) {
                        self.status = format!("Playing as {}", identity);
                    }
                }
                None => debug!("Enable for {} before handshake; ignored", identity),
            },
            NetworkEvent::Snapshot { tick, avatars } => {
                if tick >= self.tick {
                    self.tick = tick;
                    self.avatars = avatars;
                }
            }
            NetworkEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.client_id = None;
                self.gate = None;
                self.status = format!("Disconnected: {}", reason);
            }
        }
    }

    /// Runs one frame of input. Returns whether an intent went out.
    pub fn frame(&mut self, dt: f32, intent: MoveIntent) -> Result<bool, TransportError> {
        if !self.is_enabled() {
            return Ok(false);
        }

        self.rig.update(dt, &intent);
        self.sender.publish(intent)
    }

    /// Ships a log line to the server's debug log.
    pub fn debug_log(&mut self, message: impl Into<String>) -> Result<(), TransportError> {
        Transport::send(
            self.sender.transport_mut(),
            Packet::DebugLog {
                message: message.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn session() -> (Session, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(tx, &Tuning::default()), rx)
    }

    fn forward() -> MoveIntent {
        MoveIntent {
            forward: true,
            ..Default::default()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Packet>) -> Vec<Packet> {
        let mut out = Vec::new();
        while let Ok(packet) = rx.try_recv() {
            out.push(packet);
        }
        out
    }

    #[test]
    fn test_nothing_published_before_enable() {
        let (mut session, mut rx) = session();
        assert!(!session.frame(0.016, forward()).unwrap());

        session.handle_event(NetworkEvent::Connected { client_id: 4 });
        assert!(!session.frame(0.016, forward()).unwrap());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_enable_for_other_identity_ignored() {
        let (mut session, _rx) = session();
        session.handle_event(NetworkEvent::Connected { client_id: 4 });
        session.handle_event(NetworkEvent::Enable { identity: 3 });
        assert!(!session.is_enabled());

        session.handle_event(NetworkEvent::Enable { identity: 4 });
        assert!(session.is_enabled());
        assert_eq!(session.status(), "Playing as 4");
    }

    #[test]
    fn test_publishes_after_enable_with_idle_suppression() {
        let (mut session, mut rx) = session();
        session.handle_event(NetworkEvent::Connected { client_id: 1 });
        session.handle_event(NetworkEvent::Enable { identity: 1 });

        assert!(session.frame(0.016, forward()).unwrap());
        assert!(session.frame(0.016, MoveIntent::default()).unwrap());
        assert!(!session.frame(0.016, MoveIntent::default()).unwrap());
        assert_eq!(session.send_state(), SendState::Idle);

        let packets = drain(&mut rx);
        assert_eq!(packets.len(), 2);
        assert!(packets
            .iter()
            .all(|p| matches!(p, Packet::MovementInput { .. })));
    }

    #[test]
    fn test_local_view_turns_with_keys() {
        let (mut session, _rx) = session();
        session.handle_event(NetworkEvent::Connected { client_id: 1 });
        session.handle_event(NetworkEvent::Enable { identity: 1 });

        session
            .frame(
                0.1,
                MoveIntent {
                    yaw_delta: 0.5,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(session.view_yaw() > 0.0);
    }

    #[test]
    fn test_stale_snapshot_ignored() {
        let (mut session, _rx) = session();
        session.handle_event(NetworkEvent::Connected { client_id: 1 });
        let avatar = AvatarSnapshot {
            id: 1,
            position: Vec3::new(0.0, 0.0, 3.0),
            throttle: Vec3::ZERO,
            yaw: 0.0,
            grounded: true,
        };

        session.handle_event(NetworkEvent::Snapshot {
            tick: 10,
            avatars: vec![avatar],
        });
        session.handle_event(NetworkEvent::Snapshot {
            tick: 9,
            avatars: vec![],
        });

        assert_eq!(session.tick(), 10);
        assert_eq!(session.own_avatar(), Some(&avatar));
    }

    #[test]
    fn test_disconnect_revokes_gate() {
        let (mut session, _rx) = session();
        session.handle_event(NetworkEvent::Connected { client_id: 1 });
        session.handle_event(NetworkEvent::Enable { identity: 1 });
        session.handle_event(NetworkEvent::Disconnected {
            reason: "Server full".to_string(),
        });

        assert!(!session.is_enabled());
        assert!(session.client_id().is_none());
        assert!(!session.frame(0.016, forward()).unwrap());
    }

    #[test]
    fn test_debug_log_goes_out() {
        let (mut session, mut rx) = session();
        session.debug_log("hello").unwrap();
        match &drain(&mut rx)[..] {
            [Packet::DebugLog { message }] => assert_eq!(message, "hello"),
            other => panic!("Unexpected packets {:?}", other),
        }
    }

    #[test]
    fn test_event_mapping() {
        assert_eq!(
            NetworkEvent::from_packet(Packet::Enable { identity: 2 }),
            Some(NetworkEvent::Enable { identity: 2 })
        );
        assert_eq!(NetworkEvent::from_packet(Packet::Disconnect), None);
    }
}
