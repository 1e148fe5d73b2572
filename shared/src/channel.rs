//! One-way intent delivery from the input-sensing peer to the simulating peer.
//!
//! Delivery is fire-and-forget and last-write-wins: the receiver overwrites
//! its authoritative copy with whatever arrives, so a dropped message is
//! repaired by the next one.

use crate::intent::{AuthoritativeIntent, MoveIntent};
use crate::Packet;
use thiserror::Error;
use tokio::sync::mpsc;

/// Suppressed idle ticks between repeats of the idle intent. A lost idle
/// datagram is repaired within this many ticks, and the repeat doubles as a
/// keepalive for a peer that stands still.
pub const IDLE_RESEND_TICKS: u32 = 30;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("packet codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound leg of a peer link. Serialization is left to the implementor.
pub trait Transport {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError>;
}

impl Transport for mpsc::UnboundedSender<Packet> {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        mpsc::UnboundedSender::send(self, packet).map_err(|_| TransportError::Closed)
    }
}

/// In-process link straight into a receiver, for a host that both senses
/// input and owns the simulation.
#[derive(Debug, Default)]
pub struct Loopback {
    pub receiver: IntentReceiver,
}

impl Transport for Loopback {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        if let Packet::MovementInput { intent } = packet {
            self.receiver.on_receive(intent);
        }
        Ok(())
    }
}

/// Whether the receiver may still hold a non-idle intent from us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// An idle intent has been handed to the transport. Only periodic
    /// repeats go out from here.
    Idle,
    /// Something non-idle was sent since the last idle publish.
    Dirty,
}

/// Sending half of the authority channel.
///
/// Publishes every tick while input is active. Once input goes idle, one
/// idle intent is sent and further idle ticks are suppressed, except for a
/// repeat every `idle_resend` ticks.
pub struct IntentSender<T: Transport> {
    transport: T,
    state: SendState,
    sent: u64,
    idle_resend: u32,
    suppressed: u32,
}

impl<T: Transport> IntentSender<T> {
    pub fn new(transport: T) -> Self {
        // Starts dirty so the receiver learns "nothing pressed" on the first tick.
        Self {
            transport,
            state: SendState::Dirty,
            sent: 0,
            idle_resend: IDLE_RESEND_TICKS,
            suppressed: 0,
        }
    }

    /// Sets the idle repeat interval in ticks. Zero is treated as one.
    pub fn with_idle_resend(mut self, ticks: u32) -> Self {
        self.idle_resend = ticks.max(1);
        self
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Returns `Ok(true)` when a message was handed to the transport and
    /// `Ok(false)` when the publish was suppressed as redundant idle traffic.
    pub fn publish(&mut self, intent: MoveIntent) -> Result<bool, TransportError> {
        let idle = intent.is_idle();
        if idle && self.state == SendState::Idle {
            self.suppressed += 1;
            if self.suppressed < self.idle_resend {
                return Ok(false);
            }
        }

        if !idle {
            self.state = SendState::Dirty;
        }

        self.transport.send(Packet::MovementInput { intent })?;
        self.sent += 1;
        self.suppressed = 0;

        if idle {
            self.state = SendState::Idle;
        }

        Ok(true)
    }
}

/// Receiving half of the authority channel and sole writer of the
/// authoritative intent.
#[derive(Debug, Default)]
pub struct IntentReceiver {
    current: AuthoritativeIntent,
    received: u64,
    jump_pending: bool,
}

impl IntentReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the authoritative intent unconditionally.
    pub fn on_receive(&mut self, intent: MoveIntent) -> &AuthoritativeIntent {
        if intent.jump && !self.current.intent.jump {
            self.jump_pending = true;
        }
        self.current.intent = intent;
        self.received += 1;
        &self.current
    }

    pub fn current(&self) -> &AuthoritativeIntent {
        &self.current
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Consumes a jump request raised by a released-then-pressed jump flag.
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_pending)
    }
}
