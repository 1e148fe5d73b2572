//! # Movement Client Library
//!
//! Input-sensing side of the movement pipeline. The client samples keyboard,
//! mouse and gamepad state into a movement intent every frame and publishes
//! it to the server, which owns the avatar's physical state.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Turns device state into a [`shared::MoveIntent`]:
//! - W/Up, S/Down, A/Left and D/Right for the four directions
//! - either Shift to run, Space to jump
//! - Q/E for keyboard yaw, horizontal mouse for mouse yaw
//! - gamepad sticks and trigger through an [`input::AxisProvider`]
//!
//! ### Network Module (`network`)
//! A tokio task owns the UDP socket. The frame loop talks to it through
//! channels and keeps a [`network::Session`] that gates publishing on the
//! server's enable signal and suppresses repeated idle intents.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{run_network, NetworkConfig, NetworkEvent, Session};
//! use shared::{MoveIntent, Tuning, CLIENT_VERSION};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (packets_tx, packets_rx) = mpsc::unbounded_channel();
//! let (events_tx, mut events_rx) = mpsc::unbounded_channel();
//! let config = NetworkConfig {
//!     server_addr: "127.0.0.1:8080".parse()?,
//!     client_version: CLIENT_VERSION,
//!     fake_ping_ms: 0,
//! };
//! tokio::spawn(run_network(config, packets_rx, events_tx));
//!
//! let mut session = Session::new(packets_tx, &Tuning::default());
//! while let Some(event) = events_rx.recv().await {
//!     session.handle_event(event);
//!     if session.is_enabled() {
//!         break;
//!     }
//! }
//! session.frame(1.0 / 60.0, MoveIntent { forward: true, ..Default::default() })?;
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod network;
