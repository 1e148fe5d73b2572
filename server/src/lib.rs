//! # Movement Server Library
//!
//! Authoritative side of the movement pipeline. Peers sense input and send
//! movement intents; the server owns every avatar's motion state, integrates
//! it against world collision each tick, and broadcasts the result.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Each avatar carries its own motion integrator, orientation rig and
//! kinematic collision body. Nothing here is shared between avatars, and only
//! the tick loop mutates them.
//!
//! ### Ownership
//! A freshly spawned avatar is inert. When a peer connects the server emits an
//! enable signal naming that peer's identity; the avatar whose gate matches
//! starts simulating. Peers that join later are sent the signals they missed.
//!
//! ### Intent Delivery
//! Intents are not queued or reordered. The newest one received for a peer
//! replaces the previous one, and a lost datagram is repaired by the next.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connection tracking, capacity limit, address lookup and timeouts.
//!
//! ### Game Module (`game`)
//! Avatars and the world they move in.
//!
//! ### Network Module (`network`)
//! UDP socket tasks, packet handling and the fixed-rate tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameState;
//! use server::network::Server;
//! use shared::Tuning;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let world = GameState::new(Tuning::default()).with_level(GameState::default_level());
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(16), // 60Hz = ~16.67ms per tick
//!         32,
//!         world,
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The server runs three background tasks next to the tick loop:
//! - **Network Receiver**: decodes incoming datagrams
//! - **Network Sender**: drains the outgoing queue and fans out broadcasts
//! - **Timeout Checker**: drops peers that have gone quiet

pub mod client_manager;
pub mod game;
pub mod network;
