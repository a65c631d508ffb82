//! # Host Session Library
//!
//! This library implements the hosting side of a small multiplayer arena
//! game. The host is the single authority: it runs the only simulation
//! that counts, applies the inputs every peer relays to it, and
//! replicates the outcome back so all connected players converge on the
//! same fight.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The host owns the one [`shared::World`] that ever steps. Movement,
//! dashes, melee sweeps, projectiles, damage and inventories are all
//! resolved here; remote peers only ever describe their intent.
//!
//! ### Peer Lifecycle
//! Handles the complete lifecycle of remote peers including:
//! - Admission via the hello/welcome handshake and seat assignment
//! - Spawning a player body and granting the starting weapons
//! - Activity tracking with timeout-based eviction
//! - Goodbye handling and removal broadcasts
//!
//! ### State Replication
//! Every tick the host broadcasts a pose snapshot for all players on the
//! unreliable lane. Discrete facts the replicas must not miss (player
//! spawns, projectile spawns, health changes, resets, inventory changes)
//! travel through a per-peer reliable channel that redelivers and orders
//! them.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One loop owns the session state and alternates between network events
//! and simulation ticks, so no lock ever guards the world or the peer
//! roster. Socket reads, socket writes and the timeout clock run as
//! separate async tasks that talk to the loop over channels.
//!
//! ### Two Lanes, One Socket
//! All traffic is bincode-encoded frames over a single UDP socket.
//! Relayed controls and pose snapshots ride the unreliable lane, where
//! losing a datagram only means a newer one arrives instead. Events and
//! inventory requests ride the reliable lane, which acks, retransmits
//! and holds out-of-order arrivals back until delivery is exactly-once
//! and in order.
//!
//! ### Fixed Timestep
//! The simulation advances by the nominal tick duration every tick
//! regardless of wall-clock jitter, which keeps physics behavior
//! independent of scheduling noise.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The session loop itself:
//! - Frame routing and the hello/welcome handshake
//! - Input application and request validation
//! - Tick stepping, event broadcasting and snapshot fan-out
//! - Reliable channel housekeeping and peer eviction
//!
//! ### Peers Module (`peers`)
//! The roster of admitted remote peers:
//! - Seat allocation with capacity enforcement
//! - Address-to-peer resolution for incoming datagrams
//! - Last-seen tracking and timeout sweeps
//! - Per-peer reliable channel state
//!
//! ### Network Module (`network`)
//! The async tasks around the socket:
//! - Receiver task that decodes datagrams into frames
//! - Sender task that drains the outbound queue
//! - Timeout sweeper that prompts the session once a second
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::session::HostSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the host socket, with a 60Hz simulation and four seats
//!     // (the host player takes the first one).
//!     let mut session = HostSession::new("127.0.0.1:9876", 60, 4).await?;
//!
//!     // Run the session. The loop admits peers, applies their relayed
//!     // inputs, steps the world and replicates the results until the
//!     // process is interrupted.
//!     session.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Validation
//!
//! Remote peers are never trusted with outcomes. Relayed inputs are
//! structurally sanitized before they reach the simulation, inventory
//! requests are validated against the actual inventory and silently
//! rejected when stale or malformed, and nothing a peer sends can move
//! anyone else's player.

pub mod network;
pub mod peers;
pub mod session;
