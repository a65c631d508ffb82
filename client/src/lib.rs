//! # Game Client Library
//!
//! This library provides the client-side implementation for the networked
//! multiplayer game. It joins a host session over UDP, relays the local
//! player's controls, mirrors the authoritative world state, and exposes
//! read-only views plus intents for a presentation layer to build on.
//!
//! ## Architecture Overview
//!
//! The client is deliberately thin. The host simulates everything; the
//! client's job is to keep its mirror current and its controls flowing.
//! There is no prediction, reconciliation or interpolation layer: every
//! snapshot is applied as-is, so what you see is exactly what the host
//! said, one network trip ago.
//!
//! ### Replica, Not Simulation
//! [`replica::ReplicaWorld`] applies replicated messages in the order the
//! reliable channel releases them and overwrites poses from every
//! snapshot. The only state it advances on its own is presentation
//! detail: damage-flash timers and the flight of visual projectiles,
//! which expire or stop on level geometry locally while all hit
//! resolution stays on the host.
//!
//! ### Two Lanes, One Socket
//! Control samples and aim points leave on the best-effort lane every
//! send tick, newest-wins. Equip and move requests leave on the reliable
//! channel, which also carries every world event the host broadcasts
//! back, exactly once and in order.
//!
//! ### Input as a Seam
//! The session polls an [`input::InputSource`] for samples instead of
//! reading a device directly. Frontends implement the trait over their
//! real input; the bundled idle and scripted sources cover headless runs
//! and tests.
//!
//! ## Module Organization
//!
//! ### Replica Module (`replica`)
//! The mirrored world: players, inventories, visual projectiles, and the
//! notices a presentation layer subscribes to.
//!
//! ### Input Module (`input`)
//! The [`input::InputSource`] trait and its bundled implementations.
//!
//! ### Network Module (`network`)
//! [`network::ClientSession`]: handshake, relay loop, reliable channel
//! service and connection status tracking.
//!
//! ### View Module (`view`)
//! Read-only projections of replica state, currently the local player's
//! HUD.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::IdleInput;
//! use client::network::ClientSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ClientSession::connect("127.0.0.1:9876", Box::new(IdleInput)).await?;
//!
//!     // Intents are queued on the reliable lane at any time.
//!     session.request_equip(1).await?;
//!
//!     // The loop runs until the session disconnects for any reason.
//!     session.run().await?;
//!
//!     println!("{:?}", session.hud().status);
//!     Ok(())
//! }
//! ```
//!
//! ## Degradation Behavior
//!
//! Connection problems surface through
//! [`replica::SessionStatus`], never through panics: a refused or
//! unanswered handshake fails `connect`, a host that goes silent or
//! stops acking flips the session to `Disconnected` with a reason, and
//! undecodable datagrams are logged and dropped.

pub mod input;
pub mod network;
pub mod replica;
pub mod view;
