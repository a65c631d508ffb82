//! Wire format shared by the host and its clients.
//!
//! Every datagram carries exactly one bincode-encoded [`Frame`]. Frames
//! either manage the connection (`Hello`, `Welcome`, `Refuse`, `Bye`),
//! carry a [`Message`] on the unreliable lane, or carry one on the
//! reliable lane together with its sequence number. Acks flow on their
//! own frame type. The payload [`Message`] enum is shared by both
//! directions; which variants a peer is allowed to send depends on its
//! role, and the session layers enforce that.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::InputSample;
use crate::inventory::{InventoryOp, InventorySlot};
use crate::vec::Vec2;
use crate::PeerId;

/// Hard ceiling on an encoded frame. Everything this protocol sends
/// fits a single conservative UDP datagram; going over it is a bug in
/// the sender, not something to fragment around.
pub const MAX_DATAGRAM: usize = 1200;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode frame: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] bincode::Error),
    #[error("encoded frame is {0} bytes, larger than the {MAX_DATAGRAM} byte datagram budget")]
    Oversize(usize),
}

/// One player's replicated pose inside a snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PlayerPose {
    pub peer: PeerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim: Vec2,
    pub on_ground: bool,
    pub dashing: bool,
}

/// Lane-agnostic payload. Client-to-host variants are requests the host
/// validates; host-to-client variants are facts the replicas apply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Message {
    // Client to host.
    RelayInput { input: InputSample },
    RelayAim { point: Vec2 },
    RequestEquip { slot: u8 },
    RequestMove { from: u8, to: u8 },

    // Host to clients.
    SpawnPlayer { peer: PeerId, spawn: Vec2 },
    DespawnPlayer { peer: PeerId },
    Snapshot { tick: u64, players: Vec<PlayerPose> },
    SpawnProjectile {
        id: u32,
        shooter: PeerId,
        position: Vec2,
        direction: Vec2,
    },
    HealthSync { peer: PeerId, health: i32 },
    DamageFlash { peer: PeerId },
    DashEffect { peer: PeerId, active: bool },
    PlayerReset { peer: PeerId },
    InventoryChange { peer: PeerId, op: InventoryOp },
    InventoryState {
        peer: PeerId,
        slots: Vec<InventorySlot>,
        equipped_slot: Option<u8>,
    },
}

/// The unit that actually crosses the socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Frame {
    Hello { protocol: u16 },
    Welcome { peer_id: PeerId },
    Refuse { reason: String },
    Bye,
    Unreliable { message: Message },
    Reliable { seq: u32, message: Message },
    Ack { cumulative: u32 },
}

pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, WireError> {
    let data = bincode::serialize(frame).map_err(WireError::Encode)?;
    if data.len() > MAX_DATAGRAM {
        return Err(WireError::Oversize(data.len()));
    }
    Ok(data)
}

pub fn decode_frame(data: &[u8]) -> Result<Frame, WireError> {
    bincode::deserialize(data).map_err(WireError::Decode)
}
