//! Reliability layer on top of raw datagrams.
//!
//! The protocol runs two lanes over one socket. The unreliable lane is
//! exactly what UDP gives us: frames carry no sequence numbers, arrive
//! in any order or not at all, and each arrival simply overwrites the
//! receiver's previous value (snapshots, input samples). A reordered
//! pair of input datagrams can therefore apply the older sample last;
//! that window is one tick wide and the next sample papers over it, so
//! the lane stays sequence-free on purpose.
//!
//! The reliable lane is what [`ReliableChannel`] implements: ordered,
//! exactly-once delivery for the messages that must not be lost (spawns,
//! despawns, combat events, inventory changes). One channel instance per
//! remote peer, per direction pair:
//!
//! * outgoing messages get consecutive sequence numbers starting at 1
//!   and stay buffered until the peer's cumulative ack covers them,
//!   with unacked frames retransmitted every [`RESEND_INTERVAL`];
//! * incoming frames are released to the caller strictly in sequence
//!   order, with out-of-order arrivals held back and duplicates
//!   dropped;
//! * acks are cumulative ("everything through N"), so a single lost ack
//!   costs nothing once a later one lands.
//!
//! A peer that fails to ack anything for [`GIVE_UP_AGE`] is presumed
//! gone; [`ReliableChannel::failed`] reports that so the session can
//! drop the connection instead of buffering forever.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use crate::protocol::{Frame, Message};

/// How long an unacked frame waits before being retransmitted.
pub const RESEND_INTERVAL: Duration = Duration::from_millis(200);

/// How long the oldest unacked frame may stay unacked before the peer
/// is declared unreachable.
pub const GIVE_UP_AGE: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct PendingSend {
    seq: u32,
    message: Message,
    first_sent: Instant,
    last_sent: Instant,
}

#[derive(Debug)]
pub struct ReliableChannel {
    next_seq: u32,
    unacked: VecDeque<PendingSend>,
    next_expected: u32,
    held: BTreeMap<u32, Message>,
    ack_dirty: bool,
}

impl ReliableChannel {
    pub fn new() -> Self {
        ReliableChannel {
            next_seq: 1,
            unacked: VecDeque::new(),
            next_expected: 1,
            held: BTreeMap::new(),
            ack_dirty: false,
        }
    }

    /// Assigns the next sequence number to `message` and returns the
    /// frame to transmit. The message is buffered until acked.
    pub fn send(&mut self, message: Message, now: Instant) -> Frame {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.unacked.push_back(PendingSend {
            seq,
            message: message.clone(),
            first_sent: now,
            last_sent: now,
        });
        Frame::Reliable { seq, message }
    }

    /// Feeds one received reliable frame in. Returns the messages that
    /// became deliverable, in sequence order; duplicates and gap-spanning
    /// arrivals return nothing yet.
    pub fn on_reliable(&mut self, seq: u32, message: Message) -> Vec<Message> {
        self.ack_dirty = true;

        if seq < self.next_expected {
            return Vec::new();
        }
        if seq > self.next_expected {
            self.held.insert(seq, message);
            return Vec::new();
        }

        let mut released = vec![message];
        self.next_expected = self.next_expected.wrapping_add(1);
        while let Some(held) = self.held.remove(&self.next_expected) {
            released.push(held);
            self.next_expected = self.next_expected.wrapping_add(1);
        }
        released
    }

    /// Processes a cumulative ack from the peer: everything with a
    /// sequence number up to and including `cumulative` is settled.
    pub fn on_ack(&mut self, cumulative: u32) {
        while let Some(front) = self.unacked.front() {
            if front.seq <= cumulative {
                self.unacked.pop_front();
            } else {
                break;
            }
        }
    }

    /// The ack frame owed to the peer, if any arrivals happened since
    /// the last call.
    pub fn take_ack(&mut self) -> Option<Frame> {
        if !self.ack_dirty {
            return None;
        }
        self.ack_dirty = false;
        Some(Frame::Ack {
            cumulative: self.next_expected.wrapping_sub(1),
        })
    }

    /// Frames whose retransmission is due. Bumps their resend clock.
    pub fn collect_resends(&mut self, now: Instant) -> Vec<Frame> {
        let mut due = Vec::new();
        for pending in self.unacked.iter_mut() {
            if now.duration_since(pending.last_sent) >= RESEND_INTERVAL {
                pending.last_sent = now;
                due.push(Frame::Reliable {
                    seq: pending.seq,
                    message: pending.message.clone(),
                });
            }
        }
        due
    }

    /// True once the oldest unacked frame has gone unanswered longer
    /// than [`GIVE_UP_AGE`].
    pub fn failed(&self, now: Instant) -> bool {
        self.unacked
            .front()
            .map(|pending| now.duration_since(pending.first_sent) >= GIVE_UP_AGE)
            .unwrap_or(false)
    }

    pub fn pending(&self) -> usize {
        self.unacked.len()
    }
}

impl Default for ReliableChannel {
    fn default() -> Self {
        Self::new()
    }
}
