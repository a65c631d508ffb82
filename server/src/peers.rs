//! Connected-peer bookkeeping for the host
//!
//! This module tracks the remote peers of a hosted session, including:
//! - Peer connection lifecycle (join, leave, timeout)
//! - Per-peer reliable channel state for the ordered event lane
//! - Activity tracking so silent peers can be swept out
//! - Capacity enforcement counting the host itself as a player
//!
//! The table only holds remote peers. The host is peer 1 everywhere else
//! in the session but never appears here; it has no address to send to
//! and no channel to itself.

use log::info;
use shared::channel::ReliableChannel;
use shared::{PeerId, HOST_PEER_ID};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One remote peer of the session.
///
/// Each peer carries:
/// - Connection metadata (ID, address, last activity)
/// - The reliable channel holding its unacked outgoing events and the
///   reorder buffer for its incoming requests
#[derive(Debug)]
pub struct Peer {
    /// Unique peer identifier assigned by the host
    pub id: PeerId,
    /// Network address for sending frames
    pub addr: SocketAddr,
    /// Last time any frame arrived from this peer
    pub last_seen: Instant,
    /// Reliable lane state for this peer, both directions
    pub channel: ReliableChannel,
}

impl Peer {
    /// Creates a peer record marked as just seen.
    pub fn new(id: PeerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            channel: ReliableChannel::new(),
        }
    }

    /// Marks the peer as active right now.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Whether the peer has been silent longer than `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Roster of remote peers with capacity enforcement.
///
/// Peer IDs start at 2 because the host reserves 1 for itself, and the
/// capacity limit counts the host: a table with `max_peers` 4 accepts
/// three remote peers. IDs are never reused within a session so a stale
/// datagram can not be misattributed to a newcomer.
pub struct PeerTable {
    peers: HashMap<PeerId, Peer>,
    next_peer_id: PeerId,
    max_peers: usize,
}

impl PeerTable {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            next_peer_id: HOST_PEER_ID + 1,
            max_peers,
        }
    }

    /// Admits a new remote peer if the session has room left.
    ///
    /// Returns the assigned peer ID, or None when the host plus the
    /// current remotes already fill the session.
    pub fn add(&mut self, addr: SocketAddr) -> Option<PeerId> {
        if self.peers.len() + 1 >= self.max_peers {
            return None;
        }

        let peer_id = self.next_peer_id;
        self.next_peer_id += 1;

        info!("Peer {} joined from {}", peer_id, addr);
        self.peers.insert(peer_id, Peer::new(peer_id, addr));

        Some(peer_id)
    }

    /// Removes a peer. Returns true if they were present.
    pub fn remove(&mut self, peer_id: PeerId) -> bool {
        if let Some(peer) = self.peers.remove(&peer_id) {
            info!("Peer {} at {} left", peer.id, peer.addr);
            true
        } else {
            false
        }
    }

    /// Resolves the peer connected from `addr`, if any.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<PeerId> {
        self.peers
            .iter()
            .find(|(_, peer)| peer.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, peer_id: PeerId) -> Option<&Peer> {
        self.peers.get(&peer_id)
    }

    pub fn get_mut(&mut self, peer_id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(&peer_id)
    }

    /// All (id, address) pairs, for fanning a frame out to everyone.
    pub fn addrs(&self) -> Vec<(PeerId, SocketAddr)> {
        self.peers
            .iter()
            .map(|(id, peer)| (*id, peer.addr))
            .collect()
    }

    /// Peer IDs in ascending order, for deterministic per-peer work.
    pub fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Removes every peer that has been silent longer than `timeout`
    /// and returns their IDs so the caller can despawn them.
    pub fn sweep_timeouts(&mut self, timeout: Duration) -> Vec<PeerId> {
        let timed_out: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for peer_id in &timed_out {
            self.remove(*peer_id);
        }

        timed_out
    }

    /// Removes every peer whose reliable channel has given up on them
    /// and returns their IDs.
    pub fn sweep_failed_channels(&mut self, now: Instant) -> Vec<PeerId> {
        let failed: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.channel.failed(now))
            .map(|(id, _)| *id)
            .collect();

        for peer_id in &failed {
            self.remove(*peer_id);
        }

        failed
    }

    /// Number of remote peers currently connected.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
