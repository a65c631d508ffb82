//! The host side of a session: authoritative world, peer lifecycle and
//! state replication.
//!
//! `HostSession` owns the only [`World`] that ever steps. Remote peers
//! relay their controls in; the session applies them, advances the
//! simulation at a fixed cadence and replicates the results back out.
//! Poses travel on the unreliable lane as full snapshots every tick,
//! discrete events (spawns, damage, resets, inventory changes) travel
//! on each peer's reliable channel so none of them can be missed or
//! reordered.

use crate::network::{self, NetEvent, NetOutbound};
use crate::peers::PeerTable;
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{
    encode_frame, Frame, InputSample, InventoryOp, Level, Message, PeerId, PlayerPose, SimEvent,
    Tuning, Vec2, World, BOW, CLIENT_SPAWN_MAX_X, CLIENT_SPAWN_MIN_X, HOST_PEER_ID, HOST_SPAWN_X,
    LONGBOW, PEER_TIMEOUT_SECS, PROTOCOL_VERSION, SPAWN_Y, SWORD,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Replication message corresponding to a simulation event.
fn event_message(event: SimEvent) -> Message {
    match event {
        SimEvent::DashStarted { peer } => Message::DashEffect { peer, active: true },
        SimEvent::DashEnded { peer } => Message::DashEffect {
            peer,
            active: false,
        },
        SimEvent::ProjectileSpawned {
            id,
            shooter,
            position,
            direction,
        } => Message::SpawnProjectile {
            id,
            shooter,
            position,
            direction,
        },
        SimEvent::HealthChanged { peer, health } => Message::HealthSync { peer, health },
        SimEvent::DamageFlash { peer } => Message::DamageFlash { peer },
        SimEvent::PlayerReset { peer } => Message::PlayerReset { peer },
        SimEvent::InventoryChanged { peer, op } => Message::InventoryChange { peer, op },
    }
}

/// Standard starting kit: sword, bow, longbow, sword in hand.
fn grant_loadout(world: &mut World, peer_id: PeerId) {
    for item in [SWORD, BOW, LONGBOW] {
        world.apply_inventory_op(peer_id, InventoryOp::Add { item, quantity: 1 });
    }
    world.apply_inventory_op(peer_id, InventoryOp::Equip { slot: 0 });
}

/// Main host loop coordinating networking and the game simulation.
///
/// The host is itself a player (always [`HOST_PEER_ID`]); its controls
/// enter through [`HostSession::submit_local_input`] instead of the
/// socket, everything else about it is simulated like any remote player.
pub struct HostSession {
    socket: Arc<UdpSocket>,
    peers: PeerTable,
    world: World,
    tick_duration: Duration,

    // Communication channels
    net_tx: mpsc::UnboundedSender<NetEvent>,
    net_rx: mpsc::UnboundedReceiver<NetEvent>,
    out_tx: mpsc::UnboundedSender<NetOutbound>,
    out_rx: mpsc::UnboundedReceiver<NetOutbound>,
}

impl HostSession {
    pub async fn new(
        addr: &str,
        tick_rate: u32,
        max_peers: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Host listening on {}", socket.local_addr()?);

        let (net_tx, net_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let mut world = World::new(Level::arena(), Tuning::default());
        world.spawn_player(HOST_PEER_ID, Vec2::new(HOST_SPAWN_X, SPAWN_Y));
        grant_loadout(&mut world, HOST_PEER_ID);
        // The host's kit predates every connection. Joiners learn it
        // from the join sync, not from replayed events.
        world.take_events();

        Ok(HostSession {
            socket,
            peers: PeerTable::new(max_peers),
            world,
            tick_duration: Duration::from_secs_f32(1.0 / tick_rate as f32),
            net_tx,
            net_rx,
            out_tx,
            out_rx,
        })
    }

    /// Address the host socket actually bound, useful when the
    /// configured port was 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Feeds the host's own controls into the simulation. The host is a
    /// player like any other, its input just never touches the socket.
    pub fn submit_local_input(&mut self, sample: InputSample) {
        self.world.set_input(HOST_PEER_ID, sample);
    }

    /// Updates the host player's aim point.
    pub fn submit_local_aim(&mut self, point: Vec2) {
        self.world.set_aim(HOST_PEER_ID, point);
    }

    /// Main loop: spawns the socket tasks, then alternates between
    /// handling network events and advancing the simulation.
    ///
    /// The world always advances by the nominal tick duration. Wall
    /// clock jitter affects when a step runs, never how much simulated
    /// time it covers.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        network::spawn_receiver(Arc::clone(&self.socket), self.net_tx.clone());
        network::spawn_sender(
            Arc::clone(&self.socket),
            std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1),
        );
        network::spawn_timeout_sweeper(self.net_tx.clone());

        let mut tick_interval = interval(self.tick_duration);
        let dt = self.tick_duration.as_secs_f32();

        info!("Host session started");

        loop {
            tokio::select! {
                event = self.net_rx.recv() => {
                    match event {
                        Some(NetEvent::FrameReceived { frame, addr }) => {
                            self.handle_frame(frame, addr);
                        }
                        Some(NetEvent::SweepTimeouts) => {
                            self.sweep_timed_out_peers();
                        }
                        None => {
                            info!("Network tasks are gone, shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.step_once(dt);

                    if self.world.tick() % 60 == 0 {
                        debug!(
                            "Tick {}: {} peers, {} players, {} projectiles",
                            self.world.tick(),
                            self.peers.len(),
                            self.world.player_count(),
                            self.world.projectiles().len()
                        );
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    self.say_goodbye().await;
                    break;
                },
            }
        }

        Ok(())
    }

    /// Advances the world one tick and replicates what happened.
    fn step_once(&mut self, dt: f32) {
        let events = self.world.step(dt);
        for event in events {
            self.broadcast_reliable(event_message(event));
        }

        self.broadcast_snapshot();
        self.service_channels();
    }

    /// Routes one decoded frame from a remote address.
    fn handle_frame(&mut self, frame: Frame, addr: SocketAddr) {
        match frame {
            Frame::Hello { protocol } => self.handle_hello(protocol, addr),

            Frame::Unreliable { message } => {
                let peer_id = match self.peers.find_by_addr(addr) {
                    Some(peer_id) => peer_id,
                    None => return,
                };
                if let Some(peer) = self.peers.get_mut(peer_id) {
                    peer.touch();
                }

                match message {
                    Message::RelayInput { input } => {
                        self.world.set_input(peer_id, input);
                    }
                    Message::RelayAim { point } => {
                        self.world.set_aim(peer_id, point);
                    }
                    _ => {
                        warn!("Unexpected unreliable message from peer {}", peer_id);
                    }
                }
            }

            Frame::Reliable { seq, message } => {
                let peer_id = match self.peers.find_by_addr(addr) {
                    Some(peer_id) => peer_id,
                    None => return,
                };
                let released = match self.peers.get_mut(peer_id) {
                    Some(peer) => {
                        peer.touch();
                        peer.channel.on_reliable(seq, message)
                    }
                    None => Vec::new(),
                };

                for message in released {
                    self.apply_request(peer_id, message);
                }
            }

            Frame::Ack { cumulative } => {
                if let Some(peer_id) = self.peers.find_by_addr(addr) {
                    if let Some(peer) = self.peers.get_mut(peer_id) {
                        peer.touch();
                        peer.channel.on_ack(cumulative);
                    }
                }
            }

            Frame::Bye => {
                if let Some(peer_id) = self.peers.find_by_addr(addr) {
                    info!("Peer {} said goodbye", peer_id);
                    self.peers.remove(peer_id);
                    self.remove_from_world(peer_id);
                }
            }

            Frame::Welcome { .. } | Frame::Refuse { .. } => {
                warn!("Unexpected frame type from {}", addr);
            }
        }
    }

    /// Admits a connecting peer or refuses it with a reason.
    ///
    /// Admission order matters: the newcomer first receives the world as
    /// it is (spawn, inventory and health of every existing player) on
    /// its fresh reliable channel, then everyone, the newcomer included,
    /// hears about the new player. The newcomer's starting kit follows
    /// as ordinary inventory events on the next tick, which the channel
    /// orders after its spawn.
    fn handle_hello(&mut self, protocol: u16, addr: SocketAddr) {
        info!("Peer connecting from {} (protocol {})", addr, protocol);

        if protocol != PROTOCOL_VERSION {
            self.queue_frame(
                &Frame::Refuse {
                    reason: format!("protocol version mismatch, host speaks {}", PROTOCOL_VERSION),
                },
                addr,
            );
            return;
        }

        // A retransmitted hello from an admitted peer gets its welcome
        // again instead of a second seat.
        if let Some(existing) = self.peers.find_by_addr(addr) {
            self.queue_frame(&Frame::Welcome { peer_id: existing }, addr);
            return;
        }

        let peer_id = match self.peers.add(addr) {
            Some(peer_id) => peer_id,
            None => {
                self.queue_frame(
                    &Frame::Refuse {
                        reason: "session is full".to_string(),
                    },
                    addr,
                );
                return;
            }
        };

        self.queue_frame(&Frame::Welcome { peer_id }, addr);

        let mut sync = Vec::new();
        for player in self.world.players_sorted() {
            sync.push(Message::SpawnPlayer {
                peer: player.id,
                spawn: player.spawn_position,
            });
            sync.push(Message::InventoryState {
                peer: player.id,
                slots: player.inventory.slots().to_vec(),
                equipped_slot: player.inventory.equipped_slot().map(|slot| slot as u8),
            });
            sync.push(Message::HealthSync {
                peer: player.id,
                health: player.health,
            });
        }
        for message in sync {
            self.send_reliable(peer_id, message);
        }

        let spawn = Vec2::new(
            rand::thread_rng().gen_range(CLIENT_SPAWN_MIN_X..=CLIENT_SPAWN_MAX_X),
            SPAWN_Y,
        );
        self.world.spawn_player(peer_id, spawn);
        self.broadcast_reliable(Message::SpawnPlayer {
            peer: peer_id,
            spawn,
        });
        grant_loadout(&mut self.world, peer_id);

        info!("Peer {} joined from {}", peer_id, addr);
    }

    /// Applies a validated client request to the world. Rejected
    /// requests change nothing and get no reply; the client's replica
    /// simply never hears a confirming broadcast.
    fn apply_request(&mut self, peer_id: PeerId, message: Message) {
        match message {
            Message::RequestEquip { slot } => {
                if !self
                    .world
                    .apply_inventory_op(peer_id, InventoryOp::Equip { slot })
                {
                    debug!("Peer {} sent an invalid equip for slot {}", peer_id, slot);
                }
            }
            Message::RequestMove { from, to } => {
                if !self
                    .world
                    .apply_inventory_op(peer_id, InventoryOp::Move { from, to })
                {
                    debug!("Peer {} sent an invalid move {} -> {}", peer_id, from, to);
                }
            }
            _ => {
                warn!("Unexpected reliable message from peer {}", peer_id);
            }
        }
    }

    /// Removes a departed peer's player from the world and tells
    /// everyone left about it.
    fn remove_from_world(&mut self, peer_id: PeerId) {
        if self.world.despawn_player(peer_id) {
            self.broadcast_reliable(Message::DespawnPlayer { peer: peer_id });
        }
    }

    /// Drops peers that have gone silent and removes their players.
    fn sweep_timed_out_peers(&mut self) {
        for peer_id in self.peers.sweep_timeouts(Duration::from_secs(PEER_TIMEOUT_SECS)) {
            warn!("Peer {} timed out", peer_id);
            self.remove_from_world(peer_id);
        }
    }

    /// Sends the current pose of every player to every peer on the
    /// unreliable lane. Encoded once, addressed per peer.
    fn broadcast_snapshot(&mut self) {
        if self.peers.is_empty() {
            return;
        }

        let players: Vec<PlayerPose> = self
            .world
            .players_sorted()
            .iter()
            .map(|player| PlayerPose {
                peer: player.id,
                position: player.position,
                velocity: player.velocity,
                aim: player.aim_point,
                on_ground: player.on_ground,
                dashing: player.dashing,
            })
            .collect();

        let frame = Frame::Unreliable {
            message: Message::Snapshot {
                tick: self.world.tick(),
                players,
            },
        };
        match encode_frame(&frame) {
            Ok(data) => {
                for (_, addr) in self.peers.addrs() {
                    self.queue_bytes(data.clone(), addr);
                }
            }
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
    }

    /// Flushes pending acks and due retransmissions for every peer,
    /// then drops the peers whose channels have given up on them.
    fn service_channels(&mut self) {
        let now = Instant::now();

        let mut outgoing: Vec<(SocketAddr, Frame)> = Vec::new();
        for peer_id in self.peers.ids() {
            if let Some(peer) = self.peers.get_mut(peer_id) {
                let addr = peer.addr;
                if let Some(ack) = peer.channel.take_ack() {
                    outgoing.push((addr, ack));
                }
                for frame in peer.channel.collect_resends(now) {
                    outgoing.push((addr, frame));
                }
            }
        }
        for (addr, frame) in outgoing {
            self.queue_frame(&frame, addr);
        }

        for peer_id in self.peers.sweep_failed_channels(now) {
            warn!("Peer {} stopped acking, dropping them", peer_id);
            self.remove_from_world(peer_id);
        }
    }

    /// Queues a message on one peer's reliable channel and hands the
    /// framed result to the sender task.
    fn send_reliable(&mut self, peer_id: PeerId, message: Message) {
        let now = Instant::now();
        if let Some(peer) = self.peers.get_mut(peer_id) {
            let addr = peer.addr;
            let frame = peer.channel.send(message, now);
            match encode_frame(&frame) {
                Ok(data) => {
                    if self.out_tx.send(NetOutbound { data, addr }).is_err() {
                        error!("Sender task is gone, dropping frame for {}", addr);
                    }
                }
                Err(e) => error!("Failed to encode frame for peer {}: {}", peer_id, e),
            }
        }
    }

    /// Queues a message on every peer's reliable channel.
    fn broadcast_reliable(&mut self, message: Message) {
        for peer_id in self.peers.ids() {
            self.send_reliable(peer_id, message.clone());
        }
    }

    fn queue_frame(&self, frame: &Frame, addr: SocketAddr) {
        match encode_frame(frame) {
            Ok(data) => self.queue_bytes(data, addr),
            Err(e) => error!("Failed to encode frame for {}: {}", addr, e),
        }
    }

    fn queue_bytes(&self, data: Vec<u8>, addr: SocketAddr) {
        if self.out_tx.send(NetOutbound { data, addr }).is_err() {
            error!("Sender task is gone, dropping datagram for {}", addr);
        }
    }

    /// Tells every connected peer the session is closing. Sent straight
    /// on the socket, the outbound queue may never drain again.
    async fn say_goodbye(&self) {
        let data = match encode_frame(&Frame::Bye) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode goodbye: {}", e);
                return;
            }
        };

        for (peer_id, addr) in self.peers.addrs() {
            if let Err(e) = self.socket.send_to(&data, addr).await {
                error!("Failed to send goodbye to peer {}: {}", peer_id, e);
            }
        }
    }
}
