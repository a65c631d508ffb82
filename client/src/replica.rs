//! Client-side mirror of the host's world.
//!
//! Nothing here simulates gameplay. `ReplicaWorld` applies whatever the
//! host says, in the order the channel releases it: snapshots overwrite
//! poses wholesale, reliable messages mutate the mirrored players, and
//! the only thing advanced locally is presentation state, meaning
//! damage-flash timers and the flight of visual projectiles. Damage,
//! cooldowns and collision against players stay on the host; a replica
//! can at worst show a stale picture, never a divergent one.

use std::collections::HashMap;
use std::mem;

use log::{debug, warn};
use shared::{
    weapon_params, Inventory, ItemId, Level, Message, PeerId, Projectile, Vec2,
    DAMAGE_FLASH_DURATION, PLAYER_MAX_HEALTH,
};

/// Where the connection currently stands, shown on the status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Connected,
    Disconnected(String),
}

/// Registration events raised while applying replicated messages, so
/// presentation layers can subscribe instead of polling every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaNotice {
    /// The host confirmed our own player. Fired once per session.
    LocalPlayerSpawned,
}

/// One mirrored player. Pose fields track the latest snapshot; health,
/// inventory and spawn point track reliable messages.
#[derive(Debug, Clone)]
pub struct ReplicaPlayer {
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim: Vec2,
    pub on_ground: bool,
    pub dashing: bool,
    pub spawn: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub damage_flash: f32,
    pub inventory: Inventory,
}

impl ReplicaPlayer {
    fn new(spawn: Vec2) -> Self {
        ReplicaPlayer {
            position: spawn,
            velocity: Vec2::ZERO,
            aim: Vec2::ZERO,
            on_ground: false,
            dashing: false,
            spawn,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            damage_flash: 0.0,
            inventory: Inventory::new(),
        }
    }

    pub fn equipped_item(&self) -> Option<ItemId> {
        self.inventory.equipped_item()
    }
}

pub struct ReplicaWorld {
    local_peer: PeerId,
    level: Level,
    players: HashMap<PeerId, ReplicaPlayer>,
    projectiles: Vec<Projectile>,
    last_snapshot_tick: u64,
    notices: Vec<ReplicaNotice>,
}

impl ReplicaWorld {
    pub fn new(level: Level, local_peer: PeerId) -> Self {
        ReplicaWorld {
            local_peer,
            level,
            players: HashMap::new(),
            projectiles: Vec::new(),
            last_snapshot_tick: 0,
            notices: Vec::new(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn player(&self, id: PeerId) -> Option<&ReplicaPlayer> {
        self.players.get(&id)
    }

    pub fn local_player(&self) -> Option<&ReplicaPlayer> {
        self.players.get(&self.local_peer)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Mirrored players in ascending peer id order, for deterministic
    /// drawing and test assertions.
    pub fn players_sorted(&self) -> Vec<(PeerId, &ReplicaPlayer)> {
        let mut players: Vec<(PeerId, &ReplicaPlayer)> =
            self.players.iter().map(|(id, player)| (*id, player)).collect();
        players.sort_unstable_by_key(|(id, _)| *id);
        players
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Tick of the most recently applied snapshot.
    pub fn last_snapshot_tick(&self) -> u64 {
        self.last_snapshot_tick
    }

    /// Drains the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<ReplicaNotice> {
        mem::take(&mut self.notices)
    }

    /// Applies one host-to-client message. Client-to-host variants are
    /// logged and dropped; a host never echoes requests back.
    pub fn apply_message(&mut self, message: Message) {
        match message {
            Message::SpawnPlayer { peer, spawn } => self.apply_spawn(peer, spawn),
            Message::DespawnPlayer { peer } => {
                if self.players.remove(&peer).is_none() {
                    debug!("Despawn for unknown peer {}", peer);
                }
            }
            Message::Snapshot { tick, players } => {
                self.last_snapshot_tick = tick;
                for pose in players {
                    let player = self
                        .players
                        .entry(pose.peer)
                        .or_insert_with(|| ReplicaPlayer::new(pose.position));
                    player.position = pose.position;
                    player.velocity = pose.velocity;
                    player.aim = pose.aim;
                    player.on_ground = pose.on_ground;
                    player.dashing = pose.dashing;
                }
            }
            Message::SpawnProjectile {
                id,
                shooter,
                position,
                direction,
            } => self.apply_projectile(id, shooter, position, direction),
            Message::HealthSync { peer, health } => {
                match self.players.get_mut(&peer) {
                    Some(player) => player.health = health,
                    None => debug!("Health sync for unknown peer {}", peer),
                }
            }
            Message::DamageFlash { peer } => {
                if let Some(player) = self.players.get_mut(&peer) {
                    player.damage_flash = DAMAGE_FLASH_DURATION;
                }
            }
            Message::DashEffect { peer, active } => {
                if let Some(player) = self.players.get_mut(&peer) {
                    player.dashing = active;
                }
            }
            Message::PlayerReset { peer } => {
                if let Some(player) = self.players.get_mut(&peer) {
                    player.position = player.spawn;
                    player.velocity = Vec2::ZERO;
                    player.health = player.max_health;
                }
            }
            Message::InventoryChange { peer, op } => {
                match self.players.get_mut(&peer) {
                    Some(player) => {
                        if !player.inventory.apply(op) {
                            warn!("Replica inventory rejected {:?} for peer {}", op, peer);
                        }
                    }
                    None => debug!("Inventory change for unknown peer {}", peer),
                }
            }
            Message::InventoryState {
                peer,
                slots,
                equipped_slot,
            } => {
                match self.players.get_mut(&peer) {
                    Some(player) => {
                        player
                            .inventory
                            .load_state(&slots, equipped_slot.map(|slot| slot as usize));
                    }
                    None => debug!("Inventory state for unknown peer {}", peer),
                }
            }
            Message::RelayInput { .. }
            | Message::RelayAim { .. }
            | Message::RequestEquip { .. }
            | Message::RequestMove { .. } => {
                warn!("Host sent a client-to-host message, dropping it");
            }
        }
    }

    fn apply_spawn(&mut self, peer: PeerId, spawn: Vec2) {
        let player = self
            .players
            .entry(peer)
            .or_insert_with(|| ReplicaPlayer::new(spawn));
        // A snapshot may have introduced this peer already; the spawn
        // message still owns the spawn point.
        player.spawn = spawn;

        if peer == self.local_peer {
            self.notices.push(ReplicaNotice::LocalPlayerSpawned);
        }
    }

    /// Starts a visual projectile using the shooter's mirrored weapon
    /// parameters. The real projectile lives on the host; losing the
    /// visual is cosmetic, so an unresolvable weapon just logs.
    fn apply_projectile(&mut self, id: u32, shooter: PeerId, position: Vec2, direction: Vec2) {
        let projectile = self
            .players
            .get(&shooter)
            .and_then(|player| player.inventory.equipped_item())
            .and_then(weapon_params)
            .and_then(|params| Projectile::from_params(id, shooter, position, direction, &params));

        match projectile {
            Some(projectile) => self.projectiles.push(projectile),
            None => debug!(
                "No ranged parameters for projectile {} from peer {}, skipping its visual",
                id, shooter
            ),
        }
    }

    /// Advances presentation state by one frame: flash timers decay and
    /// visual projectiles fly until they expire or meet level geometry.
    /// Players never stop them here, hit resolution is the host's job.
    pub fn advance(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            if player.damage_flash > 0.0 {
                player.damage_flash = (player.damage_flash - dt).max(0.0);
            }
        }

        let mut live = Vec::new();
        for mut projectile in mem::take(&mut self.projectiles) {
            projectile.advance(dt);
            if projectile.expired() {
                continue;
            }
            if !self.level.in_bounds(projectile.position)
                || self.level.point_in_solid(projectile.position)
            {
                continue;
            }
            live.push(projectile);
        }
        self.projectiles = live;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{InputSample, InventoryOp, InventorySlot, PlayerPose, BOW, SWORD, TONIC};

    const LOCAL: PeerId = 2;

    fn replica() -> ReplicaWorld {
        ReplicaWorld::new(Level::arena(), LOCAL)
    }

    fn spawn(world: &mut ReplicaWorld, peer: PeerId, x: f32, y: f32) {
        world.apply_message(Message::SpawnPlayer {
            peer,
            spawn: Vec2::new(x, y),
        });
    }

    fn pose(peer: PeerId, x: f32, y: f32) -> PlayerPose {
        PlayerPose {
            peer,
            position: Vec2::new(x, y),
            velocity: Vec2::new(50.0, -20.0),
            aim: Vec2::new(900.0, 300.0),
            on_ground: true,
            dashing: false,
        }
    }

    fn equip(world: &mut ReplicaWorld, peer: PeerId, item: ItemId) {
        world.apply_message(Message::InventoryChange {
            peer,
            op: InventoryOp::Add { item, quantity: 1 },
        });
        world.apply_message(Message::InventoryChange {
            peer,
            op: InventoryOp::Equip { slot: 0 },
        });
    }

    #[test]
    fn test_spawn_creates_player_at_spawn_point() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        let player = world.player(3).unwrap();
        assert_eq!(player.position, Vec2::new(700.0, 300.0));
        assert_eq!(player.spawn, Vec2::new(700.0, 300.0));
        assert_eq!(player.health, PLAYER_MAX_HEALTH);
        assert_eq!(world.player_count(), 1);
    }

    #[test]
    fn test_local_spawn_raises_notice_once() {
        let mut world = replica();
        spawn(&mut world, 1, 960.0, 300.0);
        assert!(world.take_notices().is_empty());

        spawn(&mut world, LOCAL, 500.0, 300.0);
        assert_eq!(world.take_notices(), vec![ReplicaNotice::LocalPlayerSpawned]);
        assert!(world.take_notices().is_empty());
        assert!(world.local_player().is_some());
    }

    #[test]
    fn test_despawn_removes_player() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);
        world.apply_message(Message::DespawnPlayer { peer: 3 });

        assert!(world.player(3).is_none());
        assert_eq!(world.player_count(), 0);
    }

    #[test]
    fn test_snapshot_overwrites_pose() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        world.apply_message(Message::Snapshot {
            tick: 42,
            players: vec![pose(3, 820.0, 284.0)],
        });

        let player = world.player(3).unwrap();
        assert_eq!(player.position, Vec2::new(820.0, 284.0));
        assert_eq!(player.velocity, Vec2::new(50.0, -20.0));
        assert_eq!(player.aim, Vec2::new(900.0, 300.0));
        assert!(player.on_ground);
        assert_eq!(world.last_snapshot_tick(), 42);
        // The spawn point is not pose state and survives snapshots.
        assert_eq!(player.spawn, Vec2::new(700.0, 300.0));
    }

    #[test]
    fn test_snapshot_introduces_unknown_peer() {
        let mut world = replica();
        world.apply_message(Message::Snapshot {
            tick: 7,
            players: vec![pose(4, 1200.0, 300.0)],
        });

        let player = world.player(4).unwrap();
        assert_eq!(player.position, Vec2::new(1200.0, 300.0));
        assert_eq!(world.player_count(), 1);
    }

    #[test]
    fn test_health_sync_and_flash_decay() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        world.apply_message(Message::HealthSync { peer: 3, health: 2 });
        world.apply_message(Message::DamageFlash { peer: 3 });

        let player = world.player(3).unwrap();
        assert_eq!(player.health, 2);
        assert_approx_eq!(player.damage_flash, DAMAGE_FLASH_DURATION);

        world.advance(0.1);
        assert_approx_eq!(world.player(3).unwrap().damage_flash, DAMAGE_FLASH_DURATION - 0.1);

        world.advance(1.0);
        assert_eq!(world.player(3).unwrap().damage_flash, 0.0);
    }

    #[test]
    fn test_player_reset_restores_spawn_and_health() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        world.apply_message(Message::Snapshot {
            tick: 1,
            players: vec![pose(3, 1500.0, 900.0)],
        });
        world.apply_message(Message::HealthSync { peer: 3, health: 1 });
        world.apply_message(Message::PlayerReset { peer: 3 });

        let player = world.player(3).unwrap();
        assert_eq!(player.position, Vec2::new(700.0, 300.0));
        assert_eq!(player.velocity, Vec2::ZERO);
        assert_eq!(player.health, player.max_health);
    }

    #[test]
    fn test_dash_effect_toggles_flag() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        world.apply_message(Message::DashEffect {
            peer: 3,
            active: true,
        });
        assert!(world.player(3).unwrap().dashing);

        world.apply_message(Message::DashEffect {
            peer: 3,
            active: false,
        });
        assert!(!world.player(3).unwrap().dashing);
    }

    #[test]
    fn test_inventory_change_applies_to_replica() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        world.apply_message(Message::InventoryChange {
            peer: 3,
            op: InventoryOp::Add {
                item: TONIC,
                quantity: 3,
            },
        });
        equip(&mut world, 3, SWORD);

        let player = world.player(3).unwrap();
        assert_eq!(player.inventory.count_item(TONIC), 3);
        // The sword landed in slot 1 behind the tonics; equipping the
        // tonic slot fails and marks nothing.
        assert_eq!(player.equipped_item(), None);

        world.apply_message(Message::InventoryChange {
            peer: 3,
            op: InventoryOp::Equip { slot: 1 },
        });
        assert_eq!(world.player(3).unwrap().equipped_item(), Some(SWORD));
    }

    #[test]
    fn test_inventory_state_loads_snapshot() {
        let mut world = replica();
        spawn(&mut world, 3, 700.0, 300.0);

        let mut slots = vec![InventorySlot::default(); 16];
        slots[0] = InventorySlot {
            item: Some(BOW),
            quantity: 1,
        };
        slots[5] = InventorySlot {
            item: Some(TONIC),
            quantity: 4,
        };
        world.apply_message(Message::InventoryState {
            peer: 3,
            slots,
            equipped_slot: Some(0),
        });

        let player = world.player(3).unwrap();
        assert_eq!(player.equipped_item(), Some(BOW));
        assert_eq!(player.inventory.count_item(TONIC), 4);
    }

    #[test]
    fn test_projectile_visual_flight_and_expiry() {
        let mut world = replica();
        spawn(&mut world, 3, 500.0, 300.0);
        equip(&mut world, 3, BOW);

        world.apply_message(Message::SpawnProjectile {
            id: 9,
            shooter: 3,
            position: Vec2::new(560.0, 300.0),
            direction: Vec2::RIGHT,
        });
        assert_eq!(world.projectiles().len(), 1);

        world.advance(0.5);
        let projectile = &world.projectiles()[0];
        assert_eq!(projectile.id, 9);
        assert_eq!(projectile.shooter, 3);
        assert_approx_eq!(projectile.position.x, 560.0 + 750.0 * 0.5);

        // Bow lifetime is 1500 / 750 = 2.0 seconds.
        world.advance(1.0);
        assert_eq!(world.projectiles().len(), 1);
        world.advance(0.5);
        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_projectile_without_ranged_weapon_is_skipped() {
        let mut world = replica();
        spawn(&mut world, 3, 500.0, 300.0);
        equip(&mut world, 3, SWORD);

        world.apply_message(Message::SpawnProjectile {
            id: 1,
            shooter: 3,
            position: Vec2::new(560.0, 300.0),
            direction: Vec2::RIGHT,
        });

        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_projectile_stops_on_level_geometry() {
        let mut world = replica();
        spawn(&mut world, 3, 500.0, 700.0);
        equip(&mut world, 3, BOW);

        // Straight down into the arena floor at y = 1000.
        world.apply_message(Message::SpawnProjectile {
            id: 2,
            shooter: 3,
            position: Vec2::new(500.0, 700.0),
            direction: Vec2::new(0.0, 1.0),
        });

        world.advance(0.45);
        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_projectiles_fly_through_players() {
        let mut world = replica();
        spawn(&mut world, 3, 500.0, 300.0);
        spawn(&mut world, 4, 800.0, 300.0);
        equip(&mut world, 3, BOW);

        world.apply_message(Message::SpawnProjectile {
            id: 3,
            shooter: 3,
            position: Vec2::new(560.0, 300.0),
            direction: Vec2::RIGHT,
        });

        // Past peer 4's body. Whether it hit is for the host to say; the
        // visual keeps flying until expiry.
        world.advance(0.5);
        assert_eq!(world.projectiles().len(), 1);
        assert!(world.projectiles()[0].position.x > 800.0);
    }

    #[test]
    fn test_client_to_host_message_is_dropped() {
        let mut world = replica();
        world.apply_message(Message::RelayInput {
            input: InputSample::idle(),
        });
        world.apply_message(Message::RequestEquip { slot: 0 });

        assert_eq!(world.player_count(), 0);
        assert!(world.take_notices().is_empty());
    }

    #[test]
    fn test_messages_for_unknown_peers_are_harmless() {
        let mut world = replica();

        world.apply_message(Message::HealthSync { peer: 9, health: 1 });
        world.apply_message(Message::DamageFlash { peer: 9 });
        world.apply_message(Message::DashEffect {
            peer: 9,
            active: true,
        });
        world.apply_message(Message::PlayerReset { peer: 9 });
        world.apply_message(Message::DespawnPlayer { peer: 9 });

        assert_eq!(world.player_count(), 0);
    }
}
