//! The authoritative simulation.
//!
//! `World` owns every player, projectile and active melee sweep in the
//! session. The host calls [`World::step`] once per fixed tick; clients
//! never step a world of their own, they apply replicated state instead.
//!
//! Side effects that observers need to hear about (dash start/end,
//! projectile spawns, damage, resets, inventory changes) are collected
//! into a [`SimEvent`] queue during the step and drained exactly once at
//! the end, so the caller can map them to outgoing messages in a
//! deterministic order. Players are always processed in ascending peer
//! id order for the same reason.

use std::collections::HashMap;
use std::mem;

use crate::combat::{EquippedWeapon, MeleeSweep, Projectile};
use crate::input::InputSample;
use crate::inventory::InventoryOp;
use crate::items::{weapon_params, WeaponKind};
use crate::level::{Level, Rect};
use crate::player::{PlayerState, Tuning};
use crate::vec::Vec2;
use crate::{PeerId, PLAYER_HALF, PLAYER_SIZE, PROJECTILE_SPAWN_OFFSET};

/// Something that happened during a simulation step that peers other
/// than the authority must be told about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    DashStarted { peer: PeerId },
    DashEnded { peer: PeerId },
    ProjectileSpawned {
        id: u32,
        shooter: PeerId,
        position: Vec2,
        direction: Vec2,
    },
    HealthChanged { peer: PeerId, health: i32 },
    DamageFlash { peer: PeerId },
    PlayerReset { peer: PeerId },
    InventoryChanged { peer: PeerId, op: InventoryOp },
}

pub struct World {
    tick: u64,
    level: Level,
    tuning: Tuning,
    players: HashMap<PeerId, PlayerState>,
    projectiles: Vec<Projectile>,
    next_projectile_id: u32,
    events: Vec<SimEvent>,
}

impl World {
    pub fn new(level: Level, tuning: Tuning) -> Self {
        World {
            tick: 0,
            level,
            tuning,
            players: HashMap::new(),
            projectiles: Vec::new(),
            next_projectile_id: 0,
            events: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn player(&self, id: PeerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PeerId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains_player(&self, id: PeerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Players in ascending peer id order, the order in which every
    /// per-step phase visits them.
    pub fn players_sorted(&self) -> Vec<&PlayerState> {
        let mut players: Vec<&PlayerState> = self.players.values().collect();
        players.sort_unstable_by_key(|player| player.id);
        players
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn spawn_player(&mut self, id: PeerId, spawn: Vec2) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let tuning = self.tuning;
        self.players.insert(id, PlayerState::new(id, spawn, &tuning));
        true
    }

    /// Removes the player. Projectiles they fired stay in flight; the
    /// shooter id on them simply stops matching anyone.
    pub fn despawn_player(&mut self, id: PeerId) -> bool {
        self.players.remove(&id).is_some()
    }

    /// Stores the latest input sample for a player. Samples are not
    /// queued, the newest one wins and persists until replaced.
    pub fn set_input(&mut self, id: PeerId, sample: InputSample) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.input = sample.sanitized();
                true
            }
            None => false,
        }
    }

    pub fn set_aim(&mut self, id: PeerId, point: Vec2) -> bool {
        if !point.is_finite() {
            return false;
        }
        match self.players.get_mut(&id) {
            Some(player) => {
                player.aim_point = point;
                true
            }
            None => false,
        }
    }

    /// Validates and applies an inventory operation for a player.
    /// Successful operations are announced through the event queue so
    /// replicas can mirror them; failed ones change nothing and stay
    /// silent.
    pub fn apply_inventory_op(&mut self, peer: PeerId, op: InventoryOp) -> bool {
        let player = match self.players.get_mut(&peer) {
            Some(player) => player,
            None => return false,
        };
        if !player.inventory.apply(op) {
            return false;
        }
        if let InventoryOp::Equip { .. } = op {
            player.weapon = player
                .inventory
                .equipped_item()
                .and_then(|item| weapon_params(item).map(|params| EquippedWeapon::new(item, params)));
        }
        self.events.push(SimEvent::InventoryChanged { peer, op });
        true
    }

    /// Advances the whole world by one fixed timestep and returns the
    /// events it produced. Phases run in a fixed order: timers and
    /// movement, body separation, projectile flight, new attacks, melee
    /// sweeps.
    pub fn step(&mut self, dt: f32) -> Vec<SimEvent> {
        self.tick = self.tick.wrapping_add(1);
        let ids = self.sorted_ids();
        let tuning = self.tuning;

        for id in &ids {
            if let Some(player) = self.players.get_mut(id) {
                player.tick_timers(dt);
                player.step_movement(dt, &self.level, &tuning, &mut self.events);
            }
        }

        self.separate_players(&ids);
        self.step_projectiles(dt, &ids);

        for id in &ids {
            let attack_held = self
                .players
                .get(id)
                .map(|player| player.input.attack)
                .unwrap_or(false);
            if attack_held {
                self.try_attack(*id);
            }
        }

        self.step_sweeps(dt, &ids);

        self.take_events()
    }

    /// Drains events queued outside a step, such as setup-time inventory
    /// grants the caller does not want replicated.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        mem::take(&mut self.events)
    }

    fn sorted_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Fires the player's equipped weapon if its cooldown allows it.
    /// Melee raises a sweep that follows the wielder; ranged spawns a
    /// projectile ahead of them.
    fn try_attack(&mut self, id: PeerId) -> bool {
        let player = match self.players.get_mut(&id) {
            Some(player) => player,
            None => return false,
        };
        let params = match player.weapon.as_mut() {
            Some(weapon) if weapon.can_attack() => {
                weapon.start_cooldown();
                weapon.params
            }
            _ => return false,
        };

        let direction = player.attack_direction();
        player.last_attack_direction = direction;

        match params.kind {
            WeaponKind::Melee { sweep_duration } => {
                player.sweep = Some(MeleeSweep::new(
                    direction,
                    params.range,
                    params.damage,
                    sweep_duration,
                ));
                true
            }
            WeaponKind::Ranged { .. } => {
                let origin = player
                    .position
                    .add(direction.scale(PROJECTILE_SPAWN_OFFSET));
                let projectile_id = self.next_projectile_id;
                self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
                match Projectile::from_params(projectile_id, id, origin, direction, &params) {
                    Some(projectile) => {
                        self.events.push(SimEvent::ProjectileSpawned {
                            id: projectile.id,
                            shooter: id,
                            position: origin,
                            direction,
                        });
                        self.projectiles.push(projectile);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Pushes overlapping bodies apart, half the overlap each, along
    /// the line between their centers. Velocities are left alone.
    fn separate_players(&mut self, ids: &[PeerId]) {
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (ids[i], ids[j]);
                let (pos_a, pos_b) = match (self.players.get(&a), self.players.get(&b)) {
                    (Some(pa), Some(pb)) => (pa.position, pb.position),
                    _ => continue,
                };

                let body_a = Rect::centered(pos_a, PLAYER_HALF);
                let body_b = Rect::centered(pos_b, PLAYER_HALF);
                if !body_a.overlaps(&body_b) {
                    continue;
                }

                let delta = pos_b.sub(pos_a);
                let distance = delta.length();
                let (shift_a, shift_b) = if distance < 0.001 {
                    (
                        Vec2::new(-PLAYER_SIZE / 2.0, 0.0),
                        Vec2::new(PLAYER_SIZE / 2.0, 0.0),
                    )
                } else {
                    let separation = (PLAYER_SIZE - distance) / 2.0;
                    if separation <= 0.0 {
                        continue;
                    }
                    let normal = delta.scale(1.0 / distance);
                    (normal.scale(-separation), normal.scale(separation))
                };

                self.shift_player(a, shift_a);
                self.shift_player(b, shift_b);
            }
        }
    }

    fn shift_player(&mut self, id: PeerId, shift: Vec2) {
        let bounds = self.level.bounds;
        if let Some(player) = self.players.get_mut(&id) {
            let shifted = player.position.add(shift);
            player.position = Vec2::new(
                shifted
                    .x
                    .clamp(bounds.min.x + PLAYER_HALF, bounds.max.x - PLAYER_HALF),
                shifted
                    .y
                    .clamp(bounds.min.y + PLAYER_HALF, bounds.max.y - PLAYER_HALF),
            );
        }
    }

    /// Flies every projectile forward and settles what it met: silent
    /// removal at end of lifetime, removal on solid geometry or leaving
    /// the level, damage plus removal on the first player contact.
    /// Shooters never collide with their own shots.
    fn step_projectiles(&mut self, dt: f32, ids: &[PeerId]) {
        let mut hits: Vec<(PeerId, i32)> = Vec::new();
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

            let mut struck = None;
            for id in ids {
                if *id == projectile.shooter {
                    continue;
                }
                if let Some(player) = self.players.get(id) {
                    let body = Rect::centered(player.position, PLAYER_HALF);
                    if body.overlaps_circle(projectile.position, projectile.radius()) {
                        struck = Some(*id);
                        break;
                    }
                }
            }

            match struck {
                Some(victim) => hits.push((victim, projectile.damage)),
                None => live.push(projectile),
            }
        }

        self.projectiles = live;

        for (victim, damage) in hits {
            if let Some(player) = self.players.get_mut(&victim) {
                player.take_damage(damage, &mut self.events);
            }
        }
    }

    /// Applies active melee sweeps. The hit region follows the wielder
    /// each step, and a sweep damages any given player at most once over
    /// its whole duration.
    fn step_sweeps(&mut self, dt: f32, ids: &[PeerId]) {
        let mut strikes: Vec<(PeerId, PeerId, i32)> = Vec::new();

        for wielder_id in ids {
            let (center, radius, damage, already_hit) = match self.players.get(wielder_id) {
                Some(player) => match player.sweep.as_ref() {
                    Some(sweep) => (
                        sweep.hit_center(player.position),
                        sweep.hit_radius(),
                        sweep.damage,
                        sweep.already_hit.clone(),
                    ),
                    None => continue,
                },
                None => continue,
            };

            for victim_id in ids {
                if victim_id == wielder_id || already_hit.contains(victim_id) {
                    continue;
                }
                if let Some(victim) = self.players.get(victim_id) {
                    let body = Rect::centered(victim.position, PLAYER_HALF);
                    if body.overlaps_circle(center, radius) {
                        strikes.push((*wielder_id, *victim_id, damage));
                    }
                }
            }
        }

        for (wielder_id, victim_id, damage) in strikes {
            if let Some(wielder) = self.players.get_mut(&wielder_id) {
                if let Some(sweep) = wielder.sweep.as_mut() {
                    sweep.already_hit.insert(victim_id);
                }
            }
            if let Some(victim) = self.players.get_mut(&victim_id) {
                victim.take_damage(damage, &mut self.events);
            }
        }

        for id in ids {
            if let Some(player) = self.players.get_mut(id) {
                let finished = match player.sweep.as_mut() {
                    Some(sweep) => {
                        sweep.remaining -= dt;
                        sweep.remaining <= 0.0
                    }
                    None => false,
                };
                if finished {
                    player.sweep = None;
                }
            }
        }
    }
}
