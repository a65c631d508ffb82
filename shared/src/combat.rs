//! Weapon instances, melee sweeps, and projectiles.
//!
//! A player carries at most one [`EquippedWeapon`], rebuilt from the item
//! catalog on every equip. Attack resolution itself lives in the world
//! step; this module holds the state machines and the geometry helpers
//! they need.

use crate::items::{ItemId, WeaponKind, WeaponParams};
use crate::vec::Vec2;
use crate::{PeerId, MELEE_RADIUS_SCALE};
use std::collections::HashSet;

/// The single live weapon of a player. Equipping replaces the whole
/// instance, so stale cooldowns never leak between weapons.
#[derive(Debug, Clone, PartialEq)]
pub struct EquippedWeapon {
    pub item: ItemId,
    pub params: WeaponParams,
    pub cooldown_timer: f32,
}

impl EquippedWeapon {
    pub fn new(item: ItemId, params: WeaponParams) -> Self {
        EquippedWeapon {
            item,
            params,
            cooldown_timer: 0.0,
        }
    }

    pub fn can_attack(&self) -> bool {
        self.cooldown_timer <= 0.0
    }

    pub fn tick(&mut self, dt: f32) {
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer -= dt;
        }
    }

    pub fn start_cooldown(&mut self) {
        self.cooldown_timer = self.params.cooldown;
    }
}

/// An active melee swing. The hit region follows the wielder for the
/// whole sweep; each victim is damaged at most once per sweep.
#[derive(Debug, Clone)]
pub struct MeleeSweep {
    pub direction: Vec2,
    pub range: f32,
    pub damage: i32,
    pub remaining: f32,
    pub already_hit: HashSet<PeerId>,
}

impl MeleeSweep {
    pub fn new(direction: Vec2, range: f32, damage: i32, duration: f32) -> Self {
        MeleeSweep {
            direction,
            range,
            damage,
            remaining: duration,
            already_hit: HashSet::new(),
        }
    }

    /// Center of the circular hit region, offset from the wielder along
    /// the attack direction.
    pub fn hit_center(&self, wielder_position: Vec2) -> Vec2 {
        wielder_position.add(self.direction.scale(self.range))
    }

    pub fn hit_radius(&self) -> f32 {
        self.range * MELEE_RADIUS_SCALE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u32,
    pub shooter: PeerId,
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub lifetime: f32,
    pub elapsed: f32,
    pub area: f32,
}

impl Projectile {
    /// Builds a projectile from ranged weapon parameters. Lifetime is
    /// derived as range over speed. Returns None for melee parameters.
    pub fn from_params(
        id: u32,
        shooter: PeerId,
        position: Vec2,
        direction: Vec2,
        params: &WeaponParams,
    ) -> Option<Self> {
        match params.kind {
            WeaponKind::Ranged {
                projectile_speed,
                projectile_area,
            } => Some(Projectile {
                id,
                shooter,
                position,
                direction,
                speed: projectile_speed,
                damage: params.damage,
                lifetime: params.range / projectile_speed,
                elapsed: 0.0,
                area: projectile_area,
            }),
            WeaponKind::Melee { .. } => None,
        }
    }

    pub fn radius(&self) -> f32 {
        self.area / 2.0
    }

    pub fn advance(&mut self, dt: f32) {
        self.position = self.position.add(self.direction.scale(self.speed * dt));
        self.elapsed += dt;
    }

    pub fn expired(&self) -> bool {
        self.elapsed >= self.lifetime
    }
}
