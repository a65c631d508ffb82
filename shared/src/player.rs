//! Per-player simulation state and the movement/dash step.
//!
//! The step order mirrors the rules the rest of the game depends on:
//! dash cooldown first, then dash start, then either the dash override
//! or normal gravity/jump/run control, then collision resolution. Dash
//! fully owns the velocity for its duration.

use crate::combat::{EquippedWeapon, MeleeSweep};
use crate::input::InputSample;
use crate::inventory::Inventory;
use crate::level::Level;
use crate::vec::{move_toward, Vec2};
use crate::world::SimEvent;
use crate::{
    PeerId, DAMAGE_FLASH_DURATION, DASH_COOLDOWN, DASH_DURATION, DASH_SPEED, GRAVITY,
    JUMP_VELOCITY, MOVE_SPEED, PLAYER_HALF, PLAYER_MAX_HEALTH,
};

/// Movement and health tuning. Constructed once per world; tests build
/// variants instead of mutating globals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    /// Dash direction used when the input axes are zero.
    pub dash_fallback: Vec2,
    pub max_health: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_velocity: JUMP_VELOCITY,
            dash_speed: DASH_SPEED,
            dash_duration: DASH_DURATION,
            dash_cooldown: DASH_COOLDOWN,
            dash_fallback: Vec2::RIGHT,
            max_health: PLAYER_MAX_HEALTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: PeerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub spawn_position: Vec2,
    pub on_ground: bool,
    pub input: InputSample,
    pub aim_point: Vec2,
    pub last_attack_direction: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub damage_flash: f32,
    pub dashing: bool,
    pub dash_ready: bool,
    pub dash_timer: f32,
    pub dash_cooldown_timer: f32,
    pub dash_direction: Vec2,
    pub weapon: Option<EquippedWeapon>,
    pub sweep: Option<MeleeSweep>,
    pub inventory: Inventory,
}

impl PlayerState {
    pub fn new(id: PeerId, spawn: Vec2, tuning: &Tuning) -> Self {
        PlayerState {
            id,
            position: spawn,
            velocity: Vec2::ZERO,
            spawn_position: spawn,
            on_ground: false,
            input: InputSample::idle(),
            aim_point: spawn,
            last_attack_direction: Vec2::RIGHT,
            health: tuning.max_health,
            max_health: tuning.max_health,
            damage_flash: 0.0,
            dashing: false,
            dash_ready: true,
            dash_timer: 0.0,
            dash_cooldown_timer: 0.0,
            dash_direction: Vec2::RIGHT,
            weapon: None,
            sweep: None,
            inventory: Inventory::new(),
        }
    }

    /// Runs presentation and weapon timers that tick regardless of
    /// movement state.
    pub fn tick_timers(&mut self, dt: f32) {
        if self.damage_flash > 0.0 {
            self.damage_flash = (self.damage_flash - dt).max(0.0);
        }
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.tick(dt);
        }
    }

    /// One movement step against the level, driven by the current input
    /// sample.
    pub fn step_movement(
        &mut self,
        dt: f32,
        level: &Level,
        tuning: &Tuning,
        events: &mut Vec<SimEvent>,
    ) {
        // Cooldown runs once the dash itself is over, so consecutive
        // activations are at least dash_duration + dash_cooldown apart.
        if !self.dash_ready && !self.dashing {
            self.dash_cooldown_timer += dt;
            if self.dash_cooldown_timer >= tuning.dash_cooldown {
                self.dash_ready = true;
                self.dash_cooldown_timer = 0.0;
            }
        }

        if self.input.dash && self.dash_ready && !self.dashing {
            let axes = Vec2::new(self.input.axis_x, self.input.axis_y);
            self.dash_direction = if axes.length_squared() > 0.0 {
                axes.normalized()
            } else {
                tuning.dash_fallback
            };
            self.dashing = true;
            self.dash_ready = false;
            self.dash_timer = 0.0;
            events.push(SimEvent::DashStarted { peer: self.id });
        }

        if self.dashing {
            self.dash_timer += dt;
            self.velocity = self.dash_direction.scale(tuning.dash_speed);
            if self.dash_timer >= tuning.dash_duration {
                self.dashing = false;
                self.dash_timer = 0.0;
                events.push(SimEvent::DashEnded { peer: self.id });
            }
        } else {
            if !self.on_ground {
                self.velocity.y += tuning.gravity * dt;
            }
            if self.input.jump && self.on_ground {
                self.velocity.y = tuning.jump_velocity;
            }
            if self.input.axis_x != 0.0 {
                self.velocity.x = self.input.axis_x * tuning.move_speed;
            } else {
                self.velocity.x = move_toward(self.velocity.x, 0.0, tuning.move_speed * dt);
            }
        }

        let moved = level.move_and_slide(self.position, self.velocity, PLAYER_HALF, dt);
        self.position = moved.position;
        self.velocity = moved.velocity;
        self.on_ground = moved.on_ground;
    }

    /// Applies damage. Ignored while health is already depleted; lethal
    /// damage triggers the full reset in the same call.
    pub fn take_damage(&mut self, amount: i32, events: &mut Vec<SimEvent>) {
        if self.health <= 0 {
            return;
        }

        self.health -= amount;
        self.damage_flash = DAMAGE_FLASH_DURATION;
        events.push(SimEvent::DamageFlash { peer: self.id });

        if self.health <= 0 {
            self.reset(events);
        } else {
            events.push(SimEvent::HealthChanged {
                peer: self.id,
                health: self.health,
            });
        }
    }

    /// Back to spawn with full health and no momentum. There is no
    /// separate death state.
    pub fn reset(&mut self, events: &mut Vec<SimEvent>) {
        self.position = self.spawn_position;
        self.velocity = Vec2::ZERO;
        self.health = self.max_health;
        events.push(SimEvent::PlayerReset { peer: self.id });
    }

    /// Direction the player is attacking toward right now: from the body
    /// to the aim point, or the last known direction when degenerate.
    pub fn attack_direction(&self) -> Vec2 {
        let to_aim = self.aim_point.sub(self.position);
        if to_aim.length_squared() > f32::EPSILON {
            to_aim.normalized()
        } else {
            self.last_attack_direction
        }
    }
}
