//! Static level geometry and the sweep-and-slide movement resolver.
//!
//! Platforms are axis-aligned solid rectangles. Players are square AABBs
//! centered on their position; movement integrates one axis at a time in
//! substeps small enough that dash speeds cannot tunnel through thin
//! geometry.

use crate::vec::Vec2;
use crate::{WORLD_HEIGHT, WORLD_WIDTH};
use serde::{Deserialize, Serialize};

const MAX_SUBSTEPS: u32 = 32;
const GROUND_PROBE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    pub fn centered(center: Vec2, half: f32) -> Self {
        Rect {
            min: Vec2::new(center.x - half, center.y - half),
            max: Vec2::new(center.x + half, center.y + half),
        }
    }

    /// Strict overlap test; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y)
    }

    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = Vec2::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
        );
        closest.sub(center).length_squared() < radius * radius
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MoveResult {
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub bounds: Rect,
    pub platforms: Vec<Rect>,
}

impl Level {
    pub fn new(bounds: Rect, platforms: Vec<Rect>) -> Self {
        Level { bounds, platforms }
    }

    /// The default arena: a full-width floor and three ledges.
    pub fn arena() -> Self {
        Level {
            bounds: Rect::new(0.0, 0.0, WORLD_WIDTH, WORLD_HEIGHT),
            platforms: vec![
                Rect::new(0.0, 1000.0, WORLD_WIDTH, 80.0),
                Rect::new(260.0, 760.0, 360.0, 40.0),
                Rect::new(1300.0, 760.0, 360.0, 40.0),
                Rect::new(760.0, 520.0, 400.0, 40.0),
            ],
        }
    }

    /// Integrates one step of movement against the level. Contacts clamp
    /// position and zero the blocked velocity component.
    pub fn move_and_slide(
        &self,
        position: Vec2,
        velocity: Vec2,
        half: f32,
        dt: f32,
    ) -> MoveResult {
        let mut pos = position;
        let mut vel = velocity;

        let travel = vel.scale(dt);
        let longest = travel.x.abs().max(travel.y.abs());
        let max_per_step = (half * 0.5).max(1.0);
        let substeps = ((longest / max_per_step).ceil() as u32).clamp(1, MAX_SUBSTEPS);
        let sub_dt = dt / substeps as f32;

        for _ in 0..substeps {
            pos.x += vel.x * sub_dt;
            self.resolve_x(&mut pos, &mut vel, half);

            pos.y += vel.y * sub_dt;
            self.resolve_y(&mut pos, &mut vel, half);
        }

        let on_ground = vel.y >= 0.0 && self.grounded_at(pos, half);

        MoveResult {
            position: pos,
            velocity: vel,
            on_ground,
        }
    }

    fn resolve_x(&self, pos: &mut Vec2, vel: &mut Vec2, half: f32) {
        for platform in &self.platforms {
            let body = Rect::centered(*pos, half);
            if body.overlaps(platform) {
                if vel.x > 0.0 {
                    pos.x = platform.min.x - half;
                } else if vel.x < 0.0 {
                    pos.x = platform.max.x + half;
                }
                vel.x = 0.0;
            }
        }

        let min_x = self.bounds.min.x + half;
        let max_x = self.bounds.max.x - half;
        if pos.x < min_x {
            pos.x = min_x;
            if vel.x < 0.0 {
                vel.x = 0.0;
            }
        } else if pos.x > max_x {
            pos.x = max_x;
            if vel.x > 0.0 {
                vel.x = 0.0;
            }
        }
    }

    fn resolve_y(&self, pos: &mut Vec2, vel: &mut Vec2, half: f32) {
        for platform in &self.platforms {
            let body = Rect::centered(*pos, half);
            if body.overlaps(platform) {
                if vel.y > 0.0 {
                    pos.y = platform.min.y - half;
                } else if vel.y < 0.0 {
                    pos.y = platform.max.y + half;
                }
                vel.y = 0.0;
            }
        }

        let min_y = self.bounds.min.y + half;
        let max_y = self.bounds.max.y - half;
        if pos.y < min_y {
            pos.y = min_y;
            if vel.y < 0.0 {
                vel.y = 0.0;
            }
        } else if pos.y > max_y {
            pos.y = max_y;
            if vel.y > 0.0 {
                vel.y = 0.0;
            }
        }
    }

    /// True when a body resting at `position` has support directly below.
    pub fn grounded_at(&self, position: Vec2, half: f32) -> bool {
        if position.y + half + GROUND_PROBE >= self.bounds.max.y {
            return true;
        }
        let probe = Rect::centered(Vec2::new(position.x, position.y + GROUND_PROBE), half);
        self.platforms.iter().any(|platform| probe.overlaps(platform))
    }

    /// Whether a point sits inside solid geometry. Projectiles are
    /// stopped by their center crossing a platform face, not by their
    /// hit circle grazing one.
    pub fn point_in_solid(&self, point: Vec2) -> bool {
        self.platforms.iter().any(|platform| platform.contains(point))
    }

    pub fn in_bounds(&self, point: Vec2) -> bool {
        self.bounds.contains(point)
    }
}
