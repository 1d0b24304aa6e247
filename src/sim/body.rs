//! Rigid-body state and the per-tick integrator
//!
//! Positions are top-left corners in screen space (y grows downward), so
//! positive gravity pulls bodies toward the bottom of the world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_corner(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.max.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.min.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    /// Overlap on both axes; touching edges do not count
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Minimal rigid body: where it is, how big, how fast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    /// Position at the start of the current tick (for swept landing checks)
    pub prev_pos: Vec2,
    /// Whether world gravity accelerates this body
    pub gravity: bool,
    /// Standing on a platform since the last collision pass
    pub grounded: bool,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            size,
            vel: Vec2::ZERO,
            prev_pos: pos,
            gravity: false,
            grounded: false,
        }
    }

    pub fn with_gravity(mut self) -> Self {
        self.gravity = true;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_corner(self.pos, self.size)
    }

    /// Bounding box at the start of the tick
    pub fn prev_aabb(&self) -> Aabb {
        Aabb::from_corner(self.prev_pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Teleport without leaving a swept trail behind
    pub fn place(&mut self, pos: Vec2) {
        self.pos = pos;
        self.prev_pos = pos;
    }

    /// Stop all motion
    pub fn freeze(&mut self) {
        self.vel = Vec2::ZERO;
        self.prev_pos = self.pos;
    }

    /// Semi-implicit Euler step: velocity first, then position with the new velocity
    pub fn integrate(&mut self, gravity: f32, dt: f32, max_speed: Vec2) {
        self.prev_pos = self.pos;
        if self.gravity {
            self.vel.y += gravity * dt;
        }
        self.vel = self.vel.clamp(-max_speed, max_speed);
        self.pos += self.vel * dt;
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.size.is_finite() && self.vel.is_finite()
    }
}
