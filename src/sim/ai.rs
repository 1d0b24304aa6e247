//! Enemy patrol/chase behavior
//!
//! Mode is recomputed from scratch every tick with no hysteresis: an enemy
//! sitting on its detection boundary may flip between chase and patrol on
//! consecutive ticks. Tests rely on this.

use glam::Vec2;

use super::body::Body;
use super::state::{AiMode, Brain, EntityKind, RunState};
use crate::signum_or_zero;

/// Patrol moves at this fraction of the chase speed
pub const PATROL_SPEED_FACTOR: f32 = 0.5;

/// Pick a mode and set horizontal velocity for one enemy
///
/// Movement is bounded to `[patrol_left, patrol_right]` in both modes; the
/// next physics step moves the body.
pub fn steer(body: &mut Body, brain: &mut Brain, player_center: Vec2) {
    let center = body.center();

    if center.distance(player_center) <= brain.detection_range {
        brain.mode = AiMode::Chase;
        body.vel.x = signum_or_zero(player_center.x - center.x) * brain.chase_speed;
    } else {
        brain.mode = AiMode::Patrol;
        if body.pos.x <= brain.patrol_left {
            brain.direction = 1.0;
        } else if body.pos.x >= brain.patrol_right {
            brain.direction = -1.0;
        }
        body.vel.x = brain.direction * brain.chase_speed * PATROL_SPEED_FACTOR;
    }
    body.vel.y = 0.0;

    // Keep the enemy on its beat
    if body.pos.x <= brain.patrol_left {
        body.pos.x = brain.patrol_left;
        body.vel.x = body.vel.x.max(0.0);
    } else if body.pos.x >= brain.patrol_right {
        body.pos.x = brain.patrol_right;
        body.vel.x = body.vel.x.min(0.0);
    }
}

/// Steer every enemy toward (or away from) the current player position
pub fn update_enemies(state: &mut RunState) {
    let Some(player) = state.player_body() else {
        return;
    };
    let target = player.center();

    for entity in state.entities.iter_mut() {
        if let EntityKind::Enemy(brain) = &mut entity.kind {
            steer(&mut entity.body, brain, target);
        }
    }
}
