//! Collision detection and response for axis-aligned boxes
//!
//! Solid platforms are resolved physically (landing, head bump, side block).
//! Collectibles and hazards are triggers: they report a [`Contact`] and leave
//! the player's motion alone.

use super::body::{Aabb, Body};
use super::config::GameKind;
use super::state::{EntityKind, RunState};

/// Per-variant rules for what touching things means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// No platforms; any hazard contact ends the run
    AutoScroller,
    /// Platforms are solid; hazards cost a life
    Platformer,
}

/// What a hazard contact does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardOutcome {
    /// Run ends immediately
    Terminal,
    /// Lose a life, then a short invincibility window
    LoseLife,
}

impl CollisionPolicy {
    pub fn for_kind(kind: GameKind) -> Self {
        match kind {
            GameKind::AutoScroller => CollisionPolicy::AutoScroller,
            GameKind::Platformer => CollisionPolicy::Platformer,
        }
    }

    pub fn resolves_platforms(&self) -> bool {
        matches!(self, CollisionPolicy::Platformer)
    }

    pub fn hazard_outcome(&self) -> HazardOutcome {
        match self {
            CollisionPolicy::AutoScroller => HazardOutcome::Terminal,
            CollisionPolicy::Platformer => HazardOutcome::LoseLife,
        }
    }
}

/// Physical response against one solid box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Came down onto the top: standing
    Landed,
    /// Hit the underside while rising
    HeadBump,
    /// Pushed out of a side
    SideBlocked,
}

/// Result of one collision pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    Solid { platform: u32, resolution: Resolution },
    Collected { id: u32, points: u64 },
    Hazard { id: u32 },
}

/// Push `body` out of `solid` if they overlap
///
/// A body lands only if it is falling and its bottom was at or above the top
/// last tick; that check runs first, so corners resolve as landings. Head bumps
/// mirror it for the underside. Anything else is pushed out of the nearer side.
pub fn resolve_solid(body: &mut Body, solid: &Aabb) -> Option<Resolution> {
    let current = body.aabb();
    if !current.overlaps(solid) {
        return None;
    }
    let previous = body.prev_aabb();

    let pen_left = current.right() - solid.left();
    let pen_right = solid.right() - current.left();

    if body.vel.y > 0.0 && previous.bottom() <= solid.top() {
        body.pos.y = solid.top() - body.size.y;
        body.vel.y = 0.0;
        body.grounded = true;
        return Some(Resolution::Landed);
    }

    if body.vel.y < 0.0 && previous.top() >= solid.bottom() {
        body.pos.y = solid.bottom();
        body.vel.y = 0.0;
        return Some(Resolution::HeadBump);
    }

    if pen_left < pen_right {
        body.pos.x = solid.left() - body.size.x;
        if body.vel.x > 0.0 {
            body.vel.x = 0.0;
        }
    } else {
        body.pos.x = solid.right();
        if body.vel.x < 0.0 {
            body.vel.x = 0.0;
        }
    }
    Some(Resolution::SideBlocked)
}

/// Resolve the player against everything it touches this tick
///
/// Collected collectibles are removed before returning. Hazards are ignored
/// while the invincibility window is open.
pub fn resolve_contacts(state: &mut RunState, policy: CollisionPolicy) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let Some(mut player) = state.player_body() else {
        return contacts;
    };

    if policy.resolves_platforms() {
        player.grounded = false;
        for entity in state.entities.iter().filter(|e| e.is_platform()) {
            if let Some(resolution) = resolve_solid(&mut player, &entity.body.aabb()) {
                contacts.push(Contact::Solid {
                    platform: entity.id,
                    resolution,
                });
            }
        }
    }

    let player_box = player.aabb();
    let invincible = state.invincible > 0.0;
    for entity in state.entities.iter_mut() {
        if entity.is_player() || !player_box.overlaps(&entity.body.aabb()) {
            continue;
        }
        let id = entity.id;
        let hazard = entity.is_hazard();
        match &mut entity.kind {
            EntityKind::Collectible { points, collected } => {
                if !*collected {
                    *collected = true;
                    contacts.push(Contact::Collected {
                        id,
                        points: *points,
                    });
                }
            }
            _ if hazard && !invincible => contacts.push(Contact::Hazard { id }),
            _ => {}
        }
    }

    state
        .entities
        .retain(|e| !matches!(e.kind, EntityKind::Collectible { collected: true, .. }));

    if let Some(entity) = state.player_mut() {
        entity.body = player;
    }
    contacts
}
