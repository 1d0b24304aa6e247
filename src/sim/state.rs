//! Run state and core simulation types
//!
//! Everything one play session mutates lives in [`RunState`]. A restart builds
//! a new one instead of resetting fields in place.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use thiserror::Error;

use super::body::Body;
use super::config::GameKind;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Run built, waiting for the first flap/jump/click
    Waiting,
    /// Active gameplay
    Playing,
    /// Run ended by a hit, a fall or an invariant violation
    GameOver,
    /// Platformer only: last level cleared
    Won,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Won)
    }
}

/// What an obstacle does to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObstacleRole {
    /// Scrolling hazard (pipe half, wall); passing a scoring barrier awards points
    Barrier { scores_on_pass: bool },
    /// Solid surface the player can stand on
    Platform,
}

/// Enemy movement mode, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AiMode {
    Patrol,
    Chase,
}

/// Enemy behavior parameters and current mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Brain {
    pub chase_speed: f32,
    pub detection_range: f32,
    /// Leftmost x the enemy's left edge may reach
    pub patrol_left: f32,
    /// Rightmost x the enemy's left edge may reach
    pub patrol_right: f32,
    /// Patrol heading: -1 left, 1 right
    pub direction: f32,
    pub mode: AiMode,
}

/// Entity variants
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EntityKind {
    Player,
    Obstacle { role: ObstacleRole, scored: bool },
    Enemy(Brain),
    Collectible { points: u64, collected: bool },
}

/// A simulated entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: u32,
    pub body: Body,
    pub kind: EntityKind,
}

impl Entity {
    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player)
    }

    pub fn is_platform(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Obstacle {
                role: ObstacleRole::Platform,
                ..
            }
        )
    }

    pub fn is_collectible(&self) -> bool {
        matches!(self.kind, EntityKind::Collectible { .. })
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_))
    }

    /// Barriers and enemies hurt on contact
    pub fn is_hazard(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Obstacle {
                role: ObstacleRole::Barrier { .. },
                ..
            } | EntityKind::Enemy(_)
        )
    }
}

/// Observable things that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    /// First qualifying input moved the run from Waiting to Playing
    PlayRecorded,
    ScoreChanged { score: u64 },
    /// Score crossed the all-time best (at most once per run)
    NewRecord { score: u64 },
    LifeLost { lives: u32 },
    LevelComplete { level: u32, bonus: u64 },
    LevelStarted { level: u32 },
    /// Fired exactly once per run, on entering GameOver or Won
    GameOver {
        final_score: u64,
        best_score: u64,
        won: bool,
    },
}

/// Broken structural assumptions; fatal to the current run only
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("world has no entities")]
    Empty,
    #[error("run has no player entity")]
    MissingPlayer,
    #[error("run has {0} player entities")]
    DuplicatePlayer(usize),
    #[error("entity id {0} is used twice")]
    DuplicateId(u32),
    #[error("entity {0} has a non-finite position, size or velocity")]
    NonFinite(u32),
    #[error("entity {0} has a negative or zero size")]
    BadSize(u32),
    #[error("platformer level has no platforms")]
    NoPlatforms,
    #[error("world dimensions {0}x{1} are not positive")]
    BadWorld(u32, u32),
}

/// Mutable state of one play session
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub kind: GameKind,
    pub world_size: Vec2,
    /// Entities sorted by id; exactly one is the player
    pub entities: Vec<Entity>,
    pub score: u64,
    pub lives: u32,
    pub level: u32,
    pub phase: GamePhase,
    /// Ticks simulated while Playing
    pub time_ticks: u64,
    /// Seconds of post-hit invincibility remaining
    pub invincible: f32,
    /// Where the player (re)appears
    pub spawn_point: Vec2,
    /// Show the "press to start" hint
    pub show_instructions: bool,
    /// World held still while the level-complete banner is up
    pub level_transition: bool,
    /// Set when the run was ended by an invariant violation
    pub degraded: Option<String>,
    #[serde(skip)]
    pub(crate) rng: Pcg32,
    next_id: u32,
}

impl RunState {
    pub fn new(kind: GameKind, world_size: Vec2, lives: u32, seed: u64) -> Self {
        Self {
            kind,
            world_size,
            entities: Vec::new(),
            score: 0,
            lives,
            level: 1,
            phase: GamePhase::Waiting,
            time_ticks: 0,
            invincible: 0.0,
            spawn_point: Vec2::ZERO,
            show_instructions: true,
            level_transition: false,
            degraded: None,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an entity, returning its id
    pub fn spawn(&mut self, body: Body, kind: EntityKind) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity { id, body, kind });
        id
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.is_player())
    }

    pub fn player_mut(&mut self) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.is_player())
    }

    pub fn player_body(&self) -> Option<Body> {
        self.player().map(|p| p.body)
    }

    /// Collectibles still in play
    pub fn remaining_collectibles(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Collectible { collected: false, .. }))
            .count()
    }

    /// Remove every non-player entity
    pub fn clear_level(&mut self) {
        self.entities.retain(|e| e.is_player());
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.entities.sort_by_key(|e| e.id);
    }

    /// Check structural invariants
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !(self.world_size.x > 0.0 && self.world_size.y > 0.0) {
            return Err(InvariantViolation::BadWorld(
                self.world_size.x.max(0.0) as u32,
                self.world_size.y.max(0.0) as u32,
            ));
        }
        if self.entities.is_empty() {
            return Err(InvariantViolation::Empty);
        }

        match self.entities.iter().filter(|e| e.is_player()).count() {
            0 => return Err(InvariantViolation::MissingPlayer),
            1 => {}
            n => return Err(InvariantViolation::DuplicatePlayer(n)),
        }

        let mut ids: Vec<u32> = self.entities.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(InvariantViolation::DuplicateId(pair[0]));
        }

        for entity in &self.entities {
            if !entity.body.is_finite() {
                return Err(InvariantViolation::NonFinite(entity.id));
            }
            if entity.body.size.x <= 0.0 || entity.body.size.y <= 0.0 {
                return Err(InvariantViolation::BadSize(entity.id));
            }
        }

        if self.kind == GameKind::Platformer && !self.entities.iter().any(|e| e.is_platform()) {
            return Err(InvariantViolation::NoPlatforms);
        }

        Ok(())
    }
}
