//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (one `Pcg32` per run)
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod ai;
pub mod body;
pub mod collision;
pub mod config;
pub mod input;
pub mod lifecycle;
pub mod score;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod timer;

pub use body::{Aabb, Body};
pub use collision::{CollisionPolicy, Contact, HazardOutcome, Resolution};
pub use config::{GameConfig, GameKind, Resolved, Severity, ValidationIssue, resolve, resolve_str};
pub use input::{InputEvent, InputRouter, Key, TickInput};
pub use lifecycle::{GameObserver, Simulation};
pub use score::{ScoreEvent, ScoreKeeper};
pub use spawn::SpawnDirector;
pub use state::{
    AiMode, Brain, Entity, EntityKind, GameEvent, GamePhase, InvariantViolation, ObstacleRole,
    RunState,
};
pub use timer::{TimerHandle, TimerKind, Timers};
