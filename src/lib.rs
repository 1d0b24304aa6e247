//! Arcade Sim - 2D arcade simulation core for browser games
//!
//! Core modules:
//! - `sim`: Deterministic simulation (config, physics, collisions, spawning, AI, scoring, lifecycle)
//! - `platform`: Browser/native host glue (frame clock, storage, wasm bindings)
//! - `highscores`: Best-score persistence contract
//! - `tuning`: Data-driven game balance

pub mod highscores;
pub mod platform;
pub mod sim;
pub mod tuning;

pub use highscores::{BestScores, MemoryStore, ScoreStore, StoreError};
pub use sim::{GameConfig, GameKind, GamePhase, RunState, Simulation};
pub use tuning::{Difficulty, Tuning};

/// Engine-wide constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one tick per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the host clock will account for (tab switches, breakpoints)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Player hitbox sizes per game kind
    pub const BIRD_SIZE: (f32, f32) = (34.0, 24.0);
    pub const HERO_SIZE: (f32, f32) = (32.0, 40.0);

    /// Enemy and collectible hitboxes
    pub const ENEMY_SIZE: (f32, f32) = (32.0, 32.0);
    pub const COLLECTIBLE_SIZE: (f32, f32) = (24.0, 24.0);

    /// Thickness of the generated ground strip in platformer levels
    pub const GROUND_THICKNESS: f32 = 32.0;
}

/// Sign of `value` as -1, 0 or 1 (`f32::signum` maps 0.0 to 1.0)
#[inline]
pub fn signum_or_zero(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
