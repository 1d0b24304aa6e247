//! Data-driven game balance
//!
//! Engine constants that are not part of a game's template. Loaded from JSON
//! (every field optional) or built from a difficulty preset.

use serde::{Deserialize, Serialize};

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" | "med" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Vertical gap between paired barriers
    pub fn barrier_gap(&self) -> f32 {
        match self {
            Difficulty::Easy => 180.0,
            Difficulty::Normal => 150.0,
            Difficulty::Hard => 125.0,
        }
    }

    /// Seconds between barrier spawns
    pub fn barrier_interval(&self) -> f32 {
        match self {
            Difficulty::Easy => 2.5,
            Difficulty::Normal => 2.2,
            Difficulty::Hard => 2.0,
        }
    }

    /// Post-hit invincibility window in seconds
    pub fn invincibility(&self) -> f32 {
        match self {
            Difficulty::Easy => 2.0,
            Difficulty::Normal => 1.5,
            Difficulty::Hard => 1.0,
        }
    }
}

/// Engine balance knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuning {
    pub difficulty: Difficulty,

    // === Physics ===
    /// Per-axis speed cap (px/s), keeps fast bodies from tunneling thin obstacles
    pub max_speed_x: f32,
    pub max_speed_y: f32,

    // === Auto-scroller ===
    pub barrier_interval: f32,
    pub barrier_gap: f32,
    pub barrier_width: f32,
    /// Minimum distance between the gap and the top/bottom of the world
    pub barrier_margin: f32,
    /// Score for passing one barrier pair
    pub pass_points: u64,

    // === Platformer ===
    pub base_platforms: u32,
    pub base_enemies: u32,
    pub base_collectibles: u32,
    pub collectible_points: u64,
    pub enemy_chase_speed: f32,
    pub enemy_detection_range: f32,
    /// Half-width of a config enemy's patrol span around its spawn x
    pub enemy_patrol_span: f32,
    pub invincibility: f32,
    pub level_bonus: u64,
    /// Seconds the "level complete" banner holds the world before the next level
    pub level_transition: f32,

    // === Shared ===
    /// Entities whose x reaches -retire_margin are removed
    pub retire_margin: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::from_preset(Difficulty::Normal)
    }
}

impl Tuning {
    /// Create tuning from a difficulty preset
    pub fn from_preset(difficulty: Difficulty) -> Self {
        Self {
            difficulty,

            max_speed_x: 600.0,
            max_speed_y: 900.0,

            barrier_interval: difficulty.barrier_interval(),
            barrier_gap: difficulty.barrier_gap(),
            barrier_width: 60.0,
            barrier_margin: 50.0,
            pass_points: 1,

            base_platforms: 3,
            base_enemies: 0,
            base_collectibles: 3,
            collectible_points: 10,
            enemy_chase_speed: 70.0,
            enemy_detection_range: 150.0,
            enemy_patrol_span: 100.0,
            invincibility: difficulty.invincibility(),
            level_bonus: 100,
            level_transition: 1.5,

            retire_margin: 100.0,
        }
    }

    /// Parse tuning JSON; missing fields take the values of its `difficulty`
    /// preset (Normal when absent)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        let Some(fields) = overrides.as_object() else {
            return serde_json::from_value(overrides);
        };
        let difficulty = match fields.get("difficulty") {
            Some(value) => Difficulty::deserialize(value)?,
            None => Difficulty::default(),
        };

        let mut merged = serde_json::to_value(Self::from_preset(difficulty))?;
        if let Some(base) = merged.as_object_mut() {
            for (key, value) in fields {
                base.insert(key.clone(), value.clone());
            }
        }
        let tuning: Tuning = serde_json::from_value(merged)?;
        Ok(tuning.sanitized())
    }

    /// Replace non-positive or non-finite timings and caps with preset values
    pub fn sanitized(mut self) -> Self {
        let preset = Self::from_preset(self.difficulty);
        let fix = |value: &mut f32, fallback: f32| {
            if !value.is_finite() || *value <= 0.0 {
                log::warn!("Tuning value {} out of range, using {}", value, fallback);
                *value = fallback;
            }
        };
        fix(&mut self.max_speed_x, preset.max_speed_x);
        fix(&mut self.max_speed_y, preset.max_speed_y);
        fix(&mut self.barrier_interval, preset.barrier_interval);
        fix(&mut self.barrier_gap, preset.barrier_gap);
        fix(&mut self.barrier_width, preset.barrier_width);
        fix(&mut self.enemy_chase_speed, preset.enemy_chase_speed);
        fix(&mut self.retire_margin, preset.retire_margin);
        if !self.barrier_margin.is_finite() || self.barrier_margin < 0.0 {
            self.barrier_margin = preset.barrier_margin;
        }
        if !self.enemy_detection_range.is_finite() || self.enemy_detection_range < 0.0 {
            self.enemy_detection_range = preset.enemy_detection_range;
        }
        if !self.enemy_patrol_span.is_finite() || self.enemy_patrol_span < 0.0 {
            self.enemy_patrol_span = preset.enemy_patrol_span;
        }
        if !self.invincibility.is_finite() || self.invincibility < 0.0 {
            self.invincibility = preset.invincibility;
        }
        if !self.level_transition.is_finite() || self.level_transition < 0.0 {
            self.level_transition = preset.level_transition;
        }
        self
    }
}
