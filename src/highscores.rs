//! Best-score persistence
//!
//! The simulation only knows the [`ScoreStore`] contract: read and write one
//! integer per game id. Writes are last-writer-wins. On the web the scores of
//! every game live in one LocalStorage entry (see `platform::storage`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a store call failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("stored scores are not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// External key-value store for all-time bests
pub trait ScoreStore {
    /// Best score for `game_id`, `None` if never recorded
    fn get_best(&self, game_id: &str) -> Result<Option<u64>, StoreError>;

    /// Overwrite the best score for `game_id`
    fn set_best(&mut self, game_id: &str, score: u64) -> Result<(), StoreError>;
}

/// All-time bests keyed by game id (the persisted document)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BestScores {
    pub entries: BTreeMap<String, u64>,
}

impl BestScores {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn best(&self, game_id: &str) -> Option<u64> {
        self.entries.get(game_id).copied()
    }

    /// Record a score; returns true if it beat the stored best
    pub fn record(&mut self, game_id: &str, score: u64) -> bool {
        match self.entries.get(game_id) {
            Some(&best) if best >= score => false,
            _ => {
                self.entries.insert(game_id.to_string(), score);
                true
            }
        }
    }

    /// Check if any game has a score
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-process store (native builds and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scores: BestScores,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn get_best(&self, game_id: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.scores.best(game_id))
    }

    fn set_best(&mut self, game_id: &str, score: u64) -> Result<(), StoreError> {
        self.scores.entries.insert(game_id.to_string(), score);
        Ok(())
    }
}
