//! LocalStorage-backed best scores (web only)
//!
//! Every game's best lives in one JSON document under a single key, so the
//! scope is this browser profile, not a logged-in user.

use crate::highscores::{BestScores, ScoreStore, StoreError};

/// [`ScoreStore`] over `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    key: String,
}

impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorageStore {
    pub const DEFAULT_KEY: &'static str = "arcade_sim_best_scores";

    pub fn new() -> Self {
        Self::with_key(Self::DEFAULT_KEY)
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        let window = web_sys::window().ok_or(StoreError::Unavailable)?;
        window
            .local_storage()
            .map_err(|err| StoreError::Backend(format!("{:?}", err)))?
            .ok_or(StoreError::Unavailable)
    }

    fn load(&self, storage: &web_sys::Storage) -> Result<BestScores, StoreError> {
        match storage.get_item(&self.key) {
            Ok(Some(json)) => BestScores::from_json(&json),
            Ok(None) => Ok(BestScores::new()),
            Err(err) => Err(StoreError::Backend(format!("{:?}", err))),
        }
    }
}

impl ScoreStore for LocalStorageStore {
    fn get_best(&self, game_id: &str) -> Result<Option<u64>, StoreError> {
        let storage = Self::storage()?;
        Ok(self.load(&storage)?.best(game_id))
    }

    fn set_best(&mut self, game_id: &str, score: u64) -> Result<(), StoreError> {
        let storage = Self::storage()?;
        // A corrupt document is replaced rather than blocking every later save
        let mut scores = self.load(&storage).unwrap_or_else(|err| {
            log::warn!("Discarding unreadable best scores: {}", err);
            BestScores::new()
        });
        scores.entries.insert(game_id.to_string(), score);

        let json = scores.to_json()?;
        storage
            .set_item(&self.key, &json)
            .map_err(|err| StoreError::Backend(format!("{:?}", err)))?;
        log::info!("Best score for '{}' saved: {}", game_id, score);
        Ok(())
    }
}
