//! Run score, session best and persisted all-time best
//!
//! The keeper never writes to the store during a tick. A beaten all-time best
//! is remembered as pending and flushed once the tick has finished.

use serde::Serialize;

use super::state::{GameEvent, RunState};
use crate::highscores::ScoreStore;

/// Things that award points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    CollectiblePicked { points: u64 },
    ObstaclePassed { points: u64 },
    LevelBonus { points: u64 },
}

impl ScoreEvent {
    pub fn points(&self) -> u64 {
        match *self {
            ScoreEvent::CollectiblePicked { points }
            | ScoreEvent::ObstaclePassed { points }
            | ScoreEvent::LevelBonus { points } => points,
        }
    }
}

/// Best-score bookkeeping for one game
#[derive(Debug, Clone, Serialize)]
pub struct ScoreKeeper {
    game_id: String,
    session_best: u64,
    all_time_best: u64,
    /// "New record" already signaled this run
    record_signaled: bool,
    /// All-time best waiting to be written to the store
    #[serde(skip)]
    pending_persist: Option<u64>,
}

impl ScoreKeeper {
    /// Load the all-time best; a failing store degrades to session-only tracking
    pub fn load(game_id: &str, store: &dyn ScoreStore) -> Self {
        let all_time_best = match store.get_best(game_id) {
            Ok(best) => best.unwrap_or(0),
            Err(err) => {
                log::warn!("Could not load best score for '{}': {}", game_id, err);
                0
            }
        };
        Self {
            game_id: game_id.to_string(),
            session_best: 0,
            all_time_best,
            record_signaled: false,
            pending_persist: None,
        }
    }

    pub fn session_best(&self) -> u64 {
        self.session_best
    }

    pub fn all_time_best(&self) -> u64 {
        self.all_time_best
    }

    /// Best score shown on the game-over screen
    pub fn best(&self) -> u64 {
        self.session_best.max(self.all_time_best)
    }

    /// Reset per-run flags
    pub fn begin_run(&mut self) {
        self.record_signaled = false;
    }

    /// Apply one scoring event to the run, pushing the resulting events
    pub fn award(&mut self, state: &mut RunState, event: ScoreEvent, events: &mut Vec<GameEvent>) {
        let points = event.points();
        if points == 0 {
            return;
        }
        state.score = state.score.saturating_add(points);
        events.push(GameEvent::ScoreChanged { score: state.score });

        self.session_best = self.session_best.max(state.score);

        if state.score > self.all_time_best {
            self.all_time_best = state.score;
            self.pending_persist = Some(state.score);
            if !self.record_signaled {
                self.record_signaled = true;
                events.push(GameEvent::NewRecord { score: state.score });
            }
        }
    }

    /// Write a pending all-time best; failures are logged and dropped
    pub fn flush(&mut self, store: &mut dyn ScoreStore) {
        let Some(best) = self.pending_persist.take() else {
            return;
        };
        if let Err(err) = store.set_best(&self.game_id, best) {
            log::warn!("Could not save best score {} for '{}': {}", best, self.game_id, err);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_persist.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::{MemoryStore, StoreError};
    use crate::sim::config::GameKind;
    use glam::Vec2;

    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn get_best(&self, _game_id: &str) -> Result<Option<u64>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn set_best(&mut self, _game_id: &str, _score: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    fn run() -> RunState {
        RunState::new(GameKind::Platformer, Vec2::new(800.0, 600.0), 3, 1)
    }

    #[test]
    fn test_award_updates_score_and_session_best() {
        let store = MemoryStore::new();
        let mut keeper = ScoreKeeper::load("g", &store);
        let mut state = run();
        let mut events = Vec::new();

        keeper.award(&mut state, ScoreEvent::CollectiblePicked { points: 10 }, &mut events);
        keeper.award(&mut state, ScoreEvent::LevelBonus { points: 100 }, &mut events);

        assert_eq!(state.score, 110);
        assert_eq!(keeper.session_best(), 110);
        assert!(events.contains(&GameEvent::ScoreChanged { score: 10 }));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 110 }));
    }

    #[test]
    fn test_new_record_signaled_once_per_run() {
        let mut store = MemoryStore::new();
        store.set_best("g", 15).unwrap();
        let mut keeper = ScoreKeeper::load("g", &store);
        let mut state = run();
        let mut events = Vec::new();

        for _ in 0..4 {
            keeper.award(&mut state, ScoreEvent::ObstaclePassed { points: 10 }, &mut events);
        }
        let records: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::NewRecord { .. }))
            .collect();
        // Crossing happened at 20, not at 10, and only once
        assert_eq!(records, vec![&GameEvent::NewRecord { score: 20 }]);
        assert_eq!(keeper.all_time_best(), 40);

        keeper.begin_run();
        let mut state = run();
        events.clear();
        keeper.award(&mut state, ScoreEvent::ObstaclePassed { points: 10 }, &mut events);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::NewRecord { .. })));
    }

    #[test]
    fn test_persist_is_deferred_until_flush() {
        let mut store = MemoryStore::new();
        let mut keeper = ScoreKeeper::load("g", &store);
        let mut state = run();
        let mut events = Vec::new();

        keeper.award(&mut state, ScoreEvent::CollectiblePicked { points: 5 }, &mut events);
        keeper.award(&mut state, ScoreEvent::CollectiblePicked { points: 5 }, &mut events);
        assert!(keeper.has_pending());
        assert_eq!(store.get_best("g").unwrap(), None);

        keeper.flush(&mut store);
        assert_eq!(store.get_best("g").unwrap(), Some(10));
        assert!(!keeper.has_pending());
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let mut store = BrokenStore;
        let mut keeper = ScoreKeeper::load("g", &store);
        assert_eq!(keeper.all_time_best(), 0);

        let mut state = run();
        let mut events = Vec::new();
        keeper.award(&mut state, ScoreEvent::CollectiblePicked { points: 7 }, &mut events);
        keeper.flush(&mut store);
        // Session tracking still works
        assert_eq!(keeper.all_time_best(), 7);
        assert_eq!(keeper.best(), 7);
    }
}
