//! Game lifecycle
//!
//! [`Simulation`] owns everything one game needs: the resolved config, the
//! current [`RunState`], best-score bookkeeping, timers and queued input.
//! Phase transitions live here; the per-tick pipeline is in `tick.rs`.
//!
//! ```text
//! Waiting --primary--> Playing --hit/fall/out of bounds--> GameOver --restart--> Waiting
//!                         |  \--last level cleared--> Won ------restart------^
//!                         \--level cleared--> (freeze, bonus) --LevelAdvance--> Playing
//! ```

use super::collision::CollisionPolicy;
use super::config::GameConfig;
use super::input::{InputEvent, InputRouter};
use super::score::{ScoreEvent, ScoreKeeper};
use super::spawn::SpawnDirector;
use super::state::{GameEvent, GamePhase, InvariantViolation, RunState};
use super::timer::{TimerHandle, TimerKind, Timers};
use crate::highscores::ScoreStore;
use crate::tuning::Tuning;

/// Events kept for the host between drains; older ones are dropped first
const MAX_BUFFERED_EVENTS: usize = 1024;

/// Host callbacks, invoked after each tick in event order
pub trait GameObserver {
    /// Every score change
    fn on_score_update(&mut self, _score: u64) {}

    /// Exactly once per run, on entering GameOver or Won
    fn on_game_over(&mut self, _final_score: u64, _best_score: u64) {}

    /// Once per run, on the first Waiting -> Playing transition
    fn on_play_recorded(&mut self) {}

    /// The run's score beat the stored all-time best (once per run)
    fn on_new_record(&mut self, _score: u64) {}
}

/// One playable game: config plus the current run
pub struct Simulation {
    pub(crate) config: GameConfig,
    pub(crate) tuning: Tuning,
    pub(crate) policy: CollisionPolicy,
    pub(crate) director: SpawnDirector,
    pub(crate) state: RunState,
    pub(crate) keeper: ScoreKeeper,
    pub(crate) store: Box<dyn ScoreStore>,
    pub(crate) timers: Timers,
    /// Pending banner delay while a level is complete
    level_advance: Option<TimerHandle>,
    pub(crate) input: InputRouter,
    pub(crate) events: Vec<GameEvent>,
    /// Events before this index have been handed to the observer
    dispatched: usize,
    observer: Option<Box<dyn GameObserver>>,
    seed: u64,
    run_index: u64,
}

impl Simulation {
    /// Build the first run in Waiting
    ///
    /// A run that fails its invariants straight away goes directly to a
    /// degraded GameOver instead of refusing to construct.
    pub fn new(
        game_id: &str,
        config: GameConfig,
        tuning: Tuning,
        store: Box<dyn ScoreStore>,
        seed: u64,
    ) -> Self {
        let tuning = tuning.sanitized();
        let director = SpawnDirector::new(&config, &tuning);
        let keeper = ScoreKeeper::load(game_id, store.as_ref());
        let state = director.build_run(config.starting_lives, run_seed(seed, 0));

        log::info!(
            "Game '{}' ({}) ready: {}x{}, best {}",
            game_id,
            config.kind.as_str(),
            config.world_width,
            config.world_height,
            keeper.all_time_best()
        );

        let mut sim = Self {
            policy: CollisionPolicy::for_kind(config.kind),
            config,
            tuning,
            director,
            state,
            keeper,
            store,
            timers: Timers::new(),
            level_advance: None,
            input: InputRouter::new(),
            events: Vec::new(),
            dispatched: 0,
            observer: None,
            seed,
            run_index: 0,
        };
        sim.verify_run();
        sim
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn scores(&self) -> &ScoreKeeper {
        &self.keeper
    }

    /// Number of live timers (zero outside Playing)
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Install the observer; events it has not seen yet go out on the next tick
    pub fn set_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observer = Some(observer);
    }

    /// Queue a raw input event for the next tick
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Take every buffered event, after the observer has seen them
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.dispatch();
        self.dispatched = 0;
        std::mem::take(&mut self.events)
    }

    /// Discard the current run and build a fresh one in Waiting
    ///
    /// Only the all-time and session bests survive.
    pub fn restart(&mut self) {
        self.timers.cancel_all();
        self.level_advance = None;
        self.input.reset();
        self.run_index += 1;
        self.state = self
            .director
            .build_run(self.config.starting_lives, run_seed(self.seed, self.run_index));
        self.keeper.begin_run();
        log::info!("Run {} ready", self.run_index + 1);
        self.verify_run();
    }

    /// Debug: jump straight to `level` (platformer), keeping score and lives
    pub fn skip_to_level(&mut self, level: u32) {
        if self.state.phase.is_terminal() {
            return;
        }
        self.state.level = level.clamp(1, self.config.max_levels);
        self.state.level_transition = false;
        // Spawn timers keep running; only a pending level advance is stale
        if let Some(handle) = self.level_advance.take() {
            self.timers.cancel(handle);
        }
        self.director.populate_level(&mut self.state);
        self.respawn_player();
        log::info!("Skipped to level {}", self.state.level);
    }

    /// Waiting -> Playing
    pub(crate) fn start_run(&mut self) {
        if self.state.phase != GamePhase::Waiting {
            return;
        }
        self.state.phase = GamePhase::Playing;
        self.state.show_instructions = false;

        let impulse = self.config.player.jump_force;
        if let Some(player) = self.state.player_mut() {
            player.body.vel.y = impulse;
            player.body.grounded = false;
        }

        self.start_timers();
        if self.director.procedural_barriers() {
            self.director.spawn_barrier_pair(&mut self.state);
        }
        self.events.push(GameEvent::PlayRecorded);
        log::info!("Run {} started", self.run_index + 1);
    }

    fn start_timers(&mut self) {
        if self.director.procedural_barriers() {
            self.timers
                .every(TimerKind::SpawnBarrier, self.tuning.barrier_interval);
        }
    }

    /// Playing -> GameOver | Won; a no-op from any other phase
    pub(crate) fn enter_terminal(&mut self, won: bool) {
        if self.state.phase != GamePhase::Playing {
            return;
        }
        self.finish(won);
    }

    fn finish(&mut self, won: bool) {
        self.state.phase = if won { GamePhase::Won } else { GamePhase::GameOver };
        self.state.level_transition = false;
        self.level_advance = None;
        let canceled = self.timers.cancel_all();
        for entity in self.state.entities.iter_mut() {
            entity.body.freeze();
        }

        let final_score = self.state.score;
        let best_score = self.keeper.best();
        self.events.push(GameEvent::GameOver {
            final_score,
            best_score,
            won,
        });
        log::info!(
            "Run {} {}: score {}, best {} ({} timers canceled)",
            self.run_index + 1,
            if won { "won" } else { "over" },
            final_score,
            best_score,
            canceled
        );
    }

    /// Force a degraded GameOver from Waiting or Playing
    pub(crate) fn fail_run(&mut self, violation: InvariantViolation) {
        if self.state.phase.is_terminal() {
            return;
        }
        log::warn!("Run {} aborted: {}", self.run_index + 1, violation);
        self.state.degraded = Some(violation.to_string());
        self.state.score = 0;
        self.finish(false);
    }

    fn verify_run(&mut self) {
        if let Err(violation) = self.state.check_invariants() {
            self.fail_run(violation);
        }
    }

    /// Take a non-terminal hit; the run ends when the last life goes
    pub(crate) fn lose_life(&mut self, respawn: bool) {
        self.state.lives = self.state.lives.saturating_sub(1);
        self.events.push(GameEvent::LifeLost {
            lives: self.state.lives,
        });
        if self.state.lives == 0 {
            self.enter_terminal(false);
            return;
        }
        self.state.invincible = self.tuning.invincibility;
        if respawn {
            self.respawn_player();
        }
        log::debug!("Life lost, {} left", self.state.lives);
    }

    fn respawn_player(&mut self) {
        let spawn = self.state.spawn_point;
        if let Some(player) = self.state.player_mut() {
            player.body.place(spawn);
            player.body.freeze();
            player.body.grounded = false;
        }
    }

    /// Coins cleared: win on the last level, otherwise bank the bonus and
    /// hold the world still until the LevelAdvance timer fires
    pub(crate) fn complete_level(&mut self) {
        if self.state.phase != GamePhase::Playing || self.state.level_transition {
            return;
        }
        let level = self.state.level;
        if level >= self.config.max_levels {
            self.enter_terminal(true);
            return;
        }

        let bonus = self.tuning.level_bonus;
        self.keeper.award(
            &mut self.state,
            ScoreEvent::LevelBonus { points: bonus },
            &mut self.events,
        );
        self.events.push(GameEvent::LevelComplete { level, bonus });
        self.state.level_transition = true;
        if let Some(player) = self.state.player_mut() {
            player.body.freeze();
        }
        self.level_advance = Some(
            self.timers
                .once(TimerKind::LevelAdvance, self.tuning.level_transition),
        );
        log::info!("Level {} complete, bonus {}", level, bonus);
    }

    /// Build the next level after the display delay
    pub(crate) fn advance_level(&mut self) {
        if self.state.phase != GamePhase::Playing || !self.state.level_transition {
            return;
        }
        self.state.level += 1;
        self.state.level_transition = false;
        self.level_advance = None;
        self.director.populate_level(&mut self.state);
        self.respawn_player();
        self.events.push(GameEvent::LevelStarted {
            level: self.state.level,
        });
        log::info!("Level {} started", self.state.level);
    }

    /// Write deferred scores and hand pending events to the observer
    pub(crate) fn finish_tick(&mut self) {
        self.keeper.flush(self.store.as_mut());
        self.dispatch();

        if self.events.len() > MAX_BUFFERED_EVENTS {
            let excess = self.events.len() - MAX_BUFFERED_EVENTS;
            self.events.drain(..excess);
            self.dispatched -= excess;
        }
    }

    /// Everything pushed since the last dispatch, including events raised
    /// outside a tick (a degraded run from `new` or `restart`)
    fn dispatch(&mut self) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        for event in &self.events[self.dispatched..] {
            match *event {
                GameEvent::PlayRecorded => observer.on_play_recorded(),
                GameEvent::ScoreChanged { score } => observer.on_score_update(score),
                GameEvent::NewRecord { score } => observer.on_new_record(score),
                GameEvent::GameOver {
                    final_score,
                    best_score,
                    ..
                } => observer.on_game_over(final_score, best_score),
                _ => {}
            }
        }
        self.dispatched = self.events.len();
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        let canceled = self.timers.cancel_all();
        self.keeper.flush(self.store.as_mut());
        if canceled > 0 {
            log::debug!("Simulation dropped with {} live timers", canceled);
        }
    }
}

/// Per-run RNG seed: same simulation seed and run index, same run
fn run_seed(seed: u64, run_index: u64) -> u64 {
    seed ^ run_index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryStore;
    use crate::sim::config::resolve;
    use crate::sim::input::Key;
    use serde_json::json;

    fn sim(template: serde_json::Value) -> Simulation {
        let config = resolve(&template, None).config;
        Simulation::new("test", config, Tuning::default(), Box::new(MemoryStore::new()), 9)
    }

    #[test]
    fn test_starts_waiting_without_timers() {
        let sim = sim(json!({"kind": "flappy"}));
        assert_eq!(sim.phase(), GamePhase::Waiting);
        assert_eq!(sim.active_timers(), 0);
        assert!(sim.state().show_instructions);
    }

    #[test]
    fn test_start_run_arms_spawn_timer() {
        let mut sim = sim(json!({"kind": "flappy"}));
        sim.start_run();
        assert_eq!(sim.phase(), GamePhase::Playing);
        assert_eq!(sim.active_timers(), 1);
        assert!(!sim.state().show_instructions);
        // First pair is spawned immediately
        assert_eq!(sim.state().entities.len(), 3);
        assert_eq!(sim.drain_events(), vec![GameEvent::PlayRecorded]);
    }

    #[test]
    fn test_terminal_entry_is_not_reentrant() {
        let mut sim = sim(json!({"kind": "flappy"}));
        sim.start_run();
        sim.drain_events();

        sim.enter_terminal(false);
        sim.enter_terminal(false);
        sim.enter_terminal(true);

        let overs: Vec<_> = sim
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .collect();
        assert_eq!(overs.len(), 1);
        assert_eq!(sim.phase(), GamePhase::GameOver);
        assert_eq!(sim.active_timers(), 0);
        assert!(sim.state().entities.iter().all(|e| e.body.vel == glam::Vec2::ZERO));
    }

    #[test]
    fn test_lives_run_out() {
        let mut sim = sim(json!({"kind": "platformer", "lives": 2}));
        sim.start_run();
        sim.lose_life(false);
        assert_eq!(sim.phase(), GamePhase::Playing);
        assert_eq!(sim.state().invincible, sim.tuning().invincibility);
        sim.lose_life(true);
        assert_eq!(sim.state().lives, 0);
        assert_eq!(sim.phase(), GamePhase::GameOver);
    }

    #[test]
    fn test_level_complete_then_advance() {
        let mut sim = sim(json!({"kind": "platformer", "maxLevels": 3}));
        sim.start_run();
        sim.complete_level();
        assert!(sim.state().level_transition);
        assert_eq!(sim.state().score, sim.tuning().level_bonus);
        assert_eq!(sim.active_timers(), 1);

        // A second completion while frozen changes nothing
        sim.complete_level();
        assert_eq!(sim.state().score, sim.tuning().level_bonus);

        sim.advance_level();
        assert_eq!(sim.state().level, 2);
        assert!(!sim.state().level_transition);
        let player = sim.state().player_body().unwrap();
        assert_eq!(player.pos, sim.state().spawn_point);
    }

    #[test]
    fn test_skip_during_transition_drops_pending_advance() {
        let mut sim = sim(json!({"kind": "platformer", "maxLevels": 5}));
        sim.start_run();
        sim.complete_level();
        assert_eq!(sim.active_timers(), 1);

        sim.skip_to_level(4);
        assert_eq!(sim.state().level, 4);
        assert!(!sim.state().level_transition);
        assert_eq!(sim.active_timers(), 0);
        assert!(sim.level_advance.is_none());
    }

    #[test]
    fn test_skip_keeps_barrier_timer() {
        let mut sim = sim(json!({"kind": "flappy"}));
        sim.start_run();
        sim.skip_to_level(2);
        assert_eq!(sim.active_timers(), 1);
    }

    #[test]
    fn test_restart_builds_fresh_run() {
        let mut sim = sim(json!({"kind": "platformer"}));
        sim.start_run();
        sim.complete_level();
        sim.enter_terminal(false);

        sim.push_input(InputEvent::KeyDown(Key::ArrowLeft));
        sim.restart();
        let state = sim.state();
        assert_eq!(state.phase, GamePhase::Waiting);
        assert_eq!((state.score, state.level, state.lives), (0, 1, 3));
        assert_eq!(sim.input.pending(), 0);
        assert_eq!(sim.scores().all_time_best(), sim.tuning().level_bonus);
    }

    #[test]
    fn test_corrupt_run_fails_degraded() {
        let mut sim = sim(json!({"kind": "platformer"}));
        sim.start_run();
        sim.state.score = 40;
        sim.state.entities.retain(|e| !e.is_platform());
        sim.verify_run();

        assert_eq!(sim.phase(), GamePhase::GameOver);
        assert_eq!(sim.state().score, 0);
        assert!(sim.state().degraded.is_some());
    }

    #[test]
    fn test_game_over_raised_outside_a_tick_reaches_observer() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Overs(Rc<RefCell<Vec<(u64, u64)>>>);
        impl GameObserver for Overs {
            fn on_game_over(&mut self, final_score: u64, best_score: u64) {
                self.0.borrow_mut().push((final_score, best_score));
            }
        }

        let mut sim = sim(json!({"kind": "platformer"}));
        sim.state.entities.retain(|e| !e.is_platform());
        sim.verify_run();
        assert_eq!(sim.phase(), GamePhase::GameOver);

        // Observer arrives after the degraded run was already over
        let overs = Rc::new(RefCell::new(Vec::new()));
        sim.set_observer(Box::new(Overs(overs.clone())));
        sim.tick(crate::consts::SIM_DT);
        sim.tick(crate::consts::SIM_DT);
        assert_eq!(*overs.borrow(), vec![(0, 0)]);

        sim.drain_events();
        sim.tick(crate::consts::SIM_DT);
        assert_eq!(overs.borrow().len(), 1);
    }

    #[test]
    fn test_drop_flushes_pending_best() {
        use crate::highscores::{BestScores, StoreError};
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Shared(Rc<RefCell<BestScores>>);
        impl ScoreStore for Shared {
            fn get_best(&self, game_id: &str) -> Result<Option<u64>, StoreError> {
                Ok(self.0.borrow().best(game_id))
            }
            fn set_best(&mut self, game_id: &str, score: u64) -> Result<(), StoreError> {
                self.0.borrow_mut().entries.insert(game_id.to_string(), score);
                Ok(())
            }
        }

        let table = Rc::new(RefCell::new(BestScores::new()));
        let config = resolve(&json!({"kind": "platformer"}), None).config;
        let mut sim = Simulation::new("g", config, Tuning::default(), Box::new(Shared(table.clone())), 1);
        sim.start_run();
        sim.complete_level();
        drop(sim);
        assert_eq!(table.borrow().best("g"), Some(Tuning::default().level_bonus));
    }
}
