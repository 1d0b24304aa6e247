//! Fixed timestep simulation tick
//!
//! Within a tick the order never changes: input, physics, collision,
//! spawn/retire, AI, score, lifecycle check. Persistence and observer
//! callbacks run after the tick has finished.

use glam::Vec2;

use super::ai;
use super::collision::{Contact, HazardOutcome, resolve_contacts};
use super::config::GameKind;
use super::input::TickInput;
use super::lifecycle::Simulation;
use super::score::ScoreEvent;
use super::state::{GamePhase, RunState};
use super::timer::TimerKind;
use crate::consts::*;

/// What the collision and bounds checks decided for the run this tick
#[derive(Debug, Default)]
struct Outcome {
    terminal: bool,
    hit: bool,
    fell: bool,
}

impl Simulation {
    /// Advance by one step of `dt` seconds (clamped to [`MAX_FRAME_DT`])
    pub fn tick(&mut self, dt: f32) -> &RunState {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        // Input is routed against the phase the tick starts in
        let input = self.input.route(self.state.kind, self.state.phase);

        match self.state.phase {
            GamePhase::Waiting => {
                // No gravity before the first input; the impulse integrates next tick
                if input.primary {
                    self.start_run();
                }
            }
            GamePhase::Playing => self.step(&input, dt),
            GamePhase::GameOver | GamePhase::Won => {
                if input.restart {
                    self.restart();
                }
            }
        }

        self.finish_tick();
        &self.state
    }

    fn step(&mut self, input: &TickInput, dt: f32) {
        self.state.time_ticks += 1;

        // The world holds still between levels; only the clock runs
        if self.state.level_transition {
            self.run_timers(dt);
            return;
        }
        self.state.invincible = (self.state.invincible - dt).max(0.0);

        self.apply_input(input);
        self.integrate(dt);

        let mut outcome = Outcome::default();
        let mut scoring = Vec::new();
        for contact in resolve_contacts(&mut self.state, self.policy) {
            match contact {
                Contact::Collected { points, .. } => {
                    scoring.push(ScoreEvent::CollectiblePicked { points })
                }
                Contact::Hazard { .. } => match self.policy.hazard_outcome() {
                    HazardOutcome::Terminal => outcome.terminal = true,
                    HazardOutcome::LoseLife => outcome.hit = true,
                },
                Contact::Solid { .. } => {}
            }
        }

        self.director.retire(&mut self.state);
        self.run_timers(dt);
        let passed = self.director.score_passes(&mut self.state);
        scoring.extend((0..passed).map(|_| ScoreEvent::ObstaclePassed {
            points: self.tuning.pass_points,
        }));

        if self.state.kind == GameKind::Platformer {
            ai::update_enemies(&mut self.state);
        }

        for event in scoring {
            self.keeper.award(&mut self.state, event, &mut self.events);
        }

        self.check_bounds(&mut outcome);
        if outcome.terminal {
            self.enter_terminal(false);
        } else if outcome.hit {
            self.lose_life(false);
        } else if outcome.fell {
            self.lose_life(true);
        }

        if self.state.kind == GameKind::Platformer && self.state.remaining_collectibles() == 0 {
            self.complete_level();
        }

        self.state.normalize_order();
        if self.state.phase == GamePhase::Playing {
            if let Err(violation) = self.state.check_invariants() {
                self.fail_run(violation);
            }
        }
    }

    /// Advance timers and act on the ones that fire
    fn run_timers(&mut self, dt: f32) {
        for fired in self.timers.advance(dt) {
            match fired {
                TimerKind::SpawnBarrier => self.director.spawn_barrier_pair(&mut self.state),
                TimerKind::LevelAdvance => self.advance_level(),
            }
        }
    }

    /// Flap, jump and walk
    fn apply_input(&mut self, input: &TickInput) {
        let kind = self.state.kind;
        let speed = self.config.player.speed;
        let impulse = self.config.player.jump_force;
        let Some(player) = self.state.player_mut() else {
            return;
        };
        let body = &mut player.body;

        match kind {
            GameKind::AutoScroller => {
                if input.primary {
                    body.vel.y = impulse;
                }
            }
            GameKind::Platformer => {
                body.vel.x = input.move_dir * speed;
                if input.primary && body.grounded {
                    body.vel.y = impulse;
                    body.grounded = false;
                }
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        let max_speed = Vec2::new(self.tuning.max_speed_x, self.tuning.max_speed_y);
        for entity in self.state.entities.iter_mut() {
            entity.body.integrate(gravity, dt, max_speed);
        }

        // Platformer player stays inside the world horizontally
        if self.state.kind == GameKind::Platformer {
            let width = self.state.world_size.x;
            if let Some(player) = self.state.player_mut() {
                let body = &mut player.body;
                let max_x = (width - body.size.x).max(0.0);
                if body.pos.x < 0.0 || body.pos.x > max_x {
                    body.pos.x = body.pos.x.clamp(0.0, max_x);
                    body.vel.x = 0.0;
                }
            }
        }
    }

    fn check_bounds(&self, outcome: &mut Outcome) {
        let Some(player) = self.state.player_body() else {
            return;
        };
        let bounds = player.aabb();
        let height = self.state.world_size.y;
        match self.state.kind {
            GameKind::AutoScroller => {
                if bounds.top() < 0.0 || bounds.bottom() > height {
                    outcome.terminal = true;
                }
            }
            GameKind::Platformer => {
                if bounds.top() > height {
                    outcome.fell = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryStore;
    use crate::sim::config::resolve;
    use crate::sim::input::{InputEvent, Key};
    use crate::sim::state::GameEvent;
    use crate::tuning::Tuning;
    use proptest::prelude::*;
    use serde_json::json;

    fn sim(template: serde_json::Value, seed: u64) -> Simulation {
        let config = resolve(&template, None).config;
        Simulation::new("tick", config, Tuning::default(), Box::new(MemoryStore::new()), seed)
    }

    fn cancel_start_jump(sim: &mut Simulation) {
        if let Some(player) = sim.state.player_mut() {
            player.body.vel.y = 0.0;
        }
    }

    fn run_ticks(sim: &mut Simulation, n: usize) {
        for _ in 0..n {
            sim.tick(SIM_DT);
        }
    }

    #[test]
    fn test_waiting_ignores_gravity_until_flap() {
        let mut sim = sim(json!({"kind": "flappy", "gravity": 800, "player": {"flapForce": -250}}), 1);
        let start = sim.state().player_body().unwrap();
        run_ticks(&mut sim, 120);
        assert_eq!(sim.phase(), GamePhase::Waiting);
        assert_eq!(sim.state().player_body().unwrap(), start);

        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        assert_eq!(sim.phase(), GamePhase::Playing);
        assert_eq!(sim.state().player_body().unwrap().vel.y, -250.0);
    }

    #[test]
    fn test_falling_bird_hits_the_floor() {
        let mut sim = sim(json!({"kind": "flappy"}), 2);
        sim.push_input(InputEvent::KeyDown(Key::Space));
        run_ticks(&mut sim, 60 * 5);
        assert_eq!(sim.phase(), GamePhase::GameOver);

        let overs = sim
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
        assert_eq!(sim.active_timers(), 0);
    }

    #[test]
    fn test_passing_barriers_scores() {
        // Zero gravity keeps the bird in the gap center band forever
        let mut sim = sim(json!({"kind": "flappy", "gravity": 0, "player": {"flapForce": -50}}), 3);
        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        // Only the first pair; park the bird in its gap
        sim.timers.cancel_all();
        if let Some(player) = sim.state.player_mut() {
            player.body.vel.y = 0.0;
            player.body.pos.y = 300.0 - player.body.size.y * 0.5;
        }
        for entity in sim.state.entities.iter_mut().filter(|e| !e.is_player()) {
            entity.body.pos.y = if entity.body.pos.y == 0.0 { -10_000.0 } else { 10_000.0 };
        }
        run_ticks(&mut sim, 60 * 6);
        assert_eq!(sim.phase(), GamePhase::Playing);
        assert_eq!(sim.state().score, 1);
    }

    #[test]
    fn test_timed_barriers_spawn_after_physics() {
        let mut sim = sim(json!({"kind": "flappy", "gravity": 0, "player": {"flapForce": -20}}), 9);
        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        sim.state.entities.retain(|e| e.is_player());
        sim.timers.cancel_all();
        sim.timers.every(TimerKind::SpawnBarrier, sim.tuning.barrier_interval);

        let limit = (sim.tuning().barrier_interval / SIM_DT).ceil() as usize + 2;
        for _ in 0..limit {
            sim.tick(SIM_DT);
            if sim.state().entities.len() > 1 {
                break;
            }
        }
        let barriers: Vec<_> = sim.state().entities.iter().filter(|e| !e.is_player()).collect();
        assert_eq!(barriers.len(), 2);
        // Not yet scrolled: the pair arrived in the spawn slot, after integration
        let width = sim.state().world_size.x;
        assert!(barriers.iter().all(|e| e.body.pos.x == width));
    }

    #[test]
    fn test_platformer_player_lands_and_jumps() {
        let mut sim = sim(json!({"kind": "platformer", "enemies": [{"x": 700, "y": 536, "detectionRange": 1}]}), 4);
        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        cancel_start_jump(&mut sim);

        sim.push_input(InputEvent::KeyDown(Key::ArrowRight));
        run_ticks(&mut sim, 90);

        let player = sim.state().player_body().unwrap();
        assert!(player.grounded);
        assert_eq!(player.vel.y, 0.0);
        assert!(player.pos.x > sim.state().spawn_point.x);

        sim.push_input(InputEvent::KeyDown(Key::Space));
        sim.tick(SIM_DT);
        assert!(sim.state().player_body().unwrap().vel.y < 0.0);
    }

    #[test]
    fn test_collectible_scores_once() {
        let mut sim = sim(
            json!({
                "kind": "platformer",
                "world": {"platforms": [
                    {"x": 230, "y": 440, "width": 200, "height": 20},
                    {"x": 0, "y": 568, "width": 800, "height": 32}
                ]},
                "enemies": [{"x": 700, "y": 536, "detectionRange": 1}],
                "collectibles": [{"x": 250, "y": 400, "points": 10}, {"x": 700, "y": 500, "points": 10}]
            }),
            5,
        );
        sim.push_input(InputEvent::KeyDown(Key::Space));
        sim.tick(SIM_DT);
        sim.tick(SIM_DT);
        assert_eq!(sim.state().score, 10);
        assert_eq!(sim.state().remaining_collectibles(), 1);

        sim.tick(SIM_DT);
        assert_eq!(sim.state().score, 10);
    }

    #[test]
    fn test_level_transition_freezes_world() {
        let mut sim = sim(
            json!({
                "kind": "platformer",
                "maxLevels": 5,
                "world": {"platforms": [{"x": 0, "y": 568, "width": 800, "height": 32}]},
                "enemies": [{"x": 700, "y": 536, "detectionRange": 1}],
                "collectibles": [{"x": 10, "y": 530, "points": 10}]
            }),
            6,
        );
        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        sim.tick(SIM_DT);
        assert!(sim.state().level_transition);
        assert_eq!(sim.state().score, 10 + sim.tuning().level_bonus);

        let frozen = sim.state().player_body().unwrap();
        sim.tick(SIM_DT);
        assert_eq!(sim.state().player_body().unwrap().pos, frozen.pos);

        let delay_ticks = (sim.tuning().level_transition / SIM_DT).ceil() as usize;
        run_ticks(&mut sim, delay_ticks + 1);
        assert_eq!(sim.state().level, 2);
        assert_eq!(sim.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_enemy_hit_costs_life_then_invincible() {
        let mut sim = sim(
            json!({
                "kind": "platformer",
                "lives": 3,
                "world": {"platforms": [{"x": 0, "y": 568, "width": 800, "height": 32}]},
                "enemies": [{"x": 60, "y": 536, "speed": 10, "patrolLeft": 60, "patrolRight": 60}],
                "collectibles": [{"x": 700, "y": 500, "points": 10}]
            }),
            7,
        );
        sim.push_input(InputEvent::PointerDown);
        sim.tick(SIM_DT);
        cancel_start_jump(&mut sim);

        // Walk into the enemy standing next to the spawn point
        sim.push_input(InputEvent::KeyDown(Key::ArrowRight));
        run_ticks(&mut sim, 60);

        let lives = sim.state().lives;
        assert_eq!(lives, 2);
        assert!(sim.state().invincible > 0.0);
        assert_eq!(sim.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_fall_respawns() {
        let mut sim = sim(
            json!({
                "kind": "platformer",
                "world": {"platforms": [{"x": 0, "y": 400, "width": 100, "height": 20}]},
                "enemies": [{"x": 700, "y": 100, "detectionRange": 1}],
                "collectibles": [{"x": 700, "y": 50, "points": 10}]
            }),
            8,
        );
        sim.push_input(InputEvent::KeyDown(Key::ArrowRight));
        sim.push_input(InputEvent::KeyDown(Key::Space));
        sim.tick(SIM_DT);
        run_ticks(&mut sim, 60 * 4);

        assert!(sim.drain_events().contains(&GameEvent::LifeLost { lives: 2 }));
    }

    #[test]
    fn test_same_seed_same_run() {
        let script = |seed| {
            let mut sim = sim(json!({"kind": "flappy"}), seed);
            for i in 0..600 {
                if i % 25 == 0 {
                    sim.push_input(InputEvent::PointerDown);
                }
                sim.tick(SIM_DT);
            }
            serde_json::to_string(sim.state()).unwrap()
        };
        assert_eq!(script(11), script(11));
    }

    proptest! {
        #[test]
        fn prop_restart_round_trip(seed in any::<u64>(), ticks in 1usize..400, platformer in any::<bool>()) {
            let kind = if platformer { "platformer" } else { "flappy" };
            let mut sim = sim(json!({"kind": kind, "lives": 4}), seed);
            sim.push_input(InputEvent::PointerDown);
            run_ticks(&mut sim, ticks);
            sim.enter_terminal(false);
            let best = sim.scores().all_time_best();

            sim.push_input(InputEvent::KeyDown(Key::R));
            sim.tick(SIM_DT);

            let state = sim.state();
            prop_assert_eq!(state.phase, GamePhase::Waiting);
            prop_assert_eq!(state.score, 0);
            prop_assert_eq!(state.level, 1);
            prop_assert_eq!(state.lives, 4);
            prop_assert_eq!(sim.scores().all_time_best(), best);
            prop_assert_eq!(sim.active_timers(), 0);
        }
    }
}
