//! Arcade Sim entry point
//!
//! Native: runs both game kinds headless with a tiny autopilot and logs the
//! outcome. The web build is a library driven from JS (`platform::web`).

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use arcade_sim::consts::SIM_DT;
    use arcade_sim::platform::FrameClock;
    use arcade_sim::sim::{
        EntityKind, GameKind, GameObserver, GamePhase, InputEvent, Key, ObstacleRole,
        Simulation, resolve,
    };
    use arcade_sim::{MemoryStore, Tuning};

    /// Simulated seconds before the demo gives up on a run
    const MAX_SECONDS: f32 = 120.0;

    struct LogObserver;

    impl GameObserver for LogObserver {
        fn on_play_recorded(&mut self) {
            log::info!("play recorded");
        }

        fn on_new_record(&mut self, score: u64) {
            log::info!("new record: {}", score);
        }

        fn on_game_over(&mut self, final_score: u64, best_score: u64) {
            log::info!("game over: score {}, best {}", final_score, best_score);
        }
    }

    /// Flap whenever the bird sinks below the next gap's center
    fn flappy_pilot(sim: &Simulation) -> Option<InputEvent> {
        let state = sim.state();
        let bird = state.player_body()?;
        let target = state
            .entities
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    EntityKind::Obstacle {
                        role: ObstacleRole::Barrier {
                            scores_on_pass: true
                        },
                        scored: false,
                    }
                )
            })
            .map(|e| e.body.aabb())
            .filter(|b| b.right() >= bird.pos.x)
            .min_by(|a, b| a.left().total_cmp(&b.left()))
            .map(|top| top.bottom() + sim.tuning().barrier_gap * 0.5)
            .unwrap_or(state.world_size.y * 0.5);

        (bird.vel.y > 0.0 && bird.center().y > target).then_some(InputEvent::PointerDown)
    }

    /// Run right, hop every second
    fn platformer_pilot(sim: &Simulation) -> Option<InputEvent> {
        let ticks = sim.state().time_ticks;
        (ticks % 60 == 0).then_some(InputEvent::KeyDown(Key::Space))
    }

    pub fn play(kind: GameKind, seed: u64) {
        let template = serde_json::json!({ "kind": kind.as_str() });
        let resolved = resolve(&template, None);
        for issue in &resolved.issues {
            log::warn!("{}: {}", issue.path, issue.message);
        }

        let mut sim = Simulation::new(
            kind.as_str(),
            resolved.config,
            Tuning::default(),
            Box::new(MemoryStore::new()),
            seed,
        );
        sim.set_observer(Box::new(LogObserver));

        if kind == GameKind::Platformer {
            sim.push_input(InputEvent::KeyDown(Key::ArrowRight));
        }
        sim.push_input(InputEvent::PointerDown);

        // Pretend to be a 60 Hz display with slightly uneven frames
        let mut clock = FrameClock::new();
        let mut elapsed = 0.0;
        let mut frame = 0u32;
        while elapsed < MAX_SECONDS && !sim.phase().is_terminal() {
            let dt = if frame % 10 == 0 { SIM_DT * 1.5 } else { SIM_DT };
            frame += 1;
            elapsed += dt;

            for _ in 0..clock.advance(dt) {
                let input = match kind {
                    GameKind::AutoScroller => flappy_pilot(&sim),
                    GameKind::Platformer => platformer_pilot(&sim),
                };
                if let Some(event) = input {
                    sim.push_input(event);
                }
                sim.tick(SIM_DT);
            }
        }

        let state = sim.state();
        log::info!(
            "{} finished after {:.1}s: phase {:?}, score {}, level {}, lives {}",
            kind.as_str(),
            elapsed,
            state.phase,
            state.score,
            state.level,
            state.lives
        );
        if state.phase == GamePhase::Playing {
            log::info!("{} still running when the demo stopped", kind.as_str());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Arcade Sim (native) starting...");
    log::info!("The browser build is driven from JS; this runs a headless demo");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    demo::play(arcade_sim::GameKind::AutoScroller, seed);
    demo::play(arcade_sim::GameKind::Platformer, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::init, this is just to satisfy the compiler
}
