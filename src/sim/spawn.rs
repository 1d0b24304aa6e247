//! Entity spawning, retirement and pass scoring
//!
//! Every entity kind comes either verbatim from the config or, when the config
//! leaves that list empty, from a procedural generator seeded by the run.

use glam::Vec2;
use rand::Rng;

use super::body::Body;
use super::config::{CollectibleSpec, EnemySpec, GameConfig, GameKind, RectSpec};
use super::state::{AiMode, Brain, EntityKind, ObstacleRole, RunState};
use crate::consts::*;
use crate::tuning::Tuning;

/// Builds runs and levels, and keeps the active set bounded
#[derive(Debug, Clone)]
pub struct SpawnDirector {
    kind: GameKind,
    world: Vec2,
    scroll_speed: f32,
    platforms: Vec<RectSpec>,
    enemies: Vec<EnemySpec>,
    collectibles: Vec<CollectibleSpec>,
    tuning: Tuning,
}

impl SpawnDirector {
    pub fn new(config: &GameConfig, tuning: &Tuning) -> Self {
        Self {
            kind: config.kind,
            world: Vec2::new(config.world_width, config.world_height),
            scroll_speed: config.world.scroll_speed,
            platforms: config.world.platforms.clone(),
            enemies: config.enemies.clone(),
            collectibles: config.collectibles.clone(),
            tuning: tuning.clone(),
        }
    }

    pub fn player_size(&self) -> Vec2 {
        let (w, h) = match self.kind {
            GameKind::AutoScroller => BIRD_SIZE,
            GameKind::Platformer => HERO_SIZE,
        };
        Vec2::new(w, h)
    }

    /// Where the player starts and respawns
    pub fn spawn_point(&self) -> Vec2 {
        let size = self.player_size();
        match self.kind {
            GameKind::AutoScroller => Vec2::new(self.world.x * 0.25, self.world.y * 0.4),
            GameKind::Platformer => match self.platforms.first() {
                Some(first) => Vec2::new(
                    (first.x + 8.0).min(self.world.x - size.x).max(0.0),
                    first.y - size.y,
                ),
                None => Vec2::new(40.0, self.world.y - GROUND_THICKNESS - size.y),
            },
        }
    }

    /// Barrier pairs come from the interval timer rather than the config
    pub fn procedural_barriers(&self) -> bool {
        self.kind == GameKind::AutoScroller && self.platforms.is_empty()
    }

    /// Build a fresh run in Waiting with the player and level 1 in place
    pub fn build_run(&self, lives: u32, seed: u64) -> RunState {
        let mut state = RunState::new(self.kind, self.world, lives, seed);
        state.spawn_point = self.spawn_point();
        let body = Body::new(state.spawn_point, self.player_size()).with_gravity();
        state.spawn(body, EntityKind::Player);
        self.populate_level(&mut state);
        state
    }

    /// Replace every non-player entity with the layout for `state.level`
    pub fn populate_level(&self, state: &mut RunState) {
        state.clear_level();
        match self.kind {
            GameKind::AutoScroller => {
                for rect in &self.platforms {
                    let body = Body::new(Vec2::new(rect.x, rect.y), Vec2::new(rect.width, rect.height))
                        .with_velocity(Vec2::new(-self.scroll_speed, 0.0));
                    state.spawn(
                        body,
                        EntityKind::Obstacle {
                            role: ObstacleRole::Barrier {
                                scores_on_pass: true,
                            },
                            scored: false,
                        },
                    );
                }
                for spec in &self.enemies {
                    // Flyers: no AI, they just cross the screen faster than the scroll
                    let body = Body::new(Vec2::new(spec.x, spec.y), ENEMY_SIZE.into())
                        .with_velocity(Vec2::new(-(self.scroll_speed + spec.speed), 0.0));
                    let brain = Brain {
                        chase_speed: spec.speed,
                        detection_range: 0.0,
                        patrol_left: spec.x,
                        patrol_right: spec.x,
                        direction: -1.0,
                        mode: AiMode::Patrol,
                    };
                    state.spawn(body, EntityKind::Enemy(brain));
                }
                for spec in &self.collectibles {
                    let body = Body::new(Vec2::new(spec.x, spec.y), COLLECTIBLE_SIZE.into())
                        .with_velocity(Vec2::new(-self.scroll_speed, 0.0));
                    state.spawn(
                        body,
                        EntityKind::Collectible {
                            points: spec.points,
                            collected: false,
                        },
                    );
                }
            }
            GameKind::Platformer => {
                let platforms = if self.platforms.is_empty() {
                    self.generate_platforms(state)
                } else {
                    self.platforms.clone()
                };
                for rect in &platforms {
                    state.spawn(
                        Body::new(Vec2::new(rect.x, rect.y), Vec2::new(rect.width, rect.height)),
                        EntityKind::Obstacle {
                            role: ObstacleRole::Platform,
                            scored: false,
                        },
                    );
                }

                let collectibles = if self.collectibles.is_empty() {
                    self.generate_collectibles(state.level, &platforms)
                } else {
                    self.collectibles.clone()
                };
                for spec in &collectibles {
                    state.spawn(
                        Body::new(Vec2::new(spec.x, spec.y), COLLECTIBLE_SIZE.into()),
                        EntityKind::Collectible {
                            points: spec.points,
                            collected: false,
                        },
                    );
                }

                if self.enemies.is_empty() {
                    for (body, brain) in self.generate_enemies(state.level, &platforms) {
                        state.spawn(body, EntityKind::Enemy(brain));
                    }
                } else {
                    for spec in &self.enemies {
                        let (body, brain) = self.configured_enemy(spec);
                        state.spawn(body, EntityKind::Enemy(brain));
                    }
                }
            }
        }

        log::debug!(
            "Level {} populated with {} entities",
            state.level,
            state.entities.len()
        );
    }

    /// Spawn a top/bottom barrier pair at the right edge with a random gap center
    pub fn spawn_barrier_pair(&self, state: &mut RunState) {
        let gap = self.tuning.barrier_gap.min(self.world.y * 0.8);
        let half = gap * 0.5;
        let lo = self.tuning.barrier_margin + half;
        let hi = self.world.y - self.tuning.barrier_margin - half;
        let center = if lo < hi {
            state.rng.random_range(lo..=hi)
        } else {
            self.world.y * 0.5
        };

        let x = self.world.x;
        let width = self.tuning.barrier_width;
        let vel = Vec2::new(-self.scroll_speed, 0.0);
        let top = Body::new(Vec2::new(x, 0.0), Vec2::new(width, (center - half).max(1.0)))
            .with_velocity(vel);
        let bottom_y = center + half;
        let bottom = Body::new(
            Vec2::new(x, bottom_y),
            Vec2::new(width, (self.world.y - bottom_y).max(1.0)),
        )
        .with_velocity(vel);

        // Only one half of the pair scores
        state.spawn(
            top,
            EntityKind::Obstacle {
                role: ObstacleRole::Barrier {
                    scores_on_pass: true,
                },
                scored: false,
            },
        );
        state.spawn(
            bottom,
            EntityKind::Obstacle {
                role: ObstacleRole::Barrier {
                    scores_on_pass: false,
                },
                scored: false,
            },
        );
    }

    /// Remove entities whose x has reached `-retire_margin`; returns how many
    pub fn retire(&self, state: &mut RunState) -> usize {
        let limit = -self.tuning.retire_margin;
        let before = state.entities.len();
        state
            .entities
            .retain(|e| e.is_player() || e.body.pos.x > limit);
        let retired = before - state.entities.len();
        if retired > 0 {
            log::debug!("Retired {} off-screen entities", retired);
        }
        retired
    }

    /// Mark newly passed scoring barriers; returns how many passed this call
    ///
    /// A barrier is passed once its trailing (right) edge is left of the
    /// player's left edge. The `scored` flag makes this idempotent.
    pub fn score_passes(&self, state: &mut RunState) -> u32 {
        let Some(player) = state.player_body() else {
            return 0;
        };
        let player_left = player.aabb().left();

        let mut passed = 0;
        for entity in state.entities.iter_mut() {
            let trailing = entity.body.aabb().right();
            if let EntityKind::Obstacle {
                role: ObstacleRole::Barrier {
                    scores_on_pass: true,
                },
                scored,
            } = &mut entity.kind
            {
                if !*scored && trailing < player_left {
                    *scored = true;
                    passed += 1;
                }
            }
        }
        passed
    }

    /// Staircase of platforms over a full-width ground; steeper and narrower each level
    fn generate_platforms(&self, state: &mut RunState) -> Vec<RectSpec> {
        let level = state.level as f32;
        let floor_y = self.world.y - GROUND_THICKNESS;
        let mut platforms = vec![RectSpec {
            x: 0.0,
            y: floor_y,
            width: self.world.x,
            height: GROUND_THICKNESS,
        }];

        let count = self.tuning.base_platforms + state.level;
        let rise = (70.0 + 4.0 * level).min(110.0);
        let tiers = (((floor_y - 120.0) / rise).floor() as u32).max(1);
        let width = (140.0 - 6.0 * level).max(64.0);
        let span = (self.world.x - 80.0 - width).max(0.0);

        for i in 0..count {
            let tier = (i % tiers + 1) as f32;
            let lane = (i as f32 + 0.5) / count as f32;
            let jitter: f32 = state.rng.random_range(-20.0..=20.0);
            let x = (40.0 + lane * span + jitter).clamp(0.0, self.world.x - width);
            platforms.push(RectSpec {
                x,
                y: floor_y - rise * tier,
                width,
                height: 16.0,
            });
        }
        platforms
    }

    /// Coins hovering over platforms, one platform after another
    fn generate_collectibles(&self, level: u32, platforms: &[RectSpec]) -> Vec<CollectibleSpec> {
        // Skip the ground strip when there is anything else to stand on
        let perches: Vec<&RectSpec> = if platforms.len() > 1 {
            platforms.iter().skip(1).collect()
        } else {
            platforms.iter().collect()
        };
        let count = (self.tuning.base_collectibles + level) as usize;
        let (cw, ch) = COLLECTIBLE_SIZE;

        (0..count)
            .filter_map(|i| {
                let perch = perches.get(i % perches.len().max(1))?;
                let stack = (i / perches.len().max(1)) as f32;
                Some(CollectibleSpec {
                    x: (perch.x + perch.width * 0.5 - cw * 0.5 + stack * 30.0)
                        .clamp(0.0, self.world.x - cw),
                    y: (perch.y - ch - 12.0).max(0.0),
                    points: self.tuning.collectible_points,
                })
            })
            .collect()
    }

    /// Enemies patrolling platforms, faster and more alert each level
    fn generate_enemies(&self, level: u32, platforms: &[RectSpec]) -> Vec<(Body, Brain)> {
        let count = (self.tuning.base_enemies + level) as usize;
        let extra = (level.saturating_sub(1)) as f32;
        let chase_speed = self.tuning.enemy_chase_speed + 8.0 * extra;
        let detection_range = self.tuning.enemy_detection_range + 10.0 * extra;
        let (ew, eh) = ENEMY_SIZE;

        let perches: Vec<&RectSpec> = platforms
            .iter()
            .skip(1)
            .filter(|p| p.width >= ew)
            .collect();

        (0..count)
            .map(|i| {
                // Odd perches first so the spawn corner stays clear; overflow goes to the ground
                let perch = perches.get(i * 2 + 1).or_else(|| perches.get(i * 2)).copied();
                let (left, right, y) = match perch {
                    Some(p) if i * 2 < perches.len() => (p.x, p.x + p.width - ew, p.y - eh),
                    _ => (
                        self.world.x * 0.5,
                        self.world.x - ew,
                        self.world.y - GROUND_THICKNESS - eh,
                    ),
                };
                let x = left + (right - left) * 0.5;
                let body = Body::new(Vec2::new(x, y), Vec2::new(ew, eh));
                let brain = Brain {
                    chase_speed,
                    detection_range,
                    patrol_left: left,
                    patrol_right: right,
                    direction: if i % 2 == 0 { 1.0 } else { -1.0 },
                    mode: AiMode::Patrol,
                };
                (body, brain)
            })
            .collect()
    }

    fn configured_enemy(&self, spec: &EnemySpec) -> (Body, Brain) {
        let (ew, eh) = ENEMY_SIZE;
        let span = self.tuning.enemy_patrol_span;
        let max_x = (self.world.x - ew).max(0.0);
        let left = spec.patrol_left.unwrap_or(spec.x - span).clamp(0.0, max_x);
        let right = spec.patrol_right.unwrap_or(spec.x + span).clamp(left, max_x.max(left));
        let body = Body::new(Vec2::new(spec.x.clamp(left, right), spec.y), Vec2::new(ew, eh));
        let brain = Brain {
            chase_speed: spec.speed,
            detection_range: spec
                .detection_range
                .unwrap_or(self.tuning.enemy_detection_range),
            patrol_left: left,
            patrol_right: right,
            direction: 1.0,
            mode: AiMode::Patrol,
        };
        (body, brain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::resolve;
    use proptest::prelude::*;
    use serde_json::json;

    fn director(template: serde_json::Value) -> SpawnDirector {
        let config = resolve(&template, None).config;
        SpawnDirector::new(&config, &Tuning::default())
    }

    fn count<F: Fn(&EntityKind) -> bool>(state: &RunState, f: F) -> usize {
        state.entities.iter().filter(|e| f(&e.kind)).count()
    }

    #[test]
    fn test_procedural_platformer_scales_with_level() {
        let director = director(json!({"kind": "platformer"}));
        let mut state = director.build_run(3, 42);
        let tuning = Tuning::default();

        // Ground + base + level
        let platforms = state.entities.iter().filter(|e| e.is_platform()).count();
        assert_eq!(platforms as u32, 1 + tuning.base_platforms + 1);
        assert_eq!(state.remaining_collectibles() as u32, tuning.base_collectibles + 1);
        assert_eq!(count(&state, |k| matches!(k, EntityKind::Enemy(_))) as u32, tuning.base_enemies + 1);
        assert_eq!(state.check_invariants(), Ok(()));

        state.level = 4;
        director.populate_level(&mut state);
        let platforms = state.entities.iter().filter(|e| e.is_platform()).count();
        assert_eq!(platforms as u32, 1 + tuning.base_platforms + 4);
        assert_eq!(state.remaining_collectibles() as u32, tuning.base_collectibles + 4);
        assert_eq!(state.entities.iter().filter(|e| e.is_player()).count(), 1);
    }

    #[test]
    fn test_procedural_layout_is_deterministic() {
        let director = director(json!({"kind": "platformer"}));
        let a = director.build_run(3, 7);
        let b = director.build_run(3, 7);
        assert_eq!(a.entities, b.entities);
    }

    #[test]
    fn test_config_lists_are_used_verbatim() {
        let director = director(json!({
            "kind": "platformer",
            "world": {"platforms": [{"x": 0, "y": 568, "width": 800, "height": 32}]},
            "enemies": [{"x": 400, "y": 536, "speed": 90}],
            "collectibles": [{"x": 250, "y": 400, "points": 10}]
        }));
        let state = director.build_run(3, 1);
        assert_eq!(state.entities.len(), 4);

        let platform = state.entities.iter().find(|e| e.is_platform()).unwrap();
        assert_eq!(platform.body.pos, Vec2::new(0.0, 568.0));
        assert_eq!(platform.body.size, Vec2::new(800.0, 32.0));

        let enemy = state.entities.iter().find(|e| e.is_enemy()).unwrap();
        match enemy.kind {
            EntityKind::Enemy(brain) => {
                assert_eq!(brain.chase_speed, 90.0);
                assert_eq!(brain.patrol_left, 300.0);
                assert_eq!(brain.patrol_right, 500.0);
            }
            _ => unreachable!(),
        }

        // Player stands on the first configured platform
        assert_eq!(state.spawn_point, Vec2::new(8.0, 568.0 - HERO_SIZE.1));
    }

    #[test]
    fn test_barrier_pair_gap() {
        let director = director(json!({"kind": "flappy"}));
        let tuning = Tuning::default();
        let mut state = director.build_run(1, 5);
        for _ in 0..50 {
            director.spawn_barrier_pair(&mut state);
        }
        let barriers: Vec<_> = state.entities.iter().filter(|e| e.is_hazard()).collect();
        assert_eq!(barriers.len(), 100);
        for pair in barriers.chunks(2) {
            let top = pair[0].body.aabb();
            let bottom = pair[1].body.aabb();
            assert!((bottom.top() - top.bottom() - tuning.barrier_gap).abs() < 1e-3);
            assert!(top.bottom() >= tuning.barrier_margin - 1e-3);
            assert!(bottom.top() <= 600.0 - tuning.barrier_margin + 1e-3);
            assert_eq!(top.left(), 800.0);
            assert_eq!(pair[0].body.vel.x, -150.0);
        }
    }

    #[test]
    fn test_retire_boundary_is_inclusive() {
        let director = director(json!({"kind": "flappy"}));
        let mut state = director.build_run(1, 5);
        director.spawn_barrier_pair(&mut state);
        let margin = Tuning::default().retire_margin;

        for entity in state.entities.iter_mut().filter(|e| !e.is_player()) {
            entity.body.pos.x = -margin + 0.5;
        }
        assert_eq!(director.retire(&mut state), 0);

        for entity in state.entities.iter_mut().filter(|e| !e.is_player()) {
            entity.body.pos.x = -margin;
        }
        assert_eq!(director.retire(&mut state), 2);
        assert_eq!(state.entities.len(), 1);
    }

    #[test]
    fn test_pass_scoring_is_idempotent() {
        let director = director(json!({"kind": "flappy"}));
        let mut state = director.build_run(1, 5);
        director.spawn_barrier_pair(&mut state);

        assert_eq!(director.score_passes(&mut state), 0);

        let player_left = state.player_body().unwrap().pos.x;
        for entity in state.entities.iter_mut().filter(|e| !e.is_player()) {
            entity.body.pos.x = player_left - 100.0;
        }
        // One pair scores exactly once
        assert_eq!(director.score_passes(&mut state), 1);
        assert_eq!(director.score_passes(&mut state), 0);
        assert_eq!(director.score_passes(&mut state), 0);
    }

    proptest! {
        #[test]
        fn prop_each_pair_scores_once(
            seed in any::<u64>(),
            xs in prop::collection::vec(-400.0f32..900.0, 1..8),
            repeats in 1usize..5,
        ) {
            let director = director(json!({"kind": "flappy"}));
            let mut state = director.build_run(1, seed);
            for _ in &xs {
                director.spawn_barrier_pair(&mut state);
            }
            let player_left = state.player_body().unwrap().pos.x;
            let width = Tuning::default().barrier_width;

            let mut barriers = state.entities.iter_mut().filter(|e| !e.is_player());
            for &x in &xs {
                for half in barriers.by_ref().take(2) {
                    half.body.pos.x = x;
                }
            }

            let behind = xs.iter().filter(|&&x| x + width < player_left).count() as u32;
            prop_assert_eq!(director.score_passes(&mut state), behind);
            for _ in 0..repeats {
                prop_assert_eq!(director.score_passes(&mut state), 0);
            }

            // Sweep everything behind the bird: only the rest score now
            for entity in state.entities.iter_mut().filter(|e| !e.is_player()) {
                entity.body.pos.x = player_left - width - 10.0;
            }
            prop_assert_eq!(director.score_passes(&mut state), xs.len() as u32 - behind);
            prop_assert_eq!(director.score_passes(&mut state), 0);
        }
    }
}
