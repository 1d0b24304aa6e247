//! Game configuration resolution
//!
//! Merges the platform's template JSON with user overrides into one immutable
//! [`GameConfig`]. Nothing here fails: malformed or out-of-range input is
//! defaulted or clamped and reported as a [`ValidationIssue`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which arcade variant a config drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKind {
    /// Flappy-style: constant scroll, flap impulse, first hit ends the run
    AutoScroller,
    /// Side-view platformer: run/jump, lives, levels
    Platformer,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::AutoScroller => "flappy",
            GameKind::Platformer => "platformer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flappy" | "flappy-bird" | "auto-scroller" | "autoscroller" => {
                Some(GameKind::AutoScroller)
            }
            "platformer" | "platform" => Some(GameKind::Platformer),
            _ => None,
        }
    }
}

/// Issue severity: errors suggest blocking play, warnings only degrade it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found while resolving a config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Dotted field path, e.g. `player.speed` or `enemies[2].x`
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Horizontal run speed (px/s)
    pub speed: f32,
    /// Upward impulse applied on flap/jump (px/s, negative is up)
    pub jump_force: f32,
    pub color: String,
}

/// Axis-aligned rectangle given as top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemySpec {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub detection_range: Option<f32>,
    pub patrol_left: Option<f32>,
    pub patrol_right: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectibleSpec {
    pub x: f32,
    pub y: f32,
    pub points: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Leftward scroll of the auto-scroller world (px/s)
    pub scroll_speed: f32,
    /// Empty means "generate procedurally"
    pub platforms: Vec<RectSpec>,
}

/// Fully resolved, immutable game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub kind: GameKind,
    pub world_width: f32,
    pub world_height: f32,
    /// Downward acceleration (px/s²)
    pub gravity: f32,
    pub background: String,
    pub player: PlayerConfig,
    pub world: WorldConfig,
    /// Empty means "generate procedurally"
    pub enemies: Vec<EnemySpec>,
    /// Empty means "generate procedurally"
    pub collectibles: Vec<CollectibleSpec>,
    pub max_levels: u32,
    pub starting_lives: u32,
}

pub const WIDTH_RANGE: (f32, f32) = (400.0, 1920.0);
pub const HEIGHT_RANGE: (f32, f32) = (300.0, 1080.0);
pub const GRAVITY_RANGE: (f32, f32) = (0.0, 1000.0);
pub const PLAYER_SPEED_RANGE: (f32, f32) = (50.0, 500.0);
pub const JUMP_FORCE_RANGE: (f32, f32) = (-1000.0, -50.0);
pub const SCROLL_SPEED_RANGE: (f32, f32) = (50.0, 600.0);
pub const ENEMY_SPEED_RANGE: (f32, f32) = (10.0, 400.0);
pub const POINTS_RANGE: (f32, f32) = (1.0, 1000.0);
pub const MAX_LEVELS_RANGE: (f32, f32) = (1.0, 50.0);
pub const LIVES_RANGE: (f32, f32) = (1.0, 9.0);
/// Rightmost x a configured entity may start at
pub const MAX_ENTITY_X: f32 = 20_000.0;
/// Smallest configured rectangle edge
pub const MIN_RECT_EDGE: f32 = 8.0;
/// Longest entity list accepted per kind
pub const MAX_LIST_LEN: usize = 256;

impl GameConfig {
    /// Defaults for a game kind (what an empty template resolves to)
    pub fn defaults(kind: GameKind) -> Self {
        let jump_force = match kind {
            GameKind::AutoScroller => -300.0,
            GameKind::Platformer => -450.0,
        };
        Self {
            kind,
            world_width: 800.0,
            world_height: 600.0,
            gravity: 800.0,
            background: "#87CEEB".to_string(),
            player: PlayerConfig {
                speed: 200.0,
                jump_force,
                color: "#FFD700".to_string(),
            },
            world: WorldConfig {
                scroll_speed: 150.0,
                platforms: Vec::new(),
            },
            enemies: Vec::new(),
            collectibles: Vec::new(),
            max_levels: 10,
            starting_lives: 3,
        }
    }
}

/// Output of the resolver: a usable config plus everything that was fixed up
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: GameConfig,
    pub issues: Vec<ValidationIssue>,
}

impl Resolved {
    /// True when at least one issue is severe enough to suggest blocking play
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Resolve template + overrides given as JSON text
pub fn resolve_str(template: &str, overrides: Option<&str>) -> Resolved {
    let mut early = Vec::new();
    let template = match serde_json::from_str::<Value>(template) {
        Ok(value) => value,
        Err(err) => {
            early.push(ValidationIssue {
                severity: Severity::Error,
                path: String::new(),
                message: format!("template is not valid JSON: {}", err),
            });
            Value::Object(Map::new())
        }
    };
    let overrides = overrides.and_then(|text| match serde_json::from_str::<Value>(text) {
        Ok(value) => Some(value),
        Err(err) => {
            early.push(ValidationIssue {
                severity: Severity::Warning,
                path: String::new(),
                message: format!("overrides are not valid JSON and were ignored: {}", err),
            });
            None
        }
    });

    let mut resolved = resolve(&template, overrides.as_ref());
    early.append(&mut resolved.issues);
    resolved.issues = early;
    resolved
}

/// Resolve a template config and optional user overrides into a [`GameConfig`]
pub fn resolve(template: &Value, overrides: Option<&Value>) -> Resolved {
    let mut resolver = Resolver::default();

    let mut merged = match template {
        Value::Object(_) => template.clone(),
        other => {
            resolver.error("", format!("template must be an object, got {}", type_name(other)));
            Value::Object(Map::new())
        }
    };
    if let Some(overrides) = overrides {
        match overrides {
            Value::Object(_) => merge(&mut merged, overrides),
            Value::Null => {}
            other => resolver.warn(
                "",
                format!("overrides must be an object, got {}; ignored", type_name(other)),
            ),
        }
    }

    let empty = Map::new();
    let root = merged.as_object().unwrap_or(&empty);
    let config = resolver.game_config(root);

    for issue in &resolver.issues {
        match issue.severity {
            Severity::Error => log::warn!("config error at '{}': {}", issue.path, issue.message),
            Severity::Warning => log::debug!("config warning at '{}': {}", issue.path, issue.message),
        }
    }

    Resolved {
        config,
        issues: resolver.issues,
    }
}

/// Deep-merge `overlay` into `base`: objects merge per key, everything else replaces
fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value)
                    }
                    _ => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

const ROOT_KEYS: &[&str] = &[
    "kind",
    "worldWidth",
    "worldHeight",
    "gravity",
    "background",
    "player",
    "world",
    "enemies",
    "collectibles",
    "maxLevels",
    "lives",
];
const PLAYER_KEYS: &[&str] = &["speed", "jumpForce", "flapForce", "color"];
const WORLD_KEYS: &[&str] = &["scrollSpeed", "platforms"];
const PLATFORM_KEYS: &[&str] = &["x", "y", "width", "height"];
const ENEMY_KEYS: &[&str] = &["x", "y", "speed", "detectionRange", "patrolLeft", "patrolRight"];
const COLLECTIBLE_KEYS: &[&str] = &["x", "y", "points"];

#[derive(Default)]
struct Resolver {
    issues: Vec<ValidationIssue>,
}

impl Resolver {
    fn error(&mut self, path: &str, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            path: path.to_string(),
            message,
        });
    }

    fn warn(&mut self, path: &str, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            path: path.to_string(),
            message,
        });
    }

    fn game_config(&mut self, root: &Map<String, Value>) -> GameConfig {
        self.unknown_keys(root, "", ROOT_KEYS);

        let kind = self.kind(root);
        let defaults = GameConfig::defaults(kind);

        let world_width = self.number(root, "worldWidth", "", defaults.world_width, WIDTH_RANGE);
        let world_height = self.number(root, "worldHeight", "", defaults.world_height, HEIGHT_RANGE);
        let gravity = self.number(root, "gravity", "", defaults.gravity, GRAVITY_RANGE);
        let background = self.text(root, "background", "", &defaults.background);

        let player = match self.object(root, "player", "") {
            Some(obj) => self.player(obj, kind, &defaults.player),
            None => defaults.player.clone(),
        };

        let world = match self.object(root, "world", "") {
            Some(obj) => {
                self.unknown_keys(obj, "world", WORLD_KEYS);
                let scroll_speed = self.number(
                    obj,
                    "scrollSpeed",
                    "world",
                    defaults.world.scroll_speed,
                    SCROLL_SPEED_RANGE,
                );
                let platforms = self
                    .entries(obj, "platforms", "world")
                    .into_iter()
                    .filter_map(|(path, entry)| self.platform(entry, &path, world_width, world_height))
                    .collect();
                WorldConfig {
                    scroll_speed,
                    platforms,
                }
            }
            None => defaults.world.clone(),
        };

        let enemies = self
            .entries(root, "enemies", "")
            .into_iter()
            .filter_map(|(path, entry)| self.enemy(entry, &path, world_height))
            .collect();
        let collectibles = self
            .entries(root, "collectibles", "")
            .into_iter()
            .filter_map(|(path, entry)| self.collectible(entry, &path, world_height))
            .collect();

        let max_levels = self.number(root, "maxLevels", "", defaults.max_levels as f32, MAX_LEVELS_RANGE);
        let starting_lives = self.number(root, "lives", "", defaults.starting_lives as f32, LIVES_RANGE);

        GameConfig {
            kind,
            world_width,
            world_height,
            gravity,
            background,
            player,
            world,
            enemies,
            collectibles,
            max_levels: max_levels.round() as u32,
            starting_lives: starting_lives.round() as u32,
        }
    }

    fn kind(&mut self, root: &Map<String, Value>) -> GameKind {
        match root.get("kind") {
            Some(Value::String(s)) => match GameKind::from_str(s) {
                Some(kind) => return kind,
                None => self.error("kind", format!("unknown game kind '{}', using flappy", s)),
            },
            None | Some(Value::Null) => {}
            Some(other) => self.error(
                "kind",
                format!("expected a string, got {}; inferring from fields", type_name(other)),
            ),
        }

        // Infer from variant-specific fields
        let player = root.get("player").and_then(Value::as_object);
        let has_platforms = root
            .get("world")
            .and_then(Value::as_object)
            .is_some_and(|w| w.contains_key("platforms"));
        if player.is_some_and(|p| p.contains_key("flapForce")) {
            GameKind::AutoScroller
        } else if player.is_some_and(|p| p.contains_key("jumpForce")) || has_platforms {
            GameKind::Platformer
        } else {
            self.warn("kind", "no game kind given, assuming flappy".to_string());
            GameKind::AutoScroller
        }
    }

    fn player(
        &mut self,
        obj: &Map<String, Value>,
        kind: GameKind,
        defaults: &PlayerConfig,
    ) -> PlayerConfig {
        self.unknown_keys(obj, "player", PLAYER_KEYS);

        let speed = self.number(obj, "speed", "player", defaults.speed, PLAYER_SPEED_RANGE);

        // Each variant prefers its own key but accepts the other one
        let (primary, secondary) = match kind {
            GameKind::AutoScroller => ("flapForce", "jumpForce"),
            GameKind::Platformer => ("jumpForce", "flapForce"),
        };
        let key = if obj.contains_key(primary) { primary } else { secondary };
        let path = join("player", key);
        let jump_force = match self.read_number(obj, key, "player") {
            Some(mut force) => {
                if force > 0.0 {
                    self.warn(&path, format!("{} must point upward (negative), using {}", force, -force));
                    force = -force;
                }
                self.clamp(force, &path, JUMP_FORCE_RANGE)
            }
            None => defaults.jump_force,
        };

        let color = self.text(obj, "color", "player", &defaults.color);

        PlayerConfig {
            speed,
            jump_force,
            color,
        }
    }

    fn platform(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        world_width: f32,
        world_height: f32,
    ) -> Option<RectSpec> {
        self.unknown_keys(obj, path, PLATFORM_KEYS);
        let (x, y) = self.position(obj, path, world_height)?;
        let width = self.number(obj, "width", path, 120.0, (MIN_RECT_EDGE, world_width));
        let height = self.number(obj, "height", path, 20.0, (MIN_RECT_EDGE, world_height));
        Some(RectSpec {
            x,
            y,
            width,
            height,
        })
    }

    fn enemy(&mut self, obj: &Map<String, Value>, path: &str, world_height: f32) -> Option<EnemySpec> {
        self.unknown_keys(obj, path, ENEMY_KEYS);
        let (x, y) = self.position(obj, path, world_height)?;
        let speed = self.number(obj, "speed", path, 80.0, ENEMY_SPEED_RANGE);
        let detection_range = self
            .read_number(obj, "detectionRange", path)
            .map(|v| self.clamp(v, &join(path, "detectionRange"), (0.0, 2000.0)));
        let patrol_left = self
            .read_number(obj, "patrolLeft", path)
            .map(|v| self.clamp(v, &join(path, "patrolLeft"), (0.0, MAX_ENTITY_X)));
        let patrol_right = self
            .read_number(obj, "patrolRight", path)
            .map(|v| self.clamp(v, &join(path, "patrolRight"), (0.0, MAX_ENTITY_X)));

        let (patrol_left, patrol_right) = match (patrol_left, patrol_right) {
            (Some(left), Some(right)) if left > right => {
                self.warn(path, "patrolLeft is right of patrolRight, swapped".to_string());
                (Some(right), Some(left))
            }
            bounds => bounds,
        };

        Some(EnemySpec {
            x,
            y,
            speed,
            detection_range,
            patrol_left,
            patrol_right,
        })
    }

    fn collectible(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        world_height: f32,
    ) -> Option<CollectibleSpec> {
        self.unknown_keys(obj, path, COLLECTIBLE_KEYS);
        let (x, y) = self.position(obj, path, world_height)?;
        let points = self.number(obj, "points", path, 10.0, POINTS_RANGE);
        Some(CollectibleSpec {
            x,
            y,
            points: points.round() as u64,
        })
    }

    /// Required `x`/`y` pair; the entry is dropped when either is unusable
    fn position(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        world_height: f32,
    ) -> Option<(f32, f32)> {
        let x = self.read_number(obj, "x", path);
        let y = self.read_number(obj, "y", path);
        match (x, y) {
            (Some(x), Some(y)) => Some((
                self.clamp(x, &join(path, "x"), (0.0, MAX_ENTITY_X)),
                self.clamp(y, &join(path, "y"), (0.0, world_height)),
            )),
            _ => {
                self.error(path, "entry needs numeric x and y; dropped".to_string());
                None
            }
        }
    }

    /// Object-valued entries of a list field, with their paths
    fn entries<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> Vec<(String, &'a Map<String, Value>)> {
        let path = join(parent, key);
        let items = match obj.get(key) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.error(&path, format!("expected an array, got {}; ignored", type_name(other)));
                return Vec::new();
            }
        };

        if items.len() > MAX_LIST_LEN {
            self.warn(
                &path,
                format!("{} entries given, only the first {} are used", items.len(), MAX_LIST_LEN),
            );
        }

        items
            .iter()
            .take(MAX_LIST_LEN)
            .enumerate()
            .filter_map(|(i, item)| {
                let item_path = format!("{}[{}]", path, i);
                match item.as_object() {
                    Some(entry) => Some((item_path, entry)),
                    None => {
                        self.error(
                            &item_path,
                            format!("expected an object, got {}; dropped", type_name(item)),
                        );
                        None
                    }
                }
            })
            .collect()
    }

    fn object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> Option<&'a Map<String, Value>> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                self.error(
                    &join(parent, key),
                    format!("expected an object, got {}; using defaults", type_name(other)),
                );
                None
            }
        }
    }

    fn text(&mut self, obj: &Map<String, Value>, key: &str, parent: &str, default: &str) -> String {
        match obj.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(other) => {
                self.error(
                    &join(parent, key),
                    format!("expected a non-empty string, got {}; using '{}'", type_name(other), default),
                );
                default.to_string()
            }
        }
    }

    /// Read, coerce, default and clamp a numeric field
    fn number(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        default: f32,
        range: (f32, f32),
    ) -> f32 {
        match self.read_number(obj, key, parent) {
            Some(value) => self.clamp(value, &join(parent, key), range),
            None => default,
        }
    }

    /// Finite numeric value of a field, or `None` when absent or unusable
    fn read_number(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<f32> {
        let path = join(parent, key);
        let value = match obj.get(key)? {
            Value::Null => return None,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    self.warn(&path, format!("numeric string '{}' coerced to a number", s));
                    Some(parsed)
                }
                _ => None,
            },
            _ => None,
        };

        match value {
            Some(v) if v.is_finite() && v.abs() < f32::MAX as f64 => Some(v as f32),
            _ => {
                self.error(&path, format!("expected a finite number, got {}; using default", obj[key]));
                None
            }
        }
    }

    fn clamp(&mut self, value: f32, path: &str, (min, max): (f32, f32)) -> f32 {
        if value < min || value > max {
            let clamped = value.clamp(min, max);
            self.warn(path, format!("{} out of range [{}, {}], clamped to {}", value, min, max, clamped));
            clamped
        } else {
            value
        }
    }

    fn unknown_keys(&mut self, obj: &Map<String, Value>, path: &str, known: &[&str]) {
        for key in obj.keys() {
            if !known.contains(&key.as_str()) {
                self.warn(&join(path, key), "unknown field ignored".to_string());
            }
        }
    }
}
