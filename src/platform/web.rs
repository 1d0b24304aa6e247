//! JavaScript bindings (web only)
//!
//! The page owns the canvas, the requestAnimationFrame loop and the DOM
//! listeners. It forwards raw events and frame times here and reads back JSON
//! snapshots to draw.

use js_sys::Function;
use wasm_bindgen::prelude::*;

use super::FrameClock;
use super::storage::LocalStorageStore;
use crate::consts::SIM_DT;
use crate::sim::config::{Severity, ValidationIssue, resolve_str};
use crate::sim::input::{InputEvent, Key};
use crate::sim::lifecycle::{GameObserver, Simulation};
use crate::tuning::{Difficulty, Tuning};

/// Install the panic hook and console logger once per page
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"arcade-sim: logger already installed".into());
    }
}

/// Forwards simulation callbacks to optional JS functions
#[derive(Default)]
struct JsObserver {
    on_score: Option<Function>,
    on_game_over: Option<Function>,
    on_play: Option<Function>,
    on_record: Option<Function>,
}

fn call(callback: &Option<Function>, args: &[JsValue]) {
    let Some(callback) = callback else {
        return;
    };
    let result = match args {
        [] => callback.call0(&JsValue::NULL),
        [a] => callback.call1(&JsValue::NULL, a),
        [a, b, ..] => callback.call2(&JsValue::NULL, a, b),
    };
    if let Err(err) = result {
        log::warn!("Game callback threw: {:?}", err);
    }
}

impl GameObserver for JsObserver {
    fn on_score_update(&mut self, score: u64) {
        call(&self.on_score, &[JsValue::from_f64(score as f64)]);
    }

    fn on_game_over(&mut self, final_score: u64, best_score: u64) {
        call(
            &self.on_game_over,
            &[
                JsValue::from_f64(final_score as f64),
                JsValue::from_f64(best_score as f64),
            ],
        );
    }

    fn on_play_recorded(&mut self) {
        call(&self.on_play, &[]);
    }

    fn on_new_record(&mut self, score: u64) {
        call(&self.on_record, &[JsValue::from_f64(score as f64)]);
    }
}

/// One playable game embedded in a page
#[wasm_bindgen]
pub struct WasmGame {
    sim: Simulation,
    clock: FrameClock,
    issues: Vec<ValidationIssue>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Resolve the template (plus optional user overrides) and build the first run
    #[wasm_bindgen(constructor)]
    pub fn new(
        game_id: &str,
        template_json: &str,
        overrides_json: Option<String>,
        difficulty: Option<String>,
    ) -> WasmGame {
        let resolved = resolve_str(template_json, overrides_json.as_deref());
        for issue in resolved.errors() {
            log::warn!("Config error at '{}': {}", issue.path, issue.message);
        }

        let tuning = difficulty
            .as_deref()
            .and_then(Difficulty::from_str)
            .map(Tuning::from_preset)
            .unwrap_or_default();

        // Wall clock and Math.random only pick the seed; the run itself is deterministic
        let seed = (js_sys::Date::now() as u64) ^ ((js_sys::Math::random() * u32::MAX as f64) as u64) << 32;

        let sim = Simulation::new(
            game_id,
            resolved.config,
            tuning,
            Box::new(LocalStorageStore::new()),
            seed,
        );
        WasmGame {
            sim,
            clock: FrameClock::new(),
            issues: resolved.issues,
        }
    }

    /// Register JS callbacks; any of them may be omitted
    pub fn set_callbacks(
        &mut self,
        on_score: Option<Function>,
        on_game_over: Option<Function>,
        on_play: Option<Function>,
        on_record: Option<Function>,
    ) {
        self.sim.set_observer(Box::new(JsObserver {
            on_score,
            on_game_over,
            on_play,
            on_record,
        }));
    }

    /// Config validation issues as a JSON array
    pub fn issues_json(&self) -> String {
        to_json(&self.issues)
    }

    /// True if the config had errors (the game still runs on defaults)
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Error)
    }

    pub fn key_down(&mut self, code: &str) {
        self.sim.push_input(InputEvent::KeyDown(Key::from_code(code)));
    }

    pub fn key_up(&mut self, code: &str) {
        self.sim.push_input(InputEvent::KeyUp(Key::from_code(code)));
    }

    pub fn pointer_down(&mut self) {
        self.sim.push_input(InputEvent::PointerDown);
    }

    pub fn pointer_up(&mut self) {
        self.sim.push_input(InputEvent::PointerUp);
    }

    /// Advance by one animation frame; returns the number of ticks run
    pub fn frame(&mut self, dt_ms: f64) -> u32 {
        let steps = self.clock.advance((dt_ms / 1000.0) as f32);
        for _ in 0..steps {
            self.sim.tick(SIM_DT);
        }
        steps
    }

    /// Drop accumulated frame time (tab hidden or window blurred)
    pub fn pause_clock(&mut self) {
        self.clock.reset();
    }

    pub fn restart(&mut self) {
        self.sim.restart();
        self.clock.reset();
    }

    /// Current run as JSON for the renderer
    pub fn snapshot_json(&self) -> String {
        to_json(self.sim.state())
    }

    /// Events since the last call, as a JSON array
    pub fn events_json(&mut self) -> String {
        to_json(&self.sim.drain_events())
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.sim.phase())
    }

    pub fn score(&self) -> f64 {
        self.sim.state().score as f64
    }

    pub fn best_score(&self) -> f64 {
        self.sim.scores().best() as f64
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        log::warn!("Snapshot serialization failed: {}", err);
        String::from("null")
    })
}
