//! Input routing
//!
//! Hosts push raw key/pointer events whenever they arrive. They are queued and
//! routed once, at the start of the next tick, into a [`TickInput`] that the
//! rest of the tick reads.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::config::GameKind;
use super::state::GamePhase;

/// Keys the simulation cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    W,
    A,
    D,
    R,
    Enter,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.code` / `key` string
    pub fn from_code(code: &str) -> Self {
        match code {
            "Space" | " " => Key::Space,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "KeyW" | "w" | "W" => Key::W,
            "KeyA" | "a" | "A" => Key::A,
            "KeyD" | "d" | "D" => Key::D,
            "KeyR" | "r" | "R" => Key::R,
            "Enter" | "NumpadEnter" => Key::Enter,
            _ => Key::Other,
        }
    }
}

/// A raw, discrete host event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    PointerDown,
    PointerUp,
}

/// Commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Flap (auto-scroller), jump (platformer) or start
    pub primary: bool,
    /// Horizontal intent: -1 left, 0 none, 1 right
    pub move_dir: f32,
    /// Build a fresh run (only honored in a terminal phase)
    pub restart: bool,
}

/// Maps raw events to per-tick actions and remembers held movement keys
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    queue: VecDeque<InputEvent>,
    left_held: bool,
    right_held: bool,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next tick
    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Forget queued events and held keys (new run)
    pub fn reset(&mut self) {
        self.queue.clear();
        self.left_held = false;
        self.right_held = false;
    }

    /// Drain the queue against the phase the tick started in
    pub fn route(&mut self, kind: GameKind, phase: GamePhase) -> TickInput {
        let mut input = TickInput::default();

        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::KeyDown(key) => match key {
                    Key::Space | Key::ArrowUp | Key::W => input.primary = true,
                    Key::ArrowLeft | Key::A => self.left_held = true,
                    Key::ArrowRight | Key::D => self.right_held = true,
                    Key::R | Key::Enter => input.restart = true,
                    Key::Other => {}
                },
                InputEvent::KeyUp(key) => match key {
                    Key::ArrowLeft | Key::A => self.left_held = false,
                    Key::ArrowRight | Key::D => self.right_held = false,
                    _ => {}
                },
                InputEvent::PointerDown => input.primary = true,
                InputEvent::PointerUp => {}
            }
        }

        if kind == GameKind::Platformer {
            input.move_dir = match (self.left_held, self.right_held) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            };
        }

        // In a terminal phase any primary press also means "play again"
        if phase.is_terminal() {
            input.restart |= input.primary;
            input.primary = false;
        } else {
            input.restart = false;
        }

        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_from_key_or_pointer() {
        let mut router = InputRouter::new();
        router.push(InputEvent::KeyDown(Key::Space));
        let input = router.route(GameKind::AutoScroller, GamePhase::Waiting);
        assert!(input.primary);

        router.push(InputEvent::PointerDown);
        assert!(router.route(GameKind::AutoScroller, GamePhase::Playing).primary);

        // Queue is drained; nothing carries over
        assert!(!router.route(GameKind::AutoScroller, GamePhase::Playing).primary);
    }

    #[test]
    fn test_held_movement_persists() {
        let mut router = InputRouter::new();
        router.push(InputEvent::KeyDown(Key::ArrowRight));
        assert_eq!(router.route(GameKind::Platformer, GamePhase::Playing).move_dir, 1.0);
        assert_eq!(router.route(GameKind::Platformer, GamePhase::Playing).move_dir, 1.0);

        router.push(InputEvent::KeyDown(Key::A));
        assert_eq!(router.route(GameKind::Platformer, GamePhase::Playing).move_dir, 0.0);

        router.push(InputEvent::KeyUp(Key::ArrowRight));
        assert_eq!(router.route(GameKind::Platformer, GamePhase::Playing).move_dir, -1.0);
    }

    #[test]
    fn test_auto_scroller_ignores_movement() {
        let mut router = InputRouter::new();
        router.push(InputEvent::KeyDown(Key::ArrowLeft));
        assert_eq!(router.route(GameKind::AutoScroller, GamePhase::Playing).move_dir, 0.0);
    }

    #[test]
    fn test_restart_only_in_terminal_phase() {
        let mut router = InputRouter::new();
        router.push(InputEvent::KeyDown(Key::R));
        assert!(!router.route(GameKind::Platformer, GamePhase::Playing).restart);

        router.push(InputEvent::PointerDown);
        let input = router.route(GameKind::Platformer, GamePhase::GameOver);
        assert!(input.restart);
        assert!(!input.primary);
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code("Space"), Key::Space);
        assert_eq!(Key::from_code("KeyD"), Key::D);
        assert_eq!(Key::from_code("Escape"), Key::Other);
    }
}
