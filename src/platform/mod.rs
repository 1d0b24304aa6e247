//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame time (fixed-step accumulator shared by every host)
//! - Storage (LocalStorage on web)
//! - JS bindings (web only)

#[cfg(target_arch = "wasm32")]
pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};

/// Turns variable frame times into whole fixed simulation steps
#[derive(Debug, Clone)]
pub struct FrameClock {
    accumulator: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self { accumulator: 0.0 }
    }

    /// Account for `dt` seconds of wall time; returns how many `SIM_DT` ticks to run
    ///
    /// Long frames are clamped and a backlog beyond `MAX_SUBSTEPS` is dropped
    /// so a slow host never spirals.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt.min(MAX_FRAME_DT);

        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        steps
    }

    /// Leftover fraction of a step, for render interpolation
    pub fn alpha(&self) -> f32 {
        (self.accumulator / SIM_DT).clamp(0.0, 1.0)
    }

    /// Forget accumulated time (restart, tab hidden)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
