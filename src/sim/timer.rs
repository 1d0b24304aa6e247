//! Cancelable simulation timers
//!
//! Timers count down in simulation time, not wall-clock time, and are only
//! advanced while a run is Playing. The lifecycle owns every handle and
//! cancels all of them whenever a run leaves Playing.

use serde::Serialize;

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerKind {
    /// Spawn the next barrier pair (auto-scroller)
    SpawnBarrier,
    /// Leave the level-complete banner and build the next level
    LevelAdvance,
}

/// Opaque handle returned by [`Timers::once`] and [`Timers::every`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerHandle(u32);

#[derive(Debug, Clone, Serialize)]
struct Timer {
    handle: TimerHandle,
    kind: TimerKind,
    remaining: f32,
    /// Re-arm interval for repeating timers
    repeat: Option<f32>,
}

/// Owned set of pending timers
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timers {
    timers: Vec<Timer>,
    next_handle: u32,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once after `delay` seconds
    pub fn once(&mut self, kind: TimerKind, delay: f32) -> TimerHandle {
        self.start(kind, delay, None)
    }

    /// Fire every `interval` seconds, first after `interval`
    pub fn every(&mut self, kind: TimerKind, interval: f32) -> TimerHandle {
        self.start(kind, interval, Some(interval))
    }

    fn start(&mut self, kind: TimerKind, delay: f32, repeat: Option<f32>) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.push(Timer {
            handle,
            kind,
            remaining: delay.max(0.0),
            // A zero interval would fire every tick forever
            repeat: repeat.map(|r| r.max(f32::EPSILON)),
        });
        handle
    }

    /// Cancel one timer; returns false if it already fired or was canceled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    /// Cancel every pending timer, returning how many were live
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance by `dt`, returning fired kinds in start order
    ///
    /// A repeating timer fires at most once per call even if `dt` spans
    /// several intervals.
    pub fn advance(&mut self, dt: f32) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            timer.remaining -= dt;
            if timer.remaining <= 0.0 {
                fired.push(timer.kind);
                if let Some(interval) = timer.repeat {
                    timer.remaining = (timer.remaining + interval).max(0.0);
                }
            }
        }
        self.timers
            .retain(|t| t.repeat.is_some() || t.remaining > 0.0);
        fired
    }
}
