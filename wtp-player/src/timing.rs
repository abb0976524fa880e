//! Timing engine
//!
//! Tracks per-step remaining time and whole-session elapsed time from
//! absolute timestamps plus accumulated-duration counters. Nothing here
//! counts ticks: every reading is recomputed from the clock, so dropped
//! frames, throttled timers and suspended processes cannot skew the result.
//!
//! **Formulas** (all in milliseconds):
//! - `total_elapsed = total_accumulated + (now - workout_started_at)` while running
//! - `step_elapsed = step_accumulated + (now - step_started_at)` while running
//! - `step_remaining = max(0, step_original_duration - step_elapsed)`
//!
//! While paused the `now - *_started_at` terms are dropped; the accumulated
//! counters only ever grow.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wtp_common::time::Clock;

/// Raw timing state, as persisted for rehydration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimingSnapshot {
    /// Epoch ms of the last start/resume of the whole workout
    pub workout_started_at: i64,
    /// Session time banked before `workout_started_at`
    pub total_accumulated_ms: i64,
    /// Epoch ms of the last start/resume/advance of the current step
    pub step_started_at: i64,
    /// Nominal length of the current step
    pub step_original_duration_ms: i64,
    /// Step time banked before `step_started_at`
    pub step_accumulated_ms: i64,
}

/// One evaluation of the clock against the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReading {
    pub total_elapsed_ms: u64,
    pub step_remaining_ms: u64,
    /// Ceiling of `step_remaining_ms` in whole seconds (display value)
    pub step_remaining_sec: u64,
}

impl TickReading {
    /// The current step has no time left
    pub fn is_step_exhausted(&self) -> bool {
        self.step_remaining_ms == 0
    }

    /// Whole elapsed seconds, rounded to nearest
    pub fn total_elapsed_sec(&self) -> u64 {
        (self.total_elapsed_ms + 500) / 1000
    }
}

/// Timestamp-driven step/session timer
#[derive(Debug, Clone)]
pub struct TimingEngine {
    clock: Arc<dyn Clock>,
    snapshot: TimingSnapshot,
    running: bool,
}

impl TimingEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            snapshot: TimingSnapshot::default(),
            running: false,
        }
    }

    /// Rebuild an engine from a persisted snapshot.
    ///
    /// A snapshot saved while running keeps counting from its timestamps, so
    /// time spent while the process was dead counts as workout time. Callers
    /// that want the gap excluded restore with `running = false`, which
    /// banks the time up to `frozen_at` first.
    pub fn restore(clock: Arc<dyn Clock>, snapshot: TimingSnapshot, running: bool) -> Self {
        Self {
            clock,
            snapshot,
            running,
        }
    }

    /// Restore a snapshot that was saved while running, freezing it at
    /// `frozen_at` (normally the record's `updated_at`).
    pub fn restore_paused_at(clock: Arc<dyn Clock>, snapshot: TimingSnapshot, frozen_at: i64) -> Self {
        let mut engine = Self::restore(clock, snapshot, true);
        engine.bank(frozen_at);
        engine.running = false;
        engine
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Begin the workout with the first step's nominal duration
    pub fn start(&mut self, first_step_duration_sec: u32) {
        let now = self.clock.now_ms();
        self.snapshot = TimingSnapshot {
            workout_started_at: now,
            total_accumulated_ms: 0,
            step_started_at: now,
            step_original_duration_ms: i64::from(first_step_duration_sec) * 1000,
            step_accumulated_ms: 0,
        };
        self.running = true;
    }

    /// Freeze both counters. No-op when already paused.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        let now = self.clock.now_ms();
        self.bank(now);
        self.running = false;
    }

    /// Restart both counters from now. No-op when already running.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        let now = self.clock.now_ms();
        self.snapshot.workout_started_at = now;
        self.snapshot.step_started_at = now;
        self.running = true;
    }

    /// Reset the per-step counters for the next step
    pub fn advance_step(&mut self, next_step_duration_sec: u32) {
        let now = self.clock.now_ms();
        self.snapshot.step_accumulated_ms = 0;
        self.snapshot.step_started_at = now;
        self.snapshot.step_original_duration_ms = i64::from(next_step_duration_sec) * 1000;
    }

    /// Evaluate the clock
    pub fn tick(&self) -> TickReading {
        self.reading_at(self.clock.now_ms())
    }

    pub fn reading_at(&self, now: i64) -> TickReading {
        let step_remaining_ms = (self.snapshot.step_original_duration_ms - self.step_elapsed_at(now)).max(0) as u64;
        TickReading {
            total_elapsed_ms: self.total_elapsed_at(now) as u64,
            step_remaining_ms,
            step_remaining_sec: step_remaining_ms.div_ceil(1000),
        }
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.total_elapsed_at(self.clock.now_ms()) as u64
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn snapshot(&self) -> TimingSnapshot {
        self.snapshot
    }

    fn total_elapsed_at(&self, now: i64) -> i64 {
        let live = if self.running {
            (now - self.snapshot.workout_started_at).max(0)
        } else {
            0
        };
        self.snapshot.total_accumulated_ms + live
    }

    fn step_elapsed_at(&self, now: i64) -> i64 {
        let live = if self.running {
            (now - self.snapshot.step_started_at).max(0)
        } else {
            0
        };
        self.snapshot.step_accumulated_ms + live
    }

    /// Move live time into the accumulators
    fn bank(&mut self, now: i64) {
        self.snapshot.total_accumulated_ms += (now - self.snapshot.workout_started_at).max(0);
        self.snapshot.step_accumulated_ms += (now - self.snapshot.step_started_at).max(0);
        self.snapshot.workout_started_at = now;
        self.snapshot.step_started_at = now;
    }
}
