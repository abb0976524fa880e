//! Cue selection and once-per-key dispatch
//!
//! The tick loop re-evaluates the same displayed second many times per
//! second. [`CueDispatcher`] makes sure every logical cue moment plays once:
//! a cue is identified by a string key derived from the step index and the
//! remaining second (or the kind of step being entered), and each key fires
//! at most once until the guard is reset.

use std::collections::HashSet;
use std::fmt;
use wtp_common::workout::StepKind;

/// Last seconds of a step that get a countdown cue
pub const COUNTDOWN_CUE_SECONDS: u64 = 3;

/// Logical cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Final seconds of any step (3, 2, 1)
    CountdownTick { remaining: u64 },
    WorkStart,
    RestStart,
    CountdownStart,
    /// Whole workout complete
    Finish,
}

impl Cue {
    /// Cue announcing entry into a step of `kind`
    pub fn for_step_kind(kind: StepKind) -> Self {
        match kind {
            StepKind::Work => Cue::WorkStart,
            StepKind::Rest => Cue::RestStart,
            StepKind::Countdown => Cue::CountdownStart,
        }
    }

    /// Countdown cue for a displayed remaining second, if one is due
    pub fn for_remaining(remaining_sec: u64) -> Option<Self> {
        (1..=COUNTDOWN_CUE_SECONDS)
            .contains(&remaining_sec)
            .then_some(Cue::CountdownTick {
                remaining: remaining_sec,
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cue::CountdownTick { .. } => "countdown_tick",
            Cue::WorkStart => "work_start",
            Cue::RestStart => "rest_start",
            Cue::CountdownStart => "countdown_start",
            Cue::Finish => "finish",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cue::CountdownTick { remaining } => write!(f, "countdown_tick({})", remaining),
            other => f.write_str(other.name()),
        }
    }
}

/// Key for the countdown cue at `remaining_sec` of step `step_index`
pub fn tick_key(step_index: usize, remaining_sec: u64) -> String {
    format!("tick:{}:{}", step_index, remaining_sec)
}

/// Key for entering step `step_index` of `kind`
pub fn transition_key(kind: StepKind, step_index: usize) -> String {
    format!("enter:{}:{}", kind, step_index)
}

/// Key for the completion cue
pub fn finish_key() -> String {
    "finish".to_string()
}

/// Once-per-key cue guard
#[derive(Debug, Default)]
pub struct CueDispatcher {
    played: HashSet<String>,
}

impl CueDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `emit` unless `key` already played since the last reset.
    ///
    /// Returns whether `emit` ran.
    pub fn beep_once<F: FnOnce()>(&mut self, key: &str, emit: F) -> bool {
        if !self.played.insert(key.to_string()) {
            return false;
        }
        emit();
        true
    }

    /// Forget every played key (new session, rehydration)
    pub fn reset_guard(&mut self) {
        self.played.clear();
    }
}
