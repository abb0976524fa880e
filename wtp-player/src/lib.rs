//! # WTP Workout Player Library (wtp-player)
//!
//! Guided workout timer with audio/haptic cues and crash-resilient session
//! persistence.
//!
//! **Purpose:** Flatten a routine into timed steps, drive them from
//! wall-clock timestamps, checkpoint progress to durable storage, cue each
//! transition exactly once and report the outcome to a session backend.
//!
//! **Architecture:** `sequencer` → `timing` → `player` (state machine),
//! with `store`/`db` for durable state, `cues`/`audio` for output and
//! `backend` for the remote session collaborator.

pub mod audio;
pub mod backend;
pub mod cues;
pub mod db;
pub mod error;
pub mod player;
pub mod routine;
pub mod sequencer;
pub mod store;
pub mod timing;

pub use error::{Error, Result};
pub use player::{PlayerDeps, PlayerProgress, WorkoutPlayer};
