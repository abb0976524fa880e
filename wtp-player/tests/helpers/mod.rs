//! Test helper modules for wtp-player integration tests
//!
//! - `harness`: players on a manual clock with in-memory storage
//! - `recording`: backend/cue output doubles that record calls, failing storage

#![allow(dead_code)]

pub mod harness;
pub mod recording;

pub use harness::*;
pub use recording::*;
