//! # WTP Common Library
//!
//! Shared code for the WTP workout player crates including:
//! - Workout model (blocks, steps, statuses)
//! - Event types (PlayerEvent enum) and the event bus
//! - Configuration loading
//! - Clock abstraction and time formatting
//! - Utility functions

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod time;
pub mod uuid_utils;
pub mod workout;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
pub use workout::{Block, BlockType, PlayerStatus, SessionStatus, Step, StepKind};
