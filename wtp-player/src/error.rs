//! Error types for wtp-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;
use wtp_common::PlayerStatus;

/// Main error type for wtp-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors surfaced by shared infrastructure (storage, config, backend)
    #[error(transparent)]
    Common(#[from] wtp_common::Error),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The routine produced no playable steps
    #[error("Cannot start workout: {0}")]
    CannotStart(String),

    /// The routine has warmup blocks and the user has not chosen yet
    #[error("Warmup choice required before starting")]
    WarmupChoiceRequired,

    /// A persisted session is waiting for continue/discard
    #[error("Rehydration choice pending")]
    RehydrationPending,

    /// No persisted session was offered
    #[error("No persisted session to {0}")]
    NoRehydration(&'static str),

    /// Action not allowed from the current status
    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: PlayerStatus,
    },

    /// Player runtime task is gone
    #[error("Player runtime stopped")]
    RuntimeStopped,
}

/// Convenience Result type using wtp-player Error
pub type Result<T> = std::result::Result<T, Error>;
