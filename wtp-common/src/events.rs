//! Event types for the WTP event system
//!
//! The player broadcasts [`PlayerEvent`]s on an [`EventBus`] so that UIs and
//! other observers react to transitions instead of polling player state.

use crate::workout::{PlayerStatus, StepKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Session-level status changed (READY → RUNNING, RUNNING ⇄ PAUSED, ...)
    StatusChanged {
        session_id: String,
        old_status: PlayerStatus,
        new_status: PlayerStatus,
        timestamp: DateTime<Utc>,
    },

    /// A step became current
    StepStarted {
        session_id: String,
        step_index: usize,
        kind: StepKind,
        exercise_name: String,
        duration_sec: u32,
        timestamp: DateTime<Utc>,
    },

    /// Displayed timer values changed (emitted on whole-second boundaries)
    TimerProgress {
        session_id: String,
        step_index: usize,
        step_remaining_sec: u64,
        total_elapsed_sec: u64,
    },

    /// An audio/haptic cue was dispatched
    CuePlayed {
        session_id: String,
        cue: String,
        key: String,
        audible: bool,
    },

    /// A persisted session is available for rehydration
    RehydrationOffered {
        session_id: String,
        step_index: usize,
        total_elapsed_sec: u64,
    },

    /// The app returned to the foreground after a background auto-pause;
    /// the user must pick resume or finish
    ResumeChoiceRequired {
        session_id: String,
    },

    /// Workout completed and handed to the finalize collaborator
    SessionFinished {
        session_id: String,
        total_elapsed_sec: u64,
        label: String,
        timestamp: DateTime<Utc>,
    },

    /// Workout abandoned
    SessionAborted {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A durable write failed; the live session is unaffected
    PersistenceFailed {
        session_id: String,
        reason: String,
    },
}

impl PlayerEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::StatusChanged { .. } => "StatusChanged",
            PlayerEvent::StepStarted { .. } => "StepStarted",
            PlayerEvent::TimerProgress { .. } => "TimerProgress",
            PlayerEvent::CuePlayed { .. } => "CuePlayed",
            PlayerEvent::RehydrationOffered { .. } => "RehydrationOffered",
            PlayerEvent::ResumeChoiceRequired { .. } => "ResumeChoiceRequired",
            PlayerEvent::SessionFinished { .. } => "SessionFinished",
            PlayerEvent::SessionAborted { .. } => "SessionAborted",
            PlayerEvent::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

/// Event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lose the
/// oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use wtp_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
