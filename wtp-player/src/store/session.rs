//! Session persistence store
//!
//! Serializes the timing state of a live workout to durable storage, one
//! record per session id, so that a reload or process death can offer to
//! resume it.
//!
//! **Guarantees:**
//! - `save` stamps `updated_at` and never fails the caller; write errors are
//!   logged and reported as `false`
//! - `load` is fail-closed: a malformed, mistyped or stale record is deleted
//!   and reported as absent
//! - Only age is checked here; routine-content (signature) checks belong to
//!   the player, which knows the current blocks

use crate::store::storage::DurableStorage;
use crate::timing::TimingSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use wtp_common::time::Clock;
use wtp_common::workout::SessionStatus;
use wtp_common::{Error, Result};

const SESSION_KEY_PREFIX: &str = "wtp:session:";

/// Storage key for a session id
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, session_id)
}

/// Cross-reload representation of an in-progress workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub session_id: String,
    pub status: SessionStatus,
    pub current_step_index: usize,
    pub skip_warmup: bool,
    pub steps_signature: String,
    #[serde(flatten)]
    pub timing: TimingSnapshot,
    /// Epoch ms of the last write
    pub updated_at: i64,
}

impl PersistedSession {
    /// Semantic checks serde cannot express
    fn validate(&self, expected_session_id: &str) -> Result<()> {
        if self.session_id != expected_session_id {
            return Err(Error::InvalidInput(format!(
                "record belongs to session {}",
                self.session_id
            )));
        }
        if self.steps_signature.is_empty() {
            return Err(Error::InvalidInput("empty steps signature".to_string()));
        }
        let t = &self.timing;
        if t.total_accumulated_ms < 0 || t.step_accumulated_ms < 0 {
            return Err(Error::InvalidInput("negative accumulated time".to_string()));
        }
        if t.step_original_duration_ms <= 0 {
            return Err(Error::InvalidInput("non-positive step duration".to_string()));
        }
        if t.workout_started_at <= 0 || t.step_started_at <= 0 || self.updated_at <= 0 {
            return Err(Error::InvalidInput("missing timestamp".to_string()));
        }
        Ok(())
    }
}

/// Durable store for [`PersistedSession`] records
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    clock: Arc<dyn Clock>,
    staleness: Duration,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn DurableStorage>, clock: Arc<dyn Clock>, staleness: Duration) -> Self {
        Self {
            storage,
            clock,
            staleness,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Write `record` under `session_id`, stamping `updated_at = now`.
    ///
    /// Returns whether the write landed. Failures are logged, never raised.
    pub async fn save(&self, session_id: &str, record: &PersistedSession) -> bool {
        self.write(session_id, &self.stamp(record)).await
    }

    /// Copy of `record` with `updated_at = now`
    pub fn stamp(&self, record: &PersistedSession) -> PersistedSession {
        PersistedSession {
            updated_at: self.clock.now_ms(),
            ..record.clone()
        }
    }

    /// Write an already stamped record as is
    pub async fn write(&self, session_id: &str, stamped: &PersistedSession) -> bool {
        let json = match serde_json::to_string(stamped) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode session {}: {}", session_id, e);
                return false;
            }
        };

        match self.storage.set(&session_key(session_id), &json).await {
            Ok(()) => {
                debug!(
                    "Persisted session {} at step {} ({:?})",
                    session_id, stamped.current_step_index, stamped.status
                );
                true
            }
            Err(e) => {
                warn!("Failed to persist session {}: {}", session_id, e);
                false
            }
        }
    }

    /// Read the record for `session_id`.
    ///
    /// Structurally invalid or stale records are deleted and reported as
    /// `None`; a partially valid record is never returned.
    pub async fn load(&self, session_id: &str) -> Option<PersistedSession> {
        let key = session_key(session_id);
        let raw = match self.storage.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read session {}: {}", session_id, e);
                return None;
            }
        };

        let record = match serde_json::from_str::<PersistedSession>(&raw)
            .map_err(Error::from)
            .and_then(|r| r.validate(session_id).map(|()| r))
        {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding corrupt session record {}: {}", session_id, e);
                self.clear(session_id).await;
                return None;
            }
        };

        let age_ms = self.clock.now_ms() - record.updated_at;
        if age_ms > i64::try_from(self.staleness.as_millis()).unwrap_or(i64::MAX) {
            debug!(
                "Discarding stale session {} (last written {} s ago)",
                session_id,
                age_ms / 1000
            );
            self.clear(session_id).await;
            return None;
        }

        Some(record)
    }

    /// Delete the record for `session_id`. Failures are logged.
    pub async fn clear(&self, session_id: &str) {
        if let Err(e) = self.storage.remove(&session_key(session_id)).await {
            warn!("Failed to clear session {}: {}", session_id, e);
        }
    }
}
