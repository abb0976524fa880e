//! Remote session collaborator
//!
//! The player reports status changes and the final outcome of a session to
//! a backend it does not own. Status updates are best effort; finalize and
//! abort are awaited but their failures never roll back local state.

pub mod http;
pub mod logging;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wtp_common::{PlayerStatus, Result};

pub use http::HttpSessionBackend;
pub use logging::LoggingBackend;

/// Body of a status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: PlayerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_elapsed_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn new(status: PlayerStatus) -> Self {
        Self {
            status,
            total_elapsed_sec: None,
            finished_at: None,
        }
    }

    pub fn with_elapsed(mut self, total_elapsed_sec: u64) -> Self {
        self.total_elapsed_sec = Some(total_elapsed_sec);
        self
    }
}

/// Body of the finalize call; carries everything history needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub session_id: String,
    pub user_id: String,
    pub total_elapsed_sec: u64,
    pub source: String,
    pub label: String,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_routine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_routine_id: Option<String>,
}

/// Session lifecycle sink
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn update_session_status(&self, session_id: &str, update: &StatusUpdate) -> Result<()>;

    async fn finalize_session(&self, request: &FinalizeRequest) -> Result<()>;

    async fn abort_session(&self, session_id: &str) -> Result<()>;
}
