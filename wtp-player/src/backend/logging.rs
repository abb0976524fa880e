//! Offline backend that records calls in the log

use super::{FinalizeRequest, SessionBackend, StatusUpdate};
use async_trait::async_trait;
use tracing::info;
use wtp_common::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBackend;

impl LoggingBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionBackend for LoggingBackend {
    async fn update_session_status(&self, session_id: &str, update: &StatusUpdate) -> Result<()> {
        info!(
            session_id,
            status = %update.status,
            total_elapsed_sec = ?update.total_elapsed_sec,
            "Session status update"
        );
        Ok(())
    }

    async fn finalize_session(&self, request: &FinalizeRequest) -> Result<()> {
        info!(
            session_id = %request.session_id,
            total_elapsed_sec = request.total_elapsed_sec,
            label = %request.label,
            source = %request.source,
            "Session finalized"
        );
        Ok(())
    }

    async fn abort_session(&self, session_id: &str) -> Result<()> {
        info!(session_id, "Session aborted");
        Ok(())
    }
}
