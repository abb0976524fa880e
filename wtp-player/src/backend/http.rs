//! HTTP session backend
//!
//! Endpoints (relative to the configured base URL):
//! - `PATCH /sessions/{id}` with a [`StatusUpdate`] body
//! - `POST /sessions/{id}/finalize` with a [`FinalizeRequest`] body
//! - `POST /sessions/{id}/abort` with an empty body

use super::{FinalizeRequest, SessionBackend, StatusUpdate};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use wtp_common::{Error, Result};

const USER_AGENT: &str = concat!("wtp-player/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpSessionBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSessionBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, session_id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => format!("{}/sessions/{}/{}", self.base_url, session_id, action),
            None => format!("{}/sessions/{}", self.base_url, session_id),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{} failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!(
                "{} rejected with {}: {}",
                what,
                status.as_u16(),
                body
            )));
        }

        debug!("{} accepted ({})", what, status.as_u16());
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn update_session_status(&self, session_id: &str, update: &StatusUpdate) -> Result<()> {
        let request = self
            .http_client
            .patch(self.session_url(session_id, None))
            .json(update);
        self.send(request, "status update").await
    }

    async fn finalize_session(&self, request: &FinalizeRequest) -> Result<()> {
        let builder = self
            .http_client
            .post(self.session_url(&request.session_id, Some("finalize")))
            .json(request);
        self.send(builder, "finalize").await
    }

    async fn abort_session(&self, session_id: &str) -> Result<()> {
        let request = self
            .http_client
            .post(self.session_url(session_id, Some("abort")));
        self.send(request, "abort").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_urls() {
        let backend = HttpSessionBackend::new("http://localhost:8080/api/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080/api");
        assert_eq!(
            backend.session_url("abc", None),
            "http://localhost:8080/api/sessions/abc"
        );
        assert_eq!(
            backend.session_url("abc", Some("finalize")),
            "http://localhost:8080/api/sessions/abc/finalize"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_backend_error() {
        let backend = HttpSessionBackend::new("http://127.0.0.1:9").unwrap();
        let result = backend.abort_session("abc").await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
