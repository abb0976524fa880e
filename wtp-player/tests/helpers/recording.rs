//! Recording and failing collaborators

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;
use wtp_common::{Error, Result};
use wtp_player::audio::{CueOutput, Tone};
use wtp_player::backend::{FinalizeRequest, SessionBackend, StatusUpdate};
use wtp_player::cues::Cue;
use wtp_player::store::{DurableStorage, MemoryStorage};

/// One call received by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Status { session_id: String, update: StatusUpdate },
    Finalize(FinalizeRequest),
    Abort(String),
}

/// Backend that records every call; optionally fails all of them
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    fail: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let backend = Self::default();
        backend.fail.store(true, Ordering::SeqCst);
        backend
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn finalizations(&self) -> Vec<FinalizeRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Finalize(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn aborts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Abort(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Status { update, .. } => Some(update),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionBackend for RecordingBackend {
    async fn update_session_status(&self, session_id: &str, update: &StatusUpdate) -> Result<()> {
        self.record(BackendCall::Status {
            session_id: session_id.to_string(),
            update: update.clone(),
        })
    }

    async fn finalize_session(&self, request: &FinalizeRequest) -> Result<()> {
        self.record(BackendCall::Finalize(request.clone()))
    }

    async fn abort_session(&self, session_id: &str) -> Result<()> {
        self.record(BackendCall::Abort(session_id.to_string()))
    }
}

/// Cue output that records played cues
#[derive(Debug, Default)]
pub struct RecordingCueOutput {
    played: Mutex<Vec<Cue>>,
    vibrations: Mutex<usize>,
}

impl RecordingCueOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Cue> {
        self.played.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Cue) -> bool) -> usize {
        self.played().iter().filter(|cue| matches(cue)).count()
    }

    pub fn vibrations(&self) -> usize {
        *self.vibrations.lock().unwrap()
    }
}

impl CueOutput for RecordingCueOutput {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn open(&self) -> Result<()> {
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn suspend(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self, cue: Cue, _tones: &[Tone]) -> Result<()> {
        self.played.lock().unwrap().push(cue);
        Ok(())
    }

    fn vibrate(&self, _pattern_ms: &[u32]) -> Result<()> {
        *self.vibrations.lock().unwrap() += 1;
        Ok(())
    }
}

/// Storage whose writes always fail; reads see nothing
#[derive(Debug, Default)]
pub struct FailingStorage;

#[async_trait]
impl DurableStorage for FailingStorage {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Internal("quota exceeded".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Storage whose writes wait until [`GatedStorage::open`] is called
#[derive(Debug)]
pub struct GatedStorage {
    inner: MemoryStorage,
    gate: Semaphore,
}

impl GatedStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Let every pending and future write through
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl DurableStorage for GatedStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}
