//! Process-wide audio service
//!
//! Exactly one audio context exists per process. It is created lazily on the
//! first unlock attempt (platforms only allow audio after a user gesture),
//! suspended when the app goes to the background and resumed on return.
//!
//! Audio is never fatal: an output that fails to open, resume or play is
//! logged and the workout continues silently.

use crate::audio::output::{CueOutput, TracingCueOutput};
use crate::audio::tones::{tone_pattern, vibration_pattern};
use crate::cues::Cue;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

static GLOBAL: Lazy<Mutex<Option<Arc<AudioService>>>> = Lazy::new(|| Mutex::new(None));

/// Lifecycle of the underlying audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Not created yet (no unlock attempt)
    Closed,
    Running,
    Suspended,
    /// Last open/resume failed; the next unlock retries
    Failed,
}

pub struct AudioService {
    output: Arc<dyn CueOutput>,
    state: Mutex<ContextState>,
    sound_enabled: AtomicBool,
    vibration_enabled: AtomicBool,
    /// Device has a vibration motor (configuration, not a preference)
    haptics_available: AtomicBool,
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService")
            .field("output", &self.output.name())
            .field("state", &self.state())
            .field("sound_enabled", &self.sound_enabled())
            .field("vibration_enabled", &self.vibration_enabled())
            .finish()
    }
}

impl AudioService {
    /// Standalone service (tests, embedding); most callers want [`global`](Self::global)
    pub fn new(output: Arc<dyn CueOutput>) -> Self {
        Self {
            output,
            state: Mutex::new(ContextState::Closed),
            sound_enabled: AtomicBool::new(true),
            vibration_enabled: AtomicBool::new(true),
            haptics_available: AtomicBool::new(true),
        }
    }

    /// The process-wide service, created with a [`TracingCueOutput`] on first use
    pub fn global() -> Arc<AudioService> {
        let mut slot = lock(&GLOBAL);
        Arc::clone(slot.get_or_insert_with(|| Arc::new(AudioService::new(Arc::new(TracingCueOutput::new())))))
    }

    /// Install the process-wide service with a specific output.
    ///
    /// Replaces any existing instance; players created afterwards see the new one.
    pub fn install_global(output: Arc<dyn CueOutput>) -> Arc<AudioService> {
        let service = Arc::new(AudioService::new(output));
        info!("Audio service installed ({})", service.output.name());
        *lock(&GLOBAL) = Some(Arc::clone(&service));
        service
    }

    /// Drop the process-wide instance (test isolation)
    pub fn reset_global() {
        *lock(&GLOBAL) = None;
    }

    pub fn state(&self) -> ContextState {
        *lock(&self.state)
    }

    /// Make audio usable after a user gesture.
    ///
    /// Opens the context on the first call, resumes a suspended one after
    /// that. Returns whether audio is running afterwards.
    pub fn unlock(&self) -> bool {
        let mut state = lock(&self.state);
        let result = match *state {
            ContextState::Running => return true,
            ContextState::Closed | ContextState::Failed => self.output.open(),
            ContextState::Suspended => self.output.resume(),
        };
        match result {
            Ok(()) => {
                debug!("Audio context running ({})", self.output.name());
                *state = ContextState::Running;
                true
            }
            Err(e) => {
                warn!("Audio unavailable, continuing silently: {}", e);
                *state = ContextState::Failed;
                false
            }
        }
    }

    /// Return from background. A context that was never opened stays closed
    /// until the next gesture-driven unlock.
    pub fn resume(&self) {
        let mut state = lock(&self.state);
        if *state != ContextState::Suspended {
            return;
        }
        match self.output.resume() {
            Ok(()) => *state = ContextState::Running,
            Err(e) => {
                warn!("Failed to resume audio context: {}", e);
                *state = ContextState::Failed;
            }
        }
    }

    /// Going to background
    pub fn suspend(&self) {
        let mut state = lock(&self.state);
        if *state != ContextState::Running {
            return;
        }
        match self.output.suspend() {
            Ok(()) => *state = ContextState::Suspended,
            Err(e) => warn!("Failed to suspend audio context: {}", e),
        }
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::Relaxed)
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.sound_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn vibration_enabled(&self) -> bool {
        self.vibration_enabled.load(Ordering::Relaxed)
    }

    pub fn set_vibration_enabled(&self, enabled: bool) {
        self.vibration_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_haptics_available(&self, available: bool) {
        self.haptics_available.store(available, Ordering::Relaxed);
    }

    /// Play a cue with its vibration.
    ///
    /// The sound preference silences both. Returns whether a tone was
    /// actually played.
    pub fn play(&self, cue: Cue) -> bool {
        if !self.sound_enabled() {
            return false;
        }

        if self.vibration_enabled() && self.haptics_available.load(Ordering::Relaxed) {
            if let Err(e) = self.output.vibrate(&vibration_pattern(cue)) {
                debug!("Vibration failed for {}: {}", cue, e);
            }
        }

        if self.state() != ContextState::Running {
            debug!("Cue {} dropped: audio context {:?}", cue, self.state());
            return false;
        }

        match self.output.play(cue, &tone_pattern(cue)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to play cue {}: {}", cue, e);
                false
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tones::Tone;
    use serial_test::serial;
    use std::sync::atomic::AtomicUsize;
    use wtp_common::{Error, Result};

    #[derive(Default)]
    struct FlakyOutput {
        fail_open: AtomicBool,
        opens: AtomicUsize,
        plays: AtomicUsize,
        vibrations: AtomicUsize,
    }

    impl CueOutput for FlakyOutput {
        fn name(&self) -> &'static str {
            "flaky"
        }
        fn open(&self) -> Result<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_open.load(Ordering::SeqCst) {
                Err(Error::Audio("no device".to_string()))
            } else {
                Ok(())
            }
        }
        fn resume(&self) -> Result<()> {
            Ok(())
        }
        fn suspend(&self) -> Result<()> {
            Ok(())
        }
        fn play(&self, _cue: Cue, _tones: &[Tone]) -> Result<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn vibrate(&self, _pattern_ms: &[u32]) -> Result<()> {
            self.vibrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_context_is_lazy() {
        let output = Arc::new(FlakyOutput::default());
        let service = AudioService::new(output.clone());
        assert_eq!(service.state(), ContextState::Closed);
        assert!(!service.play(Cue::WorkStart));
        assert_eq!(output.opens.load(Ordering::SeqCst), 0);

        assert!(service.unlock());
        assert!(service.unlock());
        assert_eq!(output.opens.load(Ordering::SeqCst), 1);
        assert!(service.play(Cue::WorkStart));
    }

    #[test]
    fn test_open_failure_degrades_to_silence_and_retries() {
        let output = Arc::new(FlakyOutput::default());
        output.fail_open.store(true, Ordering::SeqCst);
        let service = AudioService::new(output.clone());

        assert!(!service.unlock());
        assert_eq!(service.state(), ContextState::Failed);
        assert!(!service.play(Cue::Finish));

        output.fail_open.store(false, Ordering::SeqCst);
        assert!(service.unlock());
        assert_eq!(output.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_suspend_resume_cycle() {
        let service = AudioService::new(Arc::new(FlakyOutput::default()));
        service.suspend();
        assert_eq!(service.state(), ContextState::Closed);

        service.unlock();
        service.suspend();
        assert_eq!(service.state(), ContextState::Suspended);
        assert!(!service.play(Cue::RestStart));

        service.resume();
        assert_eq!(service.state(), ContextState::Running);
    }

    #[test]
    fn test_sound_preference_silences_tone_and_vibration() {
        let output = Arc::new(FlakyOutput::default());
        let service = AudioService::new(output.clone());
        service.unlock();
        service.set_sound_enabled(false);

        assert!(!service.play(Cue::WorkStart));
        assert_eq!(output.plays.load(Ordering::SeqCst), 0);
        assert_eq!(output.vibrations.load(Ordering::SeqCst), 0);

        service.set_sound_enabled(true);
        service.set_vibration_enabled(false);
        assert!(service.play(Cue::WorkStart));
        assert_eq!(output.vibrations.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[serial]
    fn test_global_is_shared_until_reset() {
        AudioService::reset_global();
        let a = AudioService::global();
        let b = AudioService::global();
        assert!(Arc::ptr_eq(&a, &b));

        AudioService::reset_global();
        let c = AudioService::global();
        assert!(!Arc::ptr_eq(&a, &c));
        AudioService::reset_global();
    }

    #[test]
    #[serial]
    fn test_install_global_replaces_instance() {
        AudioService::reset_global();
        let installed = AudioService::install_global(Arc::new(FlakyOutput::default()));
        assert!(Arc::ptr_eq(&installed, &AudioService::global()));
        AudioService::reset_global();
    }
}
