//! Cue output devices
//!
//! The player never talks to a sound card directly. An implementation of
//! [`CueOutput`] owns the platform side (audio context, speaker, vibration
//! motor); [`AudioService`](super::AudioService) drives it.

use crate::audio::tones::{pattern_duration_ms, render_pcm, Tone, CUE_SAMPLE_RATE};
use crate::cues::Cue;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use wtp_common::{Error, Result};

/// Platform audio/haptic sink
///
/// All calls are made from the player task; implementations must not block
/// for longer than it takes to queue the sound.
pub trait CueOutput: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Create the audio context. Called once, on the first unlock.
    fn open(&self) -> Result<()>;

    /// Resume a suspended context
    fn resume(&self) -> Result<()>;

    /// Suspend the context (backgrounded)
    fn suspend(&self) -> Result<()>;

    /// Play one cue
    fn play(&self, cue: Cue, tones: &[Tone]) -> Result<()>;

    /// Run a vibration pattern (alternating on/off ms)
    fn vibrate(&self, pattern_ms: &[u32]) -> Result<()>;
}

/// Output that only logs; used headless and as the process default
#[derive(Debug, Default)]
pub struct TracingCueOutput {
    played: AtomicU64,
}

impl TracingCueOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cues played since creation
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }
}

impl CueOutput for TracingCueOutput {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn open(&self) -> Result<()> {
        debug!("Cue output opened (tracing)");
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn suspend(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self, cue: Cue, tones: &[Tone]) -> Result<()> {
        self.played.fetch_add(1, Ordering::Relaxed);
        let samples = render_pcm(tones, CUE_SAMPLE_RATE).len();
        debug!(
            "Cue {} ({} tones, {} ms, {} samples)",
            cue,
            tones.len(),
            pattern_duration_ms(tones),
            samples
        );
        Ok(())
    }

    fn vibrate(&self, pattern_ms: &[u32]) -> Result<()> {
        debug!("Vibrate {:?}", pattern_ms);
        Ok(())
    }
}

/// Rings the terminal bell once per tone
///
/// The terminal has no pitch control, so every cue collapses to a bell
/// count. There is no vibration motor.
#[derive(Debug, Default)]
pub struct TerminalBellOutput;

impl TerminalBellOutput {
    pub fn new() -> Self {
        Self
    }
}

impl CueOutput for TerminalBellOutput {
    fn name(&self) -> &'static str {
        "terminal-bell"
    }

    fn open(&self) -> Result<()> {
        info!("Using terminal bell for cues");
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn suspend(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self, _cue: Cue, tones: &[Tone]) -> Result<()> {
        let bells = "\x07".repeat(tones.len().max(1));
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(bells.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| Error::Audio(format!("terminal bell failed: {}", e)))
    }

    fn vibrate(&self, _pattern_ms: &[u32]) -> Result<()> {
        Ok(())
    }
}
