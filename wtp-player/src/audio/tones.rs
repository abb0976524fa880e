//! Cue tone patterns and PCM rendering
//!
//! Each cue maps to a short pattern of sine tones plus a vibration pattern.
//! Rendering applies a brief linear fade at both ends of every tone so that
//! beeps start and stop without clicks.

use crate::cues::Cue;

/// Output sample rate for rendered cues
pub const CUE_SAMPLE_RATE: u32 = 44_100;

/// Fade length at each tone edge
const EDGE_FADE_MS: u32 = 5;

/// Peak amplitude of rendered tones (0.0-1.0)
const TONE_AMPLITUDE: f32 = 0.6;

/// One beep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    /// Silence after the tone, before the next one
    pub gap_after_ms: u32,
}

impl Tone {
    const fn new(frequency_hz: f32, duration_ms: u32, gap_after_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            gap_after_ms,
        }
    }
}

/// Tone pattern for a cue
///
/// Countdown ticks rise in pitch as the step runs out; the last second is
/// the most prominent.
pub fn tone_pattern(cue: Cue) -> Vec<Tone> {
    match cue {
        Cue::CountdownTick { remaining } => match remaining {
            3 => vec![Tone::new(660.0, 90, 0)],
            2 => vec![Tone::new(740.0, 90, 0)],
            _ => vec![Tone::new(880.0, 140, 0)],
        },
        Cue::WorkStart => vec![Tone::new(988.0, 120, 60), Tone::new(1319.0, 220, 0)],
        Cue::RestStart => vec![Tone::new(784.0, 160, 60), Tone::new(523.0, 260, 0)],
        Cue::CountdownStart => vec![Tone::new(587.0, 150, 0)],
        Cue::Finish => vec![
            Tone::new(523.0, 160, 40),
            Tone::new(659.0, 160, 40),
            Tone::new(784.0, 160, 40),
            Tone::new(1047.0, 420, 0),
        ],
    }
}

/// Vibration pattern (alternating on/off milliseconds) for a cue
pub fn vibration_pattern(cue: Cue) -> Vec<u32> {
    match cue {
        Cue::CountdownTick { .. } => vec![40],
        Cue::WorkStart => vec![120, 60, 120],
        Cue::RestStart => vec![200],
        Cue::CountdownStart => vec![80],
        Cue::Finish => vec![150, 80, 150, 80, 300],
    }
}

/// Total length of a pattern including gaps
pub fn pattern_duration_ms(tones: &[Tone]) -> u32 {
    tones.iter().map(|t| t.duration_ms + t.gap_after_ms).sum()
}

/// Render a tone pattern to mono f32 PCM
pub fn render_pcm(tones: &[Tone], sample_rate: u32) -> Vec<f32> {
    let samples_per_ms = sample_rate as f32 / 1000.0;
    let total = (pattern_duration_ms(tones) as f32 * samples_per_ms).ceil() as usize;
    let mut out = Vec::with_capacity(total);

    for tone in tones {
        let tone_samples = (tone.duration_ms as f32 * samples_per_ms) as usize;
        let fade_samples = ((EDGE_FADE_MS as f32 * samples_per_ms) as usize)
            .min(tone_samples / 2)
            .max(1);
        let step = 2.0 * std::f32::consts::PI * tone.frequency_hz / sample_rate as f32;

        for n in 0..tone_samples {
            let edge = n.min(tone_samples - 1 - n);
            let gain = if edge < fade_samples {
                edge as f32 / fade_samples as f32
            } else {
                1.0
            };
            out.push((step * n as f32).sin() * TONE_AMPLITUDE * gain);
        }

        let gap_samples = (tone.gap_after_ms as f32 * samples_per_ms) as usize;
        out.extend(std::iter::repeat(0.0).take(gap_samples));
    }

    out
}
