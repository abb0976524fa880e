//! Audio and haptic cue output

pub mod output;
pub mod service;
pub mod tones;

pub use output::{CueOutput, TerminalBellOutput, TracingCueOutput};
pub use service::{AudioService, ContextState};
pub use tones::Tone;
