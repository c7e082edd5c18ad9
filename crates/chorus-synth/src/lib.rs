//! # chorus-synth
//!
//! Tone synthesis and the playback model the session server drives.
//!
//! - [`oscillator`]: pure `(ToneParams, RenderSpec) -> StereoBuffer` rendering
//!   of a phase-modulated sine carrier with linear panning
//! - [`buffer`]: interleaved 16-bit stereo PCM
//! - [`voice`]: the [`AudioSink`]/[`Voice`] seam standing in for an output
//!   device, plus a clock-driven [`HeadlessSink`]
//! - [`fade`]: block-driven fade-in ramp applied during playback

#![deny(unsafe_code)]

pub mod buffer;
pub mod fade;
pub mod oscillator;
pub mod voice;

pub use buffer::StereoBuffer;
pub use fade::{FadeIn, FadeOutcome};
pub use oscillator::{LfoShape, RenderSpec, ToneParams, synthesize};
pub use voice::{AudioSink, ClockVoice, HeadlessSink, Voice};
