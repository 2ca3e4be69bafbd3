//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio with no audio inputs:
//! - [`BufferSource`] - Loop a generated [`NoiseBuffer`](crate::noise::NoiseBuffer)
//! - [`Tone`] - One-shot oscillator with a decaying envelope
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Gain`] - Volume control with linear ramps and exponential approach
//! - [`Mixer`] - Sum multiple inputs together
//!
//! ## Sinks ([`sink`])
//!
//! Consume audio with no audio outputs:
//! - [`RtrbSink`] - Write to the ring buffer an output device reads from
//!
//! Only [`Gain`] takes runtime messages ([`GainMessage`]); the other nodes use
//! `()` as their message type.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::{BufferSource, Tone};
pub use effect::{Gain, GainMessage, GainProbe, Mixer};
pub use sink::RtrbSink;

pub use crate::effects::{ToneSpec, Waveform};
