//! Error type shared by the engine, graph and devices.

use thiserror::Error;

use crate::node::NodeId;

/// Everything that can go wrong below the [`Engine`](crate::Engine) surface.
///
/// The engine itself never hands these to its caller: public engine
/// operations log them and carry on. Lower-level helpers such as
/// [`NoiseBuffer::generate`](crate::noise::NoiseBuffer::generate) and
/// [`MixerConfig`](crate::MixerConfig) parsing do return them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No audio output could be opened.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    /// The output stream failed to build, play or pause.
    #[error("output stream error: {0}")]
    Stream(String),

    /// The output is suspended and could not be resumed.
    #[error("output is suspended")]
    Suspended,

    /// A noise buffer was requested with a zero sample rate or no frames.
    #[error("cannot generate a buffer of {frames} frames at {sample_rate} Hz")]
    InvalidBuffer { sample_rate: u32, frames: usize },

    /// A node id that is not (or no longer) part of the graph.
    #[error("node {0:?} is not in the graph")]
    UnknownNode(NodeId),

    /// A mixer configuration string could not be parsed.
    #[error("invalid mixer entry {0:?}, expected `id=volume`")]
    InvalidMix(String),
}
