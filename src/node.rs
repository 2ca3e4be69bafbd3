//! Core node trait and context types.

use dasp_graph::{Buffer, Input};

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Contains the graph's sample rate
/// and the buffer size (always [`Buffer::LEN`], 64 frames).
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of frames per buffer
    pub buffer_size: usize,
}

/// Unique identifier for a node within a graph.
///
/// Ids are never reused, so a stale id simply stops resolving once its node
/// has been removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Nodes are one of:
/// - **Sources**: generate audio (0 inputs) - [`BufferSource`](crate::nodes::BufferSource), [`Tone`](crate::nodes::Tone)
/// - **Effects**: process audio - [`Gain`](crate::nodes::Gain), [`Mixer`](crate::nodes::Mixer)
/// - **Sinks**: consume audio (0 outputs) - [`RtrbSink`](crate::nodes::RtrbSink)
///
/// # Message-Based Parameters
///
/// Instead of shared mutable state, nodes receive parameter updates via messages
/// which are drained at the start of each block:
///
/// ```
/// use lull::{AudioNode, ProcessContext};
/// use dasp_graph::{Buffer, Input};
///
/// enum HissMessage {
///     SetLevel(f32),
/// }
///
/// struct Hiss {
///     level: f32,
///     state: u32,
/// }
///
/// impl AudioNode for Hiss {
///     type Message = HissMessage;
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         messages: impl Iterator<Item = HissMessage>,
///         _inputs: &[Input],
///         outputs: &mut [Buffer],
///     ) {
///         for msg in messages {
///             match msg {
///                 HissMessage::SetLevel(l) => self.level = l,
///             }
///         }
///
///         for sample in outputs[0].iter_mut() {
///             self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
///             let white = (self.state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
///             *sample = white * self.level;
///         }
///     }
/// }
/// ```
///
/// Nodes that need no runtime control use `()` as their message type.
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates.
    type Message: Send + 'static;

    /// Process one block of audio.
    ///
    /// Implementations should:
    /// 1. Drain and handle all pending messages
    /// 2. Read from `inputs` (if any)
    /// 3. Write to `outputs`
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    );

    /// Number of audio input channels (0 for sources).
    fn num_inputs(&self) -> usize { 0 }

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }
}
