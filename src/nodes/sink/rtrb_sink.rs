//! Master output - hands each rendered block to the device's ring buffer

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};

/// Writes the master bus into an rtrb ring as interleaved frames.
///
/// The engine's graph terminates in one of these; the consumer end belongs to
/// the [`OutputDevice`](crate::device::OutputDevice). A block only goes in
/// whole: when the device has fallen behind and the ring can't take all of
/// it, the block is dropped.
pub struct RtrbSink {
    ring: Producer<f32>,
    channels: usize,
}

impl RtrbSink {
    pub fn new(ring: Producer<f32>, channels: usize) -> Self {
        Self {
            ring,
            channels: channels.max(1),
        }
    }
}

impl AudioNode for RtrbSink {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let Some(master) = inputs.first().map(Input::buffers) else {
            return;
        };
        let Some(last) = master.len().checked_sub(1) else {
            return;
        };

        let frames = master[0].len();
        let channels = self.channels;
        let Ok(chunk) = self.ring.write_chunk_uninit(frames * channels) else {
            return;
        };

        // A mono master feeds every device channel
        let interleaved = (0..frames).flat_map(|i| (0..channels).map(move |ch| master[ch.min(last)][i]));
        chunk.fill_from_iter(interleaved);
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
