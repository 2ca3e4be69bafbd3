//! Looping playback of a generated noise buffer

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};
use crate::noise::NoiseBuffer;

/// Plays a [`NoiseBuffer`] on an endless loop.
///
/// The buffer is owned by the node: each track gets its own source, and the
/// samples are released when the node is removed from the graph.
pub struct BufferSource {
    buffer: NoiseBuffer,
    position: usize,
}

impl BufferSource {
    pub fn new(buffer: NoiseBuffer) -> Self {
        Self { buffer, position: 0 }
    }

    /// Current playback position in frames
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl AudioNode for BufferSource {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        let frames = self.buffer.frames();
        if outputs.is_empty() || frames == 0 {
            return;
        }

        let channels = self.buffer.channels();
        let start = self.position;

        for (ch, out_buffer) in outputs.iter_mut().enumerate() {
            // Map output channel to source channel (wrap if more outputs than source)
            let data = self.buffer.channel(ch % channels);
            let mut pos = start;
            for sample in out_buffer.iter_mut() {
                *sample = data[pos];
                pos += 1;
                if pos == frames {
                    pos = 0;
                }
            }
        }

        self.position = (start + Buffer::LEN) % frames;
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.buffer.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{NoiseBuffer, Soundscape};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn wraps_around_the_loop_point() {
        let mut rng = StdRng::seed_from_u64(7);
        // 100 frames is not a multiple of the block size
        let buffer = NoiseBuffer::generate_with_length(Soundscape::Pink, 8_000, 100, 0, &mut rng).unwrap();
        let expected: Vec<f32> = (0..Buffer::LEN * 3).map(|i| buffer.channel(1)[i % 100]).collect();

        let mut source = BufferSource::new(buffer);
        let ctx = ProcessContext { sample_rate: 8_000, buffer_size: Buffer::LEN };
        let mut rendered = Vec::new();
        for _ in 0..3 {
            let mut outputs = [Buffer::SILENT, Buffer::SILENT];
            source.process(&ctx, core::iter::empty(), &[], &mut outputs);
            rendered.extend_from_slice(&outputs[1]);
        }

        assert_eq!(rendered, expected);
        assert_eq!(source.position(), (Buffer::LEN * 3) % 100);
    }
}
