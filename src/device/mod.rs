//! Audio output devices.
//!
//! The engine renders into an rtrb ring buffer; an [`OutputDevice`] owns the
//! consumer end and plays whatever it finds there. A [`Backend`] opens devices,
//! and is asked again whenever the engine has no working output.
//!
//! Two backends ship with the crate:
//! - [`Offline`] - an in-memory device for tests and offline rendering
//! - [`CpalBackend`] - the system's default output (feature `cpal_sink`)

mod offline;
#[cfg(feature = "cpal_sink")]
mod cpal_output;

pub use offline::Offline;
#[cfg(feature = "cpal_sink")]
pub use cpal_output::CpalBackend;

use rtrb::Consumer;

use crate::error::EngineError;

/// Format of an opened output stream (always interleaved f32 on our side).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamConfig {
    /// Ring buffer capacity in samples: ~100ms of audio, at least 8192 samples
    pub fn ring_size(&self) -> usize {
        let samples = (self.sample_rate as f32 * 0.1) as usize * self.channels as usize;
        samples.next_power_of_two().max(8192)
    }
}

/// An opened output device.
pub trait OutputDevice {
    fn config(&self) -> StreamConfig;

    /// Begin playing interleaved samples from `consumer`.
    fn start(&mut self, consumer: Consumer<f32>) -> Result<(), EngineError>;

    /// Whether the device is holding playback until it is resumed
    fn is_suspended(&self) -> bool;

    /// Try to leave the suspended state.
    fn resume(&mut self) -> Result<(), EngineError>;

    /// Total samples (not frames) taken from the ring so far
    fn samples_consumed(&self) -> u64;
}

/// Something that can open an [`OutputDevice`].
pub trait Backend {
    fn open(&mut self) -> Result<Box<dyn OutputDevice>, EngineError>;
}

/// Fill `out` from the ring, converting each sample, and pad with silence
/// once the ring runs dry.
///
/// Returns how many samples came out of the ring. Padding is not counted:
/// the engine paces itself on that number, so counting silence would let it
/// render past what the ring can hold.
#[cfg_attr(not(feature = "cpal_sink"), allow(dead_code))]
pub(crate) fn pull<T>(consumer: &mut Consumer<f32>, out: &mut [T], convert: impl Fn(f32) -> T) -> usize {
    let popped = out.len().min(consumer.slots());
    for (i, sample) in out.iter_mut().enumerate() {
        let value = if i < popped { consumer.pop().unwrap_or(0.0) } else { 0.0 };
        *sample = convert(value);
    }
    popped
}


#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    #[test]
    fn underrun_padding_is_not_counted() {
        let (mut producer, mut consumer) = RingBuffer::new(16);
        for i in 1..=5 {
            producer.push(i as f32 * 0.1).unwrap();
        }

        let mut out = [1i16; 8];
        let popped = pull(&mut consumer, &mut out, |s| (s * 10.0).round() as i16);
        assert_eq!(popped, 5);
        assert_eq!(out, [1, 2, 3, 4, 5, 0, 0, 0]);

        assert_eq!(pull(&mut consumer, &mut out, |s| s as i16), 0);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn ring_holds_about_a_tenth_of_a_second() {
        assert_eq!(StreamConfig { sample_rate: 44_100, channels: 2 }.ring_size(), 16_384);
        assert_eq!(StreamConfig { sample_rate: 8_000, channels: 1 }.ring_size(), 8_192);
    }
}
