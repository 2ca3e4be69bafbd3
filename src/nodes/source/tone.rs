//! One-shot tone: an oscillator with an exponential decay envelope

use dasp_graph::{Buffer, Input};

use crate::effects::{ToneSpec, Waveform};
use crate::node::{AudioNode, ProcessContext};

// Level the decay envelope reaches at the end of the tone
const DECAY_FLOOR: f32 = 0.01;

/// A short, non-looping tone (mono source).
///
/// Silent for `delay` frames, then sounds for `duration` frames while its level
/// decays exponentially from the starting volume towards [`DECAY_FLOOR`], and
/// is silent again afterwards.
pub struct Tone {
    waveform: Waveform,
    phase: f32,
    phase_inc: f32,
    level: f32,
    decay: f32,
    delay: u32,
    remaining: u32,
}

impl Tone {
    pub fn new(spec: ToneSpec, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        let duration = (spec.duration.as_secs_f32() * rate).round() as u32;
        let volume = spec.volume.clamp(0.0, 1.0);

        // level(t) = volume * (floor / volume)^(t / duration)
        let decay = if duration == 0 || volume <= DECAY_FLOOR {
            1.0
        } else {
            (DECAY_FLOOR / volume).powf(1.0 / duration as f32)
        };

        Self {
            waveform: spec.waveform,
            phase: 0.0,
            phase_inc: spec.frequency.max(0.0) / rate,
            level: volume,
            decay,
            delay: (spec.delay.as_secs_f32() * rate).round() as u32,
            remaining: duration,
        }
    }

    /// True once the tone has played out
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.delay == 0 && self.remaining == 0
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        if self.remaining == 0 {
            return 0.0;
        }
        self.remaining -= 1;

        let raw = match self.waveform {
            Waveform::Sine => (self.phase * core::f32::consts::TAU).sin(),
            Waveform::Square => if self.phase < 0.5 { 1.0 } else { -1.0 },
        };
        let sample = raw * self.level;

        self.level *= self.decay;
        self.phase += self.phase_inc;
        // Branchless phase wrap (phase is always positive)
        self.phase -= (self.phase >= 1.0) as u32 as f32;
        sample
    }
}

impl AudioNode for Tone {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        let Some((first, rest)) = outputs.split_first_mut() else {
            return;
        };

        if self.is_finished() {
            first.silence();
        } else {
            for sample in first.iter_mut() {
                *sample = self.next_sample();
            }
        }

        // Copy to remaining output channels (if any)
        for buffer in rest.iter_mut() {
            buffer.copy_from_slice(first);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
