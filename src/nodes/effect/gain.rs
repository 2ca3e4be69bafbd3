//! Gain/volume control effect with click-free automation

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use dasp_graph::{Buffer, Input};
use crate::node::{AudioNode, ProcessContext};

/// Messages to control gain.
///
/// Every message cancels whatever automation is in flight and starts from the
/// gain's value at the start of the block in which it is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GainMessage {
    /// Jump to a value immediately
    Set(f32),
    /// Ramp linearly to `target` over `frames` frames
    RampTo { target: f32, frames: u32 },
    /// Approach `target` exponentially; after `time_constant` frames ~63% of
    /// the distance is covered
    Approach { target: f32, time_constant: f32 },
}

#[derive(Clone, Copy, Debug)]
enum Automation {
    Hold,
    Linear { step: f32, remaining: u32, target: f32 },
    Approach { target: f32, coeff: f32 },
}

/// Shared read-only view of a [`Gain`]'s current value.
///
/// Updated once per processed block.
#[derive(Clone, Debug)]
pub struct GainProbe(Arc<AtomicU32>);

impl GainProbe {
    fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// Below this distance an exponential approach is considered done.
const SETTLE_EPSILON: f32 = 1.0e-5;

/// A gain (volume) control that passes audio through with amplitude scaling
///
/// Supports any number of channels - each input channel maps to corresponding output.
pub struct Gain {
    current: f32,
    automation: Automation,
    probe: GainProbe,
}

impl Gain {
    /// Create a new gain node holding the specified value
    pub fn new(gain: f32) -> Self {
        Self {
            current: gain,
            automation: Automation::Hold,
            probe: GainProbe::new(gain),
        }
    }

    /// Start with a linear ramp already scheduled (builder pattern)
    pub fn ramp_to(mut self, target: f32, frames: u32) -> Self {
        self.apply(GainMessage::RampTo { target, frames });
        self
    }

    /// A probe that observes this node's value after it has been moved into a graph
    pub fn probe(&self) -> GainProbe {
        self.probe.clone()
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.current
    }

    fn apply(&mut self, msg: GainMessage) {
        self.automation = match msg {
            GainMessage::Set(g) => {
                self.current = g;
                Automation::Hold
            }
            GainMessage::RampTo { target, frames: 0 } => {
                self.current = target;
                Automation::Hold
            }
            GainMessage::RampTo { target, frames } => Automation::Linear {
                step: (target - self.current) / frames as f32,
                remaining: frames,
                target,
            },
            GainMessage::Approach { target, time_constant } if time_constant <= 0.0 => {
                self.current = target;
                Automation::Hold
            }
            GainMessage::Approach { target, time_constant } => Automation::Approach {
                target,
                coeff: (-1.0 / time_constant).exp(),
            },
        };
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        match self.automation {
            Automation::Hold => {}
            Automation::Linear { target, remaining, .. } if remaining <= 1 => {
                self.current = target;
                self.automation = Automation::Hold;
            }
            Automation::Linear { step, remaining, target } => {
                self.current += step;
                self.automation = Automation::Linear { step, remaining: remaining - 1, target };
            }
            Automation::Approach { target, coeff } => {
                self.current = target + coeff * (self.current - target);
                if (self.current - target).abs() < SETTLE_EPSILON {
                    self.current = target;
                    self.automation = Automation::Hold;
                }
            }
        }
        self.current
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = GainMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            self.apply(msg);
        }

        // Envelope is computed once per frame so all channels track together
        let mut envelope = [0.0f32; Buffer::LEN];
        for value in envelope.iter_mut() {
            *value = self.tick();
        }
        self.probe.store(self.current);

        let in_buffers = inputs.first().map(|input| input.buffers()).unwrap_or(&[]);

        for (ch, out_buffer) in outputs.iter_mut().enumerate() {
            // Get input for this channel, or last available channel
            let Some(in_buffer) = in_buffers.get(ch).or_else(|| in_buffers.last()) else {
                out_buffer.silence();
                continue;
            };

            for ((out_sample, &in_sample), &gain) in
                out_buffer.iter_mut().zip(in_buffer.iter()).zip(envelope.iter())
            {
                *out_sample = in_sample * gain;
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 2 } // Stereo pass-through by default
}
