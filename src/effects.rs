//! One-shot sound effects: short tones played independently of the ambient mix.

use std::time::Duration;

/// Oscillator shape of a one-shot tone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
}

/// Description of a single decaying tone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    /// Frequency in Hz
    pub frequency: f32,
    pub waveform: Waveform,
    /// Time from onset until the tone is stopped
    pub duration: Duration,
    /// Starting level; decays exponentially to near-silence over `duration`
    pub volume: f32,
    /// Silence before the onset
    pub delay: Duration,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            waveform: Waveform::Sine,
            duration: Duration::from_millis(500),
            volume: 0.1,
            delay: Duration::ZERO,
        }
    }
}

impl ToneSpec {
    pub fn new(frequency: f32, waveform: Waveform, duration: Duration, volume: f32) -> Self {
        Self {
            frequency,
            waveform,
            duration,
            volume,
            delay: Duration::ZERO,
        }
    }

    /// Delay the onset (builder pattern)
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay plus duration
    pub fn end(&self) -> Duration {
        self.delay + self.duration
    }
}

/// Named effects the application plays on timer and task events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Task completed: two rising sine tones in quick succession (C5, E5)
    Complete,
    /// Timer finished: three short square beeps
    Alarm,
}

impl Effect {
    /// The tones making up this effect, each with its own onset delay.
    pub fn tones(self) -> Vec<ToneSpec> {
        match self {
            Effect::Complete => {
                let chime = |frequency| ToneSpec::new(frequency, Waveform::Sine, Duration::from_millis(600), 0.1);
                vec![chime(523.25), chime(659.25).after(Duration::from_millis(100))]
            }
            Effect::Alarm => [0, 200, 400]
                .iter()
                .map(|&ms| {
                    ToneSpec::new(880.0, Waveform::Square, Duration::from_millis(100), 0.05)
                        .after(Duration::from_millis(ms))
                })
                .collect(),
        }
    }
}
