//! Procedural noise generation for each soundscape.
//!
//! Every soundscape maps to a [`Generator`]: a plain function that fills one
//! [`Channel`] of a buffer from a source of randomness, staying inside
//! [-1, 1] on its own. [`NoiseBuffer::generate`] runs the generator for both
//! channels and crossfades the seam so the buffer loops without a click.
//!
//! ```
//! use lull::noise::{NoiseBuffer, Soundscape};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let rain = NoiseBuffer::generate_with_length(Soundscape::Rain, 8_000, 4_000, 400, &mut rng).unwrap();
//! assert_eq!(rain.frames(), 4_000);
//! assert!(rain.peak() <= 1.0);
//! ```

mod burst;
mod colored;
mod fire;
mod lofi;
mod rain;
mod waves;
mod wind;

use core::fmt;
use core::str::FromStr;
use std::time::Duration;

use rand::RngCore;

use crate::error::EngineError;

/// Fills `data` (zeroed on entry) with one channel of a soundscape.
pub type Generator = fn(&mut [f32], &Channel, &mut dyn RngCore);

/// Number of channels in every generated buffer
pub const CHANNELS: usize = 2;

/// The channel a [`Generator`] is filling, and the loop it has to tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub index: usize,
    pub sample_rate: u32,
    /// Frames in one pass of the loop; the buffer being filled may run past
    /// this by the length of the seam
    pub loop_frames: usize,
}

impl Channel {
    pub fn new(index: usize, sample_rate: u32, loop_frames: usize) -> Self {
        Self {
            index,
            sample_rate,
            loop_frames,
        }
    }

    /// Length in frames of a movement that nominally repeats every `seconds`,
    /// stretched or squeezed so the loop holds a whole number of them.
    pub fn cycle(&self, seconds: f32) -> f32 {
        let nominal = seconds * self.sample_rate as f32;
        let cycles = (self.loop_frames as f32 / nominal).round().max(1.0);
        self.loop_frames as f32 / cycles
    }
}

/// The fixed set of ambient sounds, shared with the UI by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Soundscape {
    /// "Deep Focus": brown noise
    Brown,
    /// "Soft Hum": pink noise
    Pink,
    Rain,
    Wind,
    /// "Fireplace"
    Fire,
    /// "Ocean"
    Waves,
    /// "Lo-Fi": vinyl warmth
    Lofi,
    /// Plain white noise, used for any id that isn't recognised
    White,
}

impl Soundscape {
    /// Soundscapes offered to the user, in display order
    pub const ALL: [Soundscape; 7] = [
        Soundscape::Brown,
        Soundscape::Pink,
        Soundscape::Rain,
        Soundscape::Wind,
        Soundscape::Fire,
        Soundscape::Waves,
        Soundscape::Lofi,
    ];

    /// Resolve an id, falling back to [`Soundscape::White`] for unknown ids.
    pub fn from_id(id: &str) -> Self {
        id.parse().unwrap_or(Soundscape::White)
    }

    pub fn id(self) -> &'static str {
        match self {
            Soundscape::Brown => "brown",
            Soundscape::Pink => "pink",
            Soundscape::Rain => "rain",
            Soundscape::Wind => "wind",
            Soundscape::Fire => "fire",
            Soundscape::Waves => "waves",
            Soundscape::Lofi => "lofi",
            Soundscape::White => "white",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Soundscape::Brown => "Deep Focus",
            Soundscape::Pink => "Soft Hum",
            Soundscape::Rain => "Rain",
            Soundscape::Wind => "Wind",
            Soundscape::Fire => "Fireplace",
            Soundscape::Waves => "Ocean",
            Soundscape::Lofi => "Lo-Fi",
            Soundscape::White => "White Noise",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Soundscape::Brown => "Warm, deep noise",
            Soundscape::Pink => "Balanced ambient",
            Soundscape::Rain => "Gentle rainfall",
            Soundscape::Wind => "Breezy ambience",
            Soundscape::Fire => "Crackling fire",
            Soundscape::Waves => "Ocean waves",
            Soundscape::Lofi => "Vinyl warmth",
            Soundscape::White => "Flat, bright noise",
        }
    }

    pub fn generator(self) -> Generator {
        match self {
            Soundscape::Brown => colored::generate_brown,
            Soundscape::Pink => colored::generate_pink,
            Soundscape::Rain => rain::generate,
            Soundscape::Wind => wind::generate,
            Soundscape::Fire => fire::generate,
            Soundscape::Waves => waves::generate,
            Soundscape::Lofi => lofi::generate,
            Soundscape::White => colored::generate_white,
        }
    }

    /// Shortest loop that still contains this soundscape's slow movement.
    ///
    /// Ocean swells run 7-9 s and wind gusts 4-5.5 s per cycle. These lengths
    /// fit whole cycles on both channels while keeping their periods apart.
    pub fn min_loop(self) -> Duration {
        match self {
            Soundscape::Waves => Duration::from_secs(18),
            Soundscape::Wind => Duration::from_secs(11),
            _ => Duration::ZERO,
        }
    }
}

impl FromStr for Soundscape {
    type Err = EngineError;

    /// Exact match on the canonical ids; see [`Soundscape::from_id`] for the
    /// lenient version.
    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Ok(match id {
            "brown" => Soundscape::Brown,
            "pink" => Soundscape::Pink,
            "rain" => Soundscape::Rain,
            "wind" => Soundscape::Wind,
            "fire" => Soundscape::Fire,
            "waves" => Soundscape::Waves,
            "lofi" => Soundscape::Lofi,
            "white" => Soundscape::White,
            other => return Err(EngineError::InvalidMix(other.to_owned())),
        })
    }
}

impl fmt::Display for Soundscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A generated stereo loop, stored one `Vec` per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseBuffer {
    soundscape: Soundscape,
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl NoiseBuffer {
    /// Generate a loop of at least `length` (longer if the soundscape asks for
    /// it, see [`Soundscape::min_loop`]) with a `crossfade` long seam.
    pub fn generate<R: RngCore>(
        soundscape: Soundscape,
        sample_rate: u32,
        length: Duration,
        crossfade: Duration,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let seconds = length.max(soundscape.min_loop()).as_secs_f64();
        let frames = (seconds * sample_rate as f64).round() as usize;
        let seam = (crossfade.as_secs_f64() * sample_rate as f64).round() as usize;
        Self::generate_with_length(soundscape, sample_rate, frames, seam, rng)
    }

    /// Generate exactly `frames` frames per channel, crossfading a
    /// `seam`-frame region (capped at half the loop).
    pub fn generate_with_length<R: RngCore>(
        soundscape: Soundscape,
        sample_rate: u32,
        frames: usize,
        seam: usize,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        if sample_rate == 0 || frames == 0 {
            return Err(EngineError::InvalidBuffer { sample_rate, frames });
        }

        let seam = seam.min(frames / 2);
        let generator = soundscape.generator();

        let channels = (0..CHANNELS)
            .map(|channel| {
                // Render `seam` extra frames that get folded back over the start
                let mut data = vec![0.0f32; frames + seam];
                generator(&mut data, &Channel::new(channel, sample_rate, frames), &mut *rng);
                fold_seam(&mut data, seam);
                // Generators already stay in range; this only catches NaN
                for sample in data.iter_mut() {
                    *sample = if sample.is_finite() { sample.clamp(-1.0, 1.0) } else { 0.0 };
                }
                data
            })
            .collect();

        Ok(Self {
            soundscape,
            sample_rate,
            channels,
        })
    }

    pub fn soundscape(&self) -> Soundscape {
        self.soundscape
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample value across channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

/// Crossfade the last `seam` frames into the first `seam` and drop them, so
/// the frame after the new end is (almost) the one that followed it originally.
fn fold_seam(data: &mut Vec<f32>, seam: usize) {
    if seam == 0 {
        return;
    }
    let len = data.len() - seam;
    for k in 0..seam {
        let t = k as f32 / seam as f32;
        data[k] = data[k] * t + data[len + k] * (1.0 - t);
    }
    data.truncate(len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn unknown_ids_fall_back_to_white() {
        assert_eq!(Soundscape::from_id("brown"), Soundscape::Brown);
        assert_eq!(Soundscape::from_id("thunderstorm"), Soundscape::White);
        assert_eq!(Soundscape::from_id(""), Soundscape::White);
        assert!("thunderstorm".parse::<Soundscape>().is_err());
    }

    #[test]
    fn ids_round_trip() {
        for soundscape in Soundscape::ALL.iter().copied().chain(Some(Soundscape::White)) {
            assert_eq!(soundscape.id().parse::<Soundscape>(), Ok(soundscape));
            assert_eq!(soundscape.to_string(), soundscape.id());
        }
    }

    #[test]
    fn loop_length_honours_the_soundscape_minimum() {
        let mut rng = StdRng::seed_from_u64(0);
        let brown = NoiseBuffer::generate(Soundscape::Brown, 1_000, Duration::from_secs(4), Duration::from_millis(50), &mut rng).unwrap();
        assert_eq!(brown.frames(), 4_000);
        assert_eq!(brown.channels(), CHANNELS);
        assert_eq!(brown.duration(), Duration::from_secs(4));

        let waves = NoiseBuffer::generate(Soundscape::Waves, 1_000, Duration::from_secs(4), Duration::from_millis(50), &mut rng).unwrap();
        assert_eq!(waves.frames(), 18_000);
    }

    #[test]
    fn cycles_divide_the_loop() {
        let channel = Channel::new(0, 1_000, 11_000);
        // Wind's 4 s gust becomes three 3.67 s gusts
        assert!((channel.cycle(4.0) * 3.0 - 11_000.0).abs() < 1.0e-2);
        assert_eq!(channel.cycle(5.5), 5_500.0);
        // A movement longer than the loop still gets one cycle
        assert_eq!(channel.cycle(30.0), 11_000.0);
    }

    #[test]
    fn empty_buffers_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            NoiseBuffer::generate_with_length(Soundscape::Rain, 0, 100, 0, &mut rng),
            Err(EngineError::InvalidBuffer { sample_rate: 0, frames: 100 })
        );
        assert!(NoiseBuffer::generate(Soundscape::Rain, 44_100, Duration::ZERO, Duration::ZERO, &mut rng).is_err());
    }

    #[test]
    fn seam_is_continuous() {
        let mut data: Vec<f32> = (0..120).map(|i| i as f32).collect();
        fold_seam(&mut data, 20);
        assert_eq!(data.len(), 100);
        // Wrapping from the last frame to the first continues the original ramp
        assert_eq!(data[99], 99.0);
        assert_eq!(data[0], 100.0);
        assert!((data[19] - (19.0 * 0.95 + 119.0 * 0.05)).abs() < 1.0e-4);
    }

    #[test]
    fn loops_without_a_jump_at_the_seam() {
        let mut rng = StdRng::seed_from_u64(8);
        let buffer = NoiseBuffer::generate_with_length(Soundscape::Brown, 8_000, 8_000, 400, &mut rng).unwrap();
        for ch in 0..buffer.channels() {
            let data = buffer.channel(ch);
            let wrap = (data[0] - data[data.len() - 1]).abs();
            let typical = data.windows(2).map(|w| (w[1] - w[0]).abs()).fold(0.0f32, f32::max);
            assert!(wrap <= typical, "wrap step {} exceeds largest interior step {}", wrap, typical);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = NoiseBuffer::generate_with_length(Soundscape::Fire, 4_000, 1_000, 100, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = NoiseBuffer::generate_with_length(Soundscape::Fire, 4_000, 1_000, 100, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }
}
