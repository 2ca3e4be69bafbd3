//! Engine tuning.

use std::time::Duration;

/// Tuning knobs for an [`Engine`](crate::Engine).
///
/// Durations are converted to frames at the output's sample rate when the
/// engine opens its device.
///
/// ```
/// use std::time::Duration;
/// use lull::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_seed(7)
///     .with_fade_in(Duration::from_millis(800));
/// assert_eq!(config.fade_out, Duration::from_millis(300));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Scales every track's logical volume so several tracks can sum without clipping
    pub attenuation: f32,
    /// Linear ramp from silence when a track starts
    pub fade_in: Duration,
    /// Linear ramp to silence when a track stops
    pub fade_out: Duration,
    /// Extra time after the fade-out before the track's nodes are released
    pub release_margin: Duration,
    /// Time constant of the exponential approach used for volume changes
    pub volume_time_constant: Duration,
    /// Requested length of each generated loop
    pub loop_length: Duration,
    /// Length of the crossfaded seam at the loop point
    pub loop_crossfade: Duration,
    /// Seed for noise generation; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Capacity of each node's message queue
    pub queue_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attenuation: 0.2,
            fade_in: Duration::from_millis(500),
            fade_out: Duration::from_millis(300),
            release_margin: Duration::from_millis(50),
            volume_time_constant: Duration::from_millis(15),
            loop_length: Duration::from_secs(4),
            loop_crossfade: Duration::from_millis(50),
            seed: None,
            queue_size: 64,
        }
    }
}

impl EngineConfig {
    pub fn with_attenuation(mut self, attenuation: f32) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn with_fade_in(mut self, fade_in: Duration) -> Self {
        self.fade_in = fade_in;
        self
    }

    pub fn with_fade_out(mut self, fade_out: Duration) -> Self {
        self.fade_out = fade_out;
        self
    }

    pub fn with_release_margin(mut self, margin: Duration) -> Self {
        self.release_margin = margin;
        self
    }

    pub fn with_volume_time_constant(mut self, time_constant: Duration) -> Self {
        self.volume_time_constant = time_constant;
        self
    }

    pub fn with_loop_length(mut self, length: Duration) -> Self {
        self.loop_length = length;
        self
    }

    pub fn with_loop_crossfade(mut self, crossfade: Duration) -> Self {
        self.loop_crossfade = crossfade;
        self
    }

    /// Generate noise from a fixed seed (reproducible renders)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Human-readable problems with the relative timings, if any.
    ///
    /// Fade-in should be slower than fade-out, and volume changes should settle
    /// well inside either fade.
    pub(crate) fn timing_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.fade_in <= self.fade_out {
            warnings.push("fade_in is not longer than fade_out");
        }
        if self.volume_time_constant >= self.fade_out.min(self.fade_in) {
            warnings.push("volume_time_constant is not shorter than the fades");
        }
        warnings
    }
}

/// Convert a duration to a whole number of frames
pub(crate) fn frames(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_secs_f64() * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_timing_relationships() {
        assert!(EngineConfig::default().timing_warnings().is_empty());
    }

    #[test]
    fn inverted_fades_are_reported() {
        let config = EngineConfig::default()
            .with_fade_in(Duration::from_millis(100))
            .with_volume_time_constant(Duration::from_millis(200));
        assert_eq!(config.timing_warnings().len(), 2);
    }

    #[test]
    fn durations_round_to_frames() {
        assert_eq!(frames(Duration::from_millis(300), 48_000), 14_400);
        assert_eq!(frames(Duration::from_micros(10), 44_100), 0);
    }
}
