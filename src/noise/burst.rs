//! Randomly triggered noise bursts shared by the textured soundscapes.

use rand::{Rng, RngCore};

use super::colored::white;

/// Add a burst of white noise shaped by `envelope(j)` to `data[at..at + len]`.
///
/// Bursts running past the end of the buffer are truncated.
pub(crate) fn add_burst(
    data: &mut [f32],
    at: usize,
    len: usize,
    rng: &mut dyn RngCore,
    envelope: impl Fn(usize) -> f32,
) {
    let end = (at + len).min(data.len());
    for (j, sample) in data[at.min(end)..end].iter_mut().enumerate() {
        *sample += white(rng) * envelope(j);
    }
}

/// Length in frames of a burst lasting `seconds`
#[inline]
pub(crate) fn frames(sample_rate: u32, seconds: f32) -> usize {
    (sample_rate as f32 * seconds) as usize
}

/// True with probability `p`
#[inline]
pub(crate) fn chance(rng: &mut dyn RngCore, p: f32) -> bool {
    rng.gen::<f32>() < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn burst_is_truncated_at_the_end() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut data = vec![0.0; 10];
        add_burst(&mut data, 8, 100, &mut rng, |_| 1.0);
        assert!(data[..8].iter().all(|&s| s == 0.0));
        assert!(data[8..].iter().any(|&s| s != 0.0));

        add_burst(&mut data, 50, 5, &mut rng, |_| 1.0);
    }

    #[test]
    fn envelope_shapes_the_burst() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut data = vec![0.0; 64];
        add_burst(&mut data, 0, 64, &mut rng, |j| if j < 32 { 1.0 } else { 0.0 });
        assert!(data[32..].iter().all(|&s| s == 0.0));
    }
}
