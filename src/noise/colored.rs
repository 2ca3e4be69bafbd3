//! White, brown and pink noise, plus the filters the other soundscapes build on.

use rand::{Rng, RngCore};

use super::Channel;

/// Uniform white noise in [-1, 1)
#[inline]
pub(crate) fn white(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>() * 2.0 - 1.0
}

/// Leaky integrator over white noise: `next = (prev + k * white) / (1 + k)`.
///
/// Small `k` gives a smooth, low-frequency-dominant (brownian) signal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Brownian {
    last: f32,
    k: f32,
}

impl Brownian {
    pub(crate) fn new(k: f32) -> Self {
        Self { last: 0.0, k }
    }

    #[inline]
    pub(crate) fn next(&mut self, white: f32) -> f32 {
        self.last = (self.last + self.k * white) / (1.0 + self.k);
        self.last
    }
}

/// Paul Kellet's refined pink filter: six leaky poles plus a one-sample
/// white term, roughly -3 dB/octave across the audible band.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    #[inline]
    pub(crate) fn next(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let out = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115926;
        out
    }

    /// Only the three slowest poles: a soft, dark wash.
    #[inline]
    pub(crate) fn next_low(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[0] + b[1] + b[2]
    }
}

/// Identity up to the knee, then bends towards (never past) ±1.
#[inline]
pub(crate) fn soft_limit(x: f32) -> f32 {
    const KNEE: f32 = 0.8;
    let magnitude = x.abs();
    if magnitude <= KNEE {
        return x;
    }
    let over = (magnitude - KNEE) / (1.0 - KNEE);
    (1.0 - (1.0 - KNEE) * (1.0 - over.tanh())).copysign(x)
}

/// [`soft_limit`] a whole buffer, for generators that add bursts ahead of
/// the sample they are writing.
pub(crate) fn limit(data: &mut [f32]) {
    for sample in data.iter_mut() {
        *sample = soft_limit(*sample);
    }
}

pub(crate) fn generate_white(data: &mut [f32], _channel: &Channel, rng: &mut dyn RngCore) {
    for sample in data.iter_mut() {
        *sample = white(rng) * 0.3;
    }
}

pub(crate) fn generate_brown(data: &mut [f32], _channel: &Channel, rng: &mut dyn RngCore) {
    let mut walk = Brownian::new(0.02);
    for sample in data.iter_mut() {
        *sample = soft_limit(walk.next(white(rng)) * 3.5);
    }
}

pub(crate) fn generate_pink(data: &mut [f32], _channel: &Channel, rng: &mut dyn RngCore) {
    let mut filter = PinkFilter::default();
    for sample in data.iter_mut() {
        *sample = soft_limit(filter.next(white(rng)) * 0.11);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mean_abs_step(data: &[f32]) -> f32 {
        data.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / (data.len() - 1) as f32
    }

    fn rms(data: &[f32]) -> f32 {
        (data.iter().map(|s| s * s).sum::<f32>() / data.len() as f32).sqrt()
    }

    // One second at 44.1 kHz, the length every buffer below uses
    fn left() -> Channel {
        Channel::new(0, 44_100, 44_100)
    }

    #[test]
    fn brown_is_smoother_than_white() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut brown = vec![0.0; 44_100];
        let mut white_noise = vec![0.0; 44_100];
        generate_brown(&mut brown, &left(), &mut rng);
        generate_white(&mut white_noise, &left(), &mut rng);

        // Normalise by level so the comparison is about shape, not loudness
        let brown_roughness = mean_abs_step(&brown) / rms(&brown);
        let white_roughness = mean_abs_step(&white_noise) / rms(&white_noise);
        assert!(brown_roughness < white_roughness * 0.25, "{} vs {}", brown_roughness, white_roughness);
    }

    #[test]
    fn pink_sits_between_white_and_brown() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pink = vec![0.0; 44_100];
        let mut brown = vec![0.0; 44_100];
        let mut white_noise = vec![0.0; 44_100];
        generate_pink(&mut pink, &left(), &mut rng);
        generate_brown(&mut brown, &left(), &mut rng);
        generate_white(&mut white_noise, &left(), &mut rng);

        let roughness = |d: &[f32]| mean_abs_step(d) / rms(d);
        assert!(roughness(&pink) < roughness(&white_noise));
        assert!(roughness(&pink) > roughness(&brown));
    }

    #[test]
    fn soft_limit_bends_only_above_the_knee() {
        assert_eq!(soft_limit(0.5), 0.5);
        assert_eq!(soft_limit(-0.8), -0.8);
        assert!(soft_limit(0.9) > 0.8 && soft_limit(0.9) < 0.9);
        assert!(soft_limit(-2.0) < -0.99 && soft_limit(-2.0) >= -1.0);
        assert!(soft_limit(1.0e6) <= 1.0);
        // Monotonic through the knee
        let curve: Vec<f32> = (0..200).map(|i| soft_limit(i as f32 * 0.01)).collect();
        assert!(curve.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn white_is_centred_and_bounded() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut data = vec![0.0; 44_100];
        generate_white(&mut data, &left(), &mut rng);

        let mean = data.iter().sum::<f32>() / data.len() as f32;
        assert!(mean.abs() < 0.01);
        assert!(data.iter().all(|s| s.abs() <= 0.3));
        assert!(data.windows(2).any(|w| w[0] != w[1]));
    }
}
