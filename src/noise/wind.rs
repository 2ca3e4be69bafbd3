//! Wind: brownian air movement shaped by three layers of gusting plus rare
//! strong gusts.

use core::f32::consts::{PI, TAU};

use rand::{Rng, RngCore};

use super::burst::chance;
use super::colored::{soft_limit, white, Brownian};
use super::Channel;

const STRONG_GUST_CHANCE: f32 = 0.00008;

pub(crate) fn generate(data: &mut [f32], channel: &Channel, rng: &mut dyn RngCore) {
    let rate = channel.sample_rate as f32;
    let ch = channel.index as f32;

    let main_period = channel.cycle(4.0 + ch * 1.5);
    let sub_period = channel.cycle(1.2 + ch * 0.3);
    let micro_period = channel.cycle(0.15);

    let mut air = Brownian::new(0.012);
    // Strong gusts lift a stretch of the signal; overlapping gusts take the
    // larger lift rather than compounding.
    let mut lift = vec![1.0f32; data.len()];

    for i in 0..data.len() {
        if chance(rng, STRONG_GUST_CHANCE) {
            let seconds: f32 = rng.gen_range(0.5..2.0);
            let len = (rate * seconds) as usize;
            let end = (i + len).min(data.len());
            for (j, l) in lift[i..end].iter_mut().enumerate() {
                let envelope = (j as f32 / len as f32 * PI).sin();
                *l = l.max(1.0 + envelope * 0.8);
            }
        }

        let t = i as f32;
        let base = air.next(white(rng));
        let main_gust = (((TAU * t / main_period).sin() + 1.0) / 2.0).powf(0.8) * 0.6 + 0.4;
        let sub_gust = (TAU * t / sub_period).sin() * 0.2 + 0.8;
        let turbulence = (TAU * t / micro_period).sin() * 0.15 + 0.85;

        data[i] = soft_limit(base * 2.8 * main_gust * sub_gust * turbulence * lift[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn window_rms(data: &[f32]) -> f32 {
        (data.iter().map(|s| s * s).sum::<f32>() / data.len() as f32).sqrt()
    }

    #[test]
    fn gusts_swell_and_ebb() {
        let rate = 4_000;
        let mut rng = StdRng::seed_from_u64(5);
        let mut data = vec![0.0; rate as usize * 8];
        generate(&mut data, &Channel::new(0, rate, rate as usize * 8), &mut rng);

        let levels: Vec<f32> = data.chunks(rate as usize / 4).map(window_rms).collect();
        let loudest = levels.iter().cloned().fold(0.0, f32::max);
        let quietest = levels.iter().cloned().fold(f32::MAX, f32::min);
        assert!(loudest > quietest * 1.5, "{} vs {}", loudest, quietest);
    }
}
