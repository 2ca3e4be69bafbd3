//! Lo-fi: warm, quiet noise with turntable wobble, vinyl crackle and hiss.

use core::f32::consts::TAU;

use rand::{Rng, RngCore};

use super::burst::chance;
use super::colored::{soft_limit, white, Brownian};
use super::Channel;

// One revolution at 33 1/3 rpm
const WOBBLE_PERIOD: f32 = 1.8;
const CRACKLE_CHANCE: f32 = 0.0003;

pub(crate) fn generate(data: &mut [f32], channel: &Channel, rng: &mut dyn RngCore) {
    let wobble_period = channel.cycle(WOBBLE_PERIOD);
    let mut warmth = Brownian::new(0.008);

    for (i, sample) in data.iter_mut().enumerate() {
        let noise = white(rng);
        let wobble = 0.95 + (TAU * i as f32 / wobble_period).sin() * 0.05;
        let mut out = warmth.next(noise) * 1.5 * wobble;

        if chance(rng, CRACKLE_CHANCE) {
            out += (rng.gen::<f32>() - 0.5) * 0.15;
        }

        *sample = soft_limit(out + noise * 0.02);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn quieter_than_deep_focus() {
        let mut rng = StdRng::seed_from_u64(41);
        let mut lofi = vec![0.0; 44_100];
        let mut brown = vec![0.0; 44_100];
        let channel = Channel::new(0, 44_100, 44_100);
        generate(&mut lofi, &channel, &mut rng);
        super::super::colored::generate_brown(&mut brown, &channel, &mut rng);

        let rms = |d: &[f32]| (d.iter().map(|s| s * s).sum::<f32>() / d.len() as f32).sqrt();
        assert!(rms(&lofi) < rms(&brown));
    }
}
