//! Fireplace: a warm flickering bed with crackles, splitting wood and ember pops.

use core::f32::consts::{PI, TAU};

use rand::{Rng, RngCore};

use super::burst::{add_burst, chance};
use super::colored::{limit, white, Brownian};
use super::Channel;

const SMALL_CRACKLE_CHANCE: f32 = 0.0015;
const MEDIUM_CRACKLE_CHANCE: f32 = 0.0004;
const POP_CHANCE: f32 = 0.00015;

pub(crate) fn generate(data: &mut [f32], channel: &Channel, rng: &mut dyn RngCore) {
    let rate = channel.sample_rate as f32;
    let flicker_period = channel.cycle(0.8);
    // Opposite flicker phase per channel
    let channel_phase = channel.index as f32 * PI;
    let mut embers = Brownian::new(0.028);

    for i in 0..data.len() {
        let noise = white(rng);
        let flicker = (TAU * i as f32 / flicker_period + channel_phase).sin() * 0.15 + 0.85;
        let hiss = noise * 0.03;
        data[i] += embers.next(noise) * 1.8 * flicker + hiss;

        if chance(rng, SMALL_CRACKLE_CHANCE) {
            let size: f32 = rng.gen_range(0.1..0.3);
            let seconds: f32 = rng.gen_range(0.01..0.03);
            let len = (rate * seconds) as usize;
            let tau = len as f32 * 0.4;
            add_burst(data, i, len, rng, |j| size * (-(j as f32) / tau).exp());
        }

        if chance(rng, MEDIUM_CRACKLE_CHANCE) {
            let size: f32 = rng.gen_range(0.15..0.4);
            let seconds: f32 = rng.gen_range(0.03..0.07);
            let len = (rate * seconds) as usize;
            let tau = len as f32 * 0.5;
            let wobble_rate = len as f32 * 0.1;
            let end = (i + len).min(data.len());
            // Wood splitting: a decaying burst with a slight pitched wobble
            for (j, sample) in data[i..end].iter_mut().enumerate() {
                let j = j as f32;
                let wobble = (j / wobble_rate).sin() * 0.3;
                *sample += (white(rng) + wobble) * size * (-j / tau).exp();
            }
        }

        if chance(rng, POP_CHANCE) {
            let size: f32 = rng.gen_range(0.2..0.6);
            let seconds: f32 = rng.gen_range(0.05..0.13);
            let len = (rate * seconds) as usize;
            let tau = len as f32 * 0.6;
            let attack = len as f32 * 0.1;
            add_burst(data, i, len, rng, |j| {
                let j = j as f32;
                let ramp = if j < attack { j / attack } else { 1.0 };
                size * (-j / tau).exp() * ramp
            });
        }
    }

    limit(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn never_falls_silent() {
        // The hiss layer keeps every stretch audible
        let mut rng = StdRng::seed_from_u64(21);
        let mut data = vec![0.0; 22_050];
        generate(&mut data, &Channel::new(1, 22_050, 22_050), &mut rng);
        for chunk in data.chunks(256) {
            let energy: f32 = chunk.iter().map(|s| s * s).sum();
            assert!(energy > 0.0);
        }
    }

    #[test]
    fn crackles_are_transient() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut data = vec![0.0; 44_100 * 2];
        generate(&mut data, &Channel::new(0, 44_100, 44_100 * 2), &mut rng);
        let rms = (data.iter().map(|s| s * s).sum::<f32>() / data.len() as f32).sqrt();
        let peak = data.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > rms * 3.0, "peak {} rms {}", peak, rms);
    }
}
