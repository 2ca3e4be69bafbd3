//! Rain: a soft drizzle bed, three sizes of droplets and a distant rumble.

use core::f32::consts::TAU;

use rand::{Rng, RngCore};

use super::burst::{add_burst, chance, frames};
use super::colored::{limit, white, PinkFilter};
use super::Channel;

const SMALL_DROP_CHANCE: f32 = 0.002;
const MEDIUM_DROP_CHANCE: f32 = 0.0006;
const LARGE_DROP_CHANCE: f32 = 0.0002;
const RUMBLE_PERIOD: f32 = 8.0;

pub(crate) fn generate(data: &mut [f32], channel: &Channel, rng: &mut dyn RngCore) {
    let sample_rate = channel.sample_rate;
    let rumble_period = channel.cycle(RUMBLE_PERIOD);
    let mut drizzle = PinkFilter::default();

    // Each channel starts at its own point of the rumble cycle and draws its own
    // droplet triggers, so left and right never line up.
    let phase_offset = rng.gen::<f32>() * rumble_period;

    let small_len = frames(sample_rate, 0.008);
    let medium_len = frames(sample_rate, 0.015);
    let large_len = frames(sample_rate, 0.025);

    for i in 0..data.len() {
        let sample = drizzle.next_low(white(rng)) * 0.12;
        let rumble = (TAU * (i as f32 + phase_offset) / rumble_period).sin() * 0.02;
        data[i] += sample + rumble;

        if chance(rng, SMALL_DROP_CHANCE) {
            let size: f32 = rng.gen_range(0.05..0.15);
            let tau = small_len as f32 * 0.3;
            add_burst(data, i, small_len, rng, |j| size * (-(j as f32) / tau).exp());
        }

        if chance(rng, MEDIUM_DROP_CHANCE) {
            let size: f32 = rng.gen_range(0.1..0.35);
            let tau = medium_len as f32 * 0.4;
            add_burst(data, i, medium_len, rng, |j| size * (-(j as f32) / tau).exp());
        }

        if chance(rng, LARGE_DROP_CHANCE) {
            let size: f32 = rng.gen_range(0.25..0.6);
            let tau = large_len as f32 * 0.5;
            let impact = large_len as f32 * 0.3;
            // Sharp impact, then a quieter splash tail
            add_burst(data, i, large_len, rng, |j| {
                let splash = if (j as f32) < impact { 1.0 } else { 0.6 };
                size * (-(j as f32) / tau).exp() * splash
            });
        }
    }

    limit(data);
}
