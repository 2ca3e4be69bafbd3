//! Ocean: rolling swells over brownian surf, crashes at the crest of each main
//! swell and a faint distant wash.

use core::f32::consts::TAU;

use rand::RngCore;

use super::colored::{soft_limit, white, Brownian};
use super::Channel;

// Position of the main swell's peak within its cycle, and the window around
// it in which waves crash
const CREST: f32 = 0.78;
const CRASH_START: f32 = 0.7;
const CRASH_END: f32 = 0.85;

pub(crate) fn generate(data: &mut [f32], channel: &Channel, rng: &mut dyn RngCore) {
    let ch = channel.index as f32;

    // Every movement repeats a whole number of times per loop, so the swell
    // carries on across the loop point
    let main_period = channel.cycle(7.0 + ch * 2.0);
    let sub_period = channel.cycle(3.0 + ch * 0.5);
    let foam_period = channel.cycle(0.6);
    let distant_period = channel.cycle(12.0);

    let mut surf = Brownian::new(0.01);

    for i in 0..data.len() {
        let t = i as f32;
        let base = surf.next(white(rng));

        let phase = (t / main_period).fract();

        // Squaring the normalised wave sharpens the crests
        let main_swell = (((TAU * (phase - CREST)).cos() + 1.0) / 2.0).powi(2);
        let sub_swell = (((TAU * t / sub_period).sin() + 1.0) / 2.0).powf(1.5) * 0.5;
        let foam = (TAU * t / foam_period).sin() * 0.2 + 0.8;

        let crash = if phase > CRASH_START && phase < CRASH_END {
            let x = (phase - CRASH_START) / (CRASH_END - CRASH_START);
            // Builds up through the window and falls away at its end
            white(rng) * x.powi(2) * (1.0 - x).sqrt() * 0.8
        } else {
            0.0
        };

        let distant = (TAU * t / distant_period).sin() * 0.05;
        let swell = main_swell * 2.5 + sub_swell * 1.2;

        data[i] = soft_limit(base * (1.0 + swell) * foam + crash + distant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rms(data: &[f32]) -> f32 {
        (data.iter().map(|s| s * s).sum::<f32>() / data.len() as f32).sqrt()
    }

    #[test]
    fn crashes_land_in_the_crest_window() {
        let rate = 2_000;
        let mut rng = StdRng::seed_from_u64(31);
        // One full main swell for the left channel
        let mut data = vec![0.0; rate * 7];
        generate(&mut data, &Channel::new(0, rate as u32, rate * 7), &mut rng);

        let period = data.len() as f32;
        let window = |from: f32, to: f32| &data[(period * from) as usize..(period * to) as usize];
        let crest = rms(window(0.72, 0.84));
        let calm = rms(window(0.20, 0.45));
        assert!(crest > calm * 1.5, "crest {} calm {}", crest, calm);
    }

    #[test]
    fn swell_repeats_whole_cycles_per_loop() {
        let rate = 2_000;
        let mut rng = StdRng::seed_from_u64(32);
        // 18 s holds three 6 s swells on the left and two 9 s swells on the right
        let loop_frames = rate * 18;
        for (index, swells) in [(0, 3), (1, 2)] {
            let channel = Channel::new(index, rate as u32, loop_frames);
            let mut data = vec![0.0; loop_frames];
            generate(&mut data, &channel, &mut rng);

            let period = loop_frames / swells;
            assert_eq!(channel.cycle(7.0 + index as f32 * 2.0), period as f32);
            for cycle in data.chunks(period) {
                let window = |from: f32, to: f32| &cycle[(period as f32 * from) as usize..(period as f32 * to) as usize];
                let crest = rms(window(0.72, 0.84));
                let calm = rms(window(0.20, 0.45));
                assert!(crest > calm * 1.5, "channel {} crest {} calm {}", index, crest, calm);
            }
        }
    }
}
