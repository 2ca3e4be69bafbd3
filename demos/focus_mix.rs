//! Play a mix of soundscapes on the default output device
//!
//! Run with: cargo run --example focus_mix --features cpal_sink -- "rain=0.6,brown=0.3"
//!
//! Fades the mix in, plays it for a while, chimes, and fades out.

use std::thread::sleep;
use std::time::{Duration, Instant};

use lull::{Engine, MixerConfig, Soundscape};

fn play(engine: &mut Engine, duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        engine.render_available();
        sleep(Duration::from_millis(2));
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let arg = std::env::args().nth(1).unwrap_or_else(|| "rain=0.6,brown=0.3".into());
    let mix: MixerConfig = match arg.parse() {
        Ok(mix) => mix,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Available soundscapes:");
            for soundscape in Soundscape::ALL {
                eprintln!("  {:<6} {} - {}", soundscape.id(), soundscape.label(), soundscape.description());
            }
            return;
        }
    };

    let mut engine = Engine::default_output();
    if !engine.is_available() {
        eprintln!("No audio output device found!");
        return;
    }

    println!("Output at {} Hz", engine.sample_rate().unwrap_or(0));
    println!("Press Ctrl+C to stop\n");

    engine.apply_mixer_config(&mix);
    println!("Playing {:?}", engine.track_ids());
    play(&mut engine, Duration::from_secs(20));

    // Swell the first track, as if a slider were dragged
    if let Some(first) = engine.track_ids().first().map(|id| id.to_string()) {
        for step in 0..=20 {
            engine.update_track_volume(&first, step as f32 / 20.0);
            play(&mut engine, Duration::from_millis(50));
        }
    }
    play(&mut engine, Duration::from_secs(5));

    engine.play_complete();
    play(&mut engine, Duration::from_secs(1));

    engine.stop_all();
    engine.play_alarm();
    play(&mut engine, Duration::from_secs(1));
}
