use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dasp_graph::Buffer;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use lull::device::Offline;
use lull::noise::NoiseBuffer;
use lull::{Engine, EngineConfig, MixerConfig, Soundscape};

pub fn generate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("NoiseBuffer::generate (1s @ 48kHz)");
    for soundscape in Soundscape::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(soundscape), &soundscape, |b, &soundscape| {
            let mut rng = SmallRng::seed_from_u64(1);
            b.iter(|| {
                NoiseBuffer::generate_with_length(black_box(soundscape), 48_000, 48_000, 2_400, &mut rng)
            })
        });
    }
    group.finish();
}

pub fn render_benchmark(c: &mut Criterion) {
    c.bench_function("Engine::process() with 4 tracks", |b| {
        let output = Offline::new(48_000, 2);
        let config = EngineConfig::default()
            .with_seed(1)
            .with_loop_length(Duration::from_secs(1));
        let mut engine = Engine::with_config(output.clone(), config);
        let mix: MixerConfig = "rain=0.6,brown=0.3,fire=0.5,lofi=0.2".parse().unwrap();
        engine.apply_mixer_config(&mix);

        b.iter(|| {
            engine.process();
            // Keep the ring from filling so the sink does real work
            if engine.clock() % (Buffer::LEN as u64 * 32) == 0 {
                output.drain();
            }
        })
    });
}

criterion_group!(benches, generate_benchmark, render_benchmark);
criterion_main!(benches);
