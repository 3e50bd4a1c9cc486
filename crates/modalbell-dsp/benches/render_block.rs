//! Benchmarks for the modal engine's block renderer and live retuning.
//!
//! Run:
//! - cargo bench -p modalbell-dsp

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modalbell_dsp::{ModalEngine, ModalModel, ParamChange, ParameterSink, Scales};

const SR: u32 = 44_100;
const MODE_COUNTS: [usize; 4] = [1, 10, 64, 256];

fn build_model(modes: usize) -> ModalModel {
    let freqs = (0..modes).map(|i| 110.0 + i as f32 * 37.3).collect();
    let decays = (0..modes).map(|i| 1.0 + i as f32 * 0.25).collect();
    let gains = (0..modes).map(|i| 1.0 / (1.0 + i as f32)).collect();
    ModalModel::from_parts(modes, freqs, decays, 1, gains, Scales::default()).unwrap()
}

fn bench_render<const N: usize>(c: &mut Criterion, group_name: &str) {
    let mut group = c.benchmark_group(group_name);
    group.sample_size(50);

    for &modes in &MODE_COUNTS {
        let mut engine = ModalEngine::<N>::from_model(build_model(modes), SR).unwrap();
        let mut out = [0.0f32; N];
        let id = BenchmarkId::new("modes", modes);
        group.bench_function(id, |b| {
            b.iter(|| {
                engine.add_energy(0.5, 0.001);
                black_box(engine.render(black_box(&mut out)))
            })
        });
    }

    group.finish();
}

fn bench_render_blocks(c: &mut Criterion) {
    bench_render::<16>(c, "render_b16");
    bench_render::<64>(c, "render_b64");
    bench_render::<1024>(c, "render_b1024");
}

fn bench_retune(c: &mut Criterion) {
    let mut group = c.benchmark_group("retune");
    for &modes in &MODE_COUNTS {
        let mut engine = ModalEngine::<64>::from_model(build_model(modes), SR).unwrap();
        group.bench_function(BenchmarkId::new("recompute_one", modes), |b| {
            let mut hz = 200.0f32;
            b.iter(|| {
                hz = if hz > 4000.0 { 200.0 } else { hz + 1.0 };
                engine.apply(ParamChange::Frequency { mode: 0, hz });
            })
        });
        group.bench_function(BenchmarkId::new("compute_filter", modes), |b| {
            b.iter(|| engine.compute_filter())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render_blocks, bench_retune);
criterion_main!(benches);
