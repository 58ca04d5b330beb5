// benches/benchmarks.rs -- Per-stage and full-pipeline benchmarks.
//
//   cargo bench
//
// All inputs are synthetic: a 752x480 HDR gradient with a few bright
// rectangles, so luminance spans roughly three decades.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use spatial_tonemap::convolution::{convolve, convolve_parallel};
use spatial_tonemap::{Image, Kernel, Pipeline, PipelineConfig, Rgba, Stage, ToneMapMode, ToneMapper};

// ============================================================
// Helpers
// ============================================================

fn make_scene(w: usize, h: usize) -> Image<Rgba> {
    let mut img = Image::from_fn(w, h, |x, y| {
        let t = (x as f32 / w as f32) * 0.5 + 0.01;
        let s = y as f32 / h as f32;
        Rgba::opaque(t, t * (0.5 + s), t * 0.8)
    });
    for rect in 0..6 {
        let rx = (50 + rect * 100) % w;
        let ry = (40 + (rect % 3) * 120) % h;
        let bright = 5.0 + rect as f32 * 4.0;
        for y in ry..(ry + 60).min(h) {
            for x in rx..(rx + 80).min(w) {
                img.set(x, y, Rgba::opaque(bright, bright * 0.9, bright * 0.7));
            }
        }
    }
    img
}

// ============================================================
// Per-stage benchmarks
// ============================================================

fn bench_convolution(c: &mut Criterion) {
    let img = make_scene(752, 480);

    let mut group = c.benchmark_group("convolve");
    for n in [3usize, 5, 9] {
        let k = Kernel::box_filter(n).unwrap();
        group.bench_with_input(BenchmarkId::new("sequential", n), &k, |b, k| {
            b.iter(|| convolve(&img, k))
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &k, |b, k| {
            b.iter(|| convolve_parallel(&img, k))
        });
    }
    group.finish();
}

fn bench_tonemap(c: &mut Criterion) {
    let img = make_scene(752, 480);
    let mapper = ToneMapper::new(0.5).unwrap();
    let k = Kernel::box_filter(9).unwrap();

    let mut group = c.benchmark_group("tonemap");
    group.bench_function("global_752x480", |b| {
        b.iter_batched_ref(
            || img.clone(),
            |im| mapper.apply(im).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });
    group.bench_function("local_9x9_752x480", |b| {
        b.iter_batched_ref(
            || img.clone(),
            |im| mapper.apply_local(im, &k).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

// ============================================================
// Full pipeline
// ============================================================

fn bench_pipeline(c: &mut Criterion) {
    let img = make_scene(752, 480);
    let config = PipelineConfig::new(0.5)
        .unwrap()
        .with_tone_mode(ToneMapMode::Global)
        .with_stages([Stage::Convolve, Stage::ToneMap]);
    let pipeline = Pipeline::new(config, Some(Kernel::box_filter(5).unwrap())).unwrap();

    c.bench_function("pipeline_convolve5_tonemap_752x480", |b| {
        b.iter(|| pipeline.process(img.clone()).unwrap())
    });
}

criterion_group!(benches, bench_convolution, bench_tonemap, bench_pipeline);
criterion_main!(benches);
