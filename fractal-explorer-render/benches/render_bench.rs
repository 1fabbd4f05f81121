use criterion::{criterion_group, criterion_main, Criterion};

use fractal_explorer_core::{AlgorithmConfig, AlgorithmKind, Complex, Formula, Viewport};
use fractal_explorer_render::{
    ColourScheme, Partition, RenderCancel, RenderRequest, RenderSettings, Renderer,
};

fn request(algorithm: AlgorithmConfig, viewport: Viewport, width: u32, height: u32) -> RenderRequest {
    RenderRequest::new(algorithm, ColourScheme::default(), viewport, width, height)
        .expect("valid bench request")
}

fn bench_full_frame_render(c: &mut Criterion) {
    let renderer = Renderer::new(RenderSettings::default()).expect("render pool");
    let req = request(AlgorithmConfig::default(), Viewport::default(), 640, 480);
    let cancel = RenderCancel::new();

    c.bench_function("full_frame_640x480", |b| {
        b.iter(|| renderer.render(&req, &cancel));
    });
}

fn bench_quadtree_partition(c: &mut Criterion) {
    let renderer = Renderer::new(RenderSettings {
        partition: Partition::Quadtree {
            max_tile_area: 2000,
        },
        ..RenderSettings::default()
    })
    .expect("render pool");
    let req = request(AlgorithmConfig::default(), Viewport::default(), 640, 480);
    let cancel = RenderCancel::new();

    c.bench_function("quadtree_640x480", |b| {
        b.iter(|| renderer.render(&req, &cancel));
    });
}

fn bench_iteration_throughput(c: &mut Criterion) {
    let renderer = Renderer::new(RenderSettings::default()).expect("render pool");
    let algorithm = AlgorithmConfig::new(
        AlgorithmKind::julia(Formula::Mandelbrot, Complex::new(-0.8, 0.156)),
        1000,
        2.0,
    )
    .expect("valid algorithm");
    let viewport = Viewport::new(-1.5, 1.5, -1.0, 1.0).expect("valid viewport");
    let req = request(algorithm, viewport, 256, 256);
    let cancel = RenderCancel::new();

    c.bench_function("julia_256x256_1000iter", |b| {
        b.iter(|| renderer.render(&req, &cancel));
    });
}

fn bench_colour_lookup(c: &mut Criterion) {
    let scheme = ColourScheme::sea_of_gold();

    c.bench_function("calculate_colour_10k", |b| {
        b.iter(|| {
            (0..10_000)
                .map(|i| scheme.calculate_colour(i as f64 / 10_000.0).r as u32)
                .sum::<u32>()
        });
    });
}

criterion_group!(
    benches,
    bench_full_frame_render,
    bench_quadtree_partition,
    bench_iteration_throughput,
    bench_colour_lookup
);
criterion_main!(benches);
