//! Benchmarks for `Field::sample` and a full `ParticleSet::execute` pass.
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ptrack::prelude::*;

#[derive(Clone, Copy, Debug, Default, ParticleType, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct BenchParticle {
    time: f64,
    dt: f64,
    lon: f32,
    lat: f32,
    dep: f32,
    id: i32,
    state: i32,
    _pad: i32,
}

fn field(dim: usize) -> Field {
    let coords: Vec<f64> = (0..dim).map(|i| i as f64 / (dim - 1) as f64 * 100.0).collect();
    let lon: Arc<Axis> = Axis::shared(coords.clone(), "lon").unwrap();
    let lat: Arc<Axis> = Axis::shared(coords.clone(), "lat").unwrap();
    let time = Axis::shared(vec![0.0, 1.0], "time").unwrap();
    let mut data = vec![0.0f32; dim * dim * 2];
    for (idx, v) in data.iter_mut().enumerate() {
        *v = (idx % 97) as f32 * 0.1;
    }
    Field::new("U", Unit::Metres, lon, lat, time, data).unwrap()
}

fn bench_field_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_sample");
    for dim in [16usize, 128, 512] {
        let f = field(dim);
        group.bench_with_input(BenchmarkId::new("interior_point", dim), &dim, |b, _| {
            b.iter(|| black_box(f.sample(black_box(42.3), black_box(17.8), black_box(0.4)).unwrap()))
        });
    }
    group.finish();
}

fn bench_axis_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("axis_bracket");
    for len in [8usize, 128, 4096] {
        let coords: Vec<f64> = (0..len).map(|i| i as f64).collect();
        let axis = Axis::new(coords, "lon").unwrap();
        group.bench_with_input(BenchmarkId::new("binary_search", len), &len, |b, &len| {
            let x = (len / 2) as f64 + 0.5;
            b.iter(|| black_box(axis.bracket(black_box(x))))
        });
    }
    group.finish();
}

fn bench_euler_execute(c: &mut Criterion) {
    let mut grid = Grid::new();
    grid.add_field(field(64));
    let mut v = field(64);
    v.name = "V".to_string();
    grid.add_field(v);

    let kernel = methods::advection_ee::<BenchParticle>(Unit::Metres);
    let config = EngineConfig::default();

    let mut group = c.benchmark_group("euler_execute");
    for n in [100usize, 10_000] {
        group.bench_with_input(BenchmarkId::new("particles", n), &n, |b, &n| {
            b.iter(|| {
                let layout = SeedLayout::Line { start: (10.0, 10.0), finish: (90.0, 90.0), n };
                let mut pset: ParticleSet<BenchParticle> = ParticleSet::from_layout(&layout, 0.0, 60.0, 0);
                pset.execute(&kernel, &grid, 600.0, &RecoveryMap::new(), &config).unwrap();
                black_box(pset.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_field_sample, bench_axis_bracket, bench_euler_execute);
criterion_main!(benches);
