use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use strata_geom::Vec2;
use strata_mesh::generate_terrain_mesh;
use strata_world::{HeightCurve, TerrainGenerator};

fn bench_terrain_mesh_lods(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_mesh_239");
    let data = TerrainGenerator::default().generate_map_data(Vec2::ZERO);
    let curve = HeightCurve::linear();
    for lod in [0u32, 2, 4] {
        group.bench_function(format!("lod{}", lod), |b| {
            b.iter(|| {
                let mesh = generate_terrain_mesh(&data.height_map, 10.0, &curve, lod, false);
                black_box(mesh).ok();
            })
        });
    }
    group.finish();
}

fn bench_height_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("height_map_241");
    let generator = TerrainGenerator::default();
    group.bench_function("generate_map_data", |b| {
        b.iter(|| black_box(generator.generate_map_data(Vec2::new(238.0, -476.0))))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(5));
    targets = bench_terrain_mesh_lods, bench_height_map
}
criterion_main!(benches);
