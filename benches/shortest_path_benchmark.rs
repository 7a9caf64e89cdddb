use ev_grid_sim::city::CityBuilder;
use ev_grid_sim::shortest_path::router::shortest_path;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

pub fn benchmark_shortest_path(c: &mut Criterion) {
    let grid = CityBuilder::new(20, 10, 4).build().expect("benchmark grid parameters are valid");
    let start = 0;
    let goal = grid.iter().count() as u32 - 1;

    c.bench_function("shortest_path_a_star", |b| {
        b.iter(|| match shortest_path(black_box(&grid), black_box(start), black_box(goal)) {
            Ok(path) => {
                let _ = black_box(path);
            }
            Err(e) => panic!("Error during shortest path calculation: {:?}", e),
        })
    });
}

criterion_group!(benches, benchmark_shortest_path);
criterion_main!(benches);
