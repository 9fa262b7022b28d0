use backend::connections::{DEFAULT_CONNECTION_THRESHOLD_M, build_connections};
use backend::index::VertexSampling;
use backend::models::{Coordinate, RouteSegment, RouteType, RoutingPreference};
use backend::search::find_segment_path;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A grid of short east-west segments, each touching its neighbours.
fn grid(rows: usize, cols: usize) -> Vec<RouteSegment> {
    let mut segments = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let lat = 49.38 + row as f64 * 0.001;
            let lng = 8.65 + col as f64 * 0.004;
            let points = (0..=10)
                .map(|i| Coordinate::new(lat, lng + i as f64 * 0.00039))
                .collect();
            segments.push(RouteSegment::new(format!("r{row}c{col}"), points));
        }
    }
    segments
}

fn benchmark_build_connections(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_connections");

    for (rows, cols) in [(10, 10), (20, 25), (40, 50)] {
        let segments = grid(rows, cols);
        for stride in [1, 5] {
            let name = format!("{}_segments_stride_{stride}", segments.len());
            group.bench_with_input(BenchmarkId::from_parameter(name), &segments, |b, segments| {
                b.iter(|| {
                    build_connections(
                        black_box(segments),
                        DEFAULT_CONNECTION_THRESHOLD_M,
                        VertexSampling::every(stride),
                    )
                });
            });
        }
    }

    group.finish();
}

fn benchmark_segment_search(c: &mut Criterion) {
    let segments = grid(40, 50);
    let graph = build_connections(&segments, DEFAULT_CONNECTION_THRESHOLD_M, VertexSampling::ALL);
    let mut group = c.benchmark_group("find_segment_path");

    for (name, preference) in [
        ("fastest", RoutingPreference::default()),
        ("flattest", RoutingPreference::new(RouteType::Flattest, false)),
        ("best_rated_avoid_steep", RoutingPreference::new(RouteType::BestRated, true)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                find_segment_path(
                    &graph,
                    &segments,
                    black_box("r0c0"),
                    black_box("r39c49"),
                    preference,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build_connections, benchmark_segment_search);
criterion_main!(benches);
