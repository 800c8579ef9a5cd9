#![allow(clippy::all)]
//! Benchmarks for backend ranking and selection.
//!
//! Tests: haversine distance, directory ranking by size, nearest-healthy
//! selection with the nearest backends failing their probe.

mod common;
use common::generators;
use common::harness::{bench_runtime, BenchSizes};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use r0n_geolb::modules::load_balancer::{
    BackendDirectory, DistanceRanker, GeoBalancer, GeoPoint, HealthProbe,
};
use std::future::Future;
use std::hint::black_box;
use std::pin::Pin;
use std::sync::Arc;

/// Probe that reports a fixed set of addresses as down.
struct SkipNearest {
    down: std::collections::HashSet<String>,
}

impl HealthProbe for SkipNearest {
    fn is_healthy<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        let healthy = !self.down.contains(address);
        Box::pin(async move { healthy })
    }
}

fn bench_distance(c: &mut Criterion) {
    let a = GeoPoint::new(10.5, 20.6);
    let b = GeoPoint::new(70.5, 46.5);

    c.bench_function("ranking/haversine", |bench| {
        bench.iter(|| black_box(black_box(a).distance_km(&black_box(b))));
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking/rank");
    let ranker = DistanceRanker::new();
    let from = GeoPoint::new(48.85, 2.35);

    for size in BenchSizes::DIRECTORIES {
        let backends = generators::backend_servers(size);
        group.bench_with_input(BenchmarkId::new("directory", size), &size, |b, _| {
            b.iter(|| black_box(ranker.rank(&backends, from)));
        });
    }

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking/select");
    let rt = bench_runtime();
    let from = GeoPoint::new(48.85, 2.35);

    for size in BenchSizes::DIRECTORIES {
        let backends = generators::backend_servers(size);

        // The three nearest backends are down.
        let ranked = DistanceRanker::new().rank(&backends, from);
        let down = ranked
            .iter()
            .take(3.min(size.saturating_sub(1)))
            .map(|r| r.server.connect_address())
            .collect();

        let balancer = GeoBalancer::new(
            BackendDirectory::new(backends),
            Arc::new(SkipNearest { down }),
        );

        group.bench_with_input(BenchmarkId::new("skip_nearest", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(balancer.select_backend(from).await.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_mixed_requesters(c: &mut Criterion) {
    let ranker = DistanceRanker::new();
    let backends = generators::backend_servers(64);
    let requesters = generators::requester_points(256);

    c.bench_function("ranking/mixed_requesters_64", |b| {
        b.iter(|| {
            for from in &requesters {
                black_box(ranker.rank(&backends, *from));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_distance,
    bench_rank,
    bench_select,
    bench_mixed_requesters
);
criterion_main!(benches);
