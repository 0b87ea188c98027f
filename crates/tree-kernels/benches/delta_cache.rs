//! Benchmarks for the delta cache backends
//!
//! Compares the dense grid and the sparse map on fill, lookup, and clear,
//! the three operations every kernel evaluation performs.
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tree_kernels::{DeltaCache, DeltaCacheKind, NodeId, NOT_COMPUTED};

fn backends() -> [(&'static str, DeltaCacheKind); 2] {
    [
        ("dense", DeltaCacheKind::default()),
        ("sparse", DeltaCacheKind::Sparse),
    ]
}

fn fill(cache: &mut dyn DeltaCache, side: u32) {
    for a in 1..=side {
        for b in 1..=side {
            cache.add(NodeId::new(a), NodeId::new(b), NOT_COMPUTED).unwrap();
        }
    }
}

/// Benchmark seeding every pair of two trees
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_fill");

    for side in [32u32, 128] {
        for (name, kind) in backends() {
            let mut cache = kind.build();
            group.bench_with_input(BenchmarkId::new(name, side), &side, |bench, &side| {
                bench.iter(|| {
                    cache.clear();
                    fill(cache.as_mut(), side);
                    black_box(cache.len());
                });
            });
        }
    }

    group.finish();
}

/// Benchmark lookups on a filled cache
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookup");

    let side = 128u32;
    for (name, kind) in backends() {
        let mut cache = kind.build();
        fill(cache.as_mut(), side);
        group.bench_function(name, |bench| {
            bench.iter(|| {
                let mut pending = 0usize;
                for a in (1..=side).step_by(3) {
                    for b in (1..=side).step_by(5) {
                        if cache.lookup(NodeId::new(a), NodeId::new(b)).is_none() {
                            pending += 1;
                        }
                    }
                }
                black_box(pending)
            });
        });
    }

    group.finish();
}

/// Benchmark clearing a large cache
fn bench_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_clear");

    for (name, kind) in backends() {
        let mut cache = kind.build();
        group.bench_function(name, |bench| {
            bench.iter(|| {
                cache.add(NodeId::new(200), NodeId::new(200), 1.0).unwrap();
                cache.clear();
                black_box(cache.is_empty())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fill, bench_lookup, bench_clear);
criterion_main!(benches);
