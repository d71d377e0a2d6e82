//! Benchmarks for stroke mesh building.
//!
//! Run with: cargo bench -p strokemesh

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strokemesh::{regular_polygon_template, Point3, StrokeMeshBuilder};

/// Gently curving chain of `count` nodes.
fn chain_builder(count: usize, sides: usize) -> StrokeMeshBuilder {
    let mut builder = StrokeMeshBuilder::new();
    let nodes: Vec<usize> = (0..count)
        .map(|i| {
            let t = i as f64 * 0.3;
            builder.add_node(
                Point3::new(t.sin() * 2.0, i as f64 * 0.5, t.cos()),
                0.2,
                regular_polygon_template(sides),
                0.0,
            )
        })
        .collect();
    for pair in nodes.windows(2) {
        builder.add_edge(pair[0], pair[1]).expect("chain nodes exist");
    }
    builder
}

/// Hub with `arms` chains of `length` nodes each.
fn branch_builder(arms: usize, length: usize) -> StrokeMeshBuilder {
    let mut builder = StrokeMeshBuilder::new();
    let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
    for a in 0..arms {
        let angle = std::f64::consts::TAU * a as f64 / arms as f64;
        let mut previous = hub;
        for step in 1..=length {
            let r = 1.5 + step as f64;
            let node = builder.add_node(Point3::new(r * angle.cos(), r * angle.sin(), 0.1 * step as f64), 0.4, Vec::new(), 0.0);
            builder.add_edge(previous, node).expect("arm nodes exist");
            previous = node;
        }
    }
    builder
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for count in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut builder = chain_builder(count, 8);
                black_box(builder.build())
            });
        });
    }
    group.finish();
}

fn bench_branch(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch");
    for arms in [3, 4, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(arms), &arms, |b, &arms| {
            b.iter(|| {
                let mut builder = branch_builder(arms, 10);
                black_box(builder.build())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_branch);
criterion_main!(benches);
