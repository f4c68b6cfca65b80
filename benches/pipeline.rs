//! Benchmarks for pipeline evaluation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use user_props::{
    build_expression_dependency_graph, PropNode, PropTree, PropsConfig, PropsPipeline, PropsRuntime,
};

/// `n` inputs and a chain of `n` expressions, each reading its predecessor
fn chain_tree(n: usize) -> PropTree {
    let mut tree = PropTree::new();
    for i in 0..n {
        tree.set(&format!("inputs.v{}", i), PropNode::number(i as f64))
            .unwrap();
        let source = if i == 0 {
            "get('inputs.v0') * 2".to_string()
        } else {
            format!("get('chain.c{}') + get('inputs.v{}')", i - 1, i)
        };
        tree.set(
            &format!("chain.c{}", i),
            PropNode::number(0.0).with_expression(source),
        )
        .unwrap();
    }
    tree
}

fn pipeline() -> PropsPipeline {
    PropsPipeline::with_runtime(PropsConfig::default(), Arc::new(PropsRuntime::new()))
}

fn bench_dependency_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_graph");

    for size in [10, 100, 500].iter() {
        let tree = chain_tree(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &tree, |b, tree| {
            b.iter(|| black_box(build_expression_dependency_graph(tree)))
        });
    }

    group.finish();
}

fn bench_cold_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_cold");

    for size in [10, 100].iter() {
        let tree = chain_tree(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &tree, |b, tree| {
            let mut pipeline = pipeline();
            b.iter(|| {
                let mut tree = tree.clone();
                black_box(pipeline.evaluate_pipeline(&mut tree, None))
            })
        });
    }

    group.finish();
}

fn bench_settled_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_settled");

    for size in [10, 100].iter() {
        let mut tree = chain_tree(*size);
        let mut pipeline = pipeline();
        let snapshot = pipeline.evaluate_pipeline(&mut tree, None).snapshot().clone();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(pipeline.evaluate_pipeline(&mut tree, Some(&snapshot))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dependency_graph,
    bench_cold_evaluation,
    bench_settled_evaluation
);
criterion_main!(benches);
