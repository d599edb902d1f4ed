//! # Compile Pipeline Benchmarks
//!
//! Measures each stage of the TAC to GVM pipeline.
//!
//! Run: `cargo bench --bench compile_bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gvm_core::{Transformer, compile, parse, tokenize};

const DISPATCH: &str = include_str!("../../gvm-core/tests/fixtures/dispatch.tac");

/// A chain of `blocks` blocks, each jumping to the next and merging a phi
fn chain_source(blocks: usize) -> String {
    let mut source = String::from("FUNCTION chain() PUBLIC {\n");
    for i in 0..blocks {
        let prev = if i == 0 { String::new() } else { format!("0x{:x}", i - 1) };
        let next = if i + 1 < blocks { format!("0x{:x}", i + 1) } else { String::new() };
        source.push_str(&format!("  BEGIN BLOCK 0x{:x}: PREV=[{}], SUCC=[{}]:\n", i, prev, next));
        if i > 0 {
            source.push_str(&format!("    p{} = PHI s{}\n", i, i - 1));
        }
        source.push_str(&format!("    s{} = ADD p{}, c{}\n", i, i, i));
        if i + 1 < blocks {
            source.push_str(&format!("    t{0}(0x{1:x}) = CONST\n    JUMP t{0}(0x{1:x})\n", i, i + 1));
        } else {
            source.push_str("    STOP\n");
        }
    }
    source.push_str("}\n");
    source
}

/// Benchmark the individual stages on a dispatcher-shaped program
fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");

    group.bench_function("tokenize", |b| {
        b.iter(|| black_box(tokenize(black_box(DISPATCH)).unwrap()))
    });

    group.bench_function("parse", |b| {
        b.iter(|| black_box(parse(black_box(DISPATCH)).unwrap()))
    });

    let program = parse(DISPATCH).unwrap();
    let transformer = Transformer::new();

    group.bench_function("transform", |b| {
        b.iter(|| black_box(transformer.transform(black_box(&program)).unwrap()))
    });

    group.bench_function("compile", |b| {
        b.iter(|| black_box(compile(black_box(DISPATCH)).unwrap()))
    });

    group.finish();
}

/// Benchmark transformation against CFG size
fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_scaling");
    let transformer = Transformer::new();

    for blocks in [16, 128, 1024] {
        let program = parse(&chain_source(blocks)).unwrap();
        group.throughput(Throughput::Elements(blocks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &program, |b, program| {
            b.iter(|| black_box(transformer.transform(program).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_scaling);
criterion_main!(benches);
