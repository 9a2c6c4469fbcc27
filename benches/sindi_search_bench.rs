//! Benchmarks for SINDI sparse inverted-index search.
//!
//! Run with: `cargo bench --bench sindi_search_bench`
//!
//! # Reproducibility
//!
//! All benchmarks use:
//! - Seed: 42 for RNG
//! - Vocabulary: 10,000 terms
//! - Distribution: Uniform [0, 1] weights over a random nnz-sized term subset

use annidx::sindi::{search, SindiConfig, SindiIndex};
use annidx::sparse::SparseVector;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

/// Generates a random sparse document/query vector with `nnz` nonzero terms.
fn random_sparse(vocab_size: u32, nnz: usize, seed: u64) -> SparseVector {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut terms: Vec<u32> = (0..vocab_size).collect();
    terms.shuffle(&mut rng);
    terms.truncate(nnz);
    terms.sort_unstable();

    let values: Vec<f32> = (0..nnz).map(|_| rng.gen_range(0.0..1.0)).collect();
    SparseVector::new(terms, values, vocab_size).expect("generated vector should be valid")
}

/// Builds a populated index of `count` documents with `nnz` terms each.
fn build_index(vocab_size: u32, count: usize, nnz: usize, quantize: bool) -> SindiIndex {
    let config = SindiConfig::new(vocab_size).with_quantization(quantize);
    let mut index = SindiIndex::new(config).unwrap();

    for i in 0..count {
        let doc = random_sparse(vocab_size, nnz, 1000 + i as u64);
        index.add(&doc).unwrap();
    }

    if quantize {
        index.build_quantization();
    }

    index
}

/// Benchmark: search latency vs index size, full precision.
fn bench_search_latency(c: &mut Criterion) {
    let vocab_size = 10_000u32;
    let nnz = 50;
    let k = 10;
    let counts = [1_000, 10_000];

    let mut group = c.benchmark_group("sindi_search_latency");

    for count in counts {
        let index = build_index(vocab_size, count, nnz, false);
        let query = random_sparse(vocab_size, nnz, 42);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(search(black_box(&index), black_box(&query), k)));
        });
    }

    group.finish();
}

/// Benchmark: quantized vs full-precision postings at fixed index size.
fn bench_search_quantization(c: &mut Criterion) {
    let vocab_size = 10_000u32;
    let nnz = 50;
    let k = 10;
    let count = 10_000;

    let mut group = c.benchmark_group("sindi_search_quantization");

    let full = build_index(vocab_size, count, nnz, false);
    let quantized = build_index(vocab_size, count, nnz, true);
    let query = random_sparse(vocab_size, nnz, 42);

    group.bench_function("full_precision", |b| {
        b.iter(|| black_box(search(black_box(&full), black_box(&query), k)));
    });
    group.bench_function("quantized", |b| {
        b.iter(|| black_box(search(black_box(&quantized), black_box(&query), k)));
    });

    group.finish();
}

criterion_group!(benches, bench_search_latency, bench_search_quantization);
criterion_main!(benches);
