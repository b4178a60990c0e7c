//! Criterion microbenches for fingerprint canonicalization.
//!
//! Canonicalization runs once per sampled triangulation, so it sits on the
//! pipeline's hot path next to the engine calls themselves.

use calabi::engine::IntersectionEntry;
use calabi::fingerprint::Fingerprint;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_entries(count: usize, seed: u64) -> Vec<IntersectionEntry> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| IntersectionEntry {
            i: rng.gen_range(0..32),
            j: rng.gen_range(0..32),
            k: rng.gen_range(0..32),
            value: f64::from(rng.gen_range(-9i32..=9)),
        })
        .collect()
}

fn bench_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    for &count in &[24usize, 128, 1024] {
        group.bench_function(BenchmarkId::new("canonical", count), |b| {
            b.iter_batched(
                || random_entries(count, 42),
                |entries| Fingerprint::canonical(&entries),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_canonical);
criterion_main!(benches);
