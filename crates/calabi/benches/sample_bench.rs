//! Criterion bench for full sampling rounds on the synthetic engine.
//!
//! Measures the orchestration overhead (fan-out, reduction, dedup merge)
//! around a cheap engine, which is the part this crate owns.

use calabi::engine::{PolytopeQuery, SyntheticCfg, SyntheticEngine, ToricEngine};
use calabi::sample::{run_sampling, SamplerCfg};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_rounds(c: &mut Criterion) {
    let engine = SyntheticEngine::new(SyntheticCfg {
        universe: 256,
        ..SyntheticCfg::default()
    });
    let poly = engine
        .fetch_polytope(&PolytopeQuery::favorable_n(30, Some(42)))
        .unwrap();
    let mut group = c.benchmark_group("sample");
    for &(workers, batch) in &[(2usize, 25usize), (4, 50)] {
        let cfg = SamplerCfg {
            target_unique: usize::MAX,
            max_samples: (workers * batch) as u64,
            workers,
            batch_size: batch,
            ..SamplerCfg::default()
        };
        group.bench_function(BenchmarkId::new("round", format!("w{workers}b{batch}")), |b| {
            b.iter(|| run_sampling(&engine, &poly, &cfg, 7, |_| {}))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rounds);
criterion_main!(benches);
