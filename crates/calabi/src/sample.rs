//! Round-based parallel sampling and deduplication loop.
//!
//! Purpose
//! - Drive the engine until either `target_unique` distinct manifolds are
//!   known or `max_samples` triangulations have been drawn in total,
//!   whichever comes first.
//!
//! Shape
//! - Each round draws `workers` fresh task seeds from the master RNG and
//!   fans the tasks out with rayon behind a synchronous barrier. A task
//!   samples one batch, reduces every triangulation to a plain
//!   (fingerprint, GKZ, label) triple on its own stack, and returns a
//!   [`TaskOutcome`]. Opaque engine objects never leave the task.
//! - The orchestrator alone merges outcomes into the [`DedupTable`], so the
//!   table needs no locking. Stop conditions are checked between rounds
//!   only; a dispatched round always runs to completion.
//! - The sample counter advances by `workers * batch_size` per round.
//!   Duplicates and failed tasks count against the cap; failures cost
//!   wasted compute, never an abort.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::dedup::{DatasetEntry, DedupTable};
use crate::engine::{EngineError, ToricEngine, TriangulationBackend, TriangulationCfg};
use crate::fingerprint::Fingerprint;

/// Loop parameters. Values are taken as given; nonsensical settings
/// surface downstream rather than as diagnostics here.
#[derive(Clone, Copy, Debug)]
pub struct SamplerCfg {
    /// Unique-manifold target `U`.
    pub target_unique: usize,
    /// Hard cap `C` on total sampled triangulations.
    pub max_samples: u64,
    /// Parallel tasks per round `W`.
    pub workers: usize,
    /// Triangulations requested per task `B`.
    pub batch_size: usize,
    /// Concentration parameter of the triangulation sampler.
    pub concentration: f64,
    /// Stretch factor for the Kähler-cone tip.
    pub stretch: f64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            target_unique: 1_000_000,
            max_samples: 10_000_000_000,
            workers: 16,
            batch_size: 100,
            concentration: 2.5,
            stretch: 1.0,
        }
    }
}

/// One triangulation reduced to plain data at the task boundary.
#[derive(Clone, Debug)]
pub struct SampleTriple {
    pub fingerprint: Fingerprint,
    pub entry: DatasetEntry,
}

/// Why a task produced no triples.
#[derive(Debug)]
pub enum TaskFailure {
    /// Both triangulation backends failed for this batch.
    Sampling {
        primary: EngineError,
        fallback: EngineError,
    },
    /// A derived quantity failed mid-batch; the task's whole batch is lost.
    Derivation(EngineError),
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sampling { primary, fallback } => {
                write!(f, "sampling failed (primary: {primary}; fallback: {fallback})")
            }
            Self::Derivation(err) => write!(f, "derivation failed: {err}"),
        }
    }
}

impl std::error::Error for TaskFailure {}

/// Explicit per-task result; failures are observable, never silent.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Vec<SampleTriple>),
    Failed(TaskFailure),
}

/// Progress snapshot reported once per round.
#[derive(Clone, Copy, Debug)]
pub struct RoundReport {
    pub round: usize,
    /// Unique manifolds known after this round (monotonic).
    pub unique: usize,
    pub total_sampled: u64,
    pub new_unique: usize,
    /// Tasks of this round that returned a failure.
    pub failed_tasks: usize,
}

/// Run totals after termination.
#[derive(Clone, Copy, Debug)]
pub struct SampleStats {
    pub unique: usize,
    pub total_sampled: u64,
    pub rounds: usize,
    pub failed_tasks: usize,
}

/// Sample one batch and reduce it to triples. Runs inside a worker task.
fn sample_task<E: ToricEngine>(
    engine: &E,
    poly: &E::Polytope,
    cfg: &SamplerCfg,
    seed: u64,
) -> TaskOutcome {
    let tri_cfg = TriangulationCfg {
        concentration: cfg.concentration,
    };
    let triangulations = match engine.random_triangulations(
        poly,
        cfg.batch_size,
        &tri_cfg,
        TriangulationBackend::Cgal,
        seed,
    ) {
        Ok(batch) => batch,
        Err(primary) => match engine.random_triangulations(
            poly,
            cfg.batch_size,
            &tri_cfg,
            TriangulationBackend::Qhull,
            seed,
        ) {
            Ok(batch) => batch,
            Err(fallback) => {
                return TaskOutcome::Failed(TaskFailure::Sampling { primary, fallback })
            }
        },
    };
    let mut triples = Vec::with_capacity(triangulations.len());
    for t in &triangulations {
        match derive_triple(engine, poly, t, cfg.stretch) {
            Ok(triple) => triples.push(triple),
            // Mid-batch derivation failure drops the whole batch. Kept
            // observable here instead of resurfacing partial results.
            Err(err) => return TaskOutcome::Failed(TaskFailure::Derivation(err)),
        }
    }
    TaskOutcome::Completed(triples)
}

fn derive_triple<E: ToricEngine>(
    engine: &E,
    poly: &E::Polytope,
    t: &E::Triangulation,
    stretch: f64,
) -> Result<SampleTriple, EngineError> {
    let gkz_full = engine.gkz_phi(poly, t)?;
    if gkz_full.len() < 2 {
        return Err(EngineError::degenerate("GKZ vector has no usable entries"));
    }
    // The leading coordinate is the origin's GKZ value, constant across all
    // triangulations of a fixed polytope.
    let gkz = gkz_full[1..].to_vec();
    let cy = engine.calabi_yau(t)?;
    let entries = engine.intersection_numbers(&cy)?;
    let fingerprint = Fingerprint::canonical(&entries);
    let tip = engine.stretched_cone_tip(&cy, stretch)?;
    let volume = engine.cy_volume(&cy, &tip)?;
    Ok(SampleTriple {
        fingerprint,
        entry: DatasetEntry {
            gkz,
            log_volume: volume.log10(),
        },
    })
}

/// Run the sampling loop to termination.
///
/// `on_round` observes one [`RoundReport`] per completed round; the unique
/// counter it sees is monotonic.
pub fn run_sampling<E>(
    engine: &E,
    poly: &E::Polytope,
    cfg: &SamplerCfg,
    seed: u64,
    mut on_round: impl FnMut(&RoundReport),
) -> (DedupTable, SampleStats)
where
    E: ToricEngine + Sync,
    E::Polytope: Sync,
{
    let mut master = StdRng::seed_from_u64(seed);
    let mut table = DedupTable::new();
    let mut total_sampled: u64 = 0;
    let mut rounds = 0;
    let mut failed_tasks = 0;

    while table.unique_len() < cfg.target_unique && total_sampled < cfg.max_samples {
        // Fresh seeds every round so tasks never replay each other's batches.
        let seeds: Vec<u64> = (0..cfg.workers).map(|_| master.next_u64()).collect();
        let outcomes: Vec<TaskOutcome> = seeds
            .par_iter()
            .map(|&task_seed| sample_task(engine, poly, cfg, task_seed))
            .collect();

        rounds += 1;
        let unique_before = table.unique_len();
        let mut round_failures = 0;
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Completed(triples) => {
                    for triple in triples {
                        table.insert(triple.fingerprint, triple.entry);
                    }
                }
                TaskOutcome::Failed(_) => round_failures += 1,
            }
        }
        failed_tasks += round_failures;
        total_sampled += (cfg.workers as u64) * (cfg.batch_size as u64);

        on_round(&RoundReport {
            round: rounds,
            unique: table.unique_len(),
            total_sampled,
            new_unique: table.unique_len() - unique_before,
            failed_tasks: round_failures,
        });
    }

    let stats = SampleStats {
        unique: table.unique_len(),
        total_sampled,
        rounds,
        failed_tasks,
    };
    (table, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PolytopeQuery, SyntheticCfg, SyntheticEngine};

    fn cfg(target_unique: usize, max_samples: u64, workers: usize, batch_size: usize) -> SamplerCfg {
        SamplerCfg {
            target_unique,
            max_samples,
            workers,
            batch_size,
            ..SamplerCfg::default()
        }
    }

    fn fetch(engine: &SyntheticEngine) -> <SyntheticEngine as ToricEngine>::Polytope {
        engine
            .fetch_polytope(&PolytopeQuery::favorable_n(10, Some(20)))
            .unwrap()
    }

    #[test]
    fn unreachable_target_stops_exactly_at_the_cap() {
        // Only 3 manifolds are reachable but 5 are requested: the loop must
        // exhaust the cap rather than spin forever.
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 3,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let (table, stats) = run_sampling(&engine, &poly, &cfg(5, 1000, 2, 10), 42, |_| {});
        assert_eq!(stats.total_sampled, 1000);
        assert_eq!(table.unique_len(), 3);
        assert_eq!(stats.rounds, 50);
    }

    #[test]
    fn reaching_the_unique_target_stops_the_loop() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 64,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let (table, stats) = run_sampling(&engine, &poly, &cfg(8, 1_000_000, 4, 25), 7, |_| {});
        assert!(table.unique_len() >= 8);
        assert!(stats.total_sampled <= 1_000_000);
        assert!(stats.total_sampled % 100 == 0);
    }

    #[test]
    fn cap_is_respected_even_when_the_last_round_overshoots_uniques() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 1,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let (_, stats) = run_sampling(&engine, &poly, &cfg(100, 40, 2, 10), 3, |_| {});
        assert_eq!(stats.total_sampled, 40);
    }

    #[test]
    fn progress_reports_are_monotonic_per_round() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 32,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let mut seen = Vec::new();
        run_sampling(&engine, &poly, &cfg(20, 2000, 2, 10), 5, |report| {
            seen.push(*report);
        });
        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[1].unique >= pair[0].unique);
            assert!(pair[1].total_sampled > pair[0].total_sampled);
            assert_eq!(pair[1].round, pair[0].round + 1);
        }
        let last = seen.last().unwrap();
        assert_eq!(last.unique, seen.iter().map(|r| r.new_unique).sum::<usize>());
    }

    #[test]
    fn primary_backend_failure_falls_back_without_data_loss() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 16,
            fail_cgal: true,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let (table, stats) = run_sampling(&engine, &poly, &cfg(4, 10_000, 2, 10), 9, |_| {});
        assert_eq!(stats.failed_tasks, 0);
        assert!(table.unique_len() >= 4);
    }

    #[test]
    fn double_backend_failure_is_counted_and_nonfatal() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 16,
            fail_cgal: true,
            fail_qhull: true,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let (table, stats) = run_sampling(&engine, &poly, &cfg(4, 60, 2, 10), 9, |_| {});
        // Every task fails, so the loop runs to the cap with zero entries.
        assert_eq!(table.unique_len(), 0);
        assert_eq!(stats.total_sampled, 60);
        assert_eq!(stats.failed_tasks, stats.rounds * 2);
    }

    #[test]
    fn derivation_failure_loses_batches_but_is_observable() {
        // h11 = 0 gives a rank-zero tensor: every derivation fails.
        let engine = SyntheticEngine::new(SyntheticCfg::default());
        let poly = engine
            .fetch_polytope(&PolytopeQuery::favorable_n(0, None))
            .unwrap();
        let (table, stats) = run_sampling(&engine, &poly, &cfg(4, 40, 2, 10), 13, |_| {});
        assert_eq!(table.unique_len(), 0);
        assert_eq!(stats.failed_tasks, stats.rounds * 2);
    }

    #[test]
    fn equal_seeds_replay_the_same_table() {
        let engine = SyntheticEngine::new(SyntheticCfg {
            universe: 48,
            ..SyntheticCfg::default()
        });
        let poly = fetch(&engine);
        let run = |seed| run_sampling(&engine, &poly, &cfg(16, 4000, 2, 20), seed, |_| {});
        let (table_a, stats_a) = run(21);
        let (table_b, stats_b) = run(21);
        assert_eq!(stats_a.total_sampled, stats_b.total_sampled);
        assert_eq!(table_a.unique_len(), table_b.unique_len());
        assert_eq!(table_a.entry_len(), table_b.entry_len());
        let fps_a: Vec<_> = table_a.fingerprints().cloned().collect();
        let fps_b: Vec<_> = table_b.fingerprints().cloned().collect();
        assert_eq!(fps_a, fps_b);
    }
}
