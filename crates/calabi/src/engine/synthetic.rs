//! Deterministic synthetic engine (test/smoke stand-in).
//!
//! Purpose
//! - Exercise the pipeline end-to-end without the external geometry engine:
//!   a bounded universe of manifolds, several triangulation variants per
//!   manifold, manifold-invariant volumes, and per-backend failure knobs.
//! - Stay deterministic. Every quantity is a pure function of
//!   (seed, manifold, variant), so runs replay exactly.
//!
//! Model
//! - The base polytope has `h11 + 4` rays (the favorable convention), so
//!   GKZ vectors have `h11 + 3` usable coordinates after the constant
//!   origin coordinate is dropped.
//! - Triangulation sampling picks a manifold index skewed by the
//!   concentration parameter, then a variant index. Variants of one
//!   manifold emit the same intersection entries in different orders, so
//!   fingerprint canonicalization is genuinely exercised.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{
    EngineError, IntersectionEntry, PolytopeQuery, ToricEngine, TriangulationBackend,
    TriangulationCfg,
};

/// GKZ value of the origin, constant across all triangulations.
const ORIGIN_GKZ: f64 = 6.0;

/// SplitMix64-style mixing, cheap and stable.
fn mix(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn rng_for(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(mix(seed ^ mix(stream.wrapping_add(0x9e3779b97f4a7c15))))
}

/// Shape of the synthetic manifold universe.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticCfg {
    /// Distinct manifolds reachable from the base polytope.
    pub universe: u64,
    /// Distinct triangulations resolving to each manifold.
    pub variants_per_manifold: u64,
    /// COO entries in each manifold's intersection tensor.
    pub tensor_entries: usize,
    /// Simulate a solver failure in the cgal backend.
    pub fail_cgal: bool,
    /// Simulate a solver failure in the qhull backend.
    pub fail_qhull: bool,
}

impl Default for SyntheticCfg {
    fn default() -> Self {
        Self {
            universe: 512,
            variants_per_manifold: 4,
            tensor_entries: 24,
            fail_cgal: false,
            fail_qhull: false,
        }
    }
}

/// Synthetic base polytope; plain data, shareable across worker tasks.
#[derive(Clone, Debug)]
pub struct SyntheticPolytope {
    pub h11: u32,
    pub h21: Option<u32>,
    pub ray_count: usize,
}

/// Opaque triangulation handle. Never leaves a worker task.
#[derive(Clone, Debug)]
pub struct SyntheticTriangulation {
    manifold: u64,
    variant: u64,
    ray_count: usize,
}

/// Opaque Calabi-Yau handle. Never leaves a worker task.
#[derive(Clone, Debug)]
pub struct SyntheticCalabiYau {
    manifold: u64,
    variant: u64,
    /// Kähler cone dimension (= h11).
    dim: usize,
    tensor_entries: usize,
}

/// Deterministic stand-in for the external toric engine.
#[derive(Clone, Debug, Default)]
pub struct SyntheticEngine {
    cfg: SyntheticCfg,
}

impl SyntheticEngine {
    pub fn new(cfg: SyntheticCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &SyntheticCfg {
        &self.cfg
    }
}

impl ToricEngine for SyntheticEngine {
    type Polytope = SyntheticPolytope;
    type Triangulation = SyntheticTriangulation;
    type CalabiYau = SyntheticCalabiYau;

    fn fetch_polytope(&self, query: &PolytopeQuery) -> Result<Self::Polytope, EngineError> {
        if query.limit == 0 {
            return Err(EngineError::fetch_empty("query limit is zero"));
        }
        Ok(SyntheticPolytope {
            h11: query.h11,
            h21: query.h21,
            ray_count: query.h11 as usize + 4,
        })
    }

    fn random_triangulations(
        &self,
        poly: &Self::Polytope,
        count: usize,
        cfg: &TriangulationCfg,
        backend: TriangulationBackend,
        seed: u64,
    ) -> Result<Vec<Self::Triangulation>, EngineError> {
        let fails = match backend {
            TriangulationBackend::Cgal => self.cfg.fail_cgal,
            TriangulationBackend::Qhull => self.cfg.fail_qhull,
        };
        if fails {
            return Err(EngineError::sampling(backend, "solver failure (simulated)"));
        }
        let universe = self.cfg.universe.max(1);
        let variants = self.cfg.variants_per_manifold.max(1);
        let mut rng = rng_for(seed, universe);
        let skew = cfg.concentration.max(1.0);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            // Higher concentration narrows the sampler onto low indices,
            // which is what makes duplicates frequent in real runs too.
            let u: f64 = rng.gen();
            let manifold = ((universe as f64) * u.powf(skew)) as u64 % universe;
            let variant = rng.gen_range(0..variants);
            out.push(SyntheticTriangulation {
                manifold,
                variant,
                ray_count: poly.ray_count,
            });
        }
        Ok(out)
    }

    fn gkz_phi(
        &self,
        _poly: &Self::Polytope,
        t: &Self::Triangulation,
    ) -> Result<Vec<f64>, EngineError> {
        // Distinct per (manifold, variant): the GKZ vector separates
        // triangulations, not manifolds.
        let mut rng = rng_for(t.manifold, t.variant.wrapping_add(1));
        let mut gkz = Vec::with_capacity(t.ray_count);
        gkz.push(ORIGIN_GKZ);
        for _ in 1..t.ray_count {
            gkz.push(rng.gen_range(1.0..60.0_f64).round());
        }
        Ok(gkz)
    }

    fn calabi_yau(&self, t: &Self::Triangulation) -> Result<Self::CalabiYau, EngineError> {
        Ok(SyntheticCalabiYau {
            manifold: t.manifold,
            variant: t.variant,
            dim: t.ray_count.saturating_sub(4),
            tensor_entries: self.cfg.tensor_entries,
        })
    }

    fn intersection_numbers(
        &self,
        cy: &Self::CalabiYau,
    ) -> Result<Vec<IntersectionEntry>, EngineError> {
        if cy.dim == 0 {
            return Err(EngineError::degenerate("intersection tensor has rank zero"));
        }
        // Entries depend on the manifold only; the emission order depends on
        // the variant, mimicking basis-relabelled duplicate phases.
        let mut rng = rng_for(cy.manifold, 2);
        let dim = cy.dim as u32;
        let mut entries = Vec::with_capacity(cy.tensor_entries);
        for _ in 0..cy.tensor_entries {
            let i = rng.gen_range(0..dim);
            let j = rng.gen_range(i..dim);
            let k = rng.gen_range(j..dim);
            let magnitude = rng.gen_range(1..=9i32);
            let value = if rng.gen() {
                f64::from(magnitude)
            } else {
                f64::from(-magnitude)
            };
            entries.push(IntersectionEntry { i, j, k, value });
        }
        let mut order_rng = rng_for(cy.variant, 3);
        entries.shuffle(&mut order_rng);
        Ok(entries)
    }

    fn stretched_cone_tip(
        &self,
        cy: &Self::CalabiYau,
        stretch: f64,
    ) -> Result<Vec<f64>, EngineError> {
        if cy.dim == 0 {
            return Err(EngineError::degenerate("Kähler cone is empty"));
        }
        // Manifold-level invariant, like the real stretched-cone tip under
        // the fixed basis choice.
        let mut rng = rng_for(cy.manifold, 4);
        let tip = (0..cy.dim)
            .map(|_| stretch * rng.gen_range(0.5..3.0))
            .collect();
        Ok(tip)
    }

    fn cy_volume(&self, cy: &Self::CalabiYau, tip: &[f64]) -> Result<f64, EngineError> {
        if tip.is_empty() {
            return Err(EngineError::degenerate("volume form over an empty cone"));
        }
        // Cubic in the Kähler parameters, as a real CY volume is.
        let s: f64 = tip.iter().sum();
        let scale = 1.0 + (mix(cy.manifold) % 1000) as f64 / 1000.0;
        Ok(scale * s.powi(3) / 6.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn engine() -> SyntheticEngine {
        SyntheticEngine::new(SyntheticCfg {
            universe: 8,
            variants_per_manifold: 3,
            ..SyntheticCfg::default()
        })
    }

    fn base(engine: &SyntheticEngine) -> SyntheticPolytope {
        engine
            .fetch_polytope(&PolytopeQuery::favorable_n(10, Some(20)))
            .unwrap()
    }

    #[test]
    fn sampling_replays_for_equal_seeds() {
        let eng = engine();
        let poly = base(&eng);
        let cfg = TriangulationCfg::default();
        let a = eng
            .random_triangulations(&poly, 16, &cfg, TriangulationBackend::Cgal, 7)
            .unwrap();
        let b = eng
            .random_triangulations(&poly, 16, &cfg, TriangulationBackend::Cgal, 7)
            .unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.manifold, y.manifold);
            assert_eq!(x.variant, y.variant);
        }
    }

    #[test]
    fn gkz_starts_with_the_constant_origin_coordinate() {
        let eng = engine();
        let poly = base(&eng);
        let cfg = TriangulationCfg::default();
        let batch = eng
            .random_triangulations(&poly, 8, &cfg, TriangulationBackend::Qhull, 11)
            .unwrap();
        for t in &batch {
            let gkz = eng.gkz_phi(&poly, t).unwrap();
            assert_eq!(gkz.len(), poly.ray_count);
            assert_eq!(gkz[0], ORIGIN_GKZ);
        }
    }

    #[test]
    fn variants_share_fingerprint_and_volume() {
        let eng = engine();
        let t0 = SyntheticTriangulation {
            manifold: 5,
            variant: 0,
            ray_count: 14,
        };
        let t1 = SyntheticTriangulation {
            manifold: 5,
            variant: 2,
            ray_count: 14,
        };
        let cy0 = eng.calabi_yau(&t0).unwrap();
        let cy1 = eng.calabi_yau(&t1).unwrap();
        let e0 = eng.intersection_numbers(&cy0).unwrap();
        let e1 = eng.intersection_numbers(&cy1).unwrap();
        // Emission order differs; canonical form must not.
        assert_eq!(Fingerprint::canonical(&e0), Fingerprint::canonical(&e1));
        let tip0 = eng.stretched_cone_tip(&cy0, 1.0).unwrap();
        let tip1 = eng.stretched_cone_tip(&cy1, 1.0).unwrap();
        let v0 = eng.cy_volume(&cy0, &tip0).unwrap();
        let v1 = eng.cy_volume(&cy1, &tip1).unwrap();
        assert_eq!(v0, v1);
        // Different GKZ vectors per variant keep the entries distinct.
        let poly = base(&eng);
        assert_ne!(
            eng.gkz_phi(&poly, &t0).unwrap(),
            eng.gkz_phi(&poly, &t1).unwrap()
        );
    }

    #[test]
    fn backend_failure_knobs_fail_the_right_backend() {
        let eng = SyntheticEngine::new(SyntheticCfg {
            fail_cgal: true,
            ..SyntheticCfg::default()
        });
        let poly = base(&eng);
        let cfg = TriangulationCfg::default();
        assert!(eng
            .random_triangulations(&poly, 4, &cfg, TriangulationBackend::Cgal, 1)
            .is_err());
        assert!(eng
            .random_triangulations(&poly, 4, &cfg, TriangulationBackend::Qhull, 1)
            .is_ok());
    }

    #[test]
    fn rank_zero_tensor_is_a_degenerate_error() {
        let eng = engine();
        let t = SyntheticTriangulation {
            manifold: 0,
            variant: 0,
            ray_count: 4,
        };
        let cy = eng.calabi_yau(&t).unwrap();
        assert!(eng.intersection_numbers(&cy).is_err());
        assert!(eng.stretched_cone_tip(&cy, 1.0).is_err());
    }
}
