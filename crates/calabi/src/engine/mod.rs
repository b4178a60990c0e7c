//! Boundary to the external toric-geometry engine.
//!
//! Purpose
//! - Define the exact surface the pipeline needs from a geometry engine:
//!   fetch one base polytope, sample random triangulations of it, and reduce
//!   a triangulation to plain numbers (GKZ vector, intersection entries,
//!   stretched-cone tip, volume).
//! - Keep engine objects opaque. Worker tasks hold `Triangulation` and
//!   `CalabiYau` values only on their own stack and hand back primitive
//!   triples; nothing engine-owned crosses the task boundary. This is a hard
//!   design constraint of the pipeline, not a convenience.
//!
//! The real engine is an external collaborator and is not reimplemented
//! here. [`synthetic`] provides a deterministic stand-in with the same
//! surface for tests, benches, and smoke runs.

use std::fmt;

pub mod synthetic;

pub use synthetic::{SyntheticCfg, SyntheticEngine};

/// Lattice convention for the polytope fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lattice {
    /// N-lattice (the convention used for hypersurface construction).
    N,
    /// M-lattice (dual).
    M,
}

/// Parameters of the one-shot polytope fetch.
///
/// Only the first polytope of the result stream is used by the pipeline.
#[derive(Clone, Debug)]
pub struct PolytopeQuery {
    pub h11: u32,
    /// When absent, the corpus returns the smallest-h21 match first.
    pub h21: Option<u32>,
    pub lattice: Lattice,
    pub limit: usize,
    pub favorable: bool,
}

impl PolytopeQuery {
    /// Query with the corpus defaults used by the dataset run.
    pub fn favorable_n(h11: u32, h21: Option<u32>) -> Self {
        Self {
            h11,
            h21,
            lattice: Lattice::N,
            limit: 1,
            favorable: true,
        }
    }
}

/// Combinatorial backend used by the triangulation sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriangulationBackend {
    Cgal,
    Qhull,
}

impl fmt::Display for TriangulationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cgal => write!(f, "cgal"),
            Self::Qhull => write!(f, "qhull"),
        }
    }
}

/// Sampler configuration shared by all triangulation batches.
#[derive(Clone, Copy, Debug)]
pub struct TriangulationCfg {
    /// Concentration parameter of the random height perturbation.
    pub concentration: f64,
}

impl Default for TriangulationCfg {
    fn default() -> Self {
        Self { concentration: 2.5 }
    }
}

/// One COO entry of the intersection-number tensor, in basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    pub i: u32,
    pub j: u32,
    pub k: u32,
    pub value: f64,
}

/// Error type shared by all engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// The polytope corpus returned nothing for the query.
    FetchEmpty { reason: String },
    /// The triangulation sampler failed (solver error, unsupported input).
    Sampling {
        backend: TriangulationBackend,
        reason: String,
    },
    /// A derived quantity could not be computed (degenerate cone, singular
    /// tensor, empty GKZ vector).
    Degenerate { reason: String },
}

impl EngineError {
    pub fn fetch_empty(reason: impl Into<String>) -> Self {
        Self::FetchEmpty {
            reason: reason.into(),
        }
    }

    pub fn sampling(backend: TriangulationBackend, reason: impl Into<String>) -> Self {
        Self::Sampling {
            backend,
            reason: reason.into(),
        }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::Degenerate {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchEmpty { reason } => write!(f, "polytope fetch returned nothing: {reason}"),
            Self::Sampling { backend, reason } => {
                write!(f, "triangulation sampling failed ({backend}): {reason}")
            }
            Self::Degenerate { reason } => write!(f, "degenerate geometry: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Surface the pipeline requires from a toric-geometry engine.
///
/// Associated types are opaque: the pipeline never inspects them, stores
/// them, or sends them across a task boundary. Every numeric quantity the
/// dataset needs has its own accessor returning plain data.
pub trait ToricEngine {
    type Polytope;
    type Triangulation;
    type CalabiYau;

    /// Fetch the base polytope; only the first match is returned.
    fn fetch_polytope(&self, query: &PolytopeQuery) -> Result<Self::Polytope, EngineError>;

    /// Sample `count` random fine regular triangulations of `poly`.
    fn random_triangulations(
        &self,
        poly: &Self::Polytope,
        count: usize,
        cfg: &TriangulationCfg,
        backend: TriangulationBackend,
        seed: u64,
    ) -> Result<Vec<Self::Triangulation>, EngineError>;

    /// Full GKZ vector of a triangulation. The first coordinate belongs to
    /// the origin and is constant across all triangulations of a fixed
    /// polytope; callers drop it.
    fn gkz_phi(
        &self,
        poly: &Self::Polytope,
        t: &Self::Triangulation,
    ) -> Result<Vec<f64>, EngineError>;

    /// Calabi-Yau hypersurface of a triangulation under the engine's fixed,
    /// deterministic Kähler-basis choice.
    fn calabi_yau(&self, t: &Self::Triangulation) -> Result<Self::CalabiYau, EngineError>;

    /// Intersection-number tensor in basis, as COO entries. Entry order is
    /// unspecified; callers canonicalize.
    fn intersection_numbers(
        &self,
        cy: &Self::CalabiYau,
    ) -> Result<Vec<IntersectionEntry>, EngineError>;

    /// Tip of the Kähler cone stretched by `stretch`.
    fn stretched_cone_tip(
        &self,
        cy: &Self::CalabiYau,
        stretch: f64,
    ) -> Result<Vec<f64>, EngineError>;

    /// Calabi-Yau volume at a point of the Kähler cone.
    fn cy_volume(&self, cy: &Self::CalabiYau, tip: &[f64]) -> Result<f64, EngineError>;
}
