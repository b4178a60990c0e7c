//! Dataset generation core for Calabi-Yau volume prediction.
//!
//! Pipeline: a base toric polytope is triangulated at random in parallel
//! batches, each triangulation is reduced to a plain (fingerprint, GKZ,
//! log-volume) triple inside its worker task, triples are deduplicated by
//! manifold fingerprint, and the deduplicated groups are shuffled, split
//! into train/test at the manifold level, flattened, and z-score
//! normalized with train-only statistics.
//!
//! The toric geometry itself (polytope fetch, triangulation sampling,
//! intersection numbers, cone tips, volumes) lives behind the
//! [`engine::ToricEngine`] trait; this crate orchestrates, it does not
//! compute geometry.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API.

pub mod dedup;
pub mod engine;
pub mod fingerprint;
pub mod model;
pub mod sample;
pub mod split;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::dedup::{DatasetEntry, DedupTable};
    pub use crate::engine::{
        EngineError, IntersectionEntry, Lattice, PolytopeQuery, ToricEngine, TriangulationBackend,
        TriangulationCfg,
    };
    pub use crate::fingerprint::Fingerprint;
    pub use crate::model::ResDenseNet;
    pub use crate::sample::{run_sampling, RoundReport, SampleStats, SamplerCfg};
    pub use crate::split::{split_normalize, Dataset, FeatureStats, Multiplicity, SplitCfg};
}
