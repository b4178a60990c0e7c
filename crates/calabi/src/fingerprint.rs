//! Canonical manifold fingerprints from intersection numbers.
//!
//! Two triangulations of the same polytope can resolve to the same
//! Calabi-Yau phase; the only thing the pipeline trusts to detect this is
//! the intersection-number tensor under the engine's fixed basis choice.
//! The COO entries arrive in unspecified order, so the fingerprint sorts
//! each of the four columns (i, j, k, value) independently into ascending
//! order. Identical tensors then produce byte-identical fingerprints no
//! matter how the entries were enumerated.
//!
//! Values are stored by IEEE-754 bit pattern so equality and hashing are
//! exact. Ties or numerical-noise collisions between distinct manifolds
//! are assumed absent.

use crate::engine::IntersectionEntry;

/// Canonical, hashable, order-independent key for a Calabi-Yau phase.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    i: Box<[u32]>,
    j: Box<[u32]>,
    k: Box<[u32]>,
    value_bits: Box<[u64]>,
}

impl Fingerprint {
    /// Canonicalize a COO tensor: sort each column independently.
    pub fn canonical(entries: &[IntersectionEntry]) -> Self {
        let mut i: Vec<u32> = entries.iter().map(|e| e.i).collect();
        let mut j: Vec<u32> = entries.iter().map(|e| e.j).collect();
        let mut k: Vec<u32> = entries.iter().map(|e| e.k).collect();
        let mut values: Vec<f64> = entries.iter().map(|e| e.value).collect();
        i.sort_unstable();
        j.sort_unstable();
        k.sort_unstable();
        values.sort_unstable_by(f64::total_cmp);
        Self {
            i: i.into_boxed_slice(),
            j: j.into_boxed_slice(),
            k: k.into_boxed_slice(),
            value_bits: values.iter().map(|v| v.to_bits()).collect(),
        }
    }

    /// Number of tensor entries behind this fingerprint.
    pub fn len(&self) -> usize {
        self.value_bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_bits.is_empty()
    }
}
