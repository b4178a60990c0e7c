//! Insertion-ordered deduplication table keyed by manifold fingerprint.
//!
//! One key per Calabi-Yau phase, one group entry per triangulation observed
//! for it. The table is owned by the orchestrator and mutated only between
//! sampling rounds; worker tasks never touch it. Groups keep first-seen
//! order so runs with a fixed seed replay exactly; the split step is the
//! only consumer and consumes the table by value, dropping the hash index
//! before the flattened copies are built.

use std::collections::HashMap;

use crate::fingerprint::Fingerprint;

/// One observed triangulation reduced to training data.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetEntry {
    /// GKZ vector with the constant origin coordinate already dropped.
    pub gkz: Vec<f64>,
    /// Base-10 log of the CY volume at the stretched-cone tip.
    pub log_volume: f64,
}

/// Fingerprint → ordered group of entries, preserving key insertion order.
#[derive(Debug, Default)]
pub struct DedupTable {
    index: HashMap<Fingerprint, usize>,
    groups: Vec<Vec<DatasetEntry>>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` under `fingerprint`. Returns `true` when the
    /// fingerprint was new (a previously unseen manifold).
    pub fn insert(&mut self, fingerprint: Fingerprint, entry: DatasetEntry) -> bool {
        match self.index.get(&fingerprint) {
            Some(&slot) => {
                self.groups[slot].push(entry);
                false
            }
            None => {
                self.index.insert(fingerprint, self.groups.len());
                self.groups.push(vec![entry]);
                true
            }
        }
    }

    /// Number of unique manifolds seen so far.
    pub fn unique_len(&self) -> usize {
        self.groups.len()
    }

    /// Total entries across all groups (one per kept triangulation).
    pub fn entry_len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.index.contains_key(fingerprint)
    }

    /// Iterate fingerprints in insertion order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        let mut by_slot: Vec<(&Fingerprint, usize)> =
            self.index.iter().map(|(fp, &slot)| (fp, slot)).collect();
        by_slot.sort_unstable_by_key(|&(_, slot)| slot);
        by_slot.into_iter().map(|(fp, _)| fp)
    }

    /// Consume the table into its groups, dropping the fingerprint index.
    pub fn into_groups(self) -> Vec<Vec<DatasetEntry>> {
        self.groups
    }
}
