//! Manifold-level shuffle, train/test split, flatten, z-score normalize.
//!
//! The unit of shuffling and splitting is the manifold group, never the
//! triangulation: all entries of one manifold land on the same side of the
//! boundary, so no geometry leaks between train and test. Normalization
//! statistics are fit on the train feature matrix only and then applied to
//! both sides.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

use crate::dedup::{DatasetEntry, DedupTable};

/// Added to the per-column std before dividing, so constant features scale
/// by `1/NORM_TOL` consistently instead of dividing by zero.
pub const NORM_TOL: f64 = 1e-10;

/// How many entries a manifold contributes after the split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    /// Keep every observed triangulation; manifolds seen via many
    /// triangulations weigh proportionally more.
    PerTriangulation,
    /// Keep only the first observed triangulation per manifold.
    PerManifold,
}

/// Split parameters.
#[derive(Clone, Copy, Debug)]
pub struct SplitCfg {
    /// Fraction of manifolds (not entries) assigned to train.
    pub ratio: f64,
    pub seed: u64,
    pub weighting: Multiplicity,
}

impl Default for SplitCfg {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            seed: 0,
            weighting: Multiplicity::PerTriangulation,
        }
    }
}

/// Error raised when feature widths disagree across entries.
#[derive(Debug)]
pub enum SplitError {
    RaggedFeatures { expected: usize, found: usize },
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RaggedFeatures { expected, found } => write!(
                f,
                "feature width must be uniform (expected {expected}, found {found})"
            ),
        }
    }
}

impl std::error::Error for SplitError {}

/// Per-column mean and population std of a feature matrix.
#[derive(Clone, Debug)]
pub struct FeatureStats {
    pub mean: DVector<f64>,
    pub std: DVector<f64>,
}

impl FeatureStats {
    /// Fit on a feature matrix (rows are samples).
    pub fn fit(features: &DMatrix<f64>) -> Self {
        let (rows, cols) = features.shape();
        let mut mean = DVector::zeros(cols);
        let mut std = DVector::zeros(cols);
        if rows == 0 {
            return Self { mean, std };
        }
        for c in 0..cols {
            let col = features.column(c);
            mean[c] = col.mean();
            std[c] = col.variance().sqrt();
        }
        Self { mean, std }
    }

    /// Apply `(x - mean) / (std + NORM_TOL)` in place, column by column.
    pub fn normalize(&self, features: &mut DMatrix<f64>) {
        let (rows, cols) = features.shape();
        for c in 0..cols {
            let denom = self.std[c] + NORM_TOL;
            for r in 0..rows {
                features[(r, c)] = (features[(r, c)] - self.mean[c]) / denom;
            }
        }
    }
}

/// The four numeric tables handed to training, plus the fitted stats.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub train_features: DMatrix<f64>,
    pub train_labels: DVector<f64>,
    pub test_features: DMatrix<f64>,
    pub test_labels: DVector<f64>,
    pub stats: FeatureStats,
}

impl Dataset {
    pub fn train_len(&self) -> usize {
        self.train_features.nrows()
    }

    pub fn test_len(&self) -> usize {
        self.test_features.nrows()
    }
}

fn flatten(groups: Vec<Vec<DatasetEntry>>, weighting: Multiplicity) -> Vec<DatasetEntry> {
    match weighting {
        Multiplicity::PerTriangulation => groups.into_iter().flatten().collect(),
        Multiplicity::PerManifold => groups
            .into_iter()
            .filter_map(|group| group.into_iter().next())
            .collect(),
    }
}

fn to_tables(
    entries: Vec<DatasetEntry>,
    width: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), SplitError> {
    let rows = entries.len();
    let mut features = DMatrix::zeros(rows, width);
    let mut labels = DVector::zeros(rows);
    for (r, entry) in entries.into_iter().enumerate() {
        if entry.gkz.len() != width {
            return Err(SplitError::RaggedFeatures {
                expected: width,
                found: entry.gkz.len(),
            });
        }
        for (c, value) in entry.gkz.into_iter().enumerate() {
            features[(r, c)] = value;
        }
        labels[r] = entry.log_volume;
    }
    Ok((features, labels))
}

/// Consume the dedup table into normalized train/test tables.
///
/// The fingerprint index is dropped on entry; only the entry groups stay
/// resident while the flattened copies are built.
pub fn split_normalize(table: DedupTable, cfg: &SplitCfg) -> Result<Dataset, SplitError> {
    let mut groups = table.into_groups();
    let width = groups
        .iter()
        .flat_map(|g| g.first())
        .map(|e| e.gkz.len())
        .next()
        .unwrap_or(0);

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    groups.shuffle(&mut rng);
    let train_len = ((groups.len() as f64) * cfg.ratio).floor() as usize;
    let test_groups = groups.split_off(train_len);
    let train_groups = groups;

    let (mut train_features, train_labels) =
        to_tables(flatten(train_groups, cfg.weighting), width)?;
    let (mut test_features, test_labels) = to_tables(flatten(test_groups, cfg.weighting), width)?;

    let stats = FeatureStats::fit(&train_features);
    stats.normalize(&mut train_features);
    stats.normalize(&mut test_features);

    Ok(Dataset {
        train_features,
        train_labels,
        test_features,
        test_labels,
        stats,
    })
}
