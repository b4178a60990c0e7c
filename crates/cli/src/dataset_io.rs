//! Headerless CSV emission of the four dataset tables via polars.

use anyhow::{Context, Result};
use calabi::split::Dataset;
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const TRAIN_FEATURES: &str = "train_features.csv";
pub const TEST_FEATURES: &str = "test_features.csv";
pub const TRAIN_LABELS: &str = "train_labels.csv";
pub const TEST_LABELS: &str = "test_labels.csv";

fn features_frame(features: &DMatrix<f64>) -> Result<DataFrame> {
    let columns: Vec<Series> = (0..features.ncols())
        .map(|c| {
            let values: Vec<f64> = features.column(c).iter().copied().collect();
            Series::new(format!("f{c}").into(), values)
        })
        .collect();
    DataFrame::new(columns).context("assembling feature frame")
}

fn labels_frame(labels: &DVector<f64>) -> Result<DataFrame> {
    let values: Vec<f64> = labels.iter().copied().collect();
    DataFrame::new(vec![Series::new("log_volume".into(), values)])
        .context("assembling label frame")
}

fn write_frame(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Write all four tables into `dir` (created if absent). Returns the paths
/// written, in a fixed order.
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let paths = vec![
        dir.join(TRAIN_FEATURES),
        dir.join(TEST_FEATURES),
        dir.join(TRAIN_LABELS),
        dir.join(TEST_LABELS),
    ];
    write_frame(&paths[0], &mut features_frame(&dataset.train_features)?)?;
    write_frame(&paths[1], &mut features_frame(&dataset.test_features)?)?;
    write_frame(&paths[2], &mut labels_frame(&dataset.train_labels)?)?;
    write_frame(&paths[3], &mut labels_frame(&dataset.test_labels)?)?;
    Ok(paths)
}

/// Shape of a headerless CSV, via the lazy reader.
pub fn csv_shape(path: &str) -> Result<(usize, usize)> {
    let lf = LazyCsvReader::new(path)
        .with_has_header(false)
        .with_infer_schema_length(Some(100))
        .finish()
        .with_context(|| format!("opening {path}"))?;
    let df = lf.collect().with_context(|| format!("reading {path}"))?;
    Ok(df.shape())
}
