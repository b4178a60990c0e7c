use anyhow::{Context, Result};
use calabi::engine::{PolytopeQuery, SyntheticCfg, SyntheticEngine, ToricEngine};
use calabi::sample::{run_sampling, SamplerCfg};
use calabi::split::{split_normalize, Multiplicity, SplitCfg};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::fmt::SubscriberBuilder;

mod dataset_io;
mod provenance;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "GKZ dataset generation for Calabi-Yau volume prediction")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Sample triangulations, dedup by manifold, split, normalize, write CSVs
    Generate(GenerateArgs),
    /// Report the shape of a generated CSV file
    Inspect {
        #[arg(long)]
        path: String,
    },
}

#[derive(Args, Serialize)]
struct GenerateArgs {
    /// Hodge number h11 of the base polytope
    #[arg(long, default_value_t = 30)]
    h11: u32,
    /// Hodge number h21; the corpus returns the smallest match when omitted
    #[arg(long)]
    h21: Option<u32>,
    /// Unique-manifold target
    #[arg(long, default_value_t = 1_000_000)]
    target_unique: usize,
    /// Hard cap on total sampled triangulations
    #[arg(long, default_value_t = 10_000_000_000)]
    max_samples: u64,
    /// Fraction of manifolds assigned to the training set
    #[arg(long, default_value_t = 0.8)]
    split_ratio: f64,
    /// Parallel sampling tasks per round
    #[arg(long, default_value_t = 16)]
    workers: usize,
    /// Triangulations requested per task
    #[arg(long, default_value_t = 100)]
    batch_size: usize,
    /// Concentration parameter of the triangulation sampler
    #[arg(long, default_value_t = 2.5)]
    concentration: f64,
    /// Keep one entry per manifold instead of one per triangulation
    #[arg(long)]
    per_manifold: bool,
    /// Master seed for sampling and the train/test shuffle
    #[arg(long, default_value_t = 2025)]
    seed: u64,
    /// Output directory (created if absent)
    #[arg(long)]
    out: PathBuf,
    /// Synthetic engine: size of the reachable manifold universe
    #[arg(long, default_value_t = 512)]
    synthetic_universe: u64,
    /// Synthetic engine: distinct triangulations per manifold
    #[arg(long, default_value_t = 4)]
    synthetic_variants: u64,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Generate(args) => generate(args),
        Action::Inspect { path } => inspect(path),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let engine = SyntheticEngine::new(SyntheticCfg {
        universe: args.synthetic_universe,
        variants_per_manifold: args.synthetic_variants,
        ..SyntheticCfg::default()
    });
    let query = PolytopeQuery::favorable_n(args.h11, args.h21);
    let poly = engine
        .fetch_polytope(&query)
        .context("fetching base polytope")?;
    tracing::info!(h11 = args.h11, h21 = ?args.h21, "base_polytope_fetched");

    let sampler = SamplerCfg {
        target_unique: args.target_unique,
        max_samples: args.max_samples,
        workers: args.workers,
        batch_size: args.batch_size,
        concentration: args.concentration,
        stretch: 1.0,
    };
    let bar = ProgressBar::new(args.target_unique as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} unique manifolds [{elapsed_precise}]")
            .expect("valid template"),
    );
    let (table, stats) = run_sampling(&engine, &poly, &sampler, args.seed, |report| {
        bar.set_position(report.unique as u64);
        if report.failed_tasks > 0 {
            tracing::warn!(
                round = report.round,
                failed = report.failed_tasks,
                "sampling_tasks_failed"
            );
        }
    });
    bar.finish_and_clear();
    tracing::info!(
        unique = stats.unique,
        total_sampled = stats.total_sampled,
        rounds = stats.rounds,
        failed_tasks = stats.failed_tasks,
        "sampling_finished"
    );

    let split_cfg = SplitCfg {
        ratio: args.split_ratio,
        seed: args.seed,
        weighting: if args.per_manifold {
            Multiplicity::PerManifold
        } else {
            Multiplicity::PerTriangulation
        },
    };
    let dataset = split_normalize(table, &split_cfg).context("splitting dataset")?;

    let paths = dataset_io::write_dataset(&args.out, &dataset)?;
    provenance::write_sidecar(
        args.out.join("dataset"),
        serde_json::to_value(&args)?,
        &paths,
    )?;
    tracing::info!(out = %args.out.display(), "dataset_written");

    println!("Number of unique CYs: {}", stats.unique);
    println!("Training set size: {}", dataset.train_len());
    println!("Testing set size: {}", dataset.test_len());
    println!("Done!");
    Ok(())
}

fn inspect(path: String) -> Result<()> {
    let (rows, cols) = dataset_io::csv_shape(&path)?;
    tracing::info!(path, rows, cols, "csv_shape");
    println!("{path}: {rows} rows x {cols} cols");
    Ok(())
}
