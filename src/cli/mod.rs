//! Command-line parsing for the market penetration index.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the index engine.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::GroupingMode;
use crate::index::locator::{DEFAULT_PRIMARY_SECTION, DEFAULT_SECONDARY_SECTION};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mpi", version, about = "Market penetration index per listing group")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute grouped index summaries and print them (default).
    Compute(ComputeArgs),
    /// Like `compute`, plus a precomputed-vs-derived table per listing and window.
    Compare(ComputeArgs),
    /// Write a synthetic entities file and reference directory.
    Sample(SampleArgs),
}

/// Options shared by `compute` and `compare`.
#[derive(Debug, Args, Clone)]
pub struct ComputeArgs {
    /// Entities JSON file (array of listings).
    #[arg(short = 'e', long, value_name = "JSON")]
    pub entities: Option<PathBuf>,

    /// Directory of reference datasets (`<id>.json`, optional `shared.json`).
    #[arg(short = 'r', long, value_name = "DIR")]
    pub reference_dir: Option<PathBuf>,

    /// Fetch from the remote API (`MPI_API_BASE` / `MPI_API_KEY`), falling
    /// back to the cache and then to synthetic data.
    #[arg(long, conflicts_with_all = ["entities", "reference_dir"])]
    pub remote: bool,

    /// Cache directory for remote payloads.
    #[arg(long, default_value = ".mpi-cache")]
    pub cache_dir: PathBuf,

    /// How listings are grouped before averaging.
    #[arg(short = 'g', long, value_enum, default_value_t = GroupingMode::City)]
    pub grouping: GroupingMode,

    /// Start date of every window (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Reference section searched first for an occupancy series.
    #[arg(long, default_value = DEFAULT_PRIMARY_SECTION)]
    pub primary_section: String,

    /// Reference section scanned channel-by-channel when the primary has none.
    #[arg(long, default_value = DEFAULT_SECONDARY_SECTION)]
    pub secondary_section: String,

    /// Disable the secondary-section scan.
    #[arg(long)]
    pub no_secondary: bool,

    /// HTTP timeout per request, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Number of synthetic listings when falling back to samples.
    #[arg(short = 'n', long, default_value_t = 24)]
    pub sample_count: usize,

    /// Random seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export group summaries to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export the full run (summaries, statistics, raw resolutions) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for writing a synthetic bundle.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output directory.
    #[arg(short = 'o', long, default_value = "sample-data")]
    pub out: PathBuf,

    /// Number of synthetic listings.
    #[arg(short = 'n', long, default_value_t = 24)]
    pub sample_count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Anchor date for the generated series (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,
}
