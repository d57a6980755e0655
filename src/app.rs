//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - assembles entity sources and the reference provider
//! - runs the index pipeline
//! - prints reports and writes optional exports

use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, ComputeArgs, SampleArgs};
use crate::data::cache::DiskCache;
use crate::data::provider::{EntitySource, NoReference, ReferenceProvider};
use crate::data::{
    DirectoryProvider, EntityChain, ReferenceChain, RemoteClient, SampleConfig, SampleEntitySource,
    SampleReferenceProvider,
};
use crate::domain::{RunConfig, SourceKind};
use crate::error::AppError;
use crate::index::locator::{FirstAvailableCategory, LocatorConfig};
use crate::io::ingest::JsonFileSource;

pub mod pipeline;

/// Entry point for the `mpi` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `mpi` and `mpi -e listings.json` behave like `mpi compute ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Compute(args) => handle_compute(args, false),
        Command::Compare(args) => handle_compute(args, true),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Logs go to stderr; stdout is reserved for reports.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mpi_index=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn handle_compute(args: ComputeArgs, compare: bool) -> Result<(), AppError> {
    let config = run_config_from_args(&args, compare);
    let run = run_index(&config)?;

    println!("{}", crate::report::format_run_summary(&run.output));
    println!("{}", crate::report::format_statistics(&run.output.statistics));
    println!("{}", crate::report::format_ingest(run.rows_read, &run.row_errors));
    if let Some(rows) = &run.output.comparisons {
        println!("{}", crate::report::format_comparisons(rows));
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        crate::io::export::write_summaries_csv(path, &run.output)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_run_json(path, &run.output)?;
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        count: args.sample_count,
        seed: args.seed,
        as_of: args.as_of.unwrap_or_else(today),
    };
    let reference_dir = crate::data::sample::write_sample_bundle(&args.out, &config)?;
    println!(
        "Wrote {} listings to {} (reference data in {}).",
        config.count,
        args.out.join("entities.json").display(),
        reference_dir.display()
    );
    Ok(())
}

/// Pipeline outputs plus ingest diagnostics.
pub struct AppRun {
    pub output: pipeline::IndexRun,
    pub row_errors: Vec<crate::data::provider::RowError>,
    pub rows_read: usize,
}

/// Assemble sources from `config`, fetch entities and compute.
pub fn run_index(config: &RunConfig) -> Result<AppRun, AppError> {
    let sample = SampleConfig {
        count: config.sample_count,
        seed: config.sample_seed,
        as_of: config.as_of,
    };

    let entities = entity_source(config, sample)?;
    let provider = reference_provider(config, sample)?;

    let ingest = entities.fetch_entities()?;
    if ingest.entities.is_empty() {
        return Err(AppError::new(3, "No valid entities to compute."));
    }

    let mut options = pipeline::ComputeOptions::new(config.grouping, config.as_of);
    options.compare = config.compare;
    options.locator = LocatorConfig {
        primary_section: config.primary_section.clone(),
        secondary_section: config.secondary_section.clone(),
        ..LocatorConfig::default()
    };
    options.matcher = Box::new(FirstAvailableCategory {
        section: config.primary_section.clone(),
    });

    let output = pipeline::compute_from_ingest(&ingest, provider.as_ref(), options);
    Ok(AppRun {
        output,
        row_errors: ingest.row_errors,
        rows_read: ingest.rows_read,
    })
}

fn entity_source(config: &RunConfig, sample: SampleConfig) -> Result<Box<dyn EntitySource>, AppError> {
    let source: Box<dyn EntitySource> = match &config.source {
        SourceKind::Files { entities, .. } => Box::new(JsonFileSource::new(entities)),
        SourceKind::Remote => {
            let cache = DiskCache::new(&config.cache_dir);
            let timeout = Duration::from_secs(config.timeout_secs);
            let cached = JsonFileSource::new(cache.entities_path()).with_label("cache");
            Box::new(
                EntityChain::new()
                    .then(RemoteClient::from_env(cache, timeout)?)
                    .then(cached)
                    .then(SampleEntitySource { config: sample }),
            )
        }
        SourceKind::Sample => Box::new(SampleEntitySource { config: sample }),
    };
    Ok(source)
}

fn reference_provider(config: &RunConfig, sample: SampleConfig) -> Result<Box<dyn ReferenceProvider>, AppError> {
    let provider: Box<dyn ReferenceProvider> = match &config.source {
        SourceKind::Files {
            reference_dir: Some(dir),
            ..
        } => Box::new(DirectoryProvider::new(dir)),
        SourceKind::Files { reference_dir: None, .. } => Box::new(NoReference),
        SourceKind::Remote => {
            let remote = RemoteClient::from_env(
                DiskCache::new(&config.cache_dir),
                Duration::from_secs(config.timeout_secs),
            )?;
            Box::new(remote_references(remote, sample))
        }
        SourceKind::Sample => Box::new(SampleReferenceProvider { config: sample }),
    };
    Ok(provider)
}

/// Live data (with its own cache fallback), then synthetic market data so
/// listings from the sample step of the entity chain still get a baseline.
fn remote_references(remote: impl ReferenceProvider + 'static, sample: SampleConfig) -> ReferenceChain {
    ReferenceChain::new()
        .then("remote", remote)
        .then("sample", SampleReferenceProvider { config: sample })
}

pub fn run_config_from_args(args: &ComputeArgs, compare: bool) -> RunConfig {
    let source = if args.remote {
        SourceKind::Remote
    } else if let Some(entities) = &args.entities {
        SourceKind::Files {
            entities: entities.clone(),
            reference_dir: args.reference_dir.clone(),
        }
    } else {
        SourceKind::Sample
    };

    RunConfig {
        source,
        grouping: args.grouping,
        as_of: args.as_of.unwrap_or_else(today),
        compare,
        primary_section: args.primary_section.clone(),
        secondary_section: (!args.no_secondary).then(|| args.secondary_section.clone()),
        cache_dir: args.cache_dir.clone(),
        timeout_secs: args.timeout_secs,
        sample_count: args.sample_count,
        sample_seed: args.seed,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Rewrite argv so `mpi` defaults to `mpi compute`.
///
/// Rules:
/// - `mpi`                      -> `mpi compute`
/// - `mpi -e listings.json ...` -> `mpi compute -e listings.json ...`
/// - `mpi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("compute".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "compute" | "compare" | "sample");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "compute".to_string());
        return argv;
    }

    argv
}
