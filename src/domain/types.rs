//! Shared domain types.
//!
//! Everything here is a value object scoped to a single computation run:
//! entities come in, resolutions and summaries come out, nothing is shared
//! across runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lookback/lookahead window, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "7")]
    D7,
    #[serde(rename = "30")]
    D30,
    #[serde(rename = "60")]
    D60,
    #[serde(rename = "90")]
    D90,
    #[serde(rename = "120")]
    D120,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::D7,
        Timeframe::D30,
        Timeframe::D60,
        Timeframe::D90,
        Timeframe::D120,
    ];

    pub fn days(self) -> i64 {
        match self {
            Timeframe::D7 => 7,
            Timeframe::D30 => 30,
            Timeframe::D60 => 60,
            Timeframe::D90 => 90,
            Timeframe::D120 => 120,
        }
    }

    /// Position in `Timeframe::ALL` (and in every per-timeframe array).
    pub fn index(self) -> usize {
        match self {
            Timeframe::D7 => 0,
            Timeframe::D30 => 1,
            Timeframe::D60 => 2,
            Timeframe::D90 => 3,
            Timeframe::D120 => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::D7 => "7d",
            Timeframe::D30 => "30d",
            Timeframe::D60 => "60d",
            Timeframe::D90 => "90d",
            Timeframe::D120 => "120d",
        }
    }
}

/// A tracked property as seen by the index engine.
///
/// `group` is always populated (`"Unknown"` when the source omits it).
/// Occupancy observations stay as the formatted strings the source provides
/// (`"80 %"`, `"Unavailable"`); they are parsed lazily and degrade to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub group: String,
    /// Location label used by `GroupingMode::City`.
    pub city: Option<String>,
    /// Size-class label used by `GroupingMode::Bedrooms`.
    pub bedrooms: Option<String>,
    /// Precomputed index per timeframe (decimal ratio, `1.0` = market parity).
    pub precomputed: [Option<f64>; 5],
    /// Most recent occupancy over the short (30-day) window.
    pub occupancy_short: Option<String>,
    /// Most recent occupancy over the long (90-day) window.
    pub occupancy_long: Option<String>,
}

pub const UNKNOWN_GROUP: &str = "Unknown";

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: UNKNOWN_GROUP.to_string(),
            city: None,
            bedrooms: None,
            precomputed: [None; 5],
            occupancy_short: None,
            occupancy_long: None,
        }
    }

    pub fn precomputed_for(&self, timeframe: Timeframe) -> Option<f64> {
        self.precomputed[timeframe.index()]
    }
}

/// Which resolution tier produced an index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Precomputed,
    Derived,
    Unavailable,
}

/// Per-(entity, timeframe) result.
///
/// The tier travels with the value so a genuine `0.0` from the precomputed
/// tier stays distinguishable from "no data".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", content = "value", rename_all = "lowercase")]
pub enum IndexResolution {
    Precomputed(f64),
    Derived(f64),
    Unavailable,
}

impl IndexResolution {
    pub fn value(&self) -> f64 {
        match *self {
            IndexResolution::Precomputed(v) | IndexResolution::Derived(v) => v,
            IndexResolution::Unavailable => 0.0,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            IndexResolution::Precomputed(_) => Tier::Precomputed,
            IndexResolution::Derived(_) => Tier::Derived,
            IndexResolution::Unavailable => Tier::Unavailable,
        }
    }
}

/// All five resolutions for one entity, in `Timeframe::ALL` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResolution {
    pub entity_id: String,
    /// `None` when the entity has no usable key for the run's grouping mode.
    pub group_key: Option<String>,
    pub resolutions: [IndexResolution; 5],
}

/// How entities are bucketed before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingMode {
    City,
    Bedrooms,
    CityBedrooms,
    /// The entity's own `group` field.
    Default,
}

/// Averages for one group, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    /// Mean index per timeframe, `Timeframe::ALL` order.
    pub averages: [f64; 5],
    pub listing_count: usize,
}

impl GroupSummary {
    pub fn average(&self, timeframe: Timeframe) -> f64 {
        self.averages[timeframe.index()]
    }
}

/// Tier usage counters for one run.
///
/// Invariant: `precomputed_used + derived_used + unavailable == total_entities * 5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStatistics {
    pub precomputed_used: usize,
    pub derived_used: usize,
    pub unavailable: usize,
    pub total_entities: usize,
    /// Entities dropped at ingest because they failed shape validation.
    pub skipped_entities: usize,
}

impl CalculationStatistics {
    pub fn total_resolutions(&self) -> usize {
        self.precomputed_used + self.derived_used + self.unavailable
    }
}

/// Side-by-side tiers for one (entity, timeframe), produced in compare mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub entity_id: String,
    pub timeframe: Timeframe,
    pub precomputed: Option<f64>,
    pub derived: Option<f64>,
}

impl ComparisonRow {
    pub fn difference(&self) -> Option<f64> {
        Some(self.derived? - self.precomputed?)
    }
}

/// Where entities and reference datasets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Local JSON file of entities plus a directory of reference datasets.
    Files {
        entities: PathBuf,
        reference_dir: Option<PathBuf>,
    },
    /// Remote API (credentials from the environment), with cache/sample fallback.
    Remote,
    /// Deterministic synthetic data.
    Sample,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceKind,
    pub grouping: GroupingMode,
    /// Start of every forward-looking window; defaults to today.
    pub as_of: NaiveDate,
    pub compare: bool,
    pub primary_section: String,
    pub secondary_section: Option<String>,
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
    pub sample_count: usize,
    pub sample_seed: u64,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
