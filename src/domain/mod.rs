//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed window enumeration (`Timeframe`)
//! - input records (`Entity`)
//! - resolution outputs (`IndexResolution`, `GroupSummary`, `CalculationStatistics`)
//! - run configuration (`RunConfig`, `GroupingMode`)

pub mod types;

pub use types::*;
