//! Reporting: terminal tables for summaries, statistics and comparisons.

pub mod format;

pub use format::*;
