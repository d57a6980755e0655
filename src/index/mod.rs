//! Index computation engine.
//!
//! Leaves first: `percentage` and `timeframe` are pure helpers, `locator` and
//! `market` turn a reference dataset into a market occupancy, `estimator`
//! produces the entity side, `resolver` combines them into tiered results and
//! `aggregate` reduces those into group summaries and statistics.

pub mod aggregate;
pub mod estimator;
pub mod locator;
pub mod market;
pub mod percentage;
pub mod resolver;
pub mod timeframe;

pub use aggregate::{StatisticsCollector, aggregate, group_key};
pub use locator::{CategoryMatcher, FirstAvailableCategory, LocateOutcome, LocatorConfig, locate};
pub use percentage::parse_percentage;
pub use resolver::IndexResolver;
pub use timeframe::resolve_range;
