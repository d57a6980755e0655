//! Per-entity, per-timeframe index resolution.
//!
//! Tiers, in priority order, terminal on first success:
//!
//! 1. precomputed: a non-negative precomputed ratio, scaled ×100;
//! 2. derived: `entity_occupancy / market_occupancy × 100` from the reference
//!    dataset, when market occupancy is positive;
//! 3. unavailable.
//!
//! Provider failures, missing channels and empty windows all land in tier 3;
//! precomputed timeframes of the same entity are unaffected.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::data::provider::ReferenceProvider;
use crate::data::reference::ReferenceDataset;
use crate::domain::{Entity, IndexResolution, Timeframe};
use crate::index::estimator::estimate_occupancy;
use crate::index::locator::{CategoryMatcher, LocateOutcome, LocatorConfig, locate};
use crate::index::market::average_occupancy;
use crate::index::timeframe::resolve_range;

/// Precomputed ratios are decimals; the index is reported as a percentage.
pub const INDEX_SCALE: f64 = 100.0;

pub struct IndexResolver<'a> {
    provider: &'a dyn ReferenceProvider,
    matcher: &'a dyn CategoryMatcher,
    locator: &'a LocatorConfig,
    as_of: NaiveDate,
}

impl<'a> IndexResolver<'a> {
    pub fn new(
        provider: &'a dyn ReferenceProvider,
        matcher: &'a dyn CategoryMatcher,
        locator: &'a LocatorConfig,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            provider,
            matcher,
            locator,
            as_of,
        }
    }

    /// All five timeframes for one entity, in `Timeframe::ALL` order.
    ///
    /// The reference dataset is fetched at most once, and only when some
    /// timeframe lacks a precomputed value.
    pub fn resolve_entity(&self, entity: &Entity) -> [IndexResolution; 5] {
        let mut dataset: Option<Option<Arc<ReferenceDataset>>> = None;
        Timeframe::ALL.map(|tf| {
            if let Some(value) = precomputed(entity, tf) {
                return IndexResolution::Precomputed(value);
            }
            let dataset = dataset.get_or_insert_with(|| self.fetch(entity));
            match self.derive_from(entity, dataset.as_deref(), tf) {
                Some(value) => IndexResolution::Derived(value),
                None => IndexResolution::Unavailable,
            }
        })
    }

    pub fn resolve(&self, entity: &Entity, timeframe: Timeframe) -> IndexResolution {
        if let Some(value) = precomputed(entity, timeframe) {
            return IndexResolution::Precomputed(value);
        }
        match self.derive(entity, timeframe) {
            Some(value) => IndexResolution::Derived(value),
            None => IndexResolution::Unavailable,
        }
    }

    /// Derived-tier value regardless of any precomputed value.
    pub fn derive(&self, entity: &Entity, timeframe: Timeframe) -> Option<f64> {
        let dataset = self.fetch(entity);
        self.derive_from(entity, dataset.as_deref(), timeframe)
    }

    /// Derived-tier values for every timeframe from a single fetch.
    pub fn derive_all(&self, entity: &Entity) -> [Option<f64>; 5] {
        let dataset = self.fetch(entity);
        Timeframe::ALL.map(|tf| self.derive_from(entity, dataset.as_deref(), tf))
    }

    /// Provider failures are logged and read as "no dataset".
    fn fetch(&self, entity: &Entity) -> Option<Arc<ReferenceDataset>> {
        match self.provider.fetch_reference(&entity.id) {
            Ok(Some(dataset)) => Some(dataset),
            Ok(None) => {
                tracing::debug!(entity = %entity.id, "no reference dataset");
                None
            }
            Err(err) => {
                tracing::warn!(entity = %entity.id, error = %err, "reference fetch failed");
                None
            }
        }
    }

    fn derive_from(&self, entity: &Entity, dataset: Option<&ReferenceDataset>, timeframe: Timeframe) -> Option<f64> {
        let dataset = dataset?;
        let category = self.matcher.match_category(entity, dataset)?;
        let located = match locate(dataset, &category, self.locator) {
            LocateOutcome::Found(located) => located,
            LocateOutcome::NotFound(reason) => {
                tracing::debug!(entity = %entity.id, ?reason, "no usable occupancy channel");
                return None;
            }
        };

        let (start, end) = resolve_range(timeframe, self.as_of);
        let market = average_occupancy(&located, start, end);
        if market <= 0.0 {
            tracing::debug!(entity = %entity.id, timeframe = timeframe.label(), "empty market window");
            return None;
        }

        let own = estimate_occupancy(entity, start, end);
        Some(own / market * INDEX_SCALE)
    }
}

/// Non-negative precomputed value, scaled. Zero is valid data.
pub fn precomputed(entity: &Entity, timeframe: Timeframe) -> Option<f64> {
    entity
        .precomputed_for(timeframe)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v * INDEX_SCALE)
}
