//! Grouping, averaging and tier statistics.
//!
//! Both reductions are commutative (sums and counts), so the output does not
//! depend on the order entities were resolved in. Groups are sorted by key.

use std::collections::BTreeMap;

use crate::domain::{
    CalculationStatistics, Entity, EntityResolution, GroupSummary, GroupingMode, IndexResolution, Tier,
};

/// Group key for `entity` under `mode`; `None` when the entity lacks the attribute.
pub fn group_key(entity: &Entity, mode: GroupingMode) -> Option<String> {
    match mode {
        GroupingMode::City => non_empty(entity.city.as_deref()),
        GroupingMode::Bedrooms => size_class(entity.bedrooms.as_deref()),
        GroupingMode::CityBedrooms => {
            let city = non_empty(entity.city.as_deref())?;
            let size = size_class(entity.bedrooms.as_deref())?;
            Some(format!("{city} - {size}"))
        }
        GroupingMode::Default => non_empty(Some(entity.group.as_str())),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Bedroom counts become `"Studio"` / `"1 BR"` / `"2 BR"`; free text passes through.
fn size_class(bedrooms: Option<&str>) -> Option<String> {
    let raw = non_empty(bedrooms)?;
    match raw.parse::<f64>() {
        Ok(n) if n == 0.0 => Some("Studio".to_string()),
        Ok(n) if n > 0.0 && n.fract() == 0.0 => Some(format!("{n:.0} BR")),
        _ => Some(raw),
    }
}

/// Mean of each timeframe's value per group, rounded to two decimals.
///
/// Entities without a group key contribute nothing.
pub fn aggregate(resolutions: &[EntityResolution]) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<&str, ([f64; 5], usize)> = BTreeMap::new();
    for entry in resolutions {
        let Some(key) = entry.group_key.as_deref() else { continue };
        let (sums, count) = groups.entry(key).or_insert(([0.0; 5], 0));
        for (sum, resolution) in sums.iter_mut().zip(entry.resolutions.iter()) {
            *sum += resolution.value();
        }
        *count += 1;
    }

    groups
        .into_iter()
        .map(|(key, (sums, count))| GroupSummary {
            key: key.to_string(),
            averages: sums.map(|s| round2(s / count as f64)),
            listing_count: count,
        })
        .collect()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tallies tiers across a run. Observability only.
#[derive(Debug, Clone, Default)]
pub struct StatisticsCollector {
    stats: CalculationStatistics,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_entity(&mut self, resolutions: &[IndexResolution]) {
        self.stats.total_entities += 1;
        for resolution in resolutions {
            match resolution.tier() {
                Tier::Precomputed => self.stats.precomputed_used += 1,
                Tier::Derived => self.stats.derived_used += 1,
                Tier::Unavailable => self.stats.unavailable += 1,
            }
        }
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.stats.skipped_entities += count;
    }

    pub fn finish(self) -> CalculationStatistics {
        self.stats
    }
}
