//! Shared index pipeline used by every CLI command.
//!
//! entities + reference provider -> per-entity resolutions (parallel)
//! -> group summaries + statistics (single-threaded reduction)

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::provider::{IngestedEntities, ReferenceProvider};
use crate::domain::{
    CalculationStatistics, ComparisonRow, Entity, EntityResolution, GroupSummary, GroupingMode, Timeframe,
};
use crate::index::locator::{CategoryMatcher, FirstAvailableCategory, LocatorConfig};
use crate::index::resolver::{IndexResolver, precomputed};
use crate::index::{StatisticsCollector, aggregate, group_key};

/// Knobs for a single computation.
pub struct ComputeOptions {
    pub grouping: GroupingMode,
    pub as_of: NaiveDate,
    pub compare: bool,
    pub locator: LocatorConfig,
    pub matcher: Box<dyn CategoryMatcher>,
    /// Entities dropped at ingest, carried into the statistics.
    pub skipped_entities: usize,
}

impl ComputeOptions {
    pub fn new(grouping: GroupingMode, as_of: NaiveDate) -> Self {
        let locator = LocatorConfig::default();
        let matcher = FirstAvailableCategory {
            section: locator.primary_section.clone(),
        };
        Self {
            grouping,
            as_of,
            compare: false,
            locator,
            matcher: Box::new(matcher),
            skipped_entities: 0,
        }
    }
}

/// All outputs of one computation.
#[derive(Debug, Clone, Serialize)]
pub struct IndexRun {
    pub as_of: NaiveDate,
    pub grouping: GroupingMode,
    pub summaries: Vec<GroupSummary>,
    pub statistics: CalculationStatistics,
    pub raw: Vec<EntityResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparisons: Option<Vec<ComparisonRow>>,
}

/// Resolve every entity × timeframe, then group and count.
///
/// Never fails: missing or broken reference data shows up as `Unavailable`
/// resolutions and in the statistics.
pub fn compute_index_summaries(
    entities: &[Entity],
    provider: &dyn ReferenceProvider,
    options: &ComputeOptions,
) -> IndexRun {
    let resolver = IndexResolver::new(provider, options.matcher.as_ref(), &options.locator, options.as_of);

    let per_entity: Vec<(EntityResolution, Option<Vec<ComparisonRow>>)> = entities
        .par_iter()
        .map(|entity| {
            let resolution = EntityResolution {
                entity_id: entity.id.clone(),
                group_key: group_key(entity, options.grouping),
                resolutions: resolver.resolve_entity(entity),
            };
            let comparison = options.compare.then(|| compare_entity(&resolver, entity));
            (resolution, comparison)
        })
        .collect();

    let mut collector = StatisticsCollector::new();
    collector.record_skipped(options.skipped_entities);

    let mut raw = Vec::with_capacity(per_entity.len());
    let mut comparisons = options.compare.then(Vec::new);
    for (resolution, comparison) in per_entity {
        collector.observe_entity(&resolution.resolutions);
        if let (Some(all), Some(rows)) = (comparisons.as_mut(), comparison) {
            all.extend(rows);
        }
        raw.push(resolution);
    }

    let summaries = aggregate(&raw);
    let statistics = collector.finish();
    tracing::info!(
        entities = statistics.total_entities,
        groups = summaries.len(),
        precomputed = statistics.precomputed_used,
        derived = statistics.derived_used,
        unavailable = statistics.unavailable,
        "index run complete"
    );

    IndexRun {
        as_of: options.as_of,
        grouping: options.grouping,
        summaries,
        statistics,
        raw,
        comparisons,
    }
}

/// Convenience wrapper for ingest output: skipped rows feed the statistics.
pub fn compute_from_ingest(
    ingest: &IngestedEntities,
    provider: &dyn ReferenceProvider,
    mut options: ComputeOptions,
) -> IndexRun {
    options.skipped_entities = ingest.row_errors.len();
    compute_index_summaries(&ingest.entities, provider, &options)
}

fn compare_entity(resolver: &IndexResolver<'_>, entity: &Entity) -> Vec<ComparisonRow> {
    let derived = resolver.derive_all(entity);
    Timeframe::ALL
        .into_iter()
        .map(|timeframe| ComparisonRow {
            entity_id: entity.id.clone(),
            timeframe,
            precomputed: precomputed(entity, timeframe),
            derived: derived[timeframe.index()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::provider::{NoReference, StaticReferenceProvider};
    use crate::data::reference::ReferenceDataset;
    use crate::domain::Tier;
    use crate::io::ingest::entities_from_value;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 8).unwrap()
    }

    fn entity(id: &str, city: &str, precomputed: [Option<f64>; 5]) -> Entity {
        Entity {
            city: Some(city.to_string()),
            precomputed,
            occupancy_short: Some("72 %".to_string()),
            occupancy_long: Some("65.5 %".to_string()),
            ..Entity::new(id)
        }
    }

    fn provider() -> StaticReferenceProvider {
        let dates: Vec<String> = (0..130)
            .map(|i| (today() + chrono::Duration::days(i)).format("%Y-%m-%d").to_string())
            .collect();
        let occupancy: Vec<f64> = (0..130).map(|i| 60.5 + (i % 7) as f64).collect();
        StaticReferenceProvider::shared(
            ReferenceDataset::from_value(&json!({
                "future_daily": { "1": { "dates": dates, "values": [occupancy] } }
            }))
            .unwrap(),
        )
    }

    fn entities() -> Vec<Entity> {
        vec![
            entity("a", "Denver", [Some(1.1), None, None, None, Some(0.9)]),
            entity("b", "Denver", [None; 5]),
            entity("c", "Miami", [Some(0.0), Some(0.5), Some(0.5), Some(0.5), Some(0.5)]),
        ]
    }

    #[test]
    fn groups_and_statistics_line_up() {
        let run = compute_index_summaries(
            &entities(),
            &provider(),
            &ComputeOptions::new(GroupingMode::City, today()),
        );

        assert_eq!(run.summaries.len(), 2);
        let denver = &run.summaries[0];
        assert_eq!(denver.key, "Denver");
        assert_eq!(denver.listing_count, 2);

        let s = run.statistics;
        assert_eq!(s.total_entities, 3);
        assert_eq!(s.total_resolutions(), s.total_entities * 5);
        assert_eq!(s.precomputed_used, 7);
        assert_eq!(s.derived_used, 8);
        assert_eq!(s.unavailable, 0);
    }

    #[test]
    fn summary_average_reproduces_member_mean() {
        let run = compute_index_summaries(
            &entities(),
            &provider(),
            &ComputeOptions::new(GroupingMode::City, today()),
        );
        for summary in &run.summaries {
            for tf in Timeframe::ALL {
                let members: Vec<f64> = run
                    .raw
                    .iter()
                    .filter(|r| r.group_key.as_deref() == Some(summary.key.as_str()))
                    .map(|r| r.resolutions[tf.index()].value())
                    .collect();
                let mean = members.iter().sum::<f64>() / members.len() as f64;
                assert!(
                    (summary.average(tf) - mean).abs() <= 0.005 + 1e-9,
                    "{} {}: {} vs {mean}",
                    summary.key,
                    tf.label(),
                    summary.average(tf)
                );
            }
        }
    }

    #[test]
    fn precomputed_tier_wins_and_is_scaled() {
        let run = compute_index_summaries(
            &entities(),
            &provider(),
            &ComputeOptions::new(GroupingMode::City, today()),
        );
        let c = run.raw.iter().find(|r| r.entity_id == "c").unwrap();
        assert_eq!(c.resolutions[0].tier(), Tier::Precomputed);
        assert_eq!(c.resolutions[0].value(), 0.0);
        assert_eq!(c.resolutions[1].value(), 0.5 * 100.0);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let options = ComputeOptions::new(GroupingMode::City, today());
        let first = compute_index_summaries(&entities(), &provider(), &options);
        let second = compute_index_summaries(&entities(), &provider(), &options);
        assert_eq!(first.summaries, second.summaries);
        assert_eq!(first.raw, second.raw);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn no_reference_data_still_returns_every_group() {
        let run = compute_index_summaries(
            &entities(),
            &NoReference,
            &ComputeOptions::new(GroupingMode::City, today()),
        );
        assert_eq!(run.summaries.len(), 2);
        assert_eq!(run.statistics.unavailable, 8);
        assert_eq!(run.statistics.total_resolutions(), 15);
    }

    #[test]
    fn compare_mode_reports_both_tiers() {
        let mut options = ComputeOptions::new(GroupingMode::Default, today());
        options.compare = true;
        let run = compute_index_summaries(&entities(), &provider(), &options);

        let rows = run.comparisons.expect("compare rows");
        assert_eq!(rows.len(), 15);
        let a7 = rows
            .iter()
            .find(|r| r.entity_id == "a" && r.timeframe == Timeframe::D7)
            .unwrap();
        assert_eq!(a7.precomputed, Some(1.1 * 100.0));
        assert!(a7.derived.is_some());
        assert!(a7.difference().is_some());
    }

    #[test]
    fn skipped_rows_reach_the_statistics() {
        let ingest = entities_from_value(&json!([
            { "id": "a", "city": "Denver", "mpi": { "7": 1.1 }, "occupancy_last_30": "72 %" },
            { "city": "Denver", "mpi_7": 0.9 },
            { "id": "b", "city": "Miami", "occupancy_last_90": "65.5 %" }
        ]))
        .unwrap();
        assert_eq!(ingest.rows_read, 3);

        let run = compute_from_ingest(&ingest, &provider(), ComputeOptions::new(GroupingMode::City, today()));
        let s = run.statistics;
        assert_eq!(s.skipped_entities, 1);
        assert_eq!(s.total_entities, 2);
        assert_eq!(s.total_resolutions(), s.total_entities * 5);
        assert_eq!(run.raw.len(), 2);
    }
}
