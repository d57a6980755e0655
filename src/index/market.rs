//! Market occupancy over a date range.
//!
//! Date axes come in two flavors: exact days (`2025-08-07`) or month labels
//! (`Aug 2024`). Daily axes include a point when its day falls in the range;
//! monthly axes include a month when it overlaps the range at all. Cells that
//! are missing or exactly zero are not samples and are skipped.

use chrono::{Datelike, NaiveDate};

use crate::data::reference::CategoryBlock;
use crate::index::locator::{ChannelLayout, LocatedChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    Daily,
    Monthly,
}

impl DateMode {
    /// Daily when any label parses as a calendar day.
    pub fn detect(dates: &[String]) -> Self {
        if dates.iter().any(|d| parse_day(d).is_some()) {
            DateMode::Daily
        } else {
            DateMode::Monthly
        }
    }
}

/// Average occupancy (as a fraction) of the located channel over `[start, end]`.
pub fn average_occupancy(located: &LocatedChannel<'_>, start: NaiveDate, end: NaiveDate) -> f64 {
    average_channel(located.block, located.channel, located.layout, start, end)
}

/// Same as [`average_occupancy`] for an explicitly chosen channel.
///
/// Returns `0.0` when no point is in range or every in-range cell is missing/zero.
pub fn average_channel(
    block: &CategoryBlock,
    channel: usize,
    layout: ChannelLayout,
    start: NaiveDate,
    end: NaiveDate,
) -> f64 {
    let Some(values) = block.channel(channel) else {
        return 0.0;
    };

    let mode = DateMode::detect(&block.dates);
    let samples: Vec<f64> = block
        .dates
        .iter()
        .enumerate()
        .filter(|(_, label)| in_range(label, mode, start, end))
        .filter_map(|(i, _)| layout.value_at(values, i))
        .filter(|v| *v != 0.0)
        .map(|v| v / 100.0)
        .collect();

    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn in_range(label: &str, mode: DateMode, start: NaiveDate, end: NaiveDate) -> bool {
    match mode {
        // Aggregate-window labels ("Next 30 days") fail to parse and drop out here.
        DateMode::Daily => parse_day(label).is_some_and(|d| start <= d && d <= end),
        DateMode::Monthly => parse_month(label).is_some_and(|(month_start, month_end)| {
            month_start <= end && month_end >= start
        }),
    }
}

fn parse_day(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), "%Y-%m-%d").ok()
}

/// `"Aug 2024"` -> `(2024-08-01, 2024-08-31)`.
pub fn parse_month(label: &str) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("01 {}", label.trim()), "%d %b %Y").ok()?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn block(dates: &[&str], values: Vec<Value>) -> CategoryBlock {
        CategoryBlock::new(dates.iter().map(|s| s.to_string()).collect(), vec![values])
    }

    #[test]
    fn daily_window_averages_in_range_points() {
        let b = block(
            &[
                "2025-08-07", "2025-08-08", "2025-08-09", "2025-08-10",
                "2025-08-11", "2025-08-12", "2025-08-13", "2025-08-14",
            ],
            [75, 80, 75, 70, 85, 90, 85, 80].into_iter().map(|v| json!(v)).collect(),
        );
        let avg = average_channel(&b, 0, ChannelLayout::Flat, d(2025, 8, 8), d(2025, 8, 14));
        let expected = (80.0 + 75.0 + 70.0 + 85.0 + 90.0 + 85.0 + 80.0) / 7.0 / 100.0;
        assert!((avg - expected).abs() < 1e-12, "got {avg}");
        assert!((avg - 0.8071).abs() < 1e-4);
    }

    #[test]
    fn aggregate_labels_are_not_dates() {
        let b = block(
            &["2025-08-08", "Next 30 days", "2025-08-09"],
            vec![json!(60.0), json!(99.0), json!(70.0)],
        );
        assert_eq!(DateMode::detect(&b.dates), DateMode::Daily);
        let avg = average_channel(&b, 0, ChannelLayout::Flat, d(2025, 8, 1), d(2025, 9, 30));
        assert!((avg - 0.65).abs() < 1e-12);
    }

    #[test]
    fn monthly_overlap_includes_partial_months() {
        let b = block(&["Aug 2024"], vec![json!(64.0)]);
        let overlap = average_channel(&b, 0, ChannelLayout::Flat, d(2024, 8, 15), d(2024, 9, 5));
        assert!((overlap - 0.64).abs() < 1e-12);

        let disjoint = average_channel(&b, 0, ChannelLayout::Flat, d(2024, 9, 10), d(2024, 9, 20));
        assert_eq!(disjoint, 0.0);
    }

    #[test]
    fn zero_cells_are_skipped() {
        let b = block(
            &["2025-08-08", "2025-08-09", "2025-08-10"],
            vec![json!(0), json!(80), json!(null)],
        );
        let avg = average_channel(&b, 0, ChannelLayout::Flat, d(2025, 8, 8), d(2025, 8, 10));
        assert!((avg - 0.8).abs() < 1e-12);
    }

    #[test]
    fn all_zero_window_is_zero() {
        let b = block(&["2025-08-08", "2025-08-09"], vec![json!(0), json!(0.0)]);
        assert_eq!(
            average_channel(&b, 0, ChannelLayout::Flat, d(2025, 8, 8), d(2025, 8, 9)),
            0.0
        );
    }

    #[test]
    fn nested_cells_use_inner_value() {
        let b = block(&["2025-08-08", "2025-08-09"], vec![json!([50.0, 1]), json!([70.0, 2])]);
        let avg = average_channel(&b, 0, ChannelLayout::Nested, d(2025, 8, 8), d(2025, 8, 9));
        assert!((avg - 0.6).abs() < 1e-12);
    }

    #[test]
    fn december_month_ends_on_31st() {
        let (start, end) = parse_month("Dec 2024").unwrap();
        assert_eq!(start, d(2024, 12, 1));
        assert_eq!(end, d(2024, 12, 31));
    }
}
