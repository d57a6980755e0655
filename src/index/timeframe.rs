//! Timeframe -> concrete date range.

use chrono::{Duration, NaiveDate};

use crate::domain::Timeframe;

/// Forward-looking window: `timeframe` days starting at `reference` (inclusive).
///
/// `resolve_range(D7, 2025-08-08)` -> `(2025-08-08, 2025-08-14)`.
pub fn resolve_range(timeframe: Timeframe, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = reference
        .checked_add_signed(Duration::days(timeframe.days() - 1))
        .unwrap_or(reference);
    (reference, end)
}

/// Inclusive length of a range in days (`0` for inverted ranges).
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn every_window_spans_exactly_its_days() {
        let today = d(2025, 8, 8);
        for tf in Timeframe::ALL {
            let (start, end) = resolve_range(tf, today);
            assert_eq!(start, today);
            assert_eq!(span_days(start, end), tf.days(), "window {}", tf.label());
        }
    }

    #[test]
    fn seven_day_window_ends_six_days_later() {
        let (_, end) = resolve_range(Timeframe::D7, d(2025, 8, 8));
        assert_eq!(end, d(2025, 8, 14));
    }
}
