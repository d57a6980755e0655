//! Entity occupancy for a window.
//!
//! True future occupancy is unknown, so the most recent historical observation
//! for a comparably sized window stands in for it. Only the span length of the
//! range matters, not where it sits on the calendar.

use chrono::NaiveDate;

use crate::domain::Entity;
use crate::index::percentage::parse_percentage;
use crate::index::timeframe::span_days;

const SHORT_WINDOW_DAYS: i64 = 30;

/// Occupancy fraction for `entity` over `[start, end]`.
///
/// Spans up to 30 days use the short observation; anything longer uses the
/// long observation.
pub fn estimate_occupancy(entity: &Entity, start: NaiveDate, end: NaiveDate) -> f64 {
    let observation = if span_days(start, end) <= SHORT_WINDOW_DAYS {
        entity.occupancy_short.as_deref()
    } else {
        entity.occupancy_long.as_deref()
    };
    parse_percentage(observation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use crate::index::timeframe::resolve_range;

    fn entity() -> Entity {
        Entity {
            occupancy_short: Some("80 %".to_string()),
            occupancy_long: Some("60 %".to_string()),
            ..Entity::new("e1")
        }
    }

    #[test]
    fn picks_observation_by_span() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 8).unwrap();
        let e = entity();
        for (tf, expected) in [
            (Timeframe::D7, 0.8),
            (Timeframe::D30, 0.8),
            (Timeframe::D60, 0.6),
            (Timeframe::D90, 0.6),
            (Timeframe::D120, 0.6),
        ] {
            let (start, end) = resolve_range(tf, today);
            let got = estimate_occupancy(&e, start, end);
            assert!((got - expected).abs() < 1e-12, "{}: {got}", tf.label());
        }
    }

    #[test]
    fn missing_observation_is_zero() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 8).unwrap();
        assert_eq!(estimate_occupancy(&Entity::new("e2"), today, today), 0.0);
    }
}
