//! Formatted terminal output.
//!
//! We keep formatting code in one place so the engine stays free of
//! presentation concerns and output changes are localized.

use crate::app::pipeline::IndexRun;
use crate::data::provider::RowError;
use crate::domain::{CalculationStatistics, ComparisonRow, GroupSummary, GroupingMode, Timeframe};

/// Run header plus the group table.
pub fn format_run_summary(run: &IndexRun) -> String {
    let mut out = String::new();

    out.push_str("=== mpi - Market Penetration Index ===\n");
    out.push_str(&format!("As-of: {}\n", run.as_of));
    out.push_str(&format!("Grouping: {}\n", grouping_label(run.grouping)));
    out.push_str(&format!(
        "Groups: {} | entities: {}\n\n",
        run.summaries.len(),
        run.statistics.total_entities
    ));
    out.push_str(&format_groups(&run.summaries));
    out
}

fn grouping_label(mode: GroupingMode) -> &'static str {
    match mode {
        GroupingMode::City => "city",
        GroupingMode::Bedrooms => "bedrooms",
        GroupingMode::CityBedrooms => "city-bedrooms",
        GroupingMode::Default => "default",
    }
}

pub fn format_groups(summaries: &[GroupSummary]) -> String {
    let mut out = String::new();
    let mut header = format!("{:<28} {:>6}", "group", "count");
    let mut rule = format!("{:-<28} {:-<6}", "", "");
    for tf in Timeframe::ALL {
        header.push_str(&format!(" {:>8}", tf.label()));
        rule.push_str(&format!(" {:-<8}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for s in summaries {
        let mut line = format!("{:<28} {:>6}", truncate(&s.key, 28), s.listing_count);
        for v in s.averages {
            line.push_str(&format!(" {v:>8.2}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Tier usage with shares of all resolutions.
pub fn format_statistics(stats: &CalculationStatistics) -> String {
    let total = stats.total_resolutions();
    let share = |n: usize| if total == 0 { 0.0 } else { n as f64 * 100.0 / total as f64 };

    let mut out = String::new();
    out.push_str("Resolution tiers:\n");
    out.push_str(&format!(
        "  precomputed  {:>6} ({:>5.1}%)\n",
        stats.precomputed_used,
        share(stats.precomputed_used)
    ));
    out.push_str(&format!(
        "  derived      {:>6} ({:>5.1}%)\n",
        stats.derived_used,
        share(stats.derived_used)
    ));
    out.push_str(&format!(
        "  unavailable  {:>6} ({:>5.1}%)\n",
        stats.unavailable,
        share(stats.unavailable)
    ));
    out.push_str(&format!(
        "  entities     {:>6} (skipped at ingest: {})\n",
        stats.total_entities, stats.skipped_entities
    ));
    out
}

/// Precomputed vs derived, side by side.
pub fn format_comparisons(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:>6} {:>12} {:>12} {:>10}\n",
        "entity", "window", "precomputed", "derived", "diff"
    ));
    out.push_str(&format!("{:-<20} {:-<6} {:-<12} {:-<12} {:-<10}\n", "", "", "", "", ""));
    for r in rows {
        out.push_str(
            format!(
                "{:<20} {:>6} {:>12} {:>12} {:>10}\n",
                truncate(&r.entity_id, 20),
                r.timeframe.label(),
                fmt_opt(r.precomputed),
                fmt_opt(r.derived),
                fmt_opt(r.difference()),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Ingest totals, followed by one line per skipped entity.
pub fn format_ingest(rows_read: usize, errors: &[RowError]) -> String {
    let mut out = format!(
        "Ingest: {} rows read, {} kept, {} skipped\n",
        rows_read,
        rows_read.saturating_sub(errors.len()),
        errors.len()
    );
    out.push_str(&format_row_errors(errors));
    out
}

pub fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in errors {
        out.push_str(&format!(
            "  #{} ({}): {}\n",
            e.index,
            e.id.as_deref().unwrap_or("-"),
            e.message
        ));
    }
    out
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
