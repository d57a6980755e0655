//! Export group summaries to CSV and whole runs to JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::app::pipeline::IndexRun;
use crate::domain::Timeframe;
use crate::error::AppError;

/// Write one row per group: key, listing count, then one column per timeframe.
pub fn write_summaries_csv(path: &Path, run: &IndexRun) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["group".to_string(), "listing_count".to_string()];
    header.extend(Timeframe::ALL.iter().map(|tf| format!("mpi_{}", tf.days())));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for summary in &run.summaries {
        let mut record = vec![summary.key.clone(), summary.listing_count.to_string()];
        record.extend(summary.averages.iter().map(|v| format!("{v:.2}")));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format_args!("Failed to flush export CSV '{}'", path.display()), e))
}

/// Write the full run (summaries, statistics, raw resolutions, comparisons).
pub fn write_run_json(path: &Path, run: &IndexRun) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format_args!("Failed to create export JSON '{}'", path.display()), e))?;
    serde_json::to_writer_pretty(file, run)
        .map_err(|e| AppError::new(4, format!("Failed to write export JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{CalculationStatistics, GroupSummary, GroupingMode};

    #[test]
    fn csv_has_header_and_rounded_rows() {
        let run = IndexRun {
            as_of: NaiveDate::from_ymd_opt(2025, 8, 8).unwrap(),
            grouping: GroupingMode::City,
            summaries: vec![
                GroupSummary {
                    key: "Denver, CO".to_string(),
                    averages: [101.5, 99.0, 0.0, 87.25, 90.1],
                    listing_count: 2,
                },
                GroupSummary {
                    key: "The \"Loft\" - 1 BR".to_string(),
                    averages: [100.0; 5],
                    listing_count: 1,
                },
            ],
            statistics: CalculationStatistics::default(),
            raw: Vec::new(),
            comparisons: None,
        };
        let path = std::env::temp_dir().join(format!("mpi-export-{}.csv", std::process::id()));
        write_summaries_csv(&path, &run).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("group,listing_count,mpi_7,mpi_30,mpi_60,mpi_90,mpi_120"));
        assert_eq!(lines.next(), Some("\"Denver, CO\",2,101.50,99.00,0.00,87.25,90.10"));
        assert_eq!(
            lines.next(),
            Some("\"The \"\"Loft\"\" - 1 BR\",1,100.00,100.00,100.00,100.00,100.00")
        );
        assert_eq!(lines.next(), None);
    }
}
