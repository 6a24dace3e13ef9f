//! Report persistence and the console summary.
//!
//! [`CsvReportWriter`] writes every file into a staging directory inside the
//! report directory and moves them into place only once all of them exist,
//! so a failed write never leaves a half-populated report behind. Only the
//! files the writer produces are replaced; anything else in the directory is
//! left alone.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    data::format_cell,
    error::{ReconError, Result},
    io_utils,
    reconcile::ReconReport,
    result_set::{ResultSet, Sheet},
    table,
};

pub const SUMMARY_FILE: &str = "summary.json";
pub const STATUS_HEADER: &str = "status";
const STAGING_DIR: &str = ".csv-recon.staging";

pub trait ReportWriter {
    fn write(&self, report: &ReconReport) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    dir: PathBuf,
    status_file: String,
}

impl CsvReportWriter {
    pub fn new(dir: impl Into<PathBuf>, status_file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            status_file: status_file.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sheet_path(&self, sheet: Sheet) -> PathBuf {
        self.dir.join(sheet_file_name(sheet))
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join(&self.status_file)
    }

    fn staging_dir(&self) -> PathBuf {
        self.dir.join(STAGING_DIR)
    }

    /// Writes the report files into `staging` and returns their names.
    fn write_into(&self, staging: &Path, report: &ReconReport) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for sheet in Sheet::ALL {
            let result = report.sheet(sheet);
            if sheet == Sheet::DataMismatches && result.is_empty() {
                debug!("No mismatches; skipping {sheet}");
                continue;
            }
            let name = sheet_file_name(sheet);
            write_sheet(&staging.join(&name), result)?;
            written.push(name);
        }

        let mut status = io_utils::open_csv_writer(&staging.join(&self.status_file))?;
        status.write_record([STATUS_HEADER])?;
        status.write_record([report.verdict.as_str()])?;
        status
            .flush()
            .map_err(|err| ReconError::io(staging.join(&self.status_file), err))?;
        written.push(self.status_file.clone());

        let summary = serde_json::to_vec_pretty(&report.summary())?;
        io_utils::write_all(&staging.join(SUMMARY_FILE), &summary)?;
        written.push(SUMMARY_FILE.to_string());
        Ok(written)
    }

    /// Moves the staged files over their counterparts in the report
    /// directory and drops a mismatch sheet left by an earlier run.
    fn publish(&self, staging: &Path, written: &[String]) -> Result<()> {
        let mismatches = sheet_file_name(Sheet::DataMismatches);
        if !written.contains(&mismatches) {
            let stale = self.dir.join(&mismatches);
            if stale.is_file() {
                debug!("Removing stale {:?}", stale);
                fs::remove_file(&stale).map_err(|err| ReconError::io(&stale, err))?;
            }
        }
        for name in written {
            let destination = self.dir.join(name);
            fs::rename(staging.join(name), &destination)
                .map_err(|err| ReconError::io(&destination, err))?;
        }
        fs::remove_dir(staging).map_err(|err| ReconError::io(staging, err))
    }
}

impl ReportWriter for CsvReportWriter {
    fn write(&self, report: &ReconReport) -> Result<()> {
        let wrap = |source: ReconError| ReconError::Report {
            path: self.dir.clone(),
            source: Box::new(source),
        };
        let staging = self.staging_dir();
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|err| wrap(ReconError::io(&staging, err)))?;
        }
        fs::create_dir_all(&staging).map_err(|err| wrap(ReconError::io(&staging, err)))?;

        let written = match self.write_into(&staging, report) {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(wrap(err));
            }
        };
        self.publish(&staging, &written).map_err(wrap)?;
        info!("Report written to {:?} ({} file(s))", self.dir, written.len());
        Ok(())
    }
}

pub fn sheet_file_name(sheet: Sheet) -> String {
    format!("{}.csv", sheet.as_str())
}

/// Header row followed by the data rows. A result set without columns (the
/// model did not run) produces an empty file.
fn write_sheet(path: &Path, result: &ResultSet) -> Result<()> {
    if result.headers().is_empty() {
        return io_utils::write_all(path, b"");
    }
    let mut writer = io_utils::open_csv_writer(path)?;
    writer.write_record(result.headers())?;
    for row in result.rows() {
        writer.write_record(row.iter().map(format_cell))?;
    }
    writer.flush().map_err(|err| ReconError::io(path, err))
}

/// Human-readable summary of a run.
pub fn render_summary(report: &ReconReport) -> String {
    let mut output = String::new();
    output.push_str(&table::render_key_values(&[
        (
            "Tables".to_string(),
            format!("{} -> {}", report.source_table, report.target_table),
        ),
        ("Primary key".to_string(), report.primary_key.clone()),
        (
            "Rows".to_string(),
            format!("{} source, {} target", report.source_rows, report.target_rows),
        ),
        (
            "Compared columns".to_string(),
            report.compared_columns.len().to_string(),
        ),
        ("Aligned keys".to_string(), report.aligned_keys.to_string()),
        (
            "Validation time".to_string(),
            format!("{:.2}s", report.duration_secs),
        ),
    ]));
    output.push('\n');

    let headers = vec!["check".to_string(), "rows".to_string()];
    let rows: Vec<Vec<String>> = [
        ("Data mismatches", report.sheet(Sheet::DataMismatches).len()),
        (
            "Nulls in source or target",
            report.sheet(Sheet::NullsSourceTarget).len(),
        ),
        (
            "Duplicates in source",
            report.sheet(Sheet::SourceDuplicates).len(),
        ),
        (
            "Duplicates in target",
            report.sheet(Sheet::TargetDuplicates).len(),
        ),
        ("Outliers in source", report.source_outlier_rows),
        ("Outliers in target", report.target_outlier_rows),
        (
            "Missing records in target",
            report.sheet(Sheet::MissingInTarget).len(),
        ),
        (
            "Model anomalies",
            report.sheet(Sheet::ModelAnomalies).len(),
        ),
    ]
    .into_iter()
    .map(|(label, count)| vec![label.to_string(), count.to_string()])
    .collect();
    output.push_str(&table::render_table(&headers, &rows));

    if let Some(stats) = report.model.stats() {
        output.push('\n');
        let threshold = stats
            .threshold
            .map(|t| format!("{t:.6}"))
            .unwrap_or_else(|| "n/a".to_string());
        output.push_str(&table::render_key_values(&[
            (
                "Model time".to_string(),
                format!("{:.2}s", stats.duration_secs),
            ),
            ("Scored rows".to_string(), stats.scored_rows.to_string()),
            ("Anomalies".to_string(), stats.anomaly_count.to_string()),
            (
                "Anomaly ratio".to_string(),
                format!("{:.2}%", stats.anomaly_ratio * 100.0),
            ),
            ("Threshold".to_string(), threshold),
            ("Device".to_string(), stats.device.to_string()),
        ]));
    }

    output.push('\n');
    output.push_str(&format!("Pipeline status: {}\n", report.verdict));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anomaly::UnavailableDetector, config::ReconConfig, data::Value, dataset::Column,
        dataset::Dataset, reconcile::reconcile_datasets, schema::ColumnType,
    };

    fn report(target_amounts: &[i64]) -> ReconReport {
        let build = |amounts: &[i64]| {
            Dataset::new(vec![
                Column::new(
                    "id",
                    ColumnType::Integer,
                    (1..=amounts.len() as i64)
                        .map(|v| Some(Value::Integer(v)))
                        .collect(),
                ),
                Column::new(
                    "amount",
                    ColumnType::Integer,
                    amounts.iter().map(|v| Some(Value::Integer(*v))).collect(),
                ),
            ])
            .unwrap()
        };
        let config = ReconConfig {
            primary_key: "id".to_string(),
            ..ReconConfig::default()
        };
        reconcile_datasets(
            &build(&[10, 20]),
            &build(target_amounts),
            &config,
            &UnavailableDetector::new("off"),
        )
        .unwrap()
    }

    #[test]
    fn summary_lists_counts_and_status() {
        let rendered = render_summary(&report(&[10, 25]));
        assert!(rendered.contains("Data mismatches"));
        assert!(rendered.ends_with("Pipeline status: FAIL\n"));
        assert!(!rendered.contains("Device"));
    }

    #[test]
    fn staging_dir_stays_inside_the_report_dir() {
        let writer = CsvReportWriter::new(".", "pipeline_status.csv");
        assert_eq!(writer.staging_dir(), PathBuf::from("./.csv-recon.staging"));
        assert_eq!(writer.dir(), Path::new("."));
    }

    #[test]
    fn rewrite_keeps_unrelated_files() {
        let workspace = tempfile::tempdir().unwrap();
        let out = workspace.path().join("reports");
        fs::create_dir_all(out.join("archive")).unwrap();
        fs::write(out.join("quarterly_numbers.xlsx"), "keep me").unwrap();
        fs::write(out.join("archive").join("old.csv"), "keep me too").unwrap();
        let writer = CsvReportWriter::new(&out, "pipeline_status.csv");

        writer.write(&report(&[10, 25])).unwrap();
        assert!(writer.sheet_path(Sheet::DataMismatches).is_file());

        writer.write(&report(&[10, 20])).unwrap();
        assert!(!writer.sheet_path(Sheet::DataMismatches).exists());
        assert_eq!(
            fs::read_to_string(writer.status_path()).unwrap(),
            "status\nPASS\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("quarterly_numbers.xlsx")).unwrap(),
            "keep me"
        );
        assert!(out.join("archive").join("old.csv").is_file());
        assert!(!writer.staging_dir().exists());
    }
}
