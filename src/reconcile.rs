//! Run entry point.
//!
//! Loads both tables, enforces the key precondition, then runs every detector
//! over the aligned data and folds their result sets into one verdict. The
//! run is synchronous and single-threaded; detectors only read their inputs.

use std::{collections::BTreeMap, time::Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    align::{align_rows, align_schemas, ensure_key_column, partition_by_key},
    anomaly::{AnomalyDetector, AnomalyOutcome, ModelStats},
    config::ReconConfig,
    dataset::Dataset,
    error::Result,
    mismatch::{CellComparison, detect_mismatches},
    missing::detect_missing,
    nulls::detect_nulls,
    outliers::detect_outliers,
    result_set::{ResultSet, Sheet},
    source::TableSource,
    verdict::{Verdict, aggregate},
};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct ReconReport {
    pub primary_key: String,
    pub source_table: String,
    pub target_table: String,
    pub source_rows: usize,
    pub target_rows: usize,
    /// Shared columns after schema alignment, sorted.
    pub compared_columns: Vec<String>,
    /// Numeric columns used by the outlier detector and the model.
    pub numeric_columns: Vec<String>,
    /// Number of unique source keys that took part in the comparison.
    pub aligned_keys: usize,
    pub source_outlier_rows: usize,
    pub target_outlier_rows: usize,
    pub sheets: BTreeMap<Sheet, ResultSet>,
    pub model: AnomalyOutcome,
    pub verdict: Verdict,
    /// Wall time of the run. Includes loading both tables when the run
    /// started through [`run`].
    pub duration_secs: f64,
}

impl ReconReport {
    pub fn sheet(&self, sheet: Sheet) -> &ResultSet {
        &self.sheets[&sheet]
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.verdict,
            primary_key: self.primary_key.clone(),
            source_table: self.source_table.clone(),
            target_table: self.target_table.clone(),
            source_rows: self.source_rows,
            target_rows: self.target_rows,
            compared_columns: self.compared_columns.clone(),
            aligned_keys: self.aligned_keys,
            sheets: self
                .sheets
                .iter()
                .map(|(sheet, rows)| (sheet.as_str(), rows.len()))
                .collect(),
            outliers: OutlierCounts {
                source_rows: self.source_outlier_rows,
                target_rows: self.target_outlier_rows,
            },
            model: self.model.stats().cloned(),
            model_unavailable: match &self.model {
                AnomalyOutcome::Unavailable { reason } => Some(reason.clone()),
                AnomalyOutcome::Completed { .. } => None,
            },
            duration_secs: self.duration_secs,
        }
    }
}

/// Serializable digest of a [`ReconReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: Verdict,
    pub primary_key: String,
    pub source_table: String,
    pub target_table: String,
    pub source_rows: usize,
    pub target_rows: usize,
    pub compared_columns: Vec<String>,
    pub aligned_keys: usize,
    /// Row count per sheet.
    pub sheets: BTreeMap<&'static str, usize>,
    pub outliers: OutlierCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_unavailable: Option<String>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutlierCounts {
    pub source_rows: usize,
    pub target_rows: usize,
}

/// Loads the configured tables and reconciles them.
pub fn run(
    config: &ReconConfig,
    source: &dyn TableSource,
    target: &dyn TableSource,
    detector: &dyn AnomalyDetector,
) -> Result<ReconReport> {
    let started = Instant::now();
    config.validate()?;
    info!(
        "Loading source table '{}' and target table '{}'",
        config.source_table, config.target_table
    );
    let source_data = source.load(&config.source_table)?;
    let target_data = target.load(&config.target_table)?;
    let mut report = reconcile_datasets(&source_data, &target_data, config, detector)?;
    report.duration_secs = started.elapsed().as_secs_f64();
    Ok(report)
}

/// Reconciles two already loaded datasets.
pub fn reconcile_datasets(
    source: &Dataset,
    target: &Dataset,
    config: &ReconConfig,
    detector: &dyn AnomalyDetector,
) -> Result<ReconReport> {
    let started = Instant::now();
    let key = config.primary_key.as_str();
    ensure_key_column(source, target, key)?;

    let aligned = align_schemas(source, target);
    if aligned.columns.len() == 1 {
        warn!("Only the key column '{key}' is shared; no values will be compared");
    }
    debug!("Comparing columns: {}", aligned.columns.join(", "));

    let source_partition = partition_by_key(&aligned.source, key);
    let target_partition = partition_by_key(&aligned.target, key);
    if !source_partition.duplicates.is_empty() || !target_partition.duplicates.is_empty() {
        warn!(
            "Duplicate keys: {} source row(s), {} target row(s) excluded from alignment",
            source_partition.duplicates.row_count(),
            target_partition.duplicates.row_count()
        );
    }

    let rows = align_rows(&source_partition.unique, &target_partition.unique, key);
    let comparison = CellComparison {
        float_tolerance: config.comparison.float_tolerance,
        nulls_match: config.comparison.nulls_match,
    };
    let mismatches = detect_mismatches(&rows, key, comparison);
    let missing = detect_missing(&source_partition.unique, &aligned.target, key);
    let nulls = detect_nulls(&aligned.source, &aligned.target, key);

    let numeric_columns = aligned
        .source
        .numeric_columns(config.exclude_key_from_features.then_some(key));
    let outliers = detect_outliers(
        &aligned.source,
        &aligned.target,
        key,
        &numeric_columns,
        config.zscore_threshold,
    );

    info!("Running anomaly detector '{}'", detector.name());
    let model = detector.detect(&aligned.source, &numeric_columns);
    if let AnomalyOutcome::Unavailable { reason } = &model {
        info!("Anomaly model unavailable: {reason}");
    }

    let mut sheets = BTreeMap::new();
    sheets.insert(Sheet::DataMismatches, mismatches);
    sheets.insert(Sheet::NullsSourceTarget, nulls);
    sheets.insert(
        Sheet::SourceDuplicates,
        ResultSet::from_dataset(&source_partition.duplicates),
    );
    sheets.insert(
        Sheet::TargetDuplicates,
        ResultSet::from_dataset(&target_partition.duplicates),
    );
    sheets.insert(Sheet::OutliersSideBySide, outliers.side_by_side);
    sheets.insert(Sheet::MissingInTarget, missing);
    sheets.insert(Sheet::ModelAnomalies, model.anomalies().clone());

    let verdict = aggregate(sheets.values());
    for (sheet, result) in &sheets {
        if !result.is_empty() {
            info!("{sheet}: {} row(s)", result.len());
        }
    }
    info!("Reconciliation verdict: {verdict}");

    Ok(ReconReport {
        primary_key: key.to_string(),
        source_table: config.source_table.clone(),
        target_table: config.target_table.clone(),
        source_rows: source.row_count(),
        target_rows: target.row_count(),
        compared_columns: aligned.columns,
        numeric_columns,
        aligned_keys: rows.len(),
        source_outlier_rows: outliers.source_rows,
        target_outlier_rows: outliers.target_rows,
        sheets,
        model,
        verdict,
        duration_secs: started.elapsed().as_secs_f64(),
    })
}
