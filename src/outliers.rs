//! Z-score outlier detection over numeric columns.
//!
//! Each dataset is scored independently with the population standard
//! deviation (`ddof = 0`). A column without spread flags nothing, and null
//! or non-numeric cells are never flagged, so degenerate columns cannot turn
//! into not-a-number comparisons.

use log::debug;

use crate::{
    dataset::Dataset,
    join::outer_join_on_key,
    result_set::ResultSet,
    stats::{ColumnStats, z_score},
};

pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct OutlierReport {
    pub side_by_side: ResultSet,
    pub source_rows: usize,
    pub target_rows: usize,
}

/// Indices of rows where any of `columns` has `|z| > threshold`.
pub fn outlier_rows(dataset: &Dataset, columns: &[String], threshold: f64) -> Vec<usize> {
    let mut flagged = vec![false; dataset.row_count()];
    for name in columns {
        let Some(column) = dataset.column(name) else {
            continue;
        };
        let values: Vec<Option<f64>> = column
            .values
            .iter()
            .map(|cell| cell.as_ref().and_then(|v| v.as_f64()))
            .collect();
        let stats = ColumnStats::from_values(values.iter().flatten().copied());
        if !stats.has_spread() {
            continue;
        }
        let (Some(mean), Some(std_dev)) = (stats.mean(), stats.std_dev(0)) else {
            continue;
        };
        let mut column_hits = 0usize;
        for (row, value) in values.iter().enumerate() {
            let Some(z) = value.and_then(|v| z_score(v, mean, std_dev)) else {
                continue;
            };
            if z.abs() > threshold {
                flagged[row] = true;
                column_hits += 1;
            }
        }
        if column_hits > 0 {
            debug!("Column '{name}': {column_hits} value(s) beyond |z| > {threshold}");
        }
    }
    flagged
        .iter()
        .enumerate()
        .filter_map(|(row, hit)| hit.then_some(row))
        .collect()
}

/// Flags outliers in both datasets over `columns` and joins the flagged rows
/// on the key.
pub fn detect_outliers(
    source: &Dataset,
    target: &Dataset,
    key: &str,
    columns: &[String],
    threshold: f64,
) -> OutlierReport {
    let source_outliers = source.take_rows(&outlier_rows(source, columns, threshold));
    let target_outliers = target.take_rows(&outlier_rows(target, columns, threshold));
    OutlierReport {
        side_by_side: outer_join_on_key(&source_outliers, &target_outliers, key),
        source_rows: source_outliers.row_count(),
        target_rows: target_outliers.row_count(),
    }
}
