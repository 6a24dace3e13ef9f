use log::debug;

use crate::{dataset::Dataset, join::outer_join_on_key, result_set::ResultSet};

/// Rows of `dataset` with at least one null cell, in their original order.
pub fn rows_with_nulls(dataset: &Dataset) -> Dataset {
    let rows: Vec<usize> = (0..dataset.row_count())
        .filter(|row| dataset.row_has_null(*row))
        .collect();
    dataset.take_rows(&rows)
}

/// Null-bearing rows of both sides, joined on the key for side-by-side
/// inspection. Runs over the schema-aligned datasets before deduplication,
/// so duplicated keys are included.
pub fn detect_nulls(source: &Dataset, target: &Dataset, key: &str) -> ResultSet {
    let source_nulls = rows_with_nulls(source);
    let target_nulls = rows_with_nulls(target);
    debug!(
        "Rows with nulls: {} source, {} target",
        source_nulls.row_count(),
        target_nulls.row_count()
    );
    outer_join_on_key(&source_nulls, &target_nulls, key)
}
