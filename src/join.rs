//! Full outer join of two datasets on a single key column.
//!
//! Used to present source-side and target-side findings next to each other.
//! Non-key columns present on both sides carry the side suffixes; rows are
//! emitted in ascending key order and keys repeated on a side produce the
//! cartesian product of that key's rows.

use std::collections::{BTreeMap, HashSet};

use crate::{
    data::{Cell, ComparableValue},
    dataset::Dataset,
    result_set::ResultSet,
};

pub const SOURCE_SUFFIX: &str = "_source";
pub const TARGET_SUFFIX: &str = "_target";

#[derive(Default)]
struct KeyBucket {
    left: Vec<usize>,
    right: Vec<usize>,
}

pub fn outer_join_on_key(left: &Dataset, right: &Dataset, key: &str) -> ResultSet {
    let (Some(left_key), Some(right_key)) = (left.column_index(key), right.column_index(key))
    else {
        return ResultSet::empty();
    };
    let left_columns = non_key_columns(left, left_key);
    let right_columns = non_key_columns(right, right_key);
    let headers = build_output_headers(left, right, key, &left_columns, &right_columns);

    let mut buckets: BTreeMap<ComparableValue, KeyBucket> = BTreeMap::new();
    for row in 0..left.row_count() {
        buckets
            .entry(ComparableValue::from_cell(left.cell(left_key, row)))
            .or_default()
            .left
            .push(row);
    }
    for row in 0..right.row_count() {
        buckets
            .entry(ComparableValue::from_cell(right.cell(right_key, row)))
            .or_default()
            .right
            .push(row);
    }

    let left_side = |row: Option<usize>| side_cells(left, &left_columns, row);
    let right_side = |row: Option<usize>| side_cells(right, &right_columns, row);

    let mut rows = Vec::new();
    for (key_value, bucket) in buckets {
        let left_rows: Vec<Option<usize>> = if bucket.left.is_empty() {
            vec![None]
        } else {
            bucket.left.iter().copied().map(Some).collect()
        };
        let right_rows: Vec<Option<usize>> = if bucket.right.is_empty() {
            vec![None]
        } else {
            bucket.right.iter().copied().map(Some).collect()
        };
        for l in &left_rows {
            for r in &right_rows {
                let mut combined = Vec::with_capacity(headers.len());
                combined.push(key_value.0.clone());
                combined.extend(left_side(*l));
                combined.extend(right_side(*r));
                rows.push(combined);
            }
        }
    }
    ResultSet::new(headers, rows)
}

fn non_key_columns(dataset: &Dataset, key_index: usize) -> Vec<usize> {
    (0..dataset.column_count())
        .filter(|idx| *idx != key_index)
        .collect()
}

fn side_cells(dataset: &Dataset, columns: &[usize], row: Option<usize>) -> Vec<Cell> {
    match row {
        Some(row) => columns
            .iter()
            .map(|col| dataset.cell(*col, row).clone())
            .collect(),
        None => vec![None; columns.len()],
    }
}

fn build_output_headers(
    left: &Dataset,
    right: &Dataset,
    key: &str,
    left_columns: &[usize],
    right_columns: &[usize],
) -> Vec<String> {
    let left_names: Vec<&str> = left_columns
        .iter()
        .map(|idx| left.columns()[*idx].name.as_str())
        .collect();
    let right_names: Vec<&str> = right_columns
        .iter()
        .map(|idx| right.columns()[*idx].name.as_str())
        .collect();
    let shared: HashSet<&str> = left_names
        .iter()
        .filter(|name| right_names.contains(name))
        .copied()
        .collect();

    let mut headers = vec![key.to_string()];
    let suffixed = |name: &str, suffix: &str| {
        if shared.contains(name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        }
    };
    headers.extend(left_names.iter().map(|name| suffixed(name, SOURCE_SUFFIX)));
    headers.extend(right_names.iter().map(|name| suffixed(name, TARGET_SUFFIX)));
    headers
}
