//! Schema alignment, key-based deduplication and key-ordered row alignment.
//!
//! These three steps run before any comparison. Every comparison after them
//! works on plain key → row maps; nothing relies on implicit positional
//! alignment between the two datasets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    data::{Cell, ComparableValue},
    dataset::Dataset,
    error::{ReconError, Result, Side},
    schema::ColumnType,
};

/// Both datasets restricted to their shared columns.
#[derive(Debug, Clone)]
pub struct AlignedSchemas {
    pub columns: Vec<String>,
    pub source: Dataset,
    pub target: Dataset,
}

/// Fails fast when the key column is absent from either side.
pub fn ensure_key_column(source: &Dataset, target: &Dataset, key: &str) -> Result<()> {
    for (side, dataset) in [(Side::Source, source), (Side::Target, target)] {
        if !dataset.has_column(key) {
            return Err(ReconError::MissingKeyColumn {
                key: key.to_string(),
                side,
            });
        }
    }
    Ok(())
}

/// Restricts both datasets to the sorted intersection of their column names.
pub fn align_schemas(source: &Dataset, target: &Dataset) -> AlignedSchemas {
    let source_names: BTreeSet<String> = source.column_names().into_iter().collect();
    let target_names: BTreeSet<String> = target.column_names().into_iter().collect();
    let columns: Vec<String> = source_names.intersection(&target_names).cloned().collect();

    let dropped_source = source_names.len() - columns.len();
    let dropped_target = target_names.len() - columns.len();
    if dropped_source > 0 || dropped_target > 0 {
        debug!(
            "Dropping {dropped_source} source-only and {dropped_target} target-only column(s)"
        );
    }
    if columns.is_empty() {
        warn!("Source and target share no columns; comparisons will be empty");
    }

    let mut aligned_source = source.select(&columns);
    let mut aligned_target = target.select(&columns);
    for name in &columns {
        harmonize_column(&mut aligned_source, &mut aligned_target, name);
    }
    AlignedSchemas {
        source: aligned_source,
        target: aligned_target,
        columns,
    }
}

/// Each side infers its types alone, so one stray field can leave a shared
/// column typed `String` on a single side. That side's cells are re-read
/// under the other side's type so equal values still compare equal.
fn harmonize_column(source: &mut Dataset, target: &mut Dataset, name: &str) {
    let type_of = |dataset: &Dataset| dataset.column(name).map(|c| c.data_type);
    let (Some(source_type), Some(target_type)) = (type_of(&*source), type_of(&*target)) else {
        return;
    };
    let (side, dataset, ty) = match (source_type, target_type) {
        (ColumnType::String, ty) if ty != ColumnType::String => (Side::Source, source, ty),
        (ty, ColumnType::String) if ty != ColumnType::String => (Side::Target, target, ty),
        _ => return,
    };
    let converted = dataset.reparse_strings(name, ty);
    debug!("Column '{name}' is String in the {side} only; re-read {converted} cell(s) as {ty}");
}

/// Rows split by how often their key occurs.
#[derive(Debug, Clone)]
pub struct KeyPartition {
    /// Rows whose key occurs exactly once.
    pub unique: Dataset,
    /// Every occurrence of every key that occurs more than once.
    pub duplicates: Dataset,
}

pub fn partition_by_key(dataset: &Dataset, key: &str) -> KeyPartition {
    let Some(key_index) = dataset.column_index(key) else {
        return KeyPartition {
            unique: dataset.clone(),
            duplicates: dataset.take_rows(&[]),
        };
    };
    let keys: Vec<ComparableValue> = (0..dataset.row_count())
        .map(|row| ComparableValue::from_cell(dataset.cell(key_index, row)))
        .collect();
    let counts = keys.iter().counts();
    let (duplicate_rows, unique_rows): (Vec<usize>, Vec<usize>) =
        (0..keys.len()).partition(|&row| counts[&keys[row]] > 1);
    KeyPartition {
        unique: dataset.take_rows(&unique_rows),
        duplicates: dataset.take_rows(&duplicate_rows),
    }
}

/// Source rows and their target counterparts in ascending key order.
#[derive(Debug, Clone)]
pub struct AlignedRows {
    pub columns: Vec<String>,
    pub keys: Vec<ComparableValue>,
    pub source: Vec<Vec<Cell>>,
    /// `None` where the source key has no target row (the synthetic
    /// all-null row).
    pub target: Vec<Option<Vec<Cell>>>,
}

impl AlignedRows {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The target row at `index`, with the synthetic row materialised as
    /// nulls.
    pub fn target_row(&self, index: usize) -> Vec<Cell> {
        self.target[index]
            .clone()
            .unwrap_or_else(|| vec![None; self.columns.len()])
    }
}

/// Indexes a unique-by-key dataset by key, projected onto `columns`.
pub fn index_by_key(
    dataset: &Dataset,
    key: &str,
    columns: &[String],
) -> BTreeMap<ComparableValue, Vec<Cell>> {
    let Some(key_index) = dataset.column_index(key) else {
        return BTreeMap::new();
    };
    let positions: Vec<Option<usize>> = columns.iter().map(|c| dataset.column_index(c)).collect();
    (0..dataset.row_count())
        .map(|row| {
            let cells = positions
                .iter()
                .map(|pos| pos.and_then(|col| dataset.cell(col, row).clone()))
                .collect();
            (ComparableValue::from_cell(dataset.cell(key_index, row)), cells)
        })
        .collect()
}

/// Re-projects the target onto the source's ordered key sequence. Both inputs
/// must be unique by key (see [`partition_by_key`]).
pub fn align_rows(source_unique: &Dataset, target_unique: &Dataset, key: &str) -> AlignedRows {
    let columns = source_unique.column_names();
    let source_index = index_by_key(source_unique, key, &columns);
    let mut target_index = index_by_key(target_unique, key, &columns);

    let mut keys = Vec::with_capacity(source_index.len());
    let mut source = Vec::with_capacity(source_index.len());
    let mut target = Vec::with_capacity(source_index.len());
    for (key_value, row) in source_index {
        target.push(target_index.remove(&key_value));
        keys.push(key_value);
        source.push(row);
    }
    AlignedRows {
        columns,
        keys,
        source,
        target,
    }
}

/// Every key present in `dataset`, duplicates included.
pub fn key_set(dataset: &Dataset, key: &str) -> HashMap<ComparableValue, usize> {
    let Some(key_index) = dataset.column_index(key) else {
        return HashMap::new();
    };
    (0..dataset.row_count())
        .map(|row| ComparableValue::from_cell(dataset.cell(key_index, row)))
        .counts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, dataset::Column, schema::ColumnType};

    fn ints(name: &str, values: &[i64]) -> Column {
        Column::new(
            name,
            ColumnType::Integer,
            values.iter().map(|v| Some(Value::Integer(*v))).collect(),
        )
    }

    #[test]
    fn align_schemas_sorts_the_intersection() {
        let source = Dataset::new(vec![ints("b", &[1]), ints("id", &[1]), ints("a", &[1])]).unwrap();
        let target = Dataset::new(vec![ints("id", &[1]), ints("a", &[2]), ints("c", &[3])]).unwrap();
        let aligned = align_schemas(&source, &target);
        assert_eq!(aligned.columns, vec!["a".to_string(), "id".to_string()]);
        assert_eq!(aligned.source.column_names(), aligned.columns);
        assert_eq!(aligned.target.column("a").unwrap().values[0], Some(Value::Integer(2)));
    }

    #[test]
    fn string_key_on_one_side_is_reread_under_the_other_type() {
        let headers = vec!["id".to_string()];
        let records = |ids: &[&str]| -> Vec<Vec<String>> {
            ids.iter().map(|id| vec![id.to_string()]).collect()
        };
        let source = Dataset::from_records(&headers, &records(&["1", "2", "3"])).unwrap();
        let target = Dataset::from_records(&headers, &records(&["3", "2", "1b"])).unwrap();
        let aligned = align_schemas(&source, &target);
        assert_eq!(
            aligned.target.column("id").unwrap().values,
            vec![
                Some(Value::Integer(3)),
                Some(Value::Integer(2)),
                Some(Value::String("1b".to_string())),
            ]
        );
        let rows = align_rows(&aligned.source, &aligned.target, "id");
        assert!(rows.target[0].is_none());
        assert!(rows.target[1].is_some());
        assert!(rows.target[2].is_some());
    }

    #[test]
    fn ensure_key_column_names_the_side() {
        let source = Dataset::new(vec![ints("id", &[1])]).unwrap();
        let target = Dataset::new(vec![ints("other", &[1])]).unwrap();
        let err = ensure_key_column(&source, &target, "id").unwrap_err();
        assert!(matches!(
            err,
            ReconError::MissingKeyColumn {
                side: Side::Target,
                ..
            }
        ));
    }

    #[test]
    fn partition_keeps_all_occurrences_of_duplicates() {
        let dataset = Dataset::new(vec![ints("id", &[1, 2, 2, 3, 2]), ints("v", &[1, 2, 3, 4, 5])]).unwrap();
        let partition = partition_by_key(&dataset, "id");
        assert_eq!(partition.duplicates.row_count(), 3);
        assert_eq!(partition.unique.row_count(), 2);
        assert_eq!(
            partition.duplicates.column("v").unwrap().values,
            vec![
                Some(Value::Integer(2)),
                Some(Value::Integer(3)),
                Some(Value::Integer(5))
            ]
        );
    }

    #[test]
    fn align_rows_inserts_synthetic_rows_for_missing_keys() {
        let source = Dataset::new(vec![ints("id", &[3, 1, 2]), ints("v", &[30, 10, 20])]).unwrap();
        let target = Dataset::new(vec![ints("id", &[2, 1, 9]), ints("v", &[21, 10, 90])]).unwrap();
        let aligned = align_rows(&source, &target, "id");
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned.keys[0], ComparableValue(Some(Value::Integer(1))));
        assert!(aligned.target[2].is_none());
        assert_eq!(aligned.target_row(2), vec![None, None]);
        assert_eq!(aligned.target[1].as_ref().unwrap()[1], Some(Value::Integer(21)));
    }
}
