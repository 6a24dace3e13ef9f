use crate::{
    align::key_set,
    data::ComparableValue,
    dataset::Dataset,
    result_set::ResultSet,
};

/// Unique-by-key source rows whose key appears nowhere in the target, in
/// ascending key order.
///
/// `target` is the full schema-aligned target, so a key that only occurs as a
/// target duplicate still counts as present.
pub fn detect_missing(source_unique: &Dataset, target: &Dataset, key: &str) -> ResultSet {
    let Some(key_index) = source_unique.column_index(key) else {
        return ResultSet::empty();
    };
    let present = key_set(target, key);
    let mut missing: Vec<(ComparableValue, usize)> = (0..source_unique.row_count())
        .map(|row| (ComparableValue::from_cell(source_unique.cell(key_index, row)), row))
        .filter(|(key_value, _)| !present.contains_key(key_value))
        .collect();
    missing.sort();
    let rows: Vec<usize> = missing.into_iter().map(|(_, row)| row).collect();
    ResultSet::from_dataset(&source_unique.take_rows(&rows))
}
