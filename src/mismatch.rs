use log::debug;

use crate::{
    align::AlignedRows,
    data::{Cell, Value},
    result_set::ResultSet,
};

pub const COLUMN_HEADER: &str = "column";
pub const SOURCE_VALUE_HEADER: &str = "source_value";
pub const TARGET_VALUE_HEADER: &str = "target_value";

#[derive(Debug, Clone, Copy, Default)]
pub struct CellComparison {
    /// Largest absolute difference at which two numeric cells still match.
    pub float_tolerance: f64,
    /// Whether a null on both sides counts as agreement.
    pub nulls_match: bool,
}

impl CellComparison {
    pub fn cells_match(&self, source: &Cell, target: &Cell) -> bool {
        match (source, target) {
            (Some(left), Some(right)) => left.matches(right, self.float_tolerance),
            (None, None) => self.nulls_match,
            _ => false,
        }
    }
}

/// Compares every shared non-key column of the aligned rows.
///
/// Positions whose target row is synthetic (key missing from the target) are
/// skipped; those keys are reported by the missing-record detector instead.
/// The result is long-form: one row per disagreeing (key, column), ordered by
/// column, then key.
pub fn detect_mismatches(aligned: &AlignedRows, key: &str, comparison: CellComparison) -> ResultSet {
    let headers = vec![
        key.to_string(),
        COLUMN_HEADER.to_string(),
        SOURCE_VALUE_HEADER.to_string(),
        TARGET_VALUE_HEADER.to_string(),
    ];
    let mut rows = Vec::new();
    for (col_idx, column) in aligned.columns.iter().enumerate() {
        if column == key {
            continue;
        }
        let before = rows.len();
        for (row_idx, source_row) in aligned.source.iter().enumerate() {
            let Some(target_row) = &aligned.target[row_idx] else {
                continue;
            };
            let (source_cell, target_cell) = (&source_row[col_idx], &target_row[col_idx]);
            if !comparison.cells_match(source_cell, target_cell) {
                rows.push(vec![
                    aligned.keys[row_idx].0.clone(),
                    Some(Value::String(column.clone())),
                    source_cell.clone(),
                    target_cell.clone(),
                ]);
            }
        }
        if rows.len() > before {
            debug!("Column '{column}': {} mismatch(es)", rows.len() - before);
        }
    }
    ResultSet::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_disagree_unless_configured() {
        let strict = CellComparison::default();
        assert!(!strict.cells_match(&None, &None));
        assert!(!strict.cells_match(&Some(Value::Integer(1)), &None));
        let lenient = CellComparison {
            nulls_match: true,
            ..CellComparison::default()
        };
        assert!(lenient.cells_match(&None, &None));
        assert!(strict.cells_match(&Some(Value::Integer(2)), &Some(Value::Float(2.0))));
    }
}
