//! In-memory columnar table consumed by every detector.

use std::collections::HashSet;

use crate::{
    data::{Cell, Value, parse_as, parse_typed_value},
    error::{ReconError, Result},
    schema::{ColumnType, infer_column_type},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }
}

/// Named, typed columns of equal length. Rows are positional across columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ReconError::DuplicateColumn(column.name.clone()));
            }
            if column.values.len() != row_count {
                return Err(ReconError::RaggedDataset {
                    column: column.name.clone(),
                    expected: row_count,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Builds a dataset from raw string records, inferring each column's type
    /// from all of its fields.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Result<Self> {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let fields = || records.iter().map(|r| r.get(idx).map_or("", String::as_str));
                let data_type = infer_column_type(fields());
                let values = fields()
                    .map(|raw| parse_typed_value(raw, data_type))
                    .collect();
                Column::new(name.clone(), data_type, values)
            })
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn row(&self, index: usize) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|c| c.values[index].clone())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        (0..self.row_count).map(|idx| self.row(idx))
    }

    pub fn cell(&self, column: usize, row: usize) -> &Cell {
        &self.columns[column].values[row]
    }

    pub fn row_has_null(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.values[row].is_none())
    }

    /// Returns an independent copy restricted to `names`, in that order.
    /// Names absent from the dataset are skipped.
    pub fn select(&self, names: &[String]) -> Dataset {
        let columns: Vec<Column> = names
            .iter()
            .filter_map(|name| self.column(name).cloned())
            .collect();
        let row_count = if columns.is_empty() { 0 } else { self.row_count };
        Dataset { columns, row_count }
    }

    /// Returns a dataset holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data_type: c.data_type,
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Dataset {
            columns,
            row_count: indices.len(),
        }
    }

    /// Integer and floating point columns, in dataset order, minus `exclude`.
    pub fn numeric_columns(&self, exclude: Option<&str>) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.data_type.is_numeric() && Some(c.name.as_str()) != exclude)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Re-reads the string cells of column `name` as `ty` wherever they
    /// parse. Cells that do not parse stay strings. Returns how many cells
    /// changed.
    pub fn reparse_strings(&mut self, name: &str, ty: ColumnType) -> usize {
        let Some(column) = self.columns.iter_mut().find(|c| c.name == name) else {
            return 0;
        };
        let mut converted = 0;
        for cell in &mut column.values {
            let parsed = match cell {
                Some(Value::String(raw)) => parse_as(raw.trim(), ty),
                _ => None,
            };
            if let Some(parsed) = parsed {
                *cell = Some(parsed);
                converted += 1;
            }
        }
        converted
    }
}
