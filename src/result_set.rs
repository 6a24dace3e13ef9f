use std::fmt;

use serde::Serialize;

use crate::{
    data::{Cell, format_cell},
    dataset::Dataset,
};

/// Report sheets, in the order the writer emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Sheet {
    DataMismatches,
    NullsSourceTarget,
    SourceDuplicates,
    TargetDuplicates,
    OutliersSideBySide,
    MissingInTarget,
    ModelAnomalies,
}

impl Sheet {
    pub const ALL: [Sheet; 7] = [
        Sheet::DataMismatches,
        Sheet::NullsSourceTarget,
        Sheet::SourceDuplicates,
        Sheet::TargetDuplicates,
        Sheet::OutliersSideBySide,
        Sheet::MissingInTarget,
        Sheet::ModelAnomalies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sheet::DataMismatches => "Data_Mismatches",
            Sheet::NullsSourceTarget => "Nulls_Source_Target",
            Sheet::SourceDuplicates => "Source_Duplicates",
            Sheet::TargetDuplicates => "Target_Duplicates",
            Sheet::OutliersSideBySide => "Outliers_SideBySide",
            Sheet::MissingInTarget => "Missing_In_Target",
            Sheet::ModelAnomalies => "Model_Anomalies",
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tabular output of one detector. An empty result set means "no finding".
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        Self { headers, rows }
    }

    /// A result set with no columns, used when a detector did not run.
    pub fn empty() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self::new(dataset.column_names(), dataset.rows().collect())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(format_cell).collect())
            .collect()
    }
}
