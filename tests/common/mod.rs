#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_recon::{
    config::ReconConfig,
    data::Value,
    dataset::{Column, Dataset},
    schema::ColumnType,
};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    /// Parent directories are created as needed.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Reads a CSV file into rows of strings, header row included.
pub fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("open csv");
    reader
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

pub fn int_column(name: &str, values: &[i64]) -> Column {
    Column::new(
        name,
        ColumnType::Integer,
        values.iter().map(|v| Some(Value::Integer(*v))).collect(),
    )
}

pub fn float_column(name: &str, values: &[Option<f64>]) -> Column {
    Column::new(
        name,
        ColumnType::Float,
        values.iter().map(|v| v.map(Value::Float)).collect(),
    )
}

pub fn dataset(columns: Vec<Column>) -> Dataset {
    Dataset::new(columns).expect("valid dataset")
}

pub fn keyed_config(key: &str) -> ReconConfig {
    ReconConfig {
        primary_key: key.to_string(),
        source_table: "source".to_string(),
        target_table: "target".to_string(),
        ..ReconConfig::default()
    }
}
