//! Table loading: the "given a table name, return a dataset" collaborator.
//!
//! Loaders are blocking and fail fast; a failure aborts the run before any
//! detector executes. Retry policy, if any, belongs to the caller.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};

use crate::{
    dataset::Dataset,
    error::{ReconError, Result},
    io_utils,
};

pub trait TableSource {
    fn load(&self, table: &str) -> Result<Dataset>;
}

/// Reads `<root>/<table>.csv`. A table name that is itself an existing file
/// path is read directly, which lets the CLI accept plain paths.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    root: Option<PathBuf>,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
}

impl CsvTableSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            delimiter: None,
            encoding: UTF_8,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn resolve(&self, table: &str) -> Result<PathBuf> {
        let direct = Path::new(table);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        let root = self.root.as_deref().unwrap_or_else(|| Path::new("."));
        for candidate in [
            root.join(table),
            root.join(format!("{table}.csv")),
            root.join(format!("{table}.tsv")),
        ] {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ReconError::TableNotFound(table.to_string()))
    }

    fn read(&self, path: &Path) -> Result<Dataset> {
        let delimiter = io_utils::resolve_input_delimiter(path, self.delimiter);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, self.encoding)?;
        let mut records = Vec::new();
        for record in reader.byte_records() {
            records.push(io_utils::decode_record(&record?, self.encoding)?);
        }
        debug!(
            "Read {} row(s) across {} column(s) from {:?}",
            records.len(),
            headers.len(),
            path
        );
        Dataset::from_records(&headers, &records)
    }
}

impl TableSource for CsvTableSource {
    fn load(&self, table: &str) -> Result<Dataset> {
        let wrap = |source: ReconError| ReconError::Load {
            table: table.to_string(),
            source: Box::new(source),
        };
        let path = self.resolve(table).map_err(wrap)?;
        info!("Loading table '{table}' from {path:?}");
        self.read(&path).map_err(wrap)
    }
}

/// Serves datasets that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableSource {
    tables: HashMap<String, Dataset>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, dataset: Dataset) -> Self {
        self.tables.insert(name.into(), dataset);
        self
    }
}

impl TableSource for MemoryTableSource {
    fn load(&self, table: &str) -> Result<Dataset> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ReconError::TableNotFound(table.to_string()))
    }
}
