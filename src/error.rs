//! Error taxonomy for a reconciliation run.
//!
//! Only preconditions and I/O are fatal. Degenerate data (no shared columns,
//! zero-variance columns, a missing modelling capability) is absorbed by the
//! detectors and never surfaces here.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Which input of the run an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("Primary key column '{key}' is missing from the {side} dataset")]
    MissingKeyColumn { key: String, side: Side },

    #[error("Loading table '{table}' failed: {source}")]
    Load {
        table: String,
        #[source]
        source: Box<ReconError>,
    },

    #[error("Table '{0}' was not found")]
    TableNotFound(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to decode text with encoding {0}")]
    Decode(&'static str),

    #[error("Column '{column}' has {actual} value(s) but the dataset has {expected} row(s)")]
    RaggedDataset {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Writing report to {path:?} failed: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: Box<ReconError>,
    },

    #[error("Serializing run summary failed: {0}")]
    Summary(#[from] serde_json::Error),
}

impl ReconError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReconError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ReconError> = std::result::Result<T, E>;
