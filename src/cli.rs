use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile a replicated CSV table against its source",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare a target table with its source and write a validation report
    Reconcile(ReconcileArgs),
    /// Print the column types inferred for a CSV file
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Source table name (resolved under --source-dir) or CSV path
    #[arg(long)]
    pub source: Option<String>,
    /// Target table name (resolved under --target-dir) or CSV path
    #[arg(long)]
    pub target: Option<String>,
    /// Directory holding the source tables
    #[arg(long = "source-dir")]
    pub source_dir: Option<PathBuf>,
    /// Directory holding the target tables
    #[arg(long = "target-dir")]
    pub target_dir: Option<PathBuf>,
    /// Primary key column used to pair rows
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// YAML configuration file; flags override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Directory the report sheets are written to
    #[arg(short = 'o', long = "report-dir")]
    pub report_dir: Option<PathBuf>,
    /// Absolute z-score above which a numeric value is an outlier
    #[arg(long = "zscore-threshold")]
    pub zscore_threshold: Option<f64>,
    /// Standard deviations above the mean reconstruction error that flag a row
    #[arg(long = "anomaly-sigma")]
    pub anomaly_sigma: Option<f64>,
    /// Training epochs for the anomaly model
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Adam learning rate for the anomaly model
    #[arg(long = "learning-rate")]
    pub learning_rate: Option<f64>,
    /// Seed for reproducible model initialisation
    #[arg(long)]
    pub seed: Option<u64>,
    /// Leave a numeric key column out of the outlier and model features
    #[arg(long = "exclude-key-features")]
    pub exclude_key_features: bool,
    /// Skip the anomaly model
    #[arg(long = "no-model")]
    pub no_model: bool,
    /// Largest absolute difference at which numeric values still match
    #[arg(long = "float-tolerance")]
    pub float_tolerance: Option<f64>,
    /// Treat a null on both sides as a match
    #[arg(long = "nulls-match")]
    pub nulls_match: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the run summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Exit with status 2 when the verdict is FAIL
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
