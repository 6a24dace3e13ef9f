pub mod align;
pub mod anomaly;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod io_utils;
pub mod join;
pub mod mismatch;
pub mod missing;
pub mod nulls;
pub mod outliers;
pub mod reconcile;
pub mod report;
pub mod result_set;
pub mod schema;
pub mod source;
pub mod stats;
pub mod table;
pub mod verdict;

use std::{env, process::ExitCode, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ProbeArgs, ReconcileArgs},
    config::ReconConfig,
    report::{CsvReportWriter, ReportWriter},
    source::{CsvTableSource, TableSource},
};

/// Exit status of a run whose verdict is FAIL under `--strict`.
pub const EXIT_VERDICT_FAIL: u8 = 2;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_recon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile(args) => handle_reconcile(&args),
        Commands::Probe(args) => handle_probe(&args).map(|_| ExitCode::SUCCESS),
    }
}

/// Layers command-line flags over the configuration file (or defaults).
pub fn build_config(args: &ReconcileArgs) -> Result<ReconConfig> {
    let mut config = match &args.config {
        Some(path) => ReconConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => ReconConfig::default(),
    };
    if let Some(source) = &args.source {
        config.source_table = source.clone();
    }
    if let Some(target) = &args.target {
        config.target_table = target.clone();
    }
    if let Some(dir) = &args.source_dir {
        config.source_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.target_dir {
        config.target_dir = Some(dir.clone());
    }
    if let Some(key) = &args.key {
        config.primary_key = key.clone();
    }
    if let Some(dir) = &args.report_dir {
        config.report.dir = dir.clone();
    }
    if let Some(threshold) = args.zscore_threshold {
        config.zscore_threshold = threshold;
    }
    if let Some(sigma) = args.anomaly_sigma {
        config.anomaly.threshold_sigma = sigma;
    }
    if let Some(epochs) = args.epochs {
        config.anomaly.epochs = epochs;
    }
    if let Some(rate) = args.learning_rate {
        config.anomaly.learning_rate = rate;
    }
    if args.seed.is_some() {
        config.anomaly.seed = args.seed;
    }
    if args.no_model {
        config.anomaly.enabled = false;
    }
    if args.exclude_key_features {
        config.exclude_key_from_features = true;
    }
    if let Some(tolerance) = args.float_tolerance {
        config.comparison.float_tolerance = tolerance;
    }
    if args.nulls_match {
        config.comparison.nulls_match = true;
    }
    if config.source_table.is_empty() {
        anyhow::bail!("No source table given (use --source or set source_table)");
    }
    if config.target_table.is_empty() {
        anyhow::bail!("No target table given (use --target or set target_table)");
    }
    config.validate().context("Validating configuration")?;
    Ok(config)
}

fn handle_reconcile(args: &ReconcileArgs) -> Result<ExitCode> {
    let config = build_config(args)?;
    debug!("Effective configuration: {config:?}");
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = CsvTableSource::new(config.source_dir.clone())
        .with_delimiter(args.delimiter)
        .with_encoding(encoding);
    let target = CsvTableSource::new(config.target_dir.clone())
        .with_delimiter(args.delimiter)
        .with_encoding(encoding);
    let detector = anomaly::select_detector(&config.anomaly);

    let report = reconcile::run(&config, &source, &target, detector.as_ref())
        .with_context(|| {
            format!(
                "Reconciling '{}' against '{}'",
                config.target_table, config.source_table
            )
        })?;

    let writer = CsvReportWriter::new(&config.report.dir, &config.report.status_file);
    writer
        .write(&report)
        .with_context(|| format!("Writing report to {:?}", writer.dir()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print!("{}", report::render_summary(&report));
    }

    if args.strict && !report.verdict.is_pass() {
        return Ok(ExitCode::from(EXIT_VERDICT_FAIL));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(&args.input, args.delimiter))
    );
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let input = args.input.to_string_lossy();
    let dataset = CsvTableSource::new(None)
        .with_delimiter(args.delimiter)
        .with_encoding(encoding)
        .load(&input)
        .with_context(|| format!("Inferring column types from {:?}", args.input))?;
    let headers = vec!["#".to_string(), "column".to_string(), "type".to_string()];
    let rows: Vec<Vec<String>> = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.data_type.to_string(),
            ]
        })
        .collect();
    table::print_table(&headers, &rows);
    info!(
        "Inferred {} column(s) over {} row(s)",
        dataset.column_count(),
        dataset.row_count()
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
