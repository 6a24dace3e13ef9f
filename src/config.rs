//! Run configuration.
//!
//! A [`ReconConfig`] is built once (YAML file, then command-line overrides)
//! and passed explicitly into [`crate::reconcile::run`]. Every field has a
//! default so a file only needs to name what differs.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ReconError, Result},
    outliers::DEFAULT_ZSCORE_THRESHOLD,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    /// Column used to pair source and target rows.
    pub primary_key: String,
    /// Source table name (or path).
    pub source_table: String,
    /// Target table name (or path).
    pub target_table: String,
    /// Directory holding the source tables.
    pub source_dir: Option<PathBuf>,
    /// Directory holding the target tables.
    pub target_dir: Option<PathBuf>,
    pub zscore_threshold: f64,
    /// Leave the key column out of the z-score and model features even when
    /// it is numeric.
    pub exclude_key_from_features: bool,
    pub comparison: ComparisonConfig,
    pub anomaly: AnomalyConfig,
    pub report: ReportConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            primary_key: String::new(),
            source_table: String::new(),
            target_table: String::new(),
            source_dir: None,
            target_dir: None,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            exclude_key_from_features: false,
            comparison: ComparisonConfig::default(),
            anomaly: AnomalyConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonConfig {
    pub float_tolerance: f64,
    pub nulls_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyConfig {
    pub enabled: bool,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Rows whose reconstruction error exceeds mean + sigma × stdev are flagged.
    pub threshold_sigma: f64,
    pub hidden_units: usize,
    pub latent_units: usize,
    pub seed: Option<u64>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epochs: 100,
            learning_rate: 1e-3,
            threshold_sigma: 3.0,
            hidden_units: 32,
            latent_units: 16,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub status_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("validation_report"),
            status_file: "pipeline_status.csv".to_string(),
        }
    }
}

impl ReconConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| ReconError::io(path, err))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|err| ReconError::InvalidConfig(err.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|err| ReconError::InvalidConfig(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(ReconError::InvalidConfig(message));
        if self.primary_key.trim().is_empty() {
            return invalid("primary_key must be set".to_string());
        }
        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return invalid(format!(
                "zscore_threshold must be positive, got {}",
                self.zscore_threshold
            ));
        }
        if !(self.comparison.float_tolerance.is_finite() && self.comparison.float_tolerance >= 0.0)
        {
            return invalid(format!(
                "comparison.float_tolerance must be non-negative, got {}",
                self.comparison.float_tolerance
            ));
        }
        let anomaly = &self.anomaly;
        if anomaly.epochs == 0 {
            return invalid("anomaly.epochs must be at least 1".to_string());
        }
        if !(anomaly.learning_rate.is_finite() && anomaly.learning_rate > 0.0) {
            return invalid(format!(
                "anomaly.learning_rate must be positive, got {}",
                anomaly.learning_rate
            ));
        }
        if !(anomaly.threshold_sigma.is_finite() && anomaly.threshold_sigma >= 0.0) {
            return invalid(format!(
                "anomaly.threshold_sigma must be non-negative, got {}",
                anomaly.threshold_sigma
            ));
        }
        if anomaly.hidden_units == 0 || anomaly.latent_units == 0 {
            return invalid("anomaly layer sizes must be at least 1".to_string());
        }
        if self.report.status_file.trim().is_empty() {
            return invalid("report.status_file must be set".to_string());
        }
        Ok(())
    }
}
