//! Model-based anomaly detection.
//!
//! The detector is a capability chosen once when the run starts. Builds
//! without the `anomaly-model` feature (or configurations that disable the
//! model) get an [`UnavailableDetector`], which the rest of the run treats as
//! "no anomalies, no model statistics".

#[cfg(feature = "anomaly-model")]
pub mod autoencoder;
#[cfg(feature = "anomaly-model")]
pub mod features;

use serde::Serialize;

use crate::{config::AnomalyConfig, dataset::Dataset, result_set::ResultSet};

pub const COMPUTE_DEVICE: &str = "CPU";

pub trait AnomalyDetector {
    fn name(&self) -> &'static str;

    /// Scores the rows of `source` over the numeric `columns` and returns the
    /// flagged rows with every source column.
    fn detect(&self, source: &Dataset, columns: &[String]) -> AnomalyOutcome;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    pub duration_secs: f64,
    pub epochs: usize,
    pub scored_rows: usize,
    pub anomaly_count: usize,
    pub anomaly_ratio: f64,
    pub threshold: Option<f64>,
    pub final_loss: Option<f64>,
    pub device: &'static str,
}

impl ModelStats {
    /// Statistics of a run that had nothing to train on.
    pub fn untrained(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            epochs: 0,
            scored_rows: 0,
            anomaly_count: 0,
            anomaly_ratio: 0.0,
            threshold: None,
            final_loss: None,
            device: COMPUTE_DEVICE,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AnomalyOutcome {
    Completed {
        anomalies: ResultSet,
        stats: ModelStats,
    },
    Unavailable {
        reason: String,
    },
}

impl AnomalyOutcome {
    pub fn anomalies(&self) -> &ResultSet {
        static EMPTY: std::sync::OnceLock<ResultSet> = std::sync::OnceLock::new();
        match self {
            AnomalyOutcome::Completed { anomalies, .. } => anomalies,
            AnomalyOutcome::Unavailable { .. } => EMPTY.get_or_init(ResultSet::empty),
        }
    }

    pub fn stats(&self) -> Option<&ModelStats> {
        match self {
            AnomalyOutcome::Completed { stats, .. } => Some(stats),
            AnomalyOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AnomalyOutcome::Completed { .. })
    }
}

/// Stand-in used when no model can run.
#[derive(Debug, Clone)]
pub struct UnavailableDetector {
    reason: String,
}

impl UnavailableDetector {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AnomalyDetector for UnavailableDetector {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn detect(&self, _source: &Dataset, _columns: &[String]) -> AnomalyOutcome {
        AnomalyOutcome::Unavailable {
            reason: self.reason.clone(),
        }
    }
}

pub fn select_detector(config: &AnomalyConfig) -> Box<dyn AnomalyDetector> {
    if !config.enabled {
        return Box::new(UnavailableDetector::new("disabled in configuration"));
    }
    #[cfg(feature = "anomaly-model")]
    {
        Box::new(autoencoder::AutoencoderDetector::new(config.clone()))
    }
    #[cfg(not(feature = "anomaly-model"))]
    {
        Box::new(UnavailableDetector::new(
            "built without the anomaly-model feature",
        ))
    }
}
