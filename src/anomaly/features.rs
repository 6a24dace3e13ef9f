use nalgebra::DMatrix;

use crate::{dataset::Dataset, stats::ColumnStats};

/// Scaled numeric features of the rows that had no null among them.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Dataset row index of each matrix row.
    pub rows: Vec<usize>,
    pub values: DMatrix<f64>,
}

impl FeatureMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.values.ncols() == 0
    }
}

/// Collects `columns` as floats, drops incomplete rows and min-max scales
/// every column to [0, 1] using the bounds of the remaining rows. A constant
/// column scales to zero.
pub fn prepare_features(dataset: &Dataset, columns: &[String]) -> FeatureMatrix {
    let selected: Vec<_> = columns
        .iter()
        .filter_map(|name| dataset.column(name))
        .collect();
    let mut rows = Vec::new();
    let mut raw = Vec::new();
    for row in 0..dataset.row_count() {
        let values: Option<Vec<f64>> = selected
            .iter()
            .map(|column| column.values[row].as_ref().and_then(|v| v.as_f64()))
            .collect();
        if let Some(values) = values {
            rows.push(row);
            raw.push(values);
        }
    }
    if selected.is_empty() {
        return FeatureMatrix {
            rows: Vec::new(),
            values: DMatrix::zeros(0, 0),
        };
    }

    let bounds: Vec<(f64, f64)> = (0..selected.len())
        .map(|col| {
            let stats = ColumnStats::from_values(raw.iter().map(|r| r[col]));
            let min = stats.min().unwrap_or(0.0);
            let range = stats.max().unwrap_or(min) - min;
            (min, if range > 0.0 { range } else { 1.0 })
        })
        .collect();
    let values = DMatrix::from_fn(raw.len(), selected.len(), |r, c| {
        let (min, range) = bounds[c];
        (raw[r][c] - min) / range
    });
    FeatureMatrix { rows, values }
}
