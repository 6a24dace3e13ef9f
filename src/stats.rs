//! Running column statistics shared by the z-score detector and the
//! anomaly model's scaler.

/// Smallest standard deviation treated as non-zero variance.
pub const MIN_STD_DEV: f64 = 1e-12;

#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut stats = Self::default();
        for value in values {
            stats.add_value(value);
        }
        stats
    }

    pub fn add_value(&mut self, value: f64) {
        // Welford's online update keeps the variance stable for large values.
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// False for empty and constant columns.
    pub fn has_spread(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min < max)
    }

    /// Standard deviation with `ddof` delta degrees of freedom: 0 for the
    /// population form, 1 for the sample form. `None` when undefined.
    pub fn std_dev(&self, ddof: usize) -> Option<f64> {
        if self.count <= ddof {
            return None;
        }
        let variance = self.m2 / (self.count - ddof) as f64;
        Some(variance.max(0.0).sqrt())
    }
}

/// Z-score of `value`, or `None` when the column has no usable spread.
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> Option<f64> {
    if std_dev.is_finite() && std_dev > MIN_STD_DEV {
        Some((value - mean) / std_dev)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_and_sample_std_dev() {
        let stats = ColumnStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean().unwrap() - 5.0).abs() < 1e-12);
        assert!((stats.std_dev(0).unwrap() - 2.0).abs() < 1e-12);
        assert!((stats.std_dev(1).unwrap() - 2.138_089_935).abs() < 1e-6);
        assert_eq!(stats.min(), Some(2.0));
        assert_eq!(stats.max(), Some(9.0));
    }

    #[test]
    fn std_dev_requires_enough_values() {
        let stats = ColumnStats::from_values([3.0]);
        assert_eq!(stats.std_dev(1), None);
        assert_eq!(stats.std_dev(0), Some(0.0));
        assert_eq!(ColumnStats::default().mean(), None);
    }

    #[test]
    fn constant_column_has_no_spread() {
        let stats = ColumnStats::from_values(std::iter::repeat_n(0.1, 50));
        assert!(!stats.has_spread());
        assert!(ColumnStats::from_values([0.1, 0.2]).has_spread());
    }

    #[test]
    fn zero_spread_has_no_z_score() {
        assert_eq!(z_score(5.0, 5.0, 0.0), None);
        assert_eq!(z_score(7.0, 5.0, 1.0), Some(2.0));
    }
}
