//! Bottleneck autoencoder trained with Adam on the full feature matrix.
//!
//! Layout: `n → hidden → latent → hidden → n`, ReLU after every layer but
//! the last. Every pass works on the whole batch at once, one sample per
//! matrix row.

use std::time::Instant;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    anomaly::{
        AnomalyDetector, AnomalyOutcome, COMPUTE_DEVICE, ModelStats, features::prepare_features,
    },
    config::AnomalyConfig,
    dataset::Dataset,
    result_set::ResultSet,
    stats::ColumnStats,
};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

#[derive(Debug, Clone)]
struct Dense {
    /// `inputs × outputs`
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    relu: bool,
}

impl Dense {
    /// Uniform initialisation in `±1/sqrt(fan_in)`, for weights and bias.
    fn new(inputs: usize, outputs: usize, relu: bool, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (inputs as f64).sqrt();
        Self {
            weights: DMatrix::from_fn(inputs, outputs, |_, _| rng.random_range(-bound..=bound)),
            bias: DVector::from_fn(outputs, |_, _| rng.random_range(-bound..=bound)),
            relu,
        }
    }

    /// Returns the activation and the pre-activation.
    fn forward(&self, input: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut pre = input * &self.weights;
        for (mut column, bias) in pre.column_iter_mut().zip(self.bias.iter()) {
            column.add_scalar_mut(*bias);
        }
        let out = if self.relu {
            pre.map(|v| v.max(0.0))
        } else {
            pre.clone()
        };
        (out, pre)
    }
}

struct LayerGradients {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
}

#[derive(Debug, Clone)]
struct Moments {
    first: Vec<f64>,
    second: Vec<f64>,
}

impl Moments {
    fn new(len: usize) -> Self {
        Self {
            first: vec![0.0; len],
            second: vec![0.0; len],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    step: i32,
    moments: Vec<(Moments, Moments)>,
}

impl Adam {
    pub fn for_model(model: &Autoencoder, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            step: 0,
            moments: model
                .layers
                .iter()
                .map(|l| (Moments::new(l.weights.len()), Moments::new(l.bias.len())))
                .collect(),
        }
    }

    fn update(&mut self, layers: &mut [Dense], gradients: &[LayerGradients]) {
        self.step += 1;
        let (learning_rate, step) = (self.learning_rate, self.step);
        for ((layer, grads), (weight_moments, bias_moments)) in layers
            .iter_mut()
            .zip(gradients)
            .zip(self.moments.iter_mut())
        {
            adam_update(
                layer.weights.as_mut_slice(),
                grads.weights.as_slice(),
                weight_moments,
                learning_rate,
                step,
            );
            adam_update(
                layer.bias.as_mut_slice(),
                grads.bias.as_slice(),
                bias_moments,
                learning_rate,
                step,
            );
        }
    }
}

fn adam_update(params: &mut [f64], grads: &[f64], moments: &mut Moments, learning_rate: f64, step: i32) {
    let correction1 = 1.0 - BETA1.powi(step);
    let correction2 = 1.0 - BETA2.powi(step);
    for (((param, grad), m), v) in params
        .iter_mut()
        .zip(grads)
        .zip(moments.first.iter_mut())
        .zip(moments.second.iter_mut())
    {
        *m = BETA1 * *m + (1.0 - BETA1) * grad;
        *v = BETA2 * *v + (1.0 - BETA2) * grad * grad;
        let m_hat = *m / correction1;
        let v_hat = *v / correction2;
        *param -= learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
    }
}

#[derive(Debug, Clone)]
pub struct Autoencoder {
    layers: Vec<Dense>,
}

impl Autoencoder {
    pub fn new(inputs: usize, hidden: usize, latent: usize, rng: &mut StdRng) -> Self {
        Self {
            layers: vec![
                Dense::new(inputs, hidden, true, rng),
                Dense::new(hidden, latent, true, rng),
                Dense::new(latent, hidden, true, rng),
                Dense::new(hidden, inputs, false, rng),
            ],
        }
    }

    pub fn reconstruct(&self, input: &DMatrix<f64>) -> DMatrix<f64> {
        self.layers
            .iter()
            .fold(input.clone(), |activation, layer| layer.forward(&activation).0)
    }

    /// One full-batch optimisation step on mean squared reconstruction
    /// error. Returns the loss before the update.
    pub fn train_step(&mut self, input: &DMatrix<f64>, optimizer: &mut Adam) -> f64 {
        let (loss, gradients) = self.backward(input);
        optimizer.update(&mut self.layers, &gradients);
        loss
    }

    /// Loss and per-layer gradients for the whole batch.
    fn backward(&self, input: &DMatrix<f64>) -> (f64, Vec<LayerGradients>) {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut activation = input.clone();
        for layer in &self.layers {
            let (out, pre) = layer.forward(&activation);
            caches.push((activation, pre));
            activation = out;
        }

        let elements = input.len().max(1) as f64;
        let residual = &activation - input;
        let loss = residual.norm_squared() / elements;
        let mut grad = residual * (2.0 / elements);

        let mut gradients = Vec::with_capacity(self.layers.len());
        for (layer, (layer_input, pre)) in self.layers.iter().zip(&caches).rev() {
            if layer.relu {
                grad = grad.zip_map(pre, |g, z| if z > 0.0 { g } else { 0.0 });
            }
            gradients.push(LayerGradients {
                weights: layer_input.tr_mul(&grad),
                bias: grad.row_sum().transpose(),
            });
            grad = &grad * layer.weights.transpose();
        }
        gradients.reverse();
        (loss, gradients)
    }

    /// Mean squared reconstruction error of every row.
    pub fn reconstruction_errors(&self, input: &DMatrix<f64>) -> Vec<f64> {
        let cols = input.ncols().max(1) as f64;
        (self.reconstruct(input) - input)
            .row_iter()
            .map(|row| row.norm_squared() / cols)
            .collect()
    }
}

/// Model-backed anomaly detection over the source's numeric profile.
#[derive(Debug, Clone)]
pub struct AutoencoderDetector {
    config: AnomalyConfig,
}

impl AutoencoderDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }
}

impl AnomalyDetector for AutoencoderDetector {
    fn name(&self) -> &'static str {
        "autoencoder"
    }

    fn detect(&self, source: &Dataset, columns: &[String]) -> AnomalyOutcome {
        let started = Instant::now();
        let features = prepare_features(source, columns);
        if features.is_empty() {
            warn!("No complete numeric rows to train the anomaly model on");
            return AnomalyOutcome::Completed {
                anomalies: ResultSet::from_dataset(&source.take_rows(&[])),
                stats: ModelStats::untrained(started.elapsed().as_secs_f64()),
            };
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut model = Autoencoder::new(
            features.values.ncols(),
            self.config.hidden_units,
            self.config.latent_units,
            &mut rng,
        );
        let mut optimizer = Adam::for_model(&model, self.config.learning_rate);
        let mut loss = f64::NAN;
        for epoch in 0..self.config.epochs {
            loss = model.train_step(&features.values, &mut optimizer);
            if epoch % 25 == 0 {
                debug!("Epoch {epoch}: reconstruction loss {loss:.6}");
            }
        }

        let errors = model.reconstruction_errors(&features.values);
        let error_stats = ColumnStats::from_values(errors.iter().copied());
        let threshold = match (error_stats.mean(), error_stats.std_dev(1)) {
            (Some(mean), Some(std_dev)) => Some(mean + self.config.threshold_sigma * std_dev),
            _ => None,
        };
        let flagged: Vec<usize> = match threshold {
            Some(threshold) => errors
                .iter()
                .zip(&features.rows)
                .filter(|(error, _)| **error > threshold)
                .map(|(_, row)| *row)
                .collect(),
            None => Vec::new(),
        };

        let scored_rows = features.rows.len();
        let stats = ModelStats {
            duration_secs: started.elapsed().as_secs_f64(),
            epochs: self.config.epochs,
            scored_rows,
            anomaly_count: flagged.len(),
            anomaly_ratio: flagged.len() as f64 / scored_rows as f64,
            threshold,
            final_loss: loss.is_finite().then_some(loss),
            device: COMPUTE_DEVICE,
        };
        info!(
            "Anomaly model scored {} row(s), flagged {} in {:.2}s",
            scored_rows, stats.anomaly_count, stats.duration_secs
        );
        AnomalyOutcome::Completed {
            anomalies: ResultSet::from_dataset(&source.take_rows(&flagged)),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> DMatrix<f64> {
        DMatrix::from_fn(24, 3, |r, c| ((r * 7 + c * 3) % 11) as f64 / 10.0)
    }

    fn loss(model: &Autoencoder, input: &DMatrix<f64>) -> f64 {
        model
            .reconstruction_errors(input)
            .iter()
            .sum::<f64>()
            / input.nrows() as f64
    }

    #[test]
    fn analytic_gradients_match_finite_differences() {
        let input = sample_matrix();
        let mut rng = StdRng::seed_from_u64(7);
        let model = Autoencoder::new(3, 5, 2, &mut rng);
        let (base_loss, gradients) = model.backward(&input);
        assert!((base_loss - loss(&model, &input)).abs() < 1e-12);

        let h = 1e-6;
        for (layer_idx, grads) in gradients.iter().enumerate() {
            for param_idx in [0, grads.weights.len() - 1] {
                let mut plus = model.clone();
                plus.layers[layer_idx].weights.as_mut_slice()[param_idx] += h;
                let mut minus = model.clone();
                minus.layers[layer_idx].weights.as_mut_slice()[param_idx] -= h;
                let numeric = (loss(&plus, &input) - loss(&minus, &input)) / (2.0 * h);
                let analytic = grads.weights.as_slice()[param_idx];
                assert!(
                    (numeric - analytic).abs() < 1e-5,
                    "layer {layer_idx} weight {param_idx}: {numeric} vs {analytic}"
                );
            }
        }
    }

    #[test]
    fn training_reduces_reconstruction_loss() {
        let input = sample_matrix();
        let mut rng = StdRng::seed_from_u64(42);
        let mut model = Autoencoder::new(3, 32, 16, &mut rng);
        let mut optimizer = Adam::for_model(&model, 1e-2);
        let first = model.train_step(&input, &mut optimizer);
        for _ in 0..200 {
            model.train_step(&input, &mut optimizer);
        }
        assert!(loss(&model, &input) < first);
    }
}
