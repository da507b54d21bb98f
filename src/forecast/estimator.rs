// src/forecast/estimator.rs - Bloom-occurrence estimators (trained and rule-based)

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::training::{FeatureVector, TrainingSet, FEATURE_COUNT};

/// Probability that a bloom occurs given a waterbody/month feature vector
pub trait BloomEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn probability(&self, features: &FeatureVector) -> f64;

    /// Sample counts the estimator was fitted on; `None` for rule-based estimators
    fn training_summary(&self) -> Option<TrainingSummary> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub observed_samples: usize,
    pub synthetic_samples: usize,
}

/// Weighted rule used when no classifier could be trained
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl BloomEstimator for HeuristicEstimator {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn probability(&self, features: &FeatureVector) -> f64 {
        let score = 0.2 * features.pollution_source_count / 5.0
            + 0.2 * features.grade_rank / 9.0
            + 0.2 * features.season_factor
            + 0.2 * features.temperature_factor
            + 0.2 * features.bloom_frequency;
        score.clamp(0.0, 1.0)
    }
}

const LEARNING_RATE: f64 = 0.1;
const ITERATIONS: usize = 2000;
const L2_PENALTY: f64 = 1e-3;

/// Logistic regression on standardised features, fitted by batch gradient descent
#[derive(Debug, Clone)]
pub struct TrainedEstimator {
    means: DVector<f64>,
    scales: DVector<f64>,
    weights: DVector<f64>,
    bias: f64,
    observed_samples: usize,
    synthetic_samples: usize,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl TrainedEstimator {
    /// Returns `None` when the set is smaller than `min_samples` or holds a single class
    pub fn fit(set: &TrainingSet, min_samples: usize) -> Option<Self> {
        if set.len() < min_samples.max(2) {
            log::info!(
                "Only {} training samples (need {}), classifier not trained",
                set.len(),
                min_samples
            );
            return None;
        }
        if !set.has_both_classes() {
            log::info!("Training samples contain a single class, classifier not trained");
            return None;
        }

        let n = set.len();
        let rows: Vec<f64> = set
            .samples()
            .iter()
            .flat_map(|s| s.features.to_array())
            .collect();
        let x = DMatrix::from_row_slice(n, FEATURE_COUNT, &rows);
        let y = DVector::from_iterator(n, set.samples().iter().map(|s| if s.bloom { 1.0 } else { 0.0 }));

        let means = DVector::from_iterator(FEATURE_COUNT, x.column_iter().map(|c| c.mean()));
        let scales = DVector::from_iterator(
            FEATURE_COUNT,
            x.column_iter().zip(means.iter()).map(|(column, mean)| {
                let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
                let std = variance.sqrt();
                if std > 1e-12 {
                    std
                } else {
                    1.0
                }
            }),
        );

        let mut z = x;
        for (j, mut column) in z.column_iter_mut().enumerate() {
            column.iter_mut().for_each(|v| *v = (*v - means[j]) / scales[j]);
        }

        let mut weights: DVector<f64> = DVector::zeros(FEATURE_COUNT);
        let mut bias = 0.0_f64;
        for _ in 0..ITERATIONS {
            let logits = &z * &weights;
            let errors = DVector::from_iterator(
                n,
                logits.iter().zip(y.iter()).map(|(logit, target)| sigmoid(logit + bias) - target),
            );
            let gradient = z.transpose() * &errors / n as f64 + &weights * L2_PENALTY;
            let bias_gradient = errors.sum() / n as f64;
            weights -= gradient * LEARNING_RATE;
            bias -= bias_gradient * LEARNING_RATE;
        }

        log::info!(
            "Trained bloom classifier on {} samples ({} synthetic)",
            n,
            set.synthetic_count()
        );

        Some(Self {
            means,
            scales,
            weights,
            bias,
            observed_samples: set.observed_count(),
            synthetic_samples: set.synthetic_count(),
        })
    }

    pub fn observed_samples(&self) -> usize {
        self.observed_samples
    }

    pub fn synthetic_samples(&self) -> usize {
        self.synthetic_samples
    }
}

impl BloomEstimator for TrainedEstimator {
    fn name(&self) -> &'static str {
        "trained"
    }

    fn probability(&self, features: &FeatureVector) -> f64 {
        let logit = features
            .to_array()
            .iter()
            .enumerate()
            .map(|(j, value)| (value - self.means[j]) / self.scales[j] * self.weights[j])
            .sum::<f64>()
            + self.bias;
        sigmoid(logit)
    }

    fn training_summary(&self) -> Option<TrainingSummary> {
        Some(TrainingSummary {
            observed_samples: self.observed_samples,
            synthetic_samples: self.synthetic_samples,
        })
    }
}
