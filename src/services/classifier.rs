use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding::{FeatureVector, FEATURE_COUNT};

/// Error types for classifier training
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("Cannot train on an empty sample set")]
    EmptyTrainingSet,
    #[error("Kernel bandwidth must be a positive finite number, got {0}")]
    InvalidBandwidth(f64),
    #[error("Training sample for '{0}' contains a non-finite feature")]
    NonFiniteFeature(String),
    #[error("Training sample for '{label}' could not be encoded: {reason}")]
    Encoding { label: String, reason: String },
    #[error("Fitted classifier is malformed: {0}")]
    Malformed(String),
}

/// Relative tolerance when comparing stored samples against re-encoded ones
const SAMPLE_TOLERANCE: f64 = 1e-9;

/// Distance-weighted nearest-neighbour classifier with a Gaussian kernel
///
/// Features are standardised with the training mean and population standard
/// deviation. A query's weight towards each training sample is
/// `exp(-(d² - min d²) / (2h²))`; class probabilities are the normalised sums
/// of those weights. Shifting by the minimum distance keeps the closest sample
/// at weight 1, so the distribution never collapses to all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelClassifier {
    classes: Vec<String>,
    sample_classes: Vec<usize>,
    samples: Vec<FeatureVector>,
    means: FeatureVector,
    scales: FeatureVector,
    bandwidth: f64,
}

impl KernelClassifier {
    /// Fits the classifier on labelled samples
    ///
    /// Class order is the order in which labels first appear in `samples`.
    pub fn fit(samples: &[(String, FeatureVector)], bandwidth: f64) -> Result<Self, TrainingError> {
        if samples.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(TrainingError::InvalidBandwidth(bandwidth));
        }
        if let Some((label, _)) = samples
            .iter()
            .find(|(_, features)| features.iter().any(|v| !v.is_finite()))
        {
            return Err(TrainingError::NonFiniteFeature(label.clone()));
        }

        let mut classes: Vec<String> = Vec::new();
        let mut sample_classes = Vec::with_capacity(samples.len());
        for (label, _) in samples {
            let class = match classes.iter().position(|c| c == label) {
                Some(existing) => existing,
                None => {
                    classes.push(label.clone());
                    classes.len() - 1
                }
            };
            sample_classes.push(class);
        }

        let n = samples.len() as f64;
        let mut means = [0.0; FEATURE_COUNT];
        for (_, features) in samples {
            for (mean, value) in means.iter_mut().zip(features) {
                *mean += value / n;
            }
        }

        let mut scales = [0.0; FEATURE_COUNT];
        for (_, features) in samples {
            for j in 0..FEATURE_COUNT {
                scales[j] += (features[j] - means[j]).powi(2) / n;
            }
        }
        for scale in scales.iter_mut() {
            *scale = scale.sqrt();
            // Constant feature: leave it unscaled
            if *scale <= f64::EPSILON {
                *scale = 1.0;
            }
        }

        let standardised = samples
            .iter()
            .map(|(_, features)| standardise(features, &means, &scales))
            .collect();

        Ok(Self {
            classes,
            sample_classes,
            samples: standardised,
            means,
            scales,
            bandwidth,
        })
    }

    /// Class labels, in the order used by [`predict_proba`](Self::predict_proba)
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Checks the internal invariants [`fit`](Self::fit) guarantees
    ///
    /// Deserialised classifiers must pass this before
    /// [`predict_proba`](Self::predict_proba) is called.
    pub fn validate(&self) -> Result<(), TrainingError> {
        let malformed = |reason: &str| -> Result<(), TrainingError> {
            Err(TrainingError::Malformed(reason.to_string()))
        };

        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(TrainingError::InvalidBandwidth(self.bandwidth));
        }
        if self.classes.is_empty() || self.samples.is_empty() {
            return malformed("no classes or samples");
        }
        if self.samples.len() != self.sample_classes.len() {
            return malformed("sample and label counts differ");
        }

        let mut has_sample = vec![false; self.classes.len()];
        for &class in &self.sample_classes {
            match has_sample.get_mut(class) {
                Some(seen) => *seen = true,
                None => return malformed("sample label out of range"),
            }
        }
        if has_sample.contains(&false) {
            return malformed("class without samples");
        }

        let values_finite = self
            .samples
            .iter()
            .chain(std::iter::once(&self.means))
            .all(|features| features.iter().all(|v| v.is_finite()));
        if !values_finite {
            return malformed("non-finite mean or sample");
        }
        if !self.scales.iter().all(|s| s.is_finite() && *s > 0.0) {
            return malformed("scale must be finite and positive");
        }

        Ok(())
    }

    /// Whether this classifier was fitted on exactly `samples`, in order
    pub fn matches_samples(&self, samples: &[(String, FeatureVector)]) -> bool {
        if samples.len() != self.samples.len() {
            return false;
        }

        samples
            .iter()
            .zip(&self.samples)
            .zip(&self.sample_classes)
            .all(|(((label, features), stored), &class)| {
                let fresh = standardise(features, &self.means, &self.scales);
                self.classes.get(class) == Some(label)
                    && fresh.iter().zip(stored).all(|(a, b)| {
                        (a - b).abs() <= SAMPLE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
                    })
            })
    }

    /// Per-class probabilities for a query; always sums to 1
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let query = standardise(features, &self.means, &self.scales);

        let distances: Vec<f64> = self
            .samples
            .iter()
            .map(|sample| squared_distance(&query, sample))
            .collect();
        let nearest = distances.iter().copied().fold(f64::INFINITY, f64::min);

        let mut weights = vec![0.0; self.classes.len()];
        if !nearest.is_finite() {
            // Non-finite query: no basis for preferring any class
            weights.fill(1.0);
        } else {
            let denom = 2.0 * self.bandwidth * self.bandwidth;
            for (distance, &class) in distances.iter().zip(&self.sample_classes) {
                weights[class] += (-(distance - nearest) / denom).exp();
            }
        }

        let total: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= total);
        weights
    }
}

fn standardise(features: &FeatureVector, means: &FeatureVector, scales: &FeatureVector) -> FeatureVector {
    let mut out = [0.0; FEATURE_COUNT];
    for j in 0..FEATURE_COUNT {
        out[j] = (features[j] - means[j]) / scales[j];
    }
    out
}

fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
