//! Standard-score feature scaling. Parameters come from the offline
//! training run; identity scaling is used until a fitted model is loaded.

use serde::{Deserialize, Serialize};

use crate::FEATURE_COUNT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    means: [f64; FEATURE_COUNT],
    stds: [f64; FEATURE_COUNT],
}

impl FeatureScaler {
    /// Pass-through scaler (mean 0, std 1).
    pub fn identity() -> Self {
        Self {
            means: [0.0; FEATURE_COUNT],
            stds: [1.0; FEATURE_COUNT],
        }
    }

    pub fn new(means: [f64; FEATURE_COUNT], stds: [f64; FEATURE_COUNT]) -> Self {
        Self { means, stds }
    }

    /// Fit mean/std per column over row-major samples. Zero-variance
    /// columns keep a unit std so transform stays finite.
    pub fn fit(samples: &[[f64; FEATURE_COUNT]]) -> Self {
        if samples.is_empty() {
            return Self::identity();
        }
        let n = samples.len() as f64;
        let mut means = [0.0; FEATURE_COUNT];
        for row in samples {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }
        let mut stds = [0.0; FEATURE_COUNT];
        for row in samples {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Self { means, stds }
    }

    pub fn transform(&self, features: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (features[i] - self.means[i]) / self.stds[i];
        }
        out
    }
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::identity()
    }
}
