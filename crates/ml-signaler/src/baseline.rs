//! Rule-seeded classifier used until a trained model is wired in. The rules
//! mirror the labeling heuristics the training pipeline uses, so behavior is
//! consistent with what a freshly trained model converges toward.

use crate::{Classifier, Prediction, SignalClass, FEATURE_COUNT};

/// Feature order: [price_range, volume_ratio, rsi, trend_flag].
/// Expects unscaled inputs (identity scaler).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineClassifier;

impl Classifier for BaselineClassifier {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Prediction {
        let volume_ratio = features[1];
        let rsi = features[2];

        if rsi < 30.0 && volume_ratio > 1.5 {
            Prediction {
                class: SignalClass::Buy,
                probabilities: [0.2, 0.7, 0.1],
            }
        } else if rsi > 70.0 && volume_ratio > 1.5 {
            Prediction {
                class: SignalClass::Sell,
                probabilities: [0.2, 0.1, 0.7],
            }
        } else {
            Prediction {
                class: SignalClass::None,
                probabilities: [0.8, 0.1, 0.1],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversold_with_volume_is_buy() {
        let p = BaselineClassifier.predict(&[1.0, 2.0, 25.0, 1.0]);
        assert_eq!(p.class, SignalClass::Buy);
        assert!((p.class_probability() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn overbought_with_volume_is_sell() {
        let p = BaselineClassifier.predict(&[1.0, 1.8, 75.0, 0.0]);
        assert_eq!(p.class, SignalClass::Sell);
    }

    #[test]
    fn rsi_extreme_without_volume_is_none() {
        let p = BaselineClassifier.predict(&[1.0, 1.0, 25.0, 1.0]);
        assert_eq!(p.class, SignalClass::None);
    }

    #[test]
    fn neutral_market_is_none() {
        let p = BaselineClassifier.predict(&[1.0, 1.0, 50.0, 0.0]);
        assert_eq!(p.class, SignalClass::None);
    }
}
