//! Learned signal source: a replaceable three-class classifier plus feature
//! scaler behind a trait seam. Training happens out of band; this crate only
//! consumes inference output and applies the deterministic confidence rules.

pub mod baseline;
pub mod scaler;

pub use baseline::BaselineClassifier;
pub use scaler::FeatureScaler;

use engine_core::{Direction, FeatureVector, Signal, SignalSource};

/// Default actionability floor: below this confidence the signaler reports
/// no trade regardless of the raw class prediction.
pub const CONFIDENCE_FLOOR: f64 = 30.0;

/// Number of model inputs (price_range, volume_ratio, rsi, trend_flag).
pub const FEATURE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    None,
    Buy,
    Sell,
}

/// One inference result: the argmax class and per-class probabilities in
/// [none, buy, sell] order.
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    pub class: SignalClass,
    pub probabilities: [f64; 3],
}

impl Prediction {
    /// Probability assigned to the predicted class.
    pub fn class_probability(&self) -> f64 {
        match self.class {
            SignalClass::None => self.probabilities[0],
            SignalClass::Buy => self.probabilities[1],
            SignalClass::Sell => self.probabilities[2],
        }
    }
}

/// Injected classifier. Implementations must be deterministic for a given
/// input; retraining swaps the implementation, not this contract.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Prediction;
}

/// Wraps the injected classifier and scaler and turns predictions into
/// engine signals with the heuristic confidence boosts applied.
pub struct LearnedSignaler {
    classifier: Box<dyn Classifier>,
    scaler: FeatureScaler,
    confidence_floor: f64,
}

impl LearnedSignaler {
    pub fn new(classifier: Box<dyn Classifier>, scaler: FeatureScaler) -> Self {
        Self {
            classifier,
            scaler,
            confidence_floor: CONFIDENCE_FLOOR,
        }
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    pub fn set_floor(&mut self, floor: f64) {
        self.confidence_floor = floor;
    }

    pub fn floor(&self) -> f64 {
        self.confidence_floor
    }

    /// Classify the latest feature vector.
    ///
    /// Confidence is the predicted-class probability scaled to 0-100, then
    /// boosted +20 for a BUY at RSI < 30 or a SELL at RSI > 70, and +10 more
    /// when volume_ratio > 1.5, capped at 100. A result below the confidence
    /// floor is reported as no signal.
    pub fn evaluate(&self, features: &FeatureVector) -> Signal {
        let raw = [
            features.price_range,
            features.volume_ratio,
            features.rsi,
            features.trend_flag,
        ];
        let scaled = self.scaler.transform(&raw);
        let prediction = self.classifier.predict(&scaled);

        let direction = match prediction.class {
            SignalClass::None => return Signal::none(SignalSource::Learned),
            SignalClass::Buy => Direction::Buy,
            SignalClass::Sell => Direction::Sell,
        };

        let mut confidence = prediction.class_probability() * 100.0;

        let rsi_extreme = match direction {
            Direction::Buy => features.rsi < 30.0,
            Direction::Sell => features.rsi > 70.0,
        };
        if rsi_extreme {
            confidence += 20.0;
        }
        if features.volume_ratio > 1.5 {
            confidence += 10.0;
        }
        confidence = confidence.min(100.0);

        tracing::debug!(
            class = ?prediction.class,
            confidence = format!("{confidence:.1}"),
            rsi = format!("{:.1}", features.rsi),
            volume_ratio = format!("{:.2}", features.volume_ratio),
            "learned signal evaluated"
        );

        if confidence < self.confidence_floor {
            return Signal::none(SignalSource::Learned);
        }

        Signal::new(direction, confidence, SignalSource::Learned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier(Prediction);

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &[f64; FEATURE_COUNT]) -> Prediction {
            self.0
        }
    }

    fn signaler(class: SignalClass, probability: f64) -> LearnedSignaler {
        let mut probabilities = [0.0; 3];
        let idx = match class {
            SignalClass::None => 0,
            SignalClass::Buy => 1,
            SignalClass::Sell => 2,
        };
        probabilities[idx] = probability;
        LearnedSignaler::new(
            Box::new(FixedClassifier(Prediction {
                class,
                probabilities,
            })),
            FeatureScaler::identity(),
        )
    }

    fn features(rsi: f64, volume_ratio: f64) -> FeatureVector {
        FeatureVector {
            rsi,
            volume_ratio,
            ..FeatureVector::default()
        }
    }

    #[test]
    fn buy_with_oversold_rsi_gets_boosted() {
        let s = signaler(SignalClass::Buy, 0.5);
        let signal = s.evaluate(&features(25.0, 1.0));
        assert_eq!(signal.direction, Some(Direction::Buy));
        assert!((signal.confidence - 70.0).abs() < 1e-9);
    }

    #[test]
    fn volume_boost_stacks_on_rsi_boost() {
        let s = signaler(SignalClass::Sell, 0.5);
        let signal = s.evaluate(&features(80.0, 2.0));
        assert!((signal.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn boosted_confidence_never_exceeds_100() {
        let s = signaler(SignalClass::Buy, 0.95);
        let signal = s.evaluate(&features(10.0, 3.0));
        assert_eq!(signal.confidence, 100.0);
    }

    #[test]
    fn rsi_boost_requires_matching_direction() {
        // Overbought RSI does not boost a BUY.
        let s = signaler(SignalClass::Buy, 0.5);
        let signal = s.evaluate(&features(80.0, 1.0));
        assert!((signal.confidence - 50.0).abs() < 1e-9);
    }

    #[test]
    fn below_floor_reports_none() {
        let s = signaler(SignalClass::Buy, 0.25);
        let signal = s.evaluate(&features(50.0, 1.0));
        assert!(!signal.is_actionable());
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn none_class_is_never_actionable() {
        let s = signaler(SignalClass::None, 0.99);
        let signal = s.evaluate(&features(25.0, 2.0));
        assert!(!signal.is_actionable());
    }

    #[test]
    fn custom_floor_is_respected() {
        let s = signaler(SignalClass::Buy, 0.5).with_floor(60.0);
        let signal = s.evaluate(&features(50.0, 1.0));
        assert!(!signal.is_actionable());
    }
}
