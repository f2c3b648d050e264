use engine_core::{Bar, FeatureVector};

use crate::indicators::{atr, macd, rsi, sma};

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const ROLLING_MEAN_PERIOD: usize = 20;

/// Derives the indicator snapshot for the latest bar of a window.
///
/// Deterministic given the same window, no hidden state. Windows too short
/// for an indicator degrade that field to its neutral default (RSI 50, ATR 0,
/// volume_ratio 1) instead of failing; 20+ bars are recommended for full
/// quality.
pub fn compute_features(bars: &[Bar]) -> FeatureVector {
    let Some(last) = bars.last() else {
        return FeatureVector::default();
    };

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.tick_volume).collect();

    let price_range = if last.close != 0.0 {
        (last.high - last.low) / last.close
    } else {
        0.0
    };

    let volume_ratio = match sma(&volumes, ROLLING_MEAN_PERIOD).last() {
        Some(&mean) => {
            // A zero mean falls back to divisor 1 rather than dividing by it.
            let divisor = if mean != 0.0 { mean } else { 1.0 };
            last.tick_volume / divisor
        }
        None => 1.0,
    };

    let rsi_value = rsi(&closes, RSI_PERIOD).last().copied().unwrap_or(50.0);

    let trend_flag = match sma(&closes, ROLLING_MEAN_PERIOD).last() {
        Some(&mean) if last.close > mean => 1.0,
        Some(_) => 0.0,
        None => 0.0,
    };

    let atr_value = atr(bars, ATR_PERIOD).last().copied().unwrap_or(0.0);

    let macd_result = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd_value = macd_result.macd_line.last().copied().unwrap_or(0.0);
    let macd_signal_value = macd_result.signal_line.last().copied().unwrap_or(0.0);

    FeatureVector {
        price_range,
        volume_ratio,
        rsi: rsi_value,
        trend_flag,
        atr: atr_value,
        macd: macd_value,
        macd_signal: macd_signal_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            open_time: Utc::now(),
            open,
            high,
            low,
            close,
            tick_volume: volume,
        }
    }

    fn window(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 1.1000 + i as f64 * 0.0005;
                bar(base, base + 0.0010, base - 0.0010, base + 0.0005, 1000.0)
            })
            .collect()
    }

    #[test]
    fn empty_window_yields_neutral_defaults() {
        let fv = compute_features(&[]);
        assert_eq!(fv, FeatureVector::default());
    }

    #[test]
    fn short_window_degrades_without_failing() {
        let fv = compute_features(&window(5));
        assert_eq!(fv.rsi, 50.0);
        assert_eq!(fv.atr, 0.0);
        assert_eq!(fv.volume_ratio, 1.0);
    }

    #[test]
    fn full_window_produces_defined_indicators() {
        let fv = compute_features(&window(50));
        assert!(fv.rsi >= 0.0 && fv.rsi <= 100.0);
        assert!(fv.atr > 0.0);
        assert!((fv.volume_ratio - 1.0).abs() < 1e-9);
        // Steady uptrend: close above its rolling mean.
        assert_eq!(fv.trend_flag, 1.0);
    }

    #[test]
    fn uptrend_window_has_max_rsi() {
        // Strictly rising closes mean the loss average is zero.
        let fv = compute_features(&window(50));
        assert_eq!(fv.rsi, 100.0);
    }

    #[test]
    fn zero_volume_mean_uses_unit_divisor() {
        let mut bars = window(30);
        for b in &mut bars {
            b.tick_volume = 0.0;
        }
        let fv = compute_features(&bars);
        assert_eq!(fv.volume_ratio, 0.0);
    }

    #[test]
    fn zero_close_yields_zero_price_range() {
        let bars = vec![bar(0.0, 0.0, 0.0, 0.0, 100.0)];
        let fv = compute_features(&bars);
        assert_eq!(fv.price_range, 0.0);
    }

    #[test]
    fn deterministic_for_same_window() {
        let bars = window(60);
        assert_eq!(compute_features(&bars), compute_features(&bars));
    }
}
