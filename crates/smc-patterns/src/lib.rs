//! Rule-based structural ("SMC") signal detection over a bar window.
//!
//! Every detector here is a pure function of the window and independent of
//! the learned classifier. `detect_trend` and `detect_contrarian_trend` are
//! deliberately distinct sources with opposite conventions; they are selected
//! by configuration and never merged.

use engine_core::{Bar, Direction, Signal, SignalSource};
use feature_engine::sma;

/// Minimum window for the premium-entry detector.
pub const MIN_BARS: usize = 20;

/// Price distance under which two neighboring highs/lows count as "equal".
pub const EQUAL_LEVEL_THRESHOLD: f64 = 0.0002;

const TREND_STRENGTH_PERIOD: usize = 14;

/// Signed trend strength: percentage deviation of the last close from its
/// SMA, positive when price is above the average.
pub fn trend_strength(bars: &[Bar], period: usize) -> f64 {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let Some(&mean) = sma(&closes, period).last() else {
        return 0.0;
    };
    if mean == 0.0 {
        return 0.0;
    }
    let last = closes[closes.len() - 1];
    let strength = (last - mean).abs() / mean * 100.0;
    if last > mean {
        strength
    } else {
        -strength
    }
}

/// True when any two neighboring highs within the lookback sit within the
/// equal-level threshold of each other (liquidity clustering).
pub fn find_equal_highs(bars: &[Bar], lookback: usize, threshold: f64) -> bool {
    if bars.len() < lookback + 1 {
        return false;
    }
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let start = highs.len() - lookback;
    (start..highs.len() - 1).any(|i| (highs[i] - highs[i + 1]).abs() <= threshold)
}

/// Mirror of [`find_equal_highs`] for lows.
pub fn find_equal_lows(bars: &[Bar], lookback: usize, threshold: f64) -> bool {
    if bars.len() < lookback + 1 {
        return false;
    }
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let start = lows.len() - lookback;
    (start..lows.len() - 1).any(|i| (lows[i] - lows[i + 1]).abs() <= threshold)
}

/// Strictly increasing tick volume over the last three bars.
fn volume_trend(bars: &[Bar]) -> bool {
    let n = bars.len();
    n >= 3
        && bars[n - 1].tick_volume > bars[n - 2].tick_volume
        && bars[n - 2].tick_volume > bars[n - 3].tick_volume
}

/// Premium-zone entry detection.
///
/// Buy: the last low breaches the prior 5-bar rolling low, the close recovers
/// above that low, volume is rising and trend strength is positive. Sell is
/// the mirror against the prior 5-bar rolling high. Confidence is
/// min(70 + momentum%, 100) where momentum is the absolute 5-bar close move.
pub fn detect_premium_entry(bars: &[Bar]) -> Signal {
    if bars.len() < MIN_BARS {
        return Signal::none(SignalSource::Pattern);
    }

    let n = bars.len();
    let last = &bars[n - 1];

    let strength = trend_strength(bars, TREND_STRENGTH_PERIOD);
    let rising_volume = volume_trend(bars);

    let base = bars[n - 5].close;
    let momentum = if base != 0.0 {
        (last.close - base).abs() / base * 100.0
    } else {
        0.0
    };

    // Key levels over the five bars preceding the last one.
    let prior = &bars[n - 6..n - 1];
    let recent_high = prior.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let recent_low = prior.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    let confidence = (70.0 + momentum).min(100.0);

    if last.low < recent_low && last.close > last.low && rising_volume && strength > 0.0 {
        return Signal::new(Direction::Buy, confidence, SignalSource::Pattern);
    }

    if last.high > recent_high && last.close < last.high && rising_volume && strength < 0.0 {
        return Signal::new(Direction::Sell, confidence, SignalSource::Pattern);
    }

    Signal::none(SignalSource::Pattern)
}

/// Standalone structural confidence score (0-100), used where a confidence
/// estimate is needed without a directional premium-entry signal.
///
/// Components: volume spike 0-30, candle-size anomaly vs the 5-bar average
/// 0-40, directional-run confirmation 0-30, rate-of-change momentum 0-20,
/// capped at 100.
pub fn pattern_confidence(bars: &[Bar]) -> f64 {
    let n = bars.len();
    if n < 6 {
        return 0.0;
    }

    let mut confidence: f64 = 0.0;

    // Volume spike vs the 5-bar average.
    let vol_avg: f64 = bars[n - 5..].iter().map(|b| b.tick_volume).sum::<f64>() / 5.0;
    let last_vol = bars[n - 1].tick_volume;
    if last_vol > vol_avg * 1.5 {
        confidence += 30.0;
    } else if last_vol > vol_avg * 1.2 {
        confidence += 20.0;
    } else if last_vol > vol_avg {
        confidence += 10.0;
    }

    // Candle-size anomaly vs the average body of the four preceding bars.
    let body = |b: &Bar| (b.close - b.open).abs();
    let candle = body(&bars[n - 1]);
    let avg_candle: f64 = bars[n - 5..n - 1].iter().map(body).sum::<f64>() / 4.0;
    if candle > avg_candle * 1.5 {
        confidence += 40.0;
    } else if candle > avg_candle {
        confidence += 20.0;
    }

    // Directional-run confirmation over the last three closes.
    let rising = (n - 3..n).all(|i| bars[i].close > bars[i - 1].close);
    let falling = (n - 3..n).all(|i| bars[i].close < bars[i - 1].close);
    if rising || falling {
        confidence += 30.0;
    } else if bars[n - 1].close != bars[n - 2].close {
        confidence += 15.0;
    }

    // Rate-of-change momentum over five bars.
    let base = bars[n - 5].close;
    if base != 0.0 {
        let roc = ((bars[n - 1].close / base) - 1.0).abs() * 100.0;
        if roc > 0.5 {
            confidence += 20.0;
        } else if roc > 0.2 {
            confidence += 10.0;
        }
    }

    confidence.min(100.0)
}

/// Standard-direction trend detector: deviation of the last close from its
/// rolling mean, signed the conventional way.
pub fn detect_trend(bars: &[Bar], lookback: usize) -> Signal {
    if bars.len() < lookback || lookback == 0 {
        return Signal::none(SignalSource::Pattern);
    }

    let closes: Vec<f64> = bars[bars.len() - lookback..].iter().map(|b| b.close).collect();
    let mean = closes.iter().sum::<f64>() / closes.len() as f64;
    let current = closes[closes.len() - 1];
    if mean == 0.0 {
        return Signal::none(SignalSource::Pattern);
    }

    if current > mean {
        let confidence = ((current / mean - 1.0) * 100.0).min(100.0);
        Signal::new(Direction::Buy, confidence, SignalSource::Pattern)
    } else if current < mean {
        let confidence = ((mean / current - 1.0) * 100.0).min(100.0);
        Signal::new(Direction::Sell, confidence, SignalSource::Pattern)
    } else {
        Signal::none(SignalSource::Pattern)
    }
}

/// Counter-trend detector: a bullish close with a higher low fades to SELL,
/// a bearish close with a lower high fades to BUY, both at confidence 80.
/// This reversal is an intentional strategy variant, selectable independently
/// of [`detect_trend`].
pub fn detect_contrarian_trend(bars: &[Bar]) -> Signal {
    let n = bars.len();
    if n < 3 {
        return Signal::none(SignalSource::Pattern);
    }

    let last = &bars[n - 1];
    let prev = &bars[n - 2];

    if last.close > last.open && last.low > prev.low {
        return Signal::new(Direction::Sell, 80.0, SignalSource::Pattern);
    }

    if last.close < last.open && last.high < prev.high {
        return Signal::new(Direction::Buy, 80.0, SignalSource::Pattern);
    }

    Signal::none(SignalSource::Pattern)
}
