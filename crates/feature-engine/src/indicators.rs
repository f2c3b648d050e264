use engine_core::Bar;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average (seeded with the SMA of the first `period`
/// values, then smoothed over the full series).
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }

    if data.len() < period {
        return vec![data.iter().sum::<f64>() / data.len() as f64];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());

    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;
    result.push(seed);

    for i in 1..data.len() {
        let value = (data[i] - result[i - 1]) * multiplier + result[i - 1];
        result.push(value);
    }

    result
}

/// Relative Strength Index over rolling average gain/loss. A window whose
/// average loss is zero yields 100, never NaN.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut rsi_values = Vec::with_capacity(gains.len() + 1 - period);
    for i in period - 1..gains.len() {
        let avg_gain: f64 = gains[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[i + 1 - period..=i].iter().sum::<f64>() / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
        rsi_values.push(value);
    }

    rsi_values
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
}

pub fn macd(
    data: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdResult {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || slow_period < fast_period {
        return MacdResult {
            macd_line: vec![],
            signal_line: vec![],
        };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let offset = ema_fast.len().saturating_sub(ema_slow.len());
    let mut macd_line = Vec::with_capacity(ema_slow.len());
    for i in 0..ema_slow.len() {
        macd_line.push(ema_fast[i + offset] - ema_slow[i]);
    }

    let signal_line = ema(&macd_line, signal_period);

    MacdResult {
        macd_line,
        signal_line,
    }
}

/// Average True Range: rolling mean of
/// max(high-low, |high-prev_close|, |low-prev_close|).
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return vec![];
    }

    let mut true_ranges = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high_low = bars[i].high - bars[i].low;
        let high_close = (bars[i].high - bars[i - 1].close).abs();
        let low_close = (bars[i].low - bars[i - 1].close).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    sma(&true_ranges, period)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_zero_loss_window_is_100() {
        let data: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&data, 14);
        assert!(!result.is_empty());
        for value in result {
            assert_eq!(value, 100.0);
        }
    }
}
