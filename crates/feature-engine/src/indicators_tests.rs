#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use chrono::Utc;
    use engine_core::Bar;

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn sample_bars() -> Vec<Bar> {
        let prices = vec![
            (100.0, 102.0, 99.0, 101.0),
            (101.0, 103.0, 100.0, 102.0),
            (102.0, 104.0, 101.0, 103.0),
            (103.0, 105.0, 102.0, 104.0),
            (104.0, 106.0, 103.0, 105.0),
            (105.0, 107.0, 104.0, 106.0),
            (106.0, 108.0, 105.0, 107.0),
            (107.0, 109.0, 106.0, 108.0),
            (108.0, 110.0, 107.0, 109.0),
            (109.0, 111.0, 108.0, 110.0),
            (110.0, 112.0, 109.0, 111.0),
            (111.0, 113.0, 110.0, 112.0),
            (112.0, 114.0, 111.0, 113.0),
            (113.0, 115.0, 112.0, 114.0),
            (114.0, 116.0, 113.0, 115.0),
            (115.0, 117.0, 114.0, 116.0),
        ];

        prices
            .into_iter()
            .enumerate()
            .map(|(i, (open, high, low, close))| Bar {
                open_time: Utc::now() - chrono::Duration::minutes(5 * (16 - i as i64)),
                open,
                high,
                low,
                close,
                tick_volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001);
        assert!((result[1] - 3.0).abs() < 0.001);
        assert!((result[2] - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        assert!(sma(&data, 5).is_empty());
    }

    #[test]
    fn test_ema_starts_at_seed_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        let first_sma = (22.0 + 24.0 + 23.0) / 3.0;
        assert!((result[0] - first_sma).abs() < 0.01);
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        assert!(ema(&data, 5).is_empty());
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_bounds() {
        let result = rsi(&sample_prices(), 14);

        assert!(!result.is_empty());
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let data = vec![1.0, 2.0, 3.0];
        assert!(rsi(&data, 14).is_empty());
    }

    #[test]
    fn test_rsi_pure_uptrend_is_100() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&uptrend, 14);

        assert_eq!(*result.last().unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_pure_downtrend_is_0() {
        let downtrend: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&downtrend, 14);

        assert!((result.last().unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_macd_basic() {
        let mut prices = sample_prices();
        prices.extend(sample_prices());
        let result = macd(&prices, 12, 26, 9);

        assert!(!result.macd_line.is_empty());
        assert!(!result.signal_line.is_empty());
        assert!(result.signal_line.len() <= result.macd_line.len());
    }

    #[test]
    fn test_macd_degenerate_periods() {
        let result = macd(&sample_prices(), 0, 26, 9);
        assert!(result.macd_line.is_empty());

        let result = macd(&sample_prices(), 26, 12, 9);
        assert!(result.macd_line.is_empty());
    }

    #[test]
    fn test_atr_basic() {
        let result = atr(&sample_bars(), 14);

        assert!(!result.is_empty());
        for &value in &result {
            assert!(value > 0.0);
        }
    }

    #[test]
    fn test_atr_insufficient_data() {
        let bars = sample_bars()[..5].to_vec();
        assert!(atr(&bars, 14).is_empty());
    }

    #[test]
    fn test_atr_is_mean_true_range() {
        let bars = sample_bars();
        // Constant 3-point ranges and 1-point gaps: every true range is 3.
        let result = atr(&bars, 5);
        for &value in &result {
            assert!((value - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_atr_increases_with_volatility() {
        let bars = sample_bars();
        let normal = atr(&bars, 5);

        let mut volatile = sample_bars();
        for bar in &mut volatile {
            bar.high += 10.0;
            bar.low -= 10.0;
        }
        let wide = atr(&volatile, 5);

        assert!(wide[0] > normal[0]);
    }
}
