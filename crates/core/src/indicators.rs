//! Pure indicator math over raw price series. No I/O, deterministic, and
//! never aborts the pipeline: degenerate inputs resolve to documented
//! numeric defaults instead of errors.

pub const RSI_PERIOD: usize = 14;
pub const RSI_NEUTRAL: f64 = 50.0;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Wilder-style RSI over a rolling mean of gains and losses.
///
/// Needs at least `period + 1` closes; shorter or flat series return the
/// neutral 50.0. A window with gains and no losses saturates at 100.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return RSI_NEUTRAL;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - period..];

    let avg_gain: f64 = recent.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 = recent.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return RSI_NEUTRAL;
        }
        return 100.0;
    }

    let value = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    if value.is_finite() {
        round1(value)
    } else {
        RSI_NEUTRAL
    }
}

/// Percentage change between the window open and close, 2 decimals.
pub fn variation(open: f64, close: f64) -> f64 {
    if open == 0.0 {
        return 0.0;
    }
    round2((close - open) / open * 100.0)
}

/// Sample standard deviation of day-over-day percentage returns, expressed
/// as a percentage. 0 with fewer than 2 return observations.
pub fn volatility(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    round2(var.sqrt() * 100.0)
}

/// Worst peak-to-trough move within the observed window, always <= 0.
pub fn drawdown(low_min: f64, high_max: f64) -> f64 {
    if high_max == 0.0 {
        return 0.0;
    }
    round2((low_min - high_max) / high_max * 100.0)
}

/// Splits a ten-sample window at its midpoint and reports the variation
/// between the window start and the midpoint, used as the "previous
/// period" comparator. Fewer than 4 samples default to 0.
pub fn prior_period_variation(closes: &[f64]) -> f64 {
    if closes.len() < 4 {
        return 0.0;
    }
    let mid = closes.len() / 2;
    variation(closes[0], closes[mid])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_defaults_below_minimum_samples() {
        // Anything shorter than period + 1 is exactly the neutral default.
        for len in 0..=RSI_PERIOD {
            let series: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            assert_eq!(rsi(&series, RSI_PERIOD), 50.0, "len={len}");
        }
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let series = vec![10.0; 30];
        assert_eq!(rsi(&series, RSI_PERIOD), 50.0);
    }

    #[test]
    fn rsi_monotonic_rise_is_overbought() {
        let series: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let value = rsi(&series, RSI_PERIOD);
        assert!(value >= 70.0, "got {value}");
        assert!(value <= 100.0);
    }

    #[test]
    fn rsi_known_mixed_series() {
        // 10 gains of 1.0 and 4 losses of 1.0 inside the last 14 deltas:
        // avg gain 10/14, avg loss 4/14, rs = 2.5, rsi = 100 - 100/3.5.
        let mut series = vec![100.0];
        for i in 0..14 {
            let last = *series.last().unwrap();
            if i % 7 < 5 {
                series.push(last + 1.0);
            } else {
                series.push(last - 1.0);
            }
        }
        assert_eq!(rsi(&series, 14), round1(100.0 - 100.0 / 3.5));
    }

    #[test]
    fn variation_round_trips() {
        let cases = [(10.0, 12.5), (37.81, 36.02), (1.0, 1.0), (250.0, 125.0)];
        for (open, close) in cases {
            let v = variation(open, close);
            let rebuilt = open * (1.0 + v / 100.0);
            assert!((rebuilt - close).abs() < open * 0.0001, "open={open} close={close}");
        }
    }

    #[test]
    fn variation_zero_open_is_zero() {
        assert_eq!(variation(0.0, 10.0), 0.0);
    }

    #[test]
    fn volatility_needs_two_returns() {
        assert_eq!(volatility(&[]), 0.0);
        assert_eq!(volatility(&[10.0]), 0.0);
        assert_eq!(volatility(&[10.0, 11.0]), 0.0);
    }

    #[test]
    fn volatility_hand_computed() {
        // Returns: +10%, -10%. Sample std of [0.1, -0.1] = 0.1414..
        let closes = [100.0, 110.0, 99.0];
        let r1 = 0.1_f64;
        let r2 = -0.1_f64;
        let mean = (r1 + r2) / 2.0;
        let expected = (((r1 - mean).powi(2) + (r2 - mean).powi(2)) / 1.0).sqrt() * 100.0;
        assert_eq!(volatility(&closes), round2(expected));
    }

    #[test]
    fn drawdown_never_positive() {
        assert!(drawdown(90.0, 100.0) <= 0.0);
        assert!(drawdown(100.0, 100.0) <= 0.0);
        assert_eq!(drawdown(80.0, 100.0), -20.0);
        assert_eq!(drawdown(0.0, 0.0), 0.0);
    }

    #[test]
    fn prior_period_needs_four_samples() {
        assert_eq!(prior_period_variation(&[10.0, 11.0, 12.0]), 0.0);
    }

    #[test]
    fn prior_period_uses_window_midpoint() {
        // Ten samples, midpoint index 5: variation from 100.0 to 110.0.
        let closes = [100.0, 101.0, 102.0, 103.0, 104.0, 110.0, 90.0, 80.0, 70.0, 60.0];
        assert_eq!(prior_period_variation(&closes), 10.0);
    }
}
