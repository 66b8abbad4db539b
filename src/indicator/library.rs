//! Indicator functions over numeric series.
//!
//! Every function returns a vector aligned 1:1 with its input. Positions where
//! the indicator is not yet defined hold `NaN`.

use ta::indicators::{Maximum, Minimum, TrueRange};
use ta::{Close, High, Low, Next};

/// Index of the first defined value
fn defined_start(data: &[f64]) -> usize {
    data.iter().position(|v| !v.is_nan()).unwrap_or(data.len())
}

/// Simple Moving Average, computed with a rolling sum.
///
/// A leading `NaN` prefix is skipped, so it composes over other indicators.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![f64::NAN; n];
    let start = defined_start(data);

    if period == 0 || n - start < period {
        return result;
    }

    let mut sum: f64 = data[start..start + period].iter().sum();
    result[start + period - 1] = sum / period as f64;

    for i in (start + period)..n {
        sum += data[i] - data[i - period];
        result[i] = sum / period as f64;
    }

    result
}

/// Exponential Moving Average seeded with the SMA of the first window.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![f64::NAN; n];
    let start = defined_start(data);

    if period == 0 || n - start < period {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = start + period - 1;
    result[seed] = data[start..=seed].iter().sum::<f64>() / period as f64;

    for i in (seed + 1)..n {
        result[i] = (data[i] - result[i - 1]) * multiplier + result[i - 1];
    }

    result
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value sits at `period`, seeded by the plain average of the first
/// `period` changes. A zero average loss yields 100.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n <= period {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let rsi_value = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let mut avg_gain = gains[1..=period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..n {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

/// On-Balance Volume. A flat close leaves the total unchanged.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len().min(volume.len());
    let mut result = vec![0.0; n];

    for i in 1..n {
        result[i] = if close[i] > close[i - 1] {
            result[i - 1] + volume[i]
        } else if close[i] < close[i - 1] {
            result[i - 1] - volume[i]
        } else {
            result[i - 1]
        };
    }

    result
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD: fast EMA minus slow EMA, signal EMA over the defined part of that line
pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdOutput {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger band lines
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bollinger Bands: SMA plus and minus `num_std` population standard deviations
pub fn bollinger(data: &[f64], period: usize, num_std: f64) -> BollingerOutput {
    let middle = sma(data, period);
    let deviation = stddev(data, period);

    let upper = middle
        .iter()
        .zip(deviation.iter())
        .map(|(m, d)| m + num_std * d)
        .collect();
    let lower = middle
        .iter()
        .zip(deviation.iter())
        .map(|(m, d)| m - num_std * d)
        .collect();

    BollingerOutput { upper, middle, lower }
}

/// Population standard deviation over a rolling window
pub fn stddev(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let means = sma(data, period);
    for i in (period - 1)..n {
        let mean = means[i];
        if mean.is_nan() {
            continue;
        }
        let window = &data[(i + 1 - period)..=i];
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        result[i] = variance.sqrt();
    }

    result
}

struct HlcItem {
    high: f64,
    low: f64,
    close: f64,
}

impl High for HlcItem {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for HlcItem {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for HlcItem {
    fn close(&self) -> f64 {
        self.close
    }
}

/// True range. The first bar uses its high-low span.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut indicator = TrueRange::new();

    (0..n)
        .map(|i| {
            indicator.next(&HlcItem {
                high: high[i],
                low: low[i],
                close: close[i],
            })
        })
        .collect()
}

/// Average True Range as the SMA of the true range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    sma(&true_range(high, low, close), period)
}

/// Highest value over the trailing window
pub fn rolling_max(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    if period == 0 || period > n {
        return vec![f64::NAN; n];
    }
    let Ok(mut indicator) = Maximum::new(period) else {
        return vec![f64::NAN; n];
    };

    data.iter()
        .enumerate()
        .map(|(i, &v)| {
            let value = indicator.next(v);
            if i + 1 >= period {
                value
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Lowest value over the trailing window
pub fn rolling_min(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    if period == 0 || period > n {
        return vec![f64::NAN; n];
    }
    let Ok(mut indicator) = Minimum::new(period) else {
        return vec![f64::NAN; n];
    };

    data.iter()
        .enumerate()
        .map(|(i, &v)| {
            let value = indicator.next(v);
            if i + 1 >= period {
                value
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Stochastic %K and %D lines
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticOutput {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Stochastic oscillator.
///
/// %K places the close inside the highest-high / lowest-low range of the
/// trailing `k_period` bars. A zero range yields the midpoint 50. %D is the
/// SMA of %K over `d_period`.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticOutput {
    let n = high.len().min(low.len()).min(close.len());
    let highest = rolling_max(&high[..n], k_period);
    let lowest = rolling_min(&low[..n], k_period);

    let k: Vec<f64> = (0..n)
        .map(|i| {
            let (hh, ll) = (highest[i], lowest[i]);
            if hh.is_nan() || ll.is_nan() {
                f64::NAN
            } else if hh - ll == 0.0 {
                50.0
            } else {
                100.0 * (close[i] - ll) / (hh - ll)
            }
        })
        .collect();
    let d = sma(&k, d_period);

    StochasticOutput { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_sma() {
        let result = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_close(result[2], 2.0);
        assert_close(result[3], 3.0);
        assert_close(result[4], 4.0);

        assert!(sma(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
        assert!(sma(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sma_skips_undefined_prefix() {
        let result = sma(&[f64::NAN, f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(result[2].is_nan());
        assert_close(result[3], 3.0);
        assert_close(result[4], 5.0);
    }

    #[test]
    fn test_ema_seed_and_smoothing() {
        let result = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(result[1].is_nan());
        assert_close(result[2], 4.0);
        // multiplier 0.5
        assert_close(result[3], 6.0);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();

        let up = rsi(&rising, 14);
        let down = rsi(&falling, 14);
        assert!(up[13].is_nan());
        assert_close(up[14], 100.0);
        assert_close(up[29], 100.0);
        assert_close(down[29], 0.0);
    }

    #[test]
    fn test_rsi_mixed_bounds() {
        let data: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let result = rsi(&data, 14);
        for v in result.iter().skip(14) {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
    }

    #[test]
    fn test_obv() {
        let result = obv(&[10.0, 11.0, 11.0, 9.0], &[5.0, 10.0, 20.0, 4.0]);
        assert_eq!(result, vec![0.0, 10.0, 10.0, 6.0]);
    }

    #[test]
    fn test_macd_alignment() {
        let data: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let out = macd(&data, 12, 26, 9);
        assert_eq!(out.macd.len(), 60);
        assert!(out.macd[24].is_nan());
        assert!(!out.macd[25].is_nan());
        assert!(out.signal[32].is_nan());
        assert!(!out.signal[33].is_nan());
        assert_close(out.histogram[40], out.macd[40] - out.signal[40]);
    }

    #[test]
    fn test_bollinger_constant_series() {
        let out = bollinger(&[5.0; 25], 20, 2.0);
        assert!(out.middle[18].is_nan());
        assert_close(out.middle[19], 5.0);
        assert_close(out.upper[24], 5.0);
        assert_close(out.lower[24], 5.0);
    }

    #[test]
    fn test_stddev_population() {
        let result = stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert_close(result[7], 2.0);
    }

    #[test]
    fn test_true_range_and_atr() {
        let high = [10.0, 12.0, 11.0];
        let low = [8.0, 9.0, 7.0];
        let close = [9.0, 11.0, 8.0];
        let tr = true_range(&high, &low, &close);
        assert_eq!(tr, vec![2.0, 3.0, 4.0]);

        let result = atr(&high, &low, &close, 2);
        assert!(result[0].is_nan());
        assert_close(result[1], 2.5);
        assert_close(result[2], 3.5);
    }

    #[test]
    fn test_rolling_extremes() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0];
        let max = rolling_max(&data, 3);
        let min = rolling_min(&data, 3);
        assert!(max[1].is_nan());
        assert_eq!(&max[2..], &[4.0, 4.0, 5.0]);
        assert_eq!(&min[2..], &[1.0, 1.0, 1.0]);
        assert!(rolling_max(&data, 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_stochastic_zero_range() {
        let flat = [10.0; 14];
        let out = stochastic(&flat, &flat, &flat, 14, 3);
        assert!(out.k[12].is_nan());
        assert_close(out.k[13], 50.0);
    }

    #[test]
    fn test_stochastic_values() {
        let high = [10.0, 12.0, 14.0, 13.0];
        let low = [8.0, 9.0, 10.0, 11.0];
        let close = [9.0, 11.0, 14.0, 11.0];
        let out = stochastic(&high, &low, &close, 3, 2);
        assert!(out.k[1].is_nan());
        assert_close(out.k[2], 100.0);
        assert_close(out.k[3], 40.0);
        assert!(out.d[2].is_nan());
        assert_close(out.d[3], 70.0);
    }

    #[test]
    fn test_oversized_period_is_undefined() {
        let data: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        assert!(rsi(&data, usize::MAX).iter().all(|v| v.is_nan()));
        assert!(rolling_max(&data, usize::MAX).iter().all(|v| v.is_nan()));
        assert!(rolling_min(&data, 31).iter().all(|v| v.is_nan()));
        assert_eq!(rolling_max(&data, 30)[29], 30.0);
    }
}
