//! Technical indicators and their per-series cache.

pub mod cache;
pub mod library;

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::common::constant::OverlayKind;
use crate::common::object::Series;

pub use cache::IndicatorCache;
pub use library::{BollingerOutput, MacdOutput, StochasticOutput};

/// Name and parameter record of one indicator request.
///
/// Floating parameters compare by bit pattern, so the key can live in a hash
/// map.
#[derive(Debug, Clone, Copy)]
pub enum IndicatorKey {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Obv,
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, std_dev: f64 },
    Atr { period: usize },
    Stochastic { k_period: usize, d_period: usize },
}

impl IndicatorKey {
    pub const fn sma(period: usize) -> Self {
        IndicatorKey::Sma { period }
    }

    pub const fn ema(period: usize) -> Self {
        IndicatorKey::Ema { period }
    }

    pub const fn rsi(period: usize) -> Self {
        IndicatorKey::Rsi { period }
    }

    /// Resolve a key from a name and a positional parameter list.
    ///
    /// Missing parameters fall back to the conventional defaults. Unknown
    /// names and zero periods return `None`.
    pub fn parse(name: &str, params: &[f64]) -> Option<Self> {
        let period = |ix: usize, default: usize| -> Option<usize> {
            let value = params.get(ix).copied().unwrap_or(default as f64);
            if value.is_finite() && value >= 1.0 {
                Some(value as usize)
            } else {
                None
            }
        };

        let key = match name.to_ascii_lowercase().as_str() {
            "sma" => IndicatorKey::Sma { period: period(0, 20)? },
            "ema" => IndicatorKey::Ema { period: period(0, 20)? },
            "rsi" => IndicatorKey::Rsi { period: period(0, 14)? },
            "obv" => IndicatorKey::Obv,
            "macd" => IndicatorKey::Macd {
                fast: period(0, 12)?,
                slow: period(1, 26)?,
                signal: period(2, 9)?,
            },
            "bollinger" | "bb" => IndicatorKey::Bollinger {
                period: period(0, 20)?,
                std_dev: params.get(1).copied().filter(|v| v.is_finite()).unwrap_or(2.0),
            },
            "atr" => IndicatorKey::Atr { period: period(0, 14)? },
            "stochastic" | "stoch" => IndicatorKey::Stochastic {
                k_period: period(0, 14)?,
                d_period: period(1, 3)?,
            },
            _ => return None,
        };
        Some(key)
    }

    /// Indicator name without parameters
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKey::Sma { .. } => "sma",
            IndicatorKey::Ema { .. } => "ema",
            IndicatorKey::Rsi { .. } => "rsi",
            IndicatorKey::Obv => "obv",
            IndicatorKey::Macd { .. } => "macd",
            IndicatorKey::Bollinger { .. } => "bollinger",
            IndicatorKey::Atr { .. } => "atr",
            IndicatorKey::Stochastic { .. } => "stochastic",
        }
    }

    /// Compute this indicator over a whole series
    pub fn compute(&self, series: &Series) -> IndicatorOutput {
        match *self {
            IndicatorKey::Sma { period } => IndicatorOutput::Line(library::sma(&series.closes(), period)),
            IndicatorKey::Ema { period } => IndicatorOutput::Line(library::ema(&series.closes(), period)),
            IndicatorKey::Rsi { period } => IndicatorOutput::Line(library::rsi(&series.closes(), period)),
            IndicatorKey::Obv => IndicatorOutput::Line(library::obv(&series.closes(), &series.volumes())),
            IndicatorKey::Macd { fast, slow, signal } => {
                IndicatorOutput::Macd(library::macd(&series.closes(), fast, slow, signal))
            }
            IndicatorKey::Bollinger { period, std_dev } => {
                IndicatorOutput::Bands(library::bollinger(&series.closes(), period, std_dev))
            }
            IndicatorKey::Atr { period } => IndicatorOutput::Line(library::atr(
                &series.highs(),
                &series.lows(),
                &series.closes(),
                period,
            )),
            IndicatorKey::Stochastic { k_period, d_period } => IndicatorOutput::Stochastic(
                library::stochastic(&series.highs(), &series.lows(), &series.closes(), k_period, d_period),
            ),
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            IndicatorKey::Sma { .. } => 0,
            IndicatorKey::Ema { .. } => 1,
            IndicatorKey::Rsi { .. } => 2,
            IndicatorKey::Obv => 3,
            IndicatorKey::Macd { .. } => 4,
            IndicatorKey::Bollinger { .. } => 5,
            IndicatorKey::Atr { .. } => 6,
            IndicatorKey::Stochastic { .. } => 7,
        }
    }
}

impl PartialEq for IndicatorKey {
    fn eq(&self, other: &Self) -> bool {
        use IndicatorKey::*;
        match (self, other) {
            (Sma { period: a }, Sma { period: b })
            | (Ema { period: a }, Ema { period: b })
            | (Rsi { period: a }, Rsi { period: b })
            | (Atr { period: a }, Atr { period: b }) => a == b,
            (Obv, Obv) => true,
            (
                Macd { fast: f1, slow: s1, signal: g1 },
                Macd { fast: f2, slow: s2, signal: g2 },
            ) => f1 == f2 && s1 == s2 && g1 == g2,
            (
                Bollinger { period: p1, std_dev: d1 },
                Bollinger { period: p2, std_dev: d2 },
            ) => p1 == p2 && d1.to_bits() == d2.to_bits(),
            (
                Stochastic { k_period: k1, d_period: d1 },
                Stochastic { k_period: k2, d_period: d2 },
            ) => k1 == k2 && d1 == d2,
            _ => false,
        }
    }
}

impl Eq for IndicatorKey {}

impl Hash for IndicatorKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match *self {
            IndicatorKey::Sma { period }
            | IndicatorKey::Ema { period }
            | IndicatorKey::Rsi { period }
            | IndicatorKey::Atr { period } => period.hash(state),
            IndicatorKey::Obv => {}
            IndicatorKey::Macd { fast, slow, signal } => {
                fast.hash(state);
                slow.hash(state);
                signal.hash(state);
            }
            IndicatorKey::Bollinger { period, std_dev } => {
                period.hash(state);
                std_dev.to_bits().hash(state);
            }
            IndicatorKey::Stochastic { k_period, d_period } => {
                k_period.hash(state);
                d_period.hash(state);
            }
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IndicatorKey::Sma { period } => write!(f, "SMA({})", period),
            IndicatorKey::Ema { period } => write!(f, "EMA({})", period),
            IndicatorKey::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorKey::Obv => write!(f, "OBV"),
            IndicatorKey::Macd { fast, slow, signal } => write!(f, "MACD({},{},{})", fast, slow, signal),
            IndicatorKey::Bollinger { period, std_dev } => write!(f, "BB({},{})", period, std_dev),
            IndicatorKey::Atr { period } => write!(f, "ATR({})", period),
            IndicatorKey::Stochastic { k_period, d_period } => write!(f, "STOCH({},{})", k_period, d_period),
        }
    }
}

impl From<OverlayKind> for IndicatorKey {
    fn from(kind: OverlayKind) -> Self {
        match kind {
            OverlayKind::Sma20 => IndicatorKey::sma(20),
            OverlayKind::Sma50 => IndicatorKey::sma(50),
            OverlayKind::Sma200 => IndicatorKey::sma(200),
            OverlayKind::Ema9 => IndicatorKey::ema(9),
            OverlayKind::Ema21 => IndicatorKey::ema(21),
            OverlayKind::Bollinger => IndicatorKey::Bollinger {
                period: 20,
                std_dev: 2.0,
            },
        }
    }
}

/// Computed indicator values aligned with the series
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Line(Vec<f64>),
    Bands(BollingerOutput),
    Macd(MacdOutput),
    Stochastic(StochasticOutput),
}

impl IndicatorOutput {
    /// Single line of a line output
    pub fn line(&self) -> Option<&[f64]> {
        match self {
            IndicatorOutput::Line(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Every line held by this output
    pub fn lines(&self) -> Vec<&[f64]> {
        match self {
            IndicatorOutput::Line(values) => vec![values.as_slice()],
            IndicatorOutput::Bands(b) => vec![b.upper.as_slice(), b.middle.as_slice(), b.lower.as_slice()],
            IndicatorOutput::Macd(m) => vec![m.macd.as_slice(), m.signal.as_slice(), m.histogram.as_slice()],
            IndicatorOutput::Stochastic(s) => vec![s.k.as_slice(), s.d.as_slice()],
        }
    }

    /// Value of a line output at an index, `None` when undefined
    pub fn value_at(&self, ix: usize) -> Option<f64> {
        self.line()?.get(ix).copied().filter(|v| !v.is_nan())
    }

    /// Min/max over all lines within an inclusive index range, skipping NaN
    pub fn range(&self, min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;

        for line in self.lines() {
            if line.is_empty() || min_ix >= line.len() {
                continue;
            }
            let end = max_ix.min(line.len() - 1);
            for &v in line[min_ix..=end].iter().filter(|v| !v.is_nan()) {
                low = low.min(v);
                high = high.max(v);
            }
        }

        if low.is_finite() && high.is_finite() {
            Some((low, high))
        } else {
            None
        }
    }
}

/// Indicator readings at one index, reported with hover events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub ema9: Option<f64>,
    pub ema21: Option<f64>,
    pub rsi14: Option<f64>,
}

impl IndicatorSnapshot {
    /// Keys read by a snapshot
    pub fn keys() -> [IndicatorKey; 6] {
        [
            IndicatorKey::sma(20),
            IndicatorKey::sma(50),
            IndicatorKey::sma(200),
            IndicatorKey::ema(9),
            IndicatorKey::ema(21),
            IndicatorKey::rsi(14),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_parse() {
        assert_eq!(IndicatorKey::parse("SMA", &[50.0]), Some(IndicatorKey::sma(50)));
        assert_eq!(IndicatorKey::parse("rsi", &[]), Some(IndicatorKey::rsi(14)));
        assert_eq!(
            IndicatorKey::parse("macd", &[8.0]),
            Some(IndicatorKey::Macd { fast: 8, slow: 26, signal: 9 })
        );
        assert_eq!(IndicatorKey::parse("vwap", &[]), None);
        assert_eq!(IndicatorKey::parse("sma", &[0.0]), None);
    }

    #[test]
    fn test_key_float_params_hash_bitwise() {
        let mut set = HashSet::new();
        set.insert(IndicatorKey::Bollinger { period: 20, std_dev: 2.0 });
        set.insert(IndicatorKey::Bollinger { period: 20, std_dev: 2.0 });
        set.insert(IndicatorKey::Bollinger { period: 20, std_dev: 2.5 });
        set.insert(IndicatorKey::sma(20));
        set.insert(IndicatorKey::ema(20));
        assert_eq!(set.len(), 4);
        assert_eq!(IndicatorKey::from(OverlayKind::Bollinger).to_string(), "BB(20,2)");
    }

    #[test]
    fn test_output_range_skips_nan() {
        let output = IndicatorOutput::Bands(BollingerOutput {
            upper: vec![f64::NAN, 12.0, 13.0],
            middle: vec![f64::NAN, 10.0, 11.0],
            lower: vec![f64::NAN, 8.0, 9.0],
        });
        assert_eq!(output.range(0, 2), Some((8.0, 13.0)));
        assert_eq!(output.range(0, 0), None);
        assert_eq!(output.range(5, 9), None);
        assert_eq!(output.value_at(1), None);

        let line = IndicatorOutput::Line(vec![f64::NAN, 3.0]);
        assert_eq!(line.value_at(0), None);
        assert_eq!(line.value_at(1), Some(3.0));
    }
}
