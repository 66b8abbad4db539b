//! Basic data structures shared by the chart engine.

use serde::{Deserialize, Serialize};

use super::constant::Direction;

/// One OHLCV observation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCandle")]
pub struct Candle {
    /// Calendar day, `YYYY-MM-DD` (a trailing time part is tolerated)
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle as it arrives from JSON, before the volume clamp
#[derive(Deserialize)]
struct RawCandle {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<RawCandle> for Candle {
    fn from(raw: RawCandle) -> Self {
        Candle::new(raw.date, raw.open, raw.high, raw.low, raw.close, raw.volume)
    }
}

impl Candle {
    pub fn new(date: impl Into<String>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date: date.into(),
            open,
            high,
            low,
            close,
            volume: volume.max(0.0),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.close > self.open {
            Direction::Up
        } else if self.close < self.open {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

/// Ordered candle series for one instrument.
///
/// Index position is the addressing scheme used by the viewport, the panels
/// and the indicator cache. Consumers share a series through `Rc<Series>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    instrument: String,
    candles: Vec<Candle>,
}

impl Series {
    /// Create a series, ordering candles ascending by date.
    pub fn new(instrument: impl Into<String>, mut candles: Vec<Candle>) -> Self {
        candles.sort_by(|a, b| a.date.cmp(&b.date));
        Self {
            instrument: instrument.into(),
            candles,
        }
    }

    /// Create a series from candles that are already in order.
    pub(crate) fn from_ordered(instrument: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            instrument: instrument.into(),
            candles,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<&Candle> {
        self.candles.get(ix)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last_index(&self) -> Option<usize> {
        self.candles.len().checked_sub(1)
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Exact index of a date
    pub fn index_of_date(&self, date: &str) -> Option<usize> {
        self.candles
            .binary_search_by(|c| c.date.as_str().cmp(date))
            .ok()
    }

    /// Index of the first candle dated on or after `date`, clamped to the
    /// last candle. Aggregated candles carry the last date of their bucket,
    /// so this resolves a daily date to the bucket that contains it.
    pub fn index_at_or_after(&self, date: &str) -> Option<usize> {
        let last = self.last_index()?;
        let ix = self.candles.partition_point(|c| c.date.as_str() < date);
        Some(ix.min(last))
    }

    /// Low/high extent over an inclusive index range
    pub fn price_range(&self, min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
        let bars = self.window(min_ix, max_ix)?;
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for bar in bars {
            low = low.min(bar.low);
            high = high.max(bar.high);
        }
        Some((low, high))
    }

    /// Largest volume over an inclusive index range
    pub fn volume_max(&self, min_ix: usize, max_ix: usize) -> Option<f64> {
        let bars = self.window(min_ix, max_ix)?;
        Some(bars.iter().fold(0.0, |acc, bar| acc.max(bar.volume)))
    }

    fn window(&self, min_ix: usize, max_ix: usize) -> Option<&[Candle]> {
        let last = self.last_index()?;
        let max_ix = max_ix.min(last);
        if min_ix > max_ix {
            return None;
        }
        Some(&self.candles[min_ix..=max_ix])
    }
}

/// One row returned by the scan backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMatch {
    #[serde(alias = "ticker")]
    pub instrument: String,
    pub date: String,
    #[serde(default)]
    pub close: f64,
}
