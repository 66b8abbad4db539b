//! Timeframe aggregation of daily series.

pub mod cache;

use std::collections::HashMap;
use std::rc::Rc;

use chrono::{Datelike, NaiveDate};

use crate::common::constant::Timeframe;
use crate::common::object::{Candle, Series};

pub use cache::{AggregationCache, CacheConfig};

/// Bucket key of a date for a timeframe.
///
/// Only the first ten characters (`YYYY-MM-DD`) are parsed. A date that does
/// not parse is its own bucket.
pub fn bucket_key(date: &str, timeframe: Timeframe) -> String {
    if timeframe.is_base() {
        return date.to_string();
    }

    let day = date.get(..10).unwrap_or(date);
    let Ok(parsed) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
        return date.to_string();
    };

    match timeframe {
        Timeframe::Week => {
            let week = parsed.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Timeframe::Month => format!("{}-{:02}", parsed.year(), parsed.month()),
        Timeframe::Quarter => format!("{}-Q{}", parsed.year(), (parsed.month() - 1) / 3 + 1),
        Timeframe::HalfYear => format!("{}-H{}", parsed.year(), if parsed.month() <= 6 { 1 } else { 2 }),
        Timeframe::Year => format!("{}", parsed.year()),
        Timeframe::Day | Timeframe::All => date.to_string(),
    }
}

/// Candle being accumulated for one bucket
struct BucketBuilder {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BucketBuilder {
    fn new(candle: &Candle) -> Self {
        Self {
            date: candle.date.clone(),
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
        }
    }

    fn update(&mut self, candle: &Candle) {
        self.date.clone_from(&candle.date);
        self.high = self.high.max(candle.high);
        self.low = self.low.min(candle.low);
        self.close = candle.close;
        self.volume += candle.volume;
    }

    fn build(self) -> Candle {
        Candle {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Aggregate a raw daily series into a coarser timeframe.
///
/// Base timeframes return the same `Rc`. Buckets keep the order in which they
/// first appear. Each bucket candle takes the first open, the highest high,
/// the lowest low, the last close and date, and the summed volume.
pub fn aggregate(series: &Rc<Series>, timeframe: Timeframe) -> Rc<Series> {
    if timeframe.is_base() {
        return Rc::clone(series);
    }

    let mut builders: Vec<BucketBuilder> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candle in series.candles() {
        let key = bucket_key(&candle.date, timeframe);
        match index.get(&key) {
            Some(&ix) => builders[ix].update(candle),
            None => {
                index.insert(key, builders.len());
                builders.push(BucketBuilder::new(candle));
            }
        }
    }

    let candles = builders.into_iter().map(BucketBuilder::build).collect();
    Rc::new(Series::from_ordered(series.instrument(), candles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(date: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle::new(date, open, high, low, close, volume)
    }

    #[test]
    fn test_base_timeframe_identity() {
        let series = Rc::new(Series::new("TEST", vec![candle("2024-01-01", 1.0, 2.0, 0.5, 1.5, 10.0)]));
        assert!(Rc::ptr_eq(&aggregate(&series, Timeframe::Day), &series));
        assert!(Rc::ptr_eq(&aggregate(&series, Timeframe::All), &series));
    }

    #[test]
    fn test_weekly_bucket() {
        // Monday 2024-01-08 to Friday 2024-01-12
        let highs = [10.0, 12.0, 9.0, 15.0, 11.0];
        let candles = (0..5)
            .map(|i| candle(&format!("2024-01-{:02}", 8 + i), 5.0 + i as f64, highs[i], 1.0 + i as f64, 6.0 + i as f64, 100.0))
            .collect();
        let series = Rc::new(Series::new("TEST", candles));

        let weekly = aggregate(&series, Timeframe::Week);
        assert_eq!(weekly.len(), 1);
        let bar = weekly.get(0).unwrap();
        assert_eq!(bar.open, 5.0);
        assert_eq!(bar.high, 15.0);
        assert_eq!(bar.low, 1.0);
        assert_eq!(bar.close, 10.0);
        assert_eq!(bar.volume, 500.0);
        assert_eq!(bar.date, "2024-01-12");
        assert_eq!(weekly.instrument(), "TEST");
    }

    #[test]
    fn test_bucket_keys() {
        assert_eq!(bucket_key("2024-12-30", Timeframe::Week), "2025-W01");
        assert_eq!(bucket_key("2024-05-17", Timeframe::Month), "2024-05");
        assert_eq!(bucket_key("2024-05-17", Timeframe::Quarter), "2024-Q2");
        assert_eq!(bucket_key("2024-07-01", Timeframe::HalfYear), "2024-H2");
        assert_eq!(bucket_key("2024-07-01T09:30:00", Timeframe::Year), "2024");
        assert_eq!(bucket_key("garbage", Timeframe::Month), "garbage");
        assert_eq!(bucket_key("2024-07-01", Timeframe::Day), "2024-07-01");
    }

    #[test]
    fn test_monthly_counts_and_volume_sum() {
        let candles = vec![
            candle("2024-01-30", 1.0, 2.0, 0.5, 1.5, 10.0),
            candle("2024-01-31", 1.5, 3.0, 1.0, 2.5, 20.0),
            candle("2024-02-01", 2.5, 4.0, 2.0, 3.5, 30.0),
            candle("2024-04-02", 3.5, 5.0, 3.0, 4.5, 40.0),
        ];
        let series = Rc::new(Series::new("TEST", candles));

        let monthly = aggregate(&series, Timeframe::Month);
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly.get(0).unwrap().volume, 30.0);
        assert_eq!(monthly.get(0).unwrap().high, 3.0);

        let quarterly = aggregate(&series, Timeframe::Quarter);
        assert_eq!(quarterly.len(), 2);
        assert_eq!(quarterly.get(0).unwrap().volume, 60.0);

        let yearly = aggregate(&series, Timeframe::Year);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly.get(0).unwrap().low, 0.5);
    }
}
