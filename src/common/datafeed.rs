//! Data sources feeding candle series and scan results into the engine.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::object::{Candle, ScanMatch, Series};
use super::utility::load_json_file;
use crate::error::{ChartError, Result};

/// Source of candle series by instrument
pub trait SeriesSource {
    fn load_series(&self, instrument: &str) -> Result<Series>;

    /// Instruments this source can deliver
    fn instruments(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Source of scan results
pub trait ScanSource {
    fn load_scan_matches(&self, query: &str) -> Result<Vec<ScanMatch>>;
}

/// Response shape of the ticker data endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerResponse {
    pub ticker: String,
    pub data: Vec<Candle>,
}

impl From<TickerResponse> for Series {
    fn from(resp: TickerResponse) -> Self {
        Series::new(resp.ticker, resp.data)
    }
}

/// In-memory datafeed, used for demos and tests
#[derive(Debug, Default)]
pub struct MemoryDatafeed {
    series: HashMap<String, Series>,
    matches: Vec<ScanMatch>,
}

impl MemoryDatafeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: Series) {
        self.series.insert(series.instrument().to_string(), series);
    }

    pub fn add_scan_match(&mut self, scan: ScanMatch) {
        self.matches.push(scan);
    }
}

impl SeriesSource for MemoryDatafeed {
    fn load_series(&self, instrument: &str) -> Result<Series> {
        self.series
            .get(instrument)
            .cloned()
            .ok_or_else(|| ChartError::InstrumentNotFound(instrument.to_string()))
    }

    fn instruments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ScanSource for MemoryDatafeed {
    /// Matches whose instrument contains the query, case-insensitive.
    /// An empty query returns every match.
    fn load_scan_matches(&self, query: &str) -> Result<Vec<ScanMatch>> {
        let query = query.to_uppercase();
        Ok(self
            .matches
            .iter()
            .filter(|m| query.is_empty() || m.instrument.to_uppercase().contains(&query))
            .cloned()
            .collect())
    }
}

/// Datafeed reading `{dir}/{TICKER}.json` files in the ticker response shape
#[derive(Debug, Clone)]
pub struct JsonDatafeed {
    dir: PathBuf,
}

impl JsonDatafeed {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn series_path(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{}.json", instrument.to_uppercase()))
    }
}

impl SeriesSource for JsonDatafeed {
    fn load_series(&self, instrument: &str) -> Result<Series> {
        let path = self.series_path(instrument);
        if !path.exists() {
            return Err(ChartError::InstrumentNotFound(instrument.to_string()));
        }

        let resp: TickerResponse = load_json_file(&path)?;
        let series = Series::from(resp);
        if series.is_empty() {
            return Err(ChartError::InvalidSeries(format!("{} has no candles", instrument)));
        }

        tracing::info!("loaded {} candles for {} from {}", series.len(), instrument, path.display());
        Ok(series)
    }

    fn instruments(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string())
            })
            .collect();
        names.sort();
        names
    }
}

/// Generate a random-walk daily series starting 2020-01-01.
///
/// The walk carries a small upward drift and a yearly seasonal wave. The same
/// seed always yields the same series.
pub fn generate_sample_series(instrument: &str, num_days: usize, seed: u64) -> Series {
    let mut rng = StdRng::seed_from_u64(seed);
    let start_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();

    let trend = 0.0005;
    let volatility = 0.02;
    let mut price = 100.0;
    let mut candles = Vec::with_capacity(num_days);

    for i in 0..num_days {
        let date = start_date + Duration::days(i as i64);
        let seasonal = (i as f64 * 2.0 * PI / 252.0).sin() * 0.01;

        let change = trend + volatility * (rng.random::<f64>() - 0.5) + seasonal;
        price *= 1.0 + change;

        let open = price * (1.0 + 0.005 * (rng.random::<f64>() - 0.5));
        let close = price;
        let high = open.max(close) * (1.0 + 0.01 * rng.random::<f64>());
        let low = open.min(close) * (1.0 - 0.01 * rng.random::<f64>());
        let volume = 1_000_000.0 * (0.5 + rng.random::<f64>());

        candles.push(Candle::new(date.format("%Y-%m-%d").to_string(), open, high, low, close, volume));
    }

    Series::new(instrument, candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sample_series() {
        let series = generate_sample_series("DEMO", 30, 7);
        assert_eq!(series.len(), 30);
        assert_eq!(series.get(0).unwrap().date, "2020-01-01");
        assert_eq!(series.get(29).unwrap().date, "2020-01-30");
        for c in series.candles() {
            assert!(c.high >= c.open.max(c.close));
            assert!(c.low <= c.open.min(c.close));
            assert!(c.volume >= 500_000.0);
        }

        let again = generate_sample_series("DEMO", 30, 7);
        assert_eq!(series, again);
    }

    #[test]
    fn test_memory_datafeed() {
        let mut feed = MemoryDatafeed::new();
        feed.insert(generate_sample_series("AAPL", 5, 1));
        feed.add_scan_match(ScanMatch {
            instrument: "AAPL".to_string(),
            date: "2020-01-03".to_string(),
            close: 101.0,
        });

        assert_eq!(feed.load_series("AAPL").unwrap().len(), 5);
        assert!(matches!(
            feed.load_series("MSFT"),
            Err(ChartError::InstrumentNotFound(_))
        ));
        assert_eq!(feed.load_scan_matches("aap").unwrap().len(), 1);
        assert_eq!(feed.load_scan_matches("").unwrap().len(), 1);
        assert!(feed.load_scan_matches("MSFT").unwrap().is_empty());
        assert_eq!(feed.instruments(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_json_datafeed() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{
            "ticker": "TEST",
            "data": [
                {"date": "2024-01-03", "open": 2.0, "high": 3.0, "low": 1.5, "close": 2.5, "volume": 100},
                {"date": "2024-01-02", "open": 1.0, "high": 2.0, "low": 0.5, "close": 2.0, "volume": 200}
            ]
        }"#;
        std::fs::write(dir.path().join("TEST.json"), body).unwrap();

        let feed = JsonDatafeed::new(dir.path());
        let series = feed.load_series("test").unwrap();
        assert_eq!(series.instrument(), "TEST");
        assert_eq!(series.get(0).unwrap().date, "2024-01-02");
        assert_eq!(feed.instruments(), vec!["TEST".to_string()]);
        assert!(feed.load_series("NONE").is_err());
    }

    #[test]
    fn test_json_datafeed_clamps_negative_volume() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{
            "ticker": "NEG",
            "data": [
                {"date": "2024-01-02", "open": 1.0, "high": 2.0, "low": 0.5, "close": 2.0, "volume": -300},
                {"date": "2024-01-03", "open": 2.0, "high": 3.0, "low": 1.5, "close": 2.5, "volume": -50.5}
            ]
        }"#;
        std::fs::write(dir.path().join("NEG.json"), body).unwrap();

        let series = JsonDatafeed::new(dir.path()).load_series("NEG").unwrap();
        assert!(series.candles().iter().all(|c| c.volume == 0.0));
    }

    #[test]
    fn test_scan_match_accepts_ticker_field() {
        let scan: ScanMatch =
            serde_json::from_str(r#"{"ticker": "NVDA", "date": "2024-03-01", "close": 820.5}"#).unwrap();
        assert_eq!(scan.instrument, "NVDA");
    }
}
