//! Memoized indicator results for the loaded series.

use std::collections::HashMap;
use std::rc::Rc;

use super::{IndicatorKey, IndicatorOutput, IndicatorSnapshot};
use crate::common::object::Series;

/// Cache of indicator outputs for a single series.
///
/// The whole cache is discarded when a different series is bound.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    series: Option<Rc<Series>>,
    entries: HashMap<IndicatorKey, Rc<IndicatorOutput>>,
    hits: u64,
    misses: u64,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a series. Binding the same `Rc` again keeps the entries.
    pub fn set_series(&mut self, series: Rc<Series>) {
        if let Some(current) = &self.series {
            if Rc::ptr_eq(current, &series) {
                return;
            }
        }

        if !self.entries.is_empty() {
            tracing::debug!(
                "indicator cache cleared: {} entries, {} hits, {} misses",
                self.entries.len(),
                self.hits,
                self.misses
            );
        }
        self.entries.clear();
        self.series = Some(series);
    }

    pub fn series(&self) -> Option<&Rc<Series>> {
        self.series.as_ref()
    }

    /// Drop all entries and the bound series
    pub fn clear(&mut self) {
        self.entries.clear();
        self.series = None;
    }

    /// Cached output for a key, computing it on a miss.
    ///
    /// Returns `None` when no series is bound.
    pub fn get_or_compute(&mut self, key: IndicatorKey) -> Option<Rc<IndicatorOutput>> {
        let series = self.series.as_ref()?;

        if let Some(output) = self.entries.get(&key) {
            self.hits += 1;
            return Some(Rc::clone(output));
        }

        let output = Rc::new(key.compute(series));
        self.misses += 1;
        tracing::debug!("indicator {} computed for {}", key, series.instrument());
        self.entries.insert(key, Rc::clone(&output));
        Some(output)
    }

    /// Cached output without computing
    pub fn lookup(&self, key: &IndicatorKey) -> Option<&IndicatorOutput> {
        self.entries.get(key).map(|output| output.as_ref())
    }

    /// Readings for the hover snapshot at an index
    pub fn snapshot(&mut self, ix: usize) -> IndicatorSnapshot {
        let mut value = |key: IndicatorKey| self.get_or_compute(key).and_then(|o| o.value_at(ix));

        IndicatorSnapshot {
            sma20: value(IndicatorKey::sma(20)),
            sma50: value(IndicatorKey::sma(50)),
            sma200: value(IndicatorKey::sma(200)),
            ema9: value(IndicatorKey::ema(9)),
            ema21: value(IndicatorKey::ema(21)),
            rsi14: value(IndicatorKey::rsi(14)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::datafeed::generate_sample_series;

    #[test]
    fn test_identical_requests_share_output() {
        let mut cache = IndicatorCache::new();
        assert!(cache.get_or_compute(IndicatorKey::sma(20)).is_none());

        cache.set_series(Rc::new(generate_sample_series("TEST", 100, 3)));
        let first = cache.get_or_compute(IndicatorKey::sma(20)).unwrap();
        let second = cache.get_or_compute(IndicatorKey::sma(20)).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(first.line().unwrap().len(), 100);
    }

    #[test]
    fn test_cleared_on_series_replacement() {
        let series = Rc::new(generate_sample_series("TEST", 50, 3));
        let mut cache = IndicatorCache::new();
        cache.set_series(Rc::clone(&series));
        let first = cache.get_or_compute(IndicatorKey::rsi(14)).unwrap();

        cache.set_series(Rc::clone(&series));
        assert_eq!(cache.len(), 1);

        cache.set_series(Rc::new(generate_sample_series("TEST", 50, 3)));
        assert!(cache.is_empty());
        assert!(cache.lookup(&IndicatorKey::rsi(14)).is_none());

        let second = cache.get_or_compute(IndicatorKey::rsi(14)).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_snapshot() {
        let mut cache = IndicatorCache::new();
        cache.set_series(Rc::new(generate_sample_series("TEST", 60, 9)));

        let early = cache.snapshot(5);
        assert_eq!(early.sma20, None);
        assert!(early.ema9.is_none());

        let late = cache.snapshot(59);
        assert!(late.sma20.is_some());
        assert!(late.sma50.is_some());
        assert!(late.sma200.is_none());
        assert!(late.rsi14.is_some());
        assert_eq!(cache.len(), IndicatorSnapshot::keys().len());
    }
}
