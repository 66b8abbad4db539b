//! Memoized timeframe aggregations per instrument.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use super::aggregate;
use crate::common::constant::Timeframe;
use crate::common::object::Series;
use crate::common::setting::Settings;

/// Sizing of the aggregation cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    /// Number of instruments kept before the least recently used is evicted
    pub max_instruments: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_instruments: 16 }
    }
}

impl CacheConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let default = Self::default();
        Self {
            max_instruments: settings
                .get_int("cache.max_instruments")
                .filter(|v| *v > 0)
                .map(|v| v as usize)
                .unwrap_or(default.max_instruments),
        }
    }
}

struct InstrumentEntry {
    raw: Rc<Series>,
    derived: HashMap<Timeframe, Rc<Series>>,
}

/// Derived series keyed by (instrument, timeframe).
///
/// Replacing an instrument's raw series drops every timeframe derived from
/// the old one.
pub struct AggregationCache {
    entries: LruCache<String, InstrumentEntry>,
}

impl AggregationCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_instruments).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Series of `raw` at `timeframe`, aggregating on first request
    pub fn get(&mut self, raw: &Rc<Series>, timeframe: Timeframe) -> Rc<Series> {
        if timeframe.is_base() {
            return Rc::clone(raw);
        }

        let instrument = raw.instrument();
        let replaced = self
            .entries
            .peek(instrument)
            .is_some_and(|entry| !Rc::ptr_eq(&entry.raw, raw));
        if replaced {
            tracing::debug!("raw series of {} replaced, dropping aggregations", instrument);
            self.entries.pop(instrument);
        }

        if !self.entries.contains(instrument) {
            let entry = InstrumentEntry {
                raw: Rc::clone(raw),
                derived: HashMap::new(),
            };
            if let Some((evicted, _)) = self.entries.push(instrument.to_string(), entry) {
                if evicted != instrument {
                    tracing::debug!("aggregation cache evicted {}", evicted);
                }
            }
        }

        let Some(entry) = self.entries.get_mut(instrument) else {
            return aggregate(raw, timeframe);
        };

        let derived = entry
            .derived
            .entry(timeframe)
            .or_insert_with(|| {
                tracing::debug!("aggregated {} to {}", instrument, timeframe);
                aggregate(raw, timeframe)
            });
        Rc::clone(derived)
    }

    /// Drop every cached timeframe of an instrument
    pub fn invalidate(&mut self, instrument: &str) {
        self.entries.pop(instrument);
    }

    pub fn contains(&self, instrument: &str, timeframe: Timeframe) -> bool {
        self.entries
            .peek(instrument)
            .is_some_and(|entry| entry.derived.contains_key(&timeframe))
    }

    /// Number of instruments held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AggregationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::datafeed::generate_sample_series;

    #[test]
    fn test_memoized_per_timeframe() {
        let raw = Rc::new(generate_sample_series("AAA", 120, 1));
        let mut cache = AggregationCache::default();

        let first = cache.get(&raw, Timeframe::Week);
        let second = cache.get(&raw, Timeframe::Week);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(cache.contains("AAA", Timeframe::Week));
        assert!(!cache.contains("AAA", Timeframe::Month));
        assert!(Rc::ptr_eq(&cache.get(&raw, Timeframe::Day), &raw));
    }

    #[test]
    fn test_replaced_raw_series_drops_derived() {
        let raw = Rc::new(generate_sample_series("AAA", 120, 1));
        let mut cache = AggregationCache::default();
        let weekly = cache.get(&raw, Timeframe::Week);
        cache.get(&raw, Timeframe::Month);

        let replacement = Rc::new(generate_sample_series("AAA", 60, 2));
        let fresh = cache.get(&replacement, Timeframe::Week);
        assert!(!Rc::ptr_eq(&weekly, &fresh));
        assert!(!cache.contains("AAA", Timeframe::Month));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_eviction() {
        let mut cache = AggregationCache::new(CacheConfig { max_instruments: 2 });
        for name in ["AAA", "BBB", "CCC"] {
            let raw = Rc::new(generate_sample_series(name, 30, 1));
            cache.get(&raw, Timeframe::Month);
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("AAA", Timeframe::Month));

        cache.invalidate("CCC");
        assert!(!cache.contains("CCC", Timeframe::Month));
        assert!(cache.contains("BBB", Timeframe::Month));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings::with_defaults();
        settings.set("cache.max_instruments", crate::common::setting::SettingValue::Int(3));
        assert_eq!(CacheConfig::from_settings(&settings).max_instruments, 3);
    }
}
