//! In-memory memoization of loaded series.
//!
//! Keyed by `(ticker, start, end)`. Only successful loads are stored, so a
//! failed load is retried on the next request. `clear` drops every entry at
//! once; there is no per-entry invalidation.

use chrono::NaiveDate;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use stockcast_core::{CanonicalSeries, Error};
use tracing::{debug, info};

/// Identity of one load request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            start,
            end,
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Series memoization store.
#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<CacheKey, Arc<CanonicalSeries>>,
    hits: u64,
    misses: u64,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached series for `key`, without counting a hit.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<CanonicalSeries>> {
        self.entries.get(key).cloned()
    }

    /// Return the cached series, or run `load` and store its result on success.
    pub fn get_or_load<F>(&mut self, key: CacheKey, load: F) -> Result<Arc<CanonicalSeries>, Error>
    where
        F: FnOnce(&CacheKey) -> Result<CanonicalSeries, Error>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                debug!(ticker = %entry.key().ticker, "series cache hit");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                debug!(ticker = %entry.key().ticker, "series cache miss");
                let series = load(entry.key())?;
                Ok(Arc::clone(entry.insert(Arc::new(series))))
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!(dropped, "series cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcast_core::data::canonicalize::date_column;
    use stockcast_core::EmptyStage;
    use polars::prelude::*;

    fn series(ticker: &str) -> CanonicalSeries {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2);
        let df = DataFrame::new(vec![
            date_column("Date", &[d]).unwrap(),
            Column::new("Open".into(), &[1.0]),
            Column::new("Close".into(), &[1.5]),
        ])
        .unwrap();
        CanonicalSeries::from_frame(ticker, df).unwrap()
    }

    fn key(ticker: &str) -> CacheKey {
        CacheKey::new(
            ticker,
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    #[test]
    fn second_load_is_a_hit() {
        let mut cache = SeriesCache::new();
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_load(key("AAPL"), |k| {
                    calls += 1;
                    Ok(series(&k.ticker))
                })
                .unwrap();
        }
        assert_eq!(calls, 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn failures_are_not_stored() {
        let mut cache = SeriesCache::new();
        let err = cache
            .get_or_load(key("INVALID"), |k| {
                Err(Error::EmptyResult {
                    ticker: k.ticker.clone(),
                    stage: EmptyStage::Fetch,
                })
            })
            .unwrap_err();
        assert!(err.to_string().contains("INVALID"));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_forces_reload() {
        let mut cache = SeriesCache::new();
        cache.get_or_load(key("MSFT"), |k| Ok(series(&k.ticker))).unwrap();
        cache.clear();
        assert!(!cache.contains(&key("MSFT")));

        let mut reloaded = false;
        cache
            .get_or_load(key("MSFT"), |k| {
                reloaded = true;
                Ok(series(&k.ticker))
            })
            .unwrap();
        assert!(reloaded);
    }

    #[test]
    fn different_ranges_are_different_entries() {
        let mut cache = SeriesCache::new();
        let a = key("GME");
        let mut b = key("GME");
        b.end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cache.get_or_load(a.clone(), |k| Ok(series(&k.ticker))).unwrap();
        cache.get_or_load(b.clone(), |k| Ok(series(&k.ticker))).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&a).is_some() && cache.peek(&b).is_some());
    }
}
