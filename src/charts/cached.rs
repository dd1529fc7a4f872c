//! Memoizing wrapper around a price source
//!
//! Successful series are cached per `(token_id, days, time_bucket)`.
//! Failures are never cached, so a rate-limited call can be repeated
//! inside the same bucket.

use std::sync::Arc;
use std::time::Duration;

use super::source::PriceSource;
use super::types::{LookbackDays, TimeSeries};
use crate::config::{FetcherConfig, DEFAULT_CACHE_BUCKET};
use crate::error::FetchError;
use crate::utils::{BucketCache, Clock, SystemClock};
use crate::log_debug;

const MODULE: &str = "charts::cached";

type CacheKey = (String, LookbackDays);

/// Price source decorator that memoizes by time bucket
pub struct CachedFetcher<S> {
    source: S,
    cache: BucketCache<CacheKey, TimeSeries>,
    clock: Arc<dyn Clock>,
}

impl<S: PriceSource> CachedFetcher<S> {
    /// Five-minute buckets on the system clock
    pub fn new(source: S) -> Self {
        Self::with_clock(source, DEFAULT_CACHE_BUCKET, Arc::new(SystemClock))
    }

    /// Bucket width taken from `config.cache_bucket`
    pub fn from_config(source: S, config: &FetcherConfig) -> Self {
        Self::with_bucket(source, config.cache_bucket)
    }

    pub fn with_bucket(source: S, bucket: Duration) -> Self {
        Self::with_clock(source, bucket, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, bucket: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: BucketCache::new(bucket),
            clock,
        }
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl<S: PriceSource> PriceSource for CachedFetcher<S> {
    fn fetch_price_series(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<TimeSeries, FetchError> {
        let bucket = self.cache.bucket_at(self.clock.now());
        let key = (token_id.to_string(), days);

        if let Some(series) = self.cache.get(&key, bucket) {
            log_debug!(MODULE, "Cache hit", token_id = token_id, days = days, bucket = bucket);
            return Ok(series);
        }

        log_debug!(MODULE, "Cache miss", token_id = token_id, days = days, bucket = bucket);
        let series = self.source.fetch_price_series(token_id, days)?;

        // A concurrent miss may have stored first; both callers see that value
        Ok(self.cache.insert_if_absent(key, bucket, series))
    }
}
