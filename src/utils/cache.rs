//! Time-Bucketed In-Memory Cache
//!
//! Entries are keyed by `(key, bucket)` where the bucket is the current
//! wall-clock time divided into fixed-width intervals. An entry is only
//! visible while its bucket is current, so no explicit TTL or eviction
//! is needed beyond dropping stale buckets.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Index of the fixed-width interval containing `at`
pub fn time_bucket(at: DateTime<Utc>, width: Duration) -> i64 {
    let width_secs = width.as_secs().max(1) as i64;
    at.timestamp().div_euclid(width_secs)
}

/// Mutex-guarded map of immutable values per time bucket
pub struct BucketCache<K, V> {
    data: Mutex<HashMap<(K, i64), V>>,
    width: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> BucketCache<K, V> {
    pub fn new(width: Duration) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            width,
        }
    }

    pub fn bucket_at(&self, at: DateTime<Utc>) -> i64 {
        time_bucket(at, self.width)
    }

    pub fn get(&self, key: &K, bucket: i64) -> Option<V> {
        let data = self.data.lock().ok()?;
        data.get(&(key.clone(), bucket)).cloned()
    }

    /// Store `value` unless the slot is already filled; returns the value
    /// that ends up cached. Entries from older buckets are dropped.
    pub fn insert_if_absent(&self, key: K, bucket: i64, value: V) -> V {
        let mut data = match self.data.lock() {
            Ok(guard) => guard,
            // A poisoned map only loses memoization
            Err(poisoned) => poisoned.into_inner(),
        };

        data.retain(|(_, b), _| *b >= bucket);
        data.entry((key, bucket)).or_insert(value).clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut data) = self.data.lock() {
            data.clear();
        }
    }
}
