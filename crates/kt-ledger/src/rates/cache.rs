//! # Rate Cache
//!
//! A small key/value store with per-entry expiry. The provider only needs
//! `get`, `set` and `delete`, so anything process-wide can sit behind
//! [`CacheStore`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use kt_core::Currency;

use crate::clock::Clock;

/// Cache key for a currency's rate on a Budapest calendar day.
pub fn rate_key(currency: Currency, day: NaiveDate) -> String {
    format!("exchange_rate:{}:{}", currency.code(), day)
}

/// Process-wide rate cache. Writes are last-write-wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Decimal>;

    fn set(&self, key: &str, value: Decimal, ttl: Duration);

    fn delete(&self, key: &str);
}

// =============================================================================
// In-Memory Cache
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: Decimal,
    expires_at: DateTime<Utc>,
}

/// In-process cache. Expired entries are dropped on the next write.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryCache {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Decimal> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value)
    }

    fn set(&self, key: &str, value: Decimal, ttl: Duration) {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(1));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        debug!(key, ttl_secs = ttl.num_seconds(), "Cached value");
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}
