//! Fakes and fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use kt_core::Currency;
use kt_db::{Database, DbConfig};

use crate::clock::ManualClock;
use crate::rates::{MemoryCache, RateProvider, RateSource, RateSourceError};
use crate::Ledger;

/// A rate source that answers from memory and counts its calls.
pub struct FakeSource {
    rates: Mutex<Option<BTreeMap<Currency, Decimal>>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn with_rates(rates: impl IntoIterator<Item = (Currency, Decimal)>) -> Self {
        FakeSource {
            rates: Mutex::new(Some(rates.into_iter().collect())),
            fetches: AtomicUsize::new(0),
        }
    }

    /// HUF 0.0025, USD 0.92, GBP 1.17.
    pub fn standard() -> Self {
        Self::with_rates([
            (Currency::Huf, dec!(0.0025)),
            (Currency::Usd, dec!(0.92)),
            (Currency::Gbp, dec!(1.17)),
        ])
    }

    /// Every fetch fails as if the network were down.
    pub fn failing() -> Self {
        FakeSource {
            rates: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_rate(&self, currency: Currency, rate: Decimal) {
        let mut rates = self.rates.lock().unwrap();
        rates.get_or_insert_with(BTreeMap::new).insert(currency, rate);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RateSource for FakeSource {
    async fn fetch_to_eur(&self) -> Result<BTreeMap<Currency, Decimal>, RateSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let rates = self.rates.lock().unwrap().clone();
        rates.ok_or_else(|| RateSourceError::Http("connection refused".to_string()))
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A provider with a fresh in-memory cache and a clock stopped at `start`.
pub fn provider(
    source: FakeSource,
    start: DateTime<Utc>,
    db: Database,
) -> (Arc<ManualClock>, RateProvider<FakeSource>) {
    let clock = Arc::new(ManualClock::new(start));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let rates = RateProvider::new(source, cache, clock.clone(), db);
    (clock, rates)
}

/// A ledger on a fresh database with the standard fake rates.
pub async fn ledger_at(start: DateTime<Utc>) -> (Arc<ManualClock>, Ledger<FakeSource>) {
    ledger_with(FakeSource::standard(), start).await
}

pub async fn ledger_with(source: FakeSource, start: DateTime<Utc>) -> (Arc<ManualClock>, Ledger<FakeSource>) {
    let db = db().await;
    let (clock, rates) = provider(source, start, db.clone());
    (clock, Ledger::new(db, rates))
}
