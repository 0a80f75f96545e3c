//! # Rate Provider
//!
//! `get_rate(currency)` for the rest of the ledger. See the module docs in
//! [`crate::rates`] for the lookup order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use kt_core::calendar::{budapest_today, seconds_until_budapest_midnight};
use kt_core::Currency;
use kt_db::{Database, StoredRate};

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};

use super::cache::{rate_key, CacheStore};
use super::source::RateSource;

pub struct RateProvider<S> {
    source: S,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    db: Database,
}

impl<S: RateSource> RateProvider<S> {
    pub fn new(source: S, cache: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, db: Database) -> Self {
        RateProvider {
            source,
            cache,
            clock,
            db,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Today's to-EUR multiplier for `currency`.
    ///
    /// ## Errors
    /// `RateUnavailable` when the source cannot be reached, answers with
    /// something unreadable, or has no usable quote for `currency`. There
    /// is no fallback to an older rate.
    pub async fn get_rate(&self, currency: Currency) -> LedgerResult<Decimal> {
        if currency.is_eur() {
            return Ok(Decimal::ONE);
        }

        let now = self.clock.now();
        let today = budapest_today(now);
        let key = rate_key(currency, today);

        if let Some(rate) = self.cache.get(&key) {
            debug!(currency = %currency, %rate, "Rate cache hit");
            return Ok(rate);
        }

        if let Some(stored) = self.db.exchange_rates().get(currency, today).await? {
            debug!(currency = %currency, rate = %stored.rate, "Rate loaded from database");
            self.cache.set(&key, stored.rate, ttl_until_midnight(now));
            return Ok(stored.rate);
        }

        let table = self.refresh(currency, now).await?;
        table.get(&currency).copied().ok_or_else(|| {
            error!(currency = %currency, "Rate source has no usable quote");
            LedgerError::RateUnavailable {
                currency,
                reason: "missing from rate source response".to_string(),
            }
        })
    }

    /// Removes stored rates older than `keep_days` Budapest days.
    pub async fn prune_history(&self, keep_days: u32) -> LedgerResult<u64> {
        let today = budapest_today(self.clock.now());
        let cutoff = today
            .checked_sub_days(chrono::Days::new(u64::from(keep_days)))
            .unwrap_or(NaiveDate::MIN);
        let removed = self.db.exchange_rates().prune_before(cutoff).await?;
        info!(%cutoff, removed, "Pruned stored exchange rates");
        Ok(removed)
    }

    /// Fetches the full table, stores every rate for today and caches it
    /// until Budapest midnight.
    async fn refresh(
        &self,
        wanted: Currency,
        now: DateTime<Utc>,
    ) -> LedgerResult<BTreeMap<Currency, Decimal>> {
        let table = self.source.fetch_to_eur().await.map_err(|e| {
            error!(currency = %wanted, error = %e, "Exchange rate fetch failed");
            LedgerError::RateUnavailable {
                currency: wanted,
                reason: e.to_string(),
            }
        })?;

        let today = budapest_today(now);
        let stored: Vec<StoredRate> = table
            .iter()
            .map(|(&currency, &rate)| StoredRate {
                currency,
                rate_date: today,
                rate,
                fetched_at: now,
            })
            .collect();
        self.db.exchange_rates().upsert_many(&stored).await?;

        let ttl = ttl_until_midnight(now);
        for rate in &stored {
            self.cache.set(&rate_key(rate.currency, today), rate.rate, ttl);
        }

        info!(
            date = %today,
            currencies = stored.len(),
            ttl_secs = ttl.as_secs(),
            "Fetched exchange rates"
        );
        Ok(table)
    }
}

fn ttl_until_midnight(now: DateTime<Utc>) -> Duration {
    Duration::from_secs(seconds_until_budapest_midnight(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::MemoryCache;
    use crate::test_support::{db, provider, utc, FakeSource};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_eur_needs_no_lookup() {
        let source = FakeSource::failing();
        let (_clock, rates) = provider(source, utc(2026, 3, 10, 9, 0), db().await);
        assert_eq!(rates.get_rate(Currency::Eur).await.unwrap(), Decimal::ONE);
        assert_eq!(rates.source().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_same_day_lookups_fetch_once() {
        let (clock, rates) = provider(FakeSource::standard(), utc(2026, 3, 10, 9, 0), db().await);

        assert_eq!(rates.get_rate(Currency::Huf).await.unwrap(), dec!(0.0025));
        clock.advance(chrono::Duration::hours(10));
        assert_eq!(rates.get_rate(Currency::Huf).await.unwrap(), dec!(0.0025));
        // One fetch populated every currency
        assert_eq!(rates.get_rate(Currency::Usd).await.unwrap(), dec!(0.92));
        assert_eq!(rates.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_new_budapest_day_refetches() {
        // 22:30 UTC in March is 23:30 in Budapest
        let (clock, rates) = provider(FakeSource::standard(), utc(2026, 3, 10, 22, 30), db().await);
        rates.get_rate(Currency::Gbp).await.unwrap();

        rates.source().set_rate(Currency::Gbp, dec!(1.18));
        clock.advance(chrono::Duration::minutes(31));
        assert_eq!(rates.get_rate(Currency::Gbp).await.unwrap(), dec!(1.18));
        assert_eq!(rates.source().fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_entry_lives_until_midnight() {
        // 22:59 UTC in January is 23:59 in Budapest
        let start = utc(2026, 1, 15, 22, 59);
        let clock = Arc::new(crate::clock::ManualClock::new(start));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let rates = RateProvider::new(FakeSource::standard(), cache.clone(), clock.clone(), db().await);

        rates.get_rate(Currency::Huf).await.unwrap();
        assert_eq!(cache.len(), 3);

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(cache.len(), 3);
        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_restart_reuses_stored_rates() {
        let db = db().await;
        let (_clock, first) = provider(FakeSource::standard(), utc(2026, 3, 10, 9, 0), db.clone());
        first.get_rate(Currency::Usd).await.unwrap();

        // Fresh process: empty cache, same database
        let (_clock, second) = provider(FakeSource::failing(), utc(2026, 3, 10, 15, 0), db);
        assert_eq!(second.get_rate(Currency::Usd).await.unwrap(), dec!(0.92));
        assert_eq!(second.source().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_rate_unavailable() {
        let db = db().await;
        let (_clock, rates) = provider(FakeSource::failing(), utc(2026, 3, 10, 9, 0), db.clone());

        let err = rates.get_rate(Currency::Huf).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::RateUnavailable { currency: Currency::Huf, .. }
        ));
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(db.exchange_rates().list_for_day(day).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_currency_missing_from_response() {
        let source = FakeSource::with_rates([(Currency::Usd, dec!(0.92))]);
        let (_clock, rates) = provider(source, utc(2026, 3, 10, 9, 0), db().await);

        let err = rates.get_rate(Currency::Gbp).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::RateUnavailable { currency: Currency::Gbp, .. }
        ));
        // USD was still stored by the same fetch
        assert_eq!(rates.get_rate(Currency::Usd).await.unwrap(), dec!(0.92));
        assert_eq!(rates.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_prune_history() {
        let db = db().await;
        let (clock, rates) = provider(FakeSource::standard(), utc(2026, 3, 1, 9, 0), db.clone());
        rates.get_rate(Currency::Huf).await.unwrap();

        clock.advance(chrono::Duration::days(40));
        assert_eq!(rates.prune_history(30).await.unwrap(), 3);
    }
}
