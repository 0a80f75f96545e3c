//! # Exchange Rate Repository
//!
//! Durable copy of the daily to-EUR rates. One row per currency per
//! Budapest calendar day; the rate provider checks here before going to
//! the network.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::Currency;

const ENTITY: &str = "exchange_rate";

/// A to-EUR rate as fetched on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRate {
    pub currency: Currency,
    /// Budapest date the rate is valid for.
    pub rate_date: NaiveDate,
    /// EUR per one unit of `currency`.
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct StoredRateRow {
    currency: String,
    rate_date: NaiveDate,
    rate: String,
    fetched_at: DateTime<Utc>,
}

impl TryFrom<StoredRateRow> for StoredRate {
    type Error = DbError;

    fn try_from(row: StoredRateRow) -> DbResult<Self> {
        Ok(StoredRate {
            currency: codec::parsed(ENTITY, "currency", &row.currency)?,
            rate: codec::decimal(ENTITY, "rate", &row.rate)?,
            rate_date: row.rate_date,
            fetched_at: row.fetched_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    pool: SqlitePool,
}

impl ExchangeRateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExchangeRateRepository { pool }
    }

    pub async fn get(&self, currency: Currency, rate_date: NaiveDate) -> DbResult<Option<StoredRate>> {
        let row: Option<StoredRateRow> = sqlx::query_as(
            r#"
            SELECT currency, rate_date, rate, fetched_at
            FROM exchange_rates
            WHERE currency = ?1 AND rate_date = ?2
            "#,
        )
        .bind(currency.code())
        .bind(rate_date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredRate::try_from).transpose()
    }

    /// Every rate stored for one day.
    pub async fn list_for_day(&self, rate_date: NaiveDate) -> DbResult<Vec<StoredRate>> {
        let rows: Vec<StoredRateRow> = sqlx::query_as(
            r#"
            SELECT currency, rate_date, rate, fetched_at
            FROM exchange_rates
            WHERE rate_date = ?1
            ORDER BY currency
            "#,
        )
        .bind(rate_date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredRate::try_from).collect()
    }

    /// Stores a day's rates in one transaction, replacing any already
    /// stored for the same currency and day.
    pub async fn upsert_many(&self, rates: &[StoredRate]) -> DbResult<()> {
        debug!(count = rates.len(), "Storing exchange rates");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for rate in rates {
            sqlx::query(
                r#"
                INSERT INTO exchange_rates (currency, rate_date, rate, fetched_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(currency, rate_date) DO UPDATE SET
                    rate = excluded.rate,
                    fetched_at = excluded.fetched_at
                "#,
            )
            .bind(rate.currency.code())
            .bind(rate.rate_date)
            .bind(codec::text(rate.rate))
            .bind(rate.fetched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Drops rates older than `before`. Returns the number removed.
    pub async fn prune_before(&self, before: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM exchange_rates WHERE rate_date < ?1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use rust_decimal_macros::dec;

    fn rate(currency: Currency, day: u32, rate: Decimal) -> StoredRate {
        StoredRate {
            currency,
            rate_date: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
            rate,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_store_and_read_a_day() {
        let db = test_support::db().await;
        let repo = db.exchange_rates();
        repo.upsert_many(&[
            rate(Currency::Huf, 10, dec!(0.002534)),
            rate(Currency::Usd, 10, dec!(0.921234)),
            rate(Currency::Huf, 9, dec!(0.002500)),
        ])
        .await
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let huf = repo.get(Currency::Huf, day).await.unwrap().unwrap();
        assert_eq!(huf.rate, dec!(0.002534));
        assert_eq!(repo.list_for_day(day).await.unwrap().len(), 2);
        assert!(repo.get(Currency::Gbp, day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refetch_replaces_and_prune() {
        let db = test_support::db().await;
        let repo = db.exchange_rates();
        repo.upsert_many(&[rate(Currency::Huf, 10, dec!(0.0025))]).await.unwrap();
        repo.upsert_many(&[rate(Currency::Huf, 10, dec!(0.0026))]).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        assert_eq!(repo.get(Currency::Huf, day).await.unwrap().unwrap().rate, dec!(0.0026));

        let removed = repo
            .prune_before(NaiveDate::from_ymd_opt(2026, 4, 11).unwrap())
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
