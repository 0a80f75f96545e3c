//! # Shuttle Daily Cost Repository
//!
//! Driver costs keyed by shuttle day. Reads come back ordered by date and
//! then by creation time so a day's drivers list in entry order.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::ShuttleDailyCost;

const ENTITY: &str = "shuttle daily cost";

const SELECT: &str = r#"
    SELECT
        id, shuttle_date, driver_id, number_plate, driver_fee, currency,
        driver_fee_in_euros, created_at, updated_at
    FROM shuttle_daily_costs
"#;

#[derive(Debug, FromRow)]
struct ShuttleDailyCostRow {
    id: String,
    shuttle_date: NaiveDate,
    driver_id: String,
    number_plate: Option<String>,
    driver_fee: String,
    currency: String,
    driver_fee_in_euros: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShuttleDailyCostRow> for ShuttleDailyCost {
    type Error = DbError;

    fn try_from(row: ShuttleDailyCostRow) -> DbResult<Self> {
        Ok(ShuttleDailyCost {
            driver_fee: codec::decimal(ENTITY, "driver_fee", &row.driver_fee)?,
            currency: codec::parsed(ENTITY, "currency", &row.currency)?,
            driver_fee_in_euros: codec::opt_decimal(
                ENTITY,
                "driver_fee_in_euros",
                row.driver_fee_in_euros.as_deref(),
            )?,
            id: row.id,
            shuttle_date: row.shuttle_date,
            driver_id: row.driver_id,
            number_plate: row.number_plate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShuttleDailyCostRepository {
    pool: SqlitePool,
}

impl ShuttleDailyCostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShuttleDailyCostRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ShuttleDailyCost>> {
        let row: Option<ShuttleDailyCostRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ShuttleDailyCost::try_from).transpose()
    }

    pub async fn list_for_day(&self, shuttle_date: NaiveDate) -> DbResult<Vec<ShuttleDailyCost>> {
        self.list_between(shuttle_date, shuttle_date).await
    }

    /// Costs dated within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<ShuttleDailyCost>> {
        let rows: Vec<ShuttleDailyCostRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE shuttle_date BETWEEN ?1 AND ?2 ORDER BY shuttle_date, created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ShuttleDailyCost::try_from).collect()
    }

    pub async fn upsert(&self, conn: &mut SqliteConnection, cost: &ShuttleDailyCost) -> DbResult<()> {
        debug!(id = %cost.id, shuttle_date = %cost.shuttle_date, "Saving shuttle daily cost");

        sqlx::query(
            r#"
            INSERT INTO shuttle_daily_costs (
                id, shuttle_date, driver_id, number_plate, driver_fee, currency,
                driver_fee_in_euros, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                shuttle_date = excluded.shuttle_date,
                driver_id = excluded.driver_id,
                number_plate = excluded.number_plate,
                driver_fee = excluded.driver_fee,
                currency = excluded.currency,
                driver_fee_in_euros = excluded.driver_fee_in_euros,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&cost.id)
        .bind(cost.shuttle_date)
        .bind(&cost.driver_id)
        .bind(&cost.number_plate)
        .bind(codec::text(cost.driver_fee))
        .bind(cost.currency.code())
        .bind(codec::opt_text(cost.driver_fee_in_euros))
        .bind(cost.created_at)
        .bind(cost.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM shuttle_daily_costs WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ShuttleDailyCost", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use kt_core::{Currency, PersonKind};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_costs_grouped_by_day() {
        let db = test_support::db().await;
        let anna = test_support::person(&db, PersonKind::Driver, "Anna").await;
        let bela = test_support::person(&db, PersonKind::Driver, "Bela").await;

        let mut first = ShuttleDailyCost::new(day(3), &anna.id, dec!(20000), Currency::Huf);
        first.driver_fee_in_euros = Some(dec!(50.00));
        first.number_plate = Some("ABC-123".to_string());
        let mut second = ShuttleDailyCost::new(day(3), &bela.id, dec!(45), Currency::Eur);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        let next_day = ShuttleDailyCost::new(day(4), &anna.id, dec!(45), Currency::Eur);

        let mut tx = db.begin().await.unwrap();
        for cost in [&first, &second, &next_day] {
            db.shuttle_daily_costs().upsert(&mut *tx, cost).await.unwrap();
        }
        tx.commit().await.unwrap();

        let listed = db.shuttle_daily_costs().list_for_day(day(3)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], first);
        assert_eq!(listed[1].driver_id, bela.id);

        let range = db.shuttle_daily_costs().list_between(day(1), day(30)).await.unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range[2].id, next_day.id);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_delete() {
        let db = test_support::db().await;
        let anna = test_support::person(&db, PersonKind::Driver, "Anna").await;
        let mut cost = ShuttleDailyCost::new(day(5), &anna.id, dec!(40), Currency::Eur);

        let mut conn = db.acquire().await.unwrap();
        db.shuttle_daily_costs().upsert(&mut *conn, &cost).await.unwrap();
        cost.driver_fee = dec!(55);
        cost.driver_fee_in_euros = Some(dec!(55.00));
        db.shuttle_daily_costs().upsert(&mut *conn, &cost).await.unwrap();
        drop(conn);

        let stored = db.shuttle_daily_costs().get(&cost.id).await.unwrap().unwrap();
        assert_eq!(stored.driver_fee, dec!(55));
        assert_eq!(stored.driver_fee_in_euros, Some(dec!(55.00)));

        let mut conn = db.acquire().await.unwrap();
        db.shuttle_daily_costs().delete(&mut *conn, &cost.id).await.unwrap();
        let err = db.shuttle_daily_costs().delete(&mut *conn, &cost.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        drop(conn);

        assert!(db.shuttle_daily_costs().get(&cost.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_driver_is_rejected() {
        let db = test_support::db().await;
        let cost = ShuttleDailyCost::new(day(5), "nobody", dec!(40), Currency::Eur);

        let mut conn = db.acquire().await.unwrap();
        assert!(db.shuttle_daily_costs().upsert(&mut *conn, &cost).await.is_err());
    }
}
