//! # Shuttle Repository
//!
//! Database operations for scheduled shuttles.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{BookingStatus, Shuttle};

const ENTITY: &str = "shuttle";

const SELECT: &str = r#"
    SELECT
        id, customer_name, customer_number, customer_email, shuttle_date, direction,
        no_of_passengers, price, price_currency, price_in_euros,
        driver_id, payment_type, cc_fee, notes,
        status, created_at, updated_at
    FROM shuttles
"#;

#[derive(Debug, FromRow)]
struct ShuttleRow {
    id: String,
    customer_name: String,
    customer_number: String,
    customer_email: Option<String>,
    shuttle_date: NaiveDate,
    direction: String,
    no_of_passengers: i64,
    price: String,
    price_currency: String,
    price_in_euros: Option<String>,
    driver_id: Option<String>,
    payment_type: Option<String>,
    cc_fee: String,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShuttleRow> for Shuttle {
    type Error = DbError;

    fn try_from(row: ShuttleRow) -> DbResult<Self> {
        Ok(Shuttle {
            direction: codec::parsed(ENTITY, "direction", &row.direction)?,
            no_of_passengers: codec::count(ENTITY, "no_of_passengers", row.no_of_passengers)?,
            price: codec::decimal(ENTITY, "price", &row.price)?,
            price_currency: codec::parsed(ENTITY, "price_currency", &row.price_currency)?,
            price_in_euros: codec::opt_decimal(ENTITY, "price_in_euros", row.price_in_euros.as_deref())?,
            payment_type: codec::opt_parsed(ENTITY, "payment_type", row.payment_type.as_deref())?,
            cc_fee: codec::decimal(ENTITY, "cc_fee", &row.cc_fee)?,
            status: codec::parsed(ENTITY, "status", &row.status)?,
            id: row.id,
            customer_name: row.customer_name,
            customer_number: row.customer_number,
            customer_email: row.customer_email,
            shuttle_date: row.shuttle_date,
            driver_id: row.driver_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShuttleRepository {
    pool: SqlitePool,
}

impl ShuttleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShuttleRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Shuttle>> {
        let row: Option<ShuttleRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Shuttle::try_from).transpose()
    }

    /// Reads the shuttle on the caller's connection, inside its transaction.
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shuttle>> {
        let row: Option<ShuttleRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Shuttle::try_from).transpose()
    }

    /// Shuttles dated within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Shuttle>> {
        let rows: Vec<ShuttleRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE shuttle_date BETWEEN ?1 AND ?2 ORDER BY shuttle_date, created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Shuttle::try_from).collect()
    }

    pub async fn list_all(&self) -> DbResult<Vec<Shuttle>> {
        let rows: Vec<ShuttleRow> =
            sqlx::query_as(&format!("{SELECT} ORDER BY shuttle_date, created_at"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Shuttle::try_from).collect()
    }

    /// Inserts or overwrites. The stored status of an existing row is kept.
    pub async fn upsert(&self, conn: &mut SqliteConnection, shuttle: &Shuttle) -> DbResult<()> {
        debug!(id = %shuttle.id, status = %shuttle.status, "Saving shuttle");

        sqlx::query(
            r#"
            INSERT INTO shuttles (
                id, customer_name, customer_number, customer_email, shuttle_date, direction,
                no_of_passengers, price, price_currency, price_in_euros,
                driver_id, payment_type, cc_fee, notes,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17
            )
            ON CONFLICT(id) DO UPDATE SET
                customer_name = excluded.customer_name,
                customer_number = excluded.customer_number,
                customer_email = excluded.customer_email,
                shuttle_date = excluded.shuttle_date,
                direction = excluded.direction,
                no_of_passengers = excluded.no_of_passengers,
                price = excluded.price,
                price_currency = excluded.price_currency,
                price_in_euros = excluded.price_in_euros,
                driver_id = excluded.driver_id,
                payment_type = excluded.payment_type,
                cc_fee = excluded.cc_fee,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&shuttle.id)
        .bind(&shuttle.customer_name)
        .bind(&shuttle.customer_number)
        .bind(&shuttle.customer_email)
        .bind(shuttle.shuttle_date)
        .bind(shuttle.direction.as_str())
        .bind(i64::from(shuttle.no_of_passengers))
        .bind(codec::text(shuttle.price))
        .bind(shuttle.price_currency.code())
        .bind(codec::opt_text(shuttle.price_in_euros))
        .bind(&shuttle.driver_id)
        .bind(shuttle.payment_type.map(|t| t.as_str()))
        .bind(codec::text(shuttle.cc_fee))
        .bind(&shuttle.notes)
        .bind(shuttle.status.as_str())
        .bind(shuttle.created_at)
        .bind(shuttle.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: BookingStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating shuttle status");

        let result = sqlx::query("UPDATE shuttles SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shuttle", id));
        }
        Ok(())
    }

    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting shuttle");

        let result = sqlx::query("DELETE FROM shuttles WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shuttle", id));
        }
        Ok(())
    }
}
