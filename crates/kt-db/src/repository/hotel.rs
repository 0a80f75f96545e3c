//! # Hotel Booking Repository
//!
//! Database operations for hotel bookings, including lookup by the
//! customer-facing public reference.
//!
//! ## Public References
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "ab12cd34"  ──normalize──►  "AB12CD34"                                 │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │  UNIQUE INDEX ON hotel_bookings(UPPER(public_id))                       │
//! │                                                                         │
//! │  Lookups compare UPPER(public_id) too, so legacy lower-case rows        │
//! │  still match.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{BookingStatus, HotelBooking};

const ENTITY: &str = "hotel_booking";

const SELECT: &str = r#"
    SELECT
        id, public_id, customer_name, customer_number,
        check_in, check_out, no_of_people, rooms, no_of_beds, hotel_tier,
        hotel_price, hotel_price_currency, hotel_price_in_euros,
        customer_pays, customer_pays_currency, customer_pays_in_euros,
        payment_type, cc_fee, agent_id, agent_fee_tier, special_requests,
        status, created_at, updated_at
    FROM hotel_bookings
"#;

#[derive(Debug, FromRow)]
struct HotelBookingRow {
    id: String,
    public_id: Option<String>,
    customer_name: String,
    customer_number: String,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    no_of_people: i64,
    rooms: i64,
    no_of_beds: Option<i64>,
    hotel_tier: Option<i64>,
    hotel_price: String,
    hotel_price_currency: String,
    hotel_price_in_euros: Option<String>,
    customer_pays: String,
    customer_pays_currency: String,
    customer_pays_in_euros: Option<String>,
    payment_type: Option<String>,
    cc_fee: String,
    agent_id: Option<String>,
    agent_fee_tier: Option<String>,
    special_requests: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HotelBookingRow> for HotelBooking {
    type Error = DbError;

    fn try_from(row: HotelBookingRow) -> DbResult<Self> {
        let hotel_tier = row
            .hotel_tier
            .map(|t| u8::try_from(t).map_err(|_| DbError::corrupt(ENTITY, "hotel_tier", t.to_string())))
            .transpose()?;

        Ok(HotelBooking {
            no_of_people: codec::count(ENTITY, "no_of_people", row.no_of_people)?,
            rooms: codec::count(ENTITY, "rooms", row.rooms)?,
            no_of_beds: row
                .no_of_beds
                .map(|b| codec::count(ENTITY, "no_of_beds", b))
                .transpose()?,
            hotel_tier,
            hotel_price: codec::decimal(ENTITY, "hotel_price", &row.hotel_price)?,
            hotel_price_currency: codec::parsed(
                ENTITY,
                "hotel_price_currency",
                &row.hotel_price_currency,
            )?,
            hotel_price_in_euros: codec::opt_decimal(
                ENTITY,
                "hotel_price_in_euros",
                row.hotel_price_in_euros.as_deref(),
            )?,
            customer_pays: codec::decimal(ENTITY, "customer_pays", &row.customer_pays)?,
            customer_pays_currency: codec::parsed(
                ENTITY,
                "customer_pays_currency",
                &row.customer_pays_currency,
            )?,
            customer_pays_in_euros: codec::opt_decimal(
                ENTITY,
                "customer_pays_in_euros",
                row.customer_pays_in_euros.as_deref(),
            )?,
            payment_type: codec::opt_parsed(ENTITY, "payment_type", row.payment_type.as_deref())?,
            cc_fee: codec::decimal(ENTITY, "cc_fee", &row.cc_fee)?,
            agent_fee_tier: codec::opt_parsed(ENTITY, "agent_fee_tier", row.agent_fee_tier.as_deref())?,
            status: codec::parsed(ENTITY, "status", &row.status)?,
            id: row.id,
            public_id: row.public_id,
            customer_name: row.customer_name,
            customer_number: row.customer_number,
            check_in: row.check_in,
            check_out: row.check_out,
            agent_id: row.agent_id,
            special_requests: row.special_requests,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HotelBookingRepository {
    pool: SqlitePool,
}

impl HotelBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HotelBookingRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<HotelBooking>> {
        let row: Option<HotelBookingRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(HotelBooking::try_from).transpose()
    }

    /// Reads the hotel booking on the caller's connection, inside its transaction.
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<HotelBooking>> {
        let row: Option<HotelBookingRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(HotelBooking::try_from).transpose()
    }

    /// Looks a booking up by its public reference, ignoring case.
    pub async fn find_by_public_id(&self, public_id: &str) -> DbResult<Option<HotelBooking>> {
        let row: Option<HotelBookingRow> =
            sqlx::query_as(&format!("{SELECT} WHERE UPPER(public_id) = UPPER(?1)"))
                .bind(public_id.trim())
                .fetch_optional(&self.pool)
                .await?;

        row.map(HotelBooking::try_from).transpose()
    }

    /// Whether a booking other than `except_id` already holds the reference.
    pub async fn public_id_exists(&self, public_id: &str, except_id: Option<&str>) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM hotel_bookings
            WHERE UPPER(public_id) = UPPER(?1)
            AND (?2 IS NULL OR id != ?2)
            "#,
        )
        .bind(public_id.trim())
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Bookings checking in within `[from, to]`, by check-in.
    pub async fn list_checking_in(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<HotelBooking>> {
        let rows: Vec<HotelBookingRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE date(check_in) BETWEEN ?1 AND ?2 ORDER BY check_in"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HotelBooking::try_from).collect()
    }

    /// Inserts or overwrites. The stored status of an existing row is kept.
    pub async fn upsert(&self, conn: &mut SqliteConnection, booking: &HotelBooking) -> DbResult<()> {
        debug!(id = %booking.id, public_id = ?booking.public_id, "Saving hotel booking");

        sqlx::query(
            r#"
            INSERT INTO hotel_bookings (
                id, public_id, customer_name, customer_number,
                check_in, check_out, no_of_people, rooms, no_of_beds, hotel_tier,
                hotel_price, hotel_price_currency, hotel_price_in_euros,
                customer_pays, customer_pays_currency, customer_pays_in_euros,
                payment_type, cc_fee, agent_id, agent_fee_tier, special_requests,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21,
                ?22, ?23, ?24
            )
            ON CONFLICT(id) DO UPDATE SET
                public_id = excluded.public_id,
                customer_name = excluded.customer_name,
                customer_number = excluded.customer_number,
                check_in = excluded.check_in,
                check_out = excluded.check_out,
                no_of_people = excluded.no_of_people,
                rooms = excluded.rooms,
                no_of_beds = excluded.no_of_beds,
                hotel_tier = excluded.hotel_tier,
                hotel_price = excluded.hotel_price,
                hotel_price_currency = excluded.hotel_price_currency,
                hotel_price_in_euros = excluded.hotel_price_in_euros,
                customer_pays = excluded.customer_pays,
                customer_pays_currency = excluded.customer_pays_currency,
                customer_pays_in_euros = excluded.customer_pays_in_euros,
                payment_type = excluded.payment_type,
                cc_fee = excluded.cc_fee,
                agent_id = excluded.agent_id,
                agent_fee_tier = excluded.agent_fee_tier,
                special_requests = excluded.special_requests,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.public_id)
        .bind(&booking.customer_name)
        .bind(&booking.customer_number)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(i64::from(booking.no_of_people))
        .bind(i64::from(booking.rooms))
        .bind(booking.no_of_beds.map(i64::from))
        .bind(booking.hotel_tier.map(i64::from))
        .bind(codec::text(booking.hotel_price))
        .bind(booking.hotel_price_currency.code())
        .bind(codec::opt_text(booking.hotel_price_in_euros))
        .bind(codec::text(booking.customer_pays))
        .bind(booking.customer_pays_currency.code())
        .bind(codec::opt_text(booking.customer_pays_in_euros))
        .bind(booking.payment_type.map(|t| t.as_str()))
        .bind(codec::text(booking.cc_fee))
        .bind(&booking.agent_id)
        .bind(booking.agent_fee_tier.map(|t| t.as_str()))
        .bind(&booking.special_requests)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("public_id", booking.public_id.clone().unwrap_or_default())
            }
            other => other,
        })?;

        Ok(())
    }

    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: BookingStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating hotel booking status");

        let result =
            sqlx::query("UPDATE hotel_bookings SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(status.as_str())
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("HotelBooking", id));
        }
        Ok(())
    }

    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting hotel booking");

        let result = sqlx::query("DELETE FROM hotel_bookings WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("HotelBooking", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::TimeZone;
    use kt_core::Currency;
    use rust_decimal_macros::dec;

    fn booking(public_id: Option<&str>) -> HotelBooking {
        let check_in = Utc.with_ymd_and_hms(2026, 8, 1, 14, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2026, 8, 4, 10, 0, 0).unwrap();
        let mut booking = HotelBooking::new(
            "Marta Szabo",
            "+36 70 111 2222",
            check_in,
            check_out,
            dec!(450),
            Currency::Eur,
        );
        booking.public_id = public_id.map(str::to_string);
        booking.hotel_tier = Some(4);
        booking.no_of_beds = Some(2);
        booking
    }

    async fn save(db: &crate::Database, booking: &HotelBooking) -> DbResult<()> {
        let mut tx = db.begin().await?;
        db.hotel_bookings().upsert(&mut *tx, booking).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip() {
        let db = test_support::db().await;
        let booking = booking(Some("AB12CD34"));
        save(&db, &booking).await.unwrap();

        let stored = db.hotel_bookings().get(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored, booking);
        assert_eq!(stored.customer_pays, dec!(20.00));
    }

    #[tokio::test]
    async fn test_public_id_lookup_ignores_case() {
        let db = test_support::db().await;
        let booking = booking(Some("ab12cd34"));
        save(&db, &booking).await.unwrap();

        let found = db.hotel_bookings().find_by_public_id("AB12CD34").await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(booking.id.clone()));

        let repo = db.hotel_bookings();
        assert!(repo.public_id_exists("Ab12Cd34", None).await.unwrap());
        assert!(!repo.public_id_exists("AB12CD34", Some(&booking.id)).await.unwrap());
        assert!(!repo.public_id_exists("ZZ99ZZ99", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_public_id_is_rejected() {
        let db = test_support::db().await;
        save(&db, &booking(Some("AB12CD34"))).await.unwrap();

        let err = save(&db, &booking(Some("ab12cd34"))).await.unwrap_err();
        assert!(err.is_unique_violation());

        // Any number of bookings may go without a reference
        save(&db, &booking(None)).await.unwrap();
        save(&db, &booking(None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_checking_in() {
        let db = test_support::db().await;
        save(&db, &booking(None)).await.unwrap();

        let aug = db
            .hotel_bookings()
            .list_checking_in(
                NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(aug.len(), 1);
    }
}
