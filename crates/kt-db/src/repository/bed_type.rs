//! # Bed Type Repository
//!
//! The bed type catalog and each hotel booking's bed allocations.

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{BedAllocation, BedType};

const ENTITY: &str = "bed allocation";

#[derive(Debug, FromRow)]
struct BedAllocationRow {
    bed_type_id: String,
    quantity: i64,
}

impl TryFrom<BedAllocationRow> for BedAllocation {
    type Error = DbError;

    fn try_from(row: BedAllocationRow) -> DbResult<Self> {
        Ok(BedAllocation {
            quantity: codec::count(ENTITY, "quantity", row.quantity)?,
            bed_type_id: row.bed_type_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BedTypeRepository {
    pool: SqlitePool,
}

impl BedTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BedTypeRepository { pool }
    }

    pub async fn insert(&self, bed_type: &BedType) -> DbResult<()> {
        debug!(id = %bed_type.id, name = %bed_type.name, "Inserting bed type");

        sqlx::query("INSERT INTO bed_types (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&bed_type.id)
            .bind(&bed_type.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// The catalog, by name.
    pub async fn list(&self) -> DbResult<Vec<BedType>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, name FROM bed_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| BedType { id, name })
            .collect())
    }

    /// A booking's allocations, ordered by bed type id.
    pub async fn list_for_booking(&self, hotel_booking_id: &str) -> DbResult<Vec<BedAllocation>> {
        let rows: Vec<BedAllocationRow> = sqlx::query_as(
            "SELECT bed_type_id, quantity FROM hotel_booking_bed_types WHERE hotel_booking_id = ?1 ORDER BY bed_type_id",
        )
        .bind(hotel_booking_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BedAllocation::try_from).collect()
    }

    /// Drops the booking's allocations and writes `allocations` in their
    /// place. Quantities must be positive and bed types unique.
    pub async fn replace_for_booking(
        &self,
        conn: &mut SqliteConnection,
        hotel_booking_id: &str,
        allocations: &[BedAllocation],
    ) -> DbResult<()> {
        debug!(hotel_booking_id, allocations = allocations.len(), "Replacing bed allocations");

        sqlx::query("DELETE FROM hotel_booking_bed_types WHERE hotel_booking_id = ?1")
            .bind(hotel_booking_id)
            .execute(&mut *conn)
            .await?;

        for allocation in allocations {
            sqlx::query(
                "INSERT INTO hotel_booking_bed_types (hotel_booking_id, bed_type_id, quantity) VALUES (?1, ?2, ?3)",
            )
            .bind(hotel_booking_id)
            .bind(&allocation.bed_type_id)
            .bind(i64::from(allocation.quantity))
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::{Duration, TimeZone};
    use kt_core::{Currency, HotelBooking};
    use rust_decimal_macros::dec;

    async fn stored_hotel(db: &crate::Database) -> HotelBooking {
        let check_in = Utc.with_ymd_and_hms(2026, 6, 1, 14, 0, 0).unwrap();
        let booking = HotelBooking::new("Jon", "1", check_in, check_in + Duration::days(2), dec!(300), Currency::Eur);
        let mut conn = db.acquire().await.unwrap();
        db.hotel_bookings().upsert(&mut *conn, &booking).await.unwrap();
        booking
    }

    #[tokio::test]
    async fn test_replace_allocations() {
        let db = test_support::db().await;
        let twin = BedType::new("Twin");
        let double = BedType::new("Double");
        db.bed_types().insert(&twin).await.unwrap();
        db.bed_types().insert(&double).await.unwrap();

        let names: Vec<String> = db.bed_types().list().await.unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Double", "Twin"]);

        let booking = stored_hotel(&db).await;
        let mut tx = db.begin().await.unwrap();
        db.bed_types()
            .replace_for_booking(
                &mut *tx,
                &booking.id,
                &[BedAllocation::new(&twin.id, 2), BedAllocation::new(&double.id, 1)],
            )
            .await
            .unwrap();
        db.bed_types()
            .replace_for_booking(&mut *tx, &booking.id, &[BedAllocation::new(&double.id, 3)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = db.bed_types().list_for_booking(&booking.id).await.unwrap();
        assert_eq!(stored, vec![BedAllocation::new(&double.id, 3)]);
    }

    #[tokio::test]
    async fn test_allocations_go_with_the_booking() {
        let db = test_support::db().await;
        let twin = BedType::new("Twin");
        db.bed_types().insert(&twin).await.unwrap();
        let booking = stored_hotel(&db).await;

        let mut conn = db.acquire().await.unwrap();
        db.bed_types()
            .replace_for_booking(&mut *conn, &booking.id, &[BedAllocation::new(&twin.id, 1)])
            .await
            .unwrap();
        db.hotel_bookings().delete(&mut *conn, &booking.id).await.unwrap();
        drop(conn);

        assert!(db.bed_types().list_for_booking(&booking.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_bed_type_is_rejected() {
        let db = test_support::db().await;
        let booking = stored_hotel(&db).await;

        let mut conn = db.acquire().await.unwrap();
        let err = db
            .bed_types()
            .replace_for_booking(&mut *conn, &booking.id, &[BedAllocation::new("no-such-type", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
