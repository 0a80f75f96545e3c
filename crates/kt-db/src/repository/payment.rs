//! # Payment Repository
//!
//! Payments are stored with one nullable foreign key per booking kind and a
//! `(recipient_kind, recipient_id)` pair. The table's CHECK constraints keep
//! both to at most one parent and a whole recipient.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{BookingKind, BookingRef, Payment, Recipient};

const ENTITY: &str = "payment";

const SELECT: &str = r#"
    SELECT
        id, job_id, shuttle_id, hotel_booking_id,
        amount, currency, amount_in_euros, payment_type,
        recipient_kind, recipient_id, cc_fee, created_at, updated_at
    FROM payments
"#;

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    job_id: Option<String>,
    shuttle_id: Option<String>,
    hotel_booking_id: Option<String>,
    amount: Option<String>,
    currency: Option<String>,
    amount_in_euros: Option<String>,
    payment_type: Option<String>,
    recipient_kind: Option<String>,
    recipient_id: Option<String>,
    cc_fee: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        let booking = match (row.job_id, row.shuttle_id, row.hotel_booking_id) {
            (Some(id), None, None) => Some(BookingRef::Job(id)),
            (None, Some(id), None) => Some(BookingRef::Shuttle(id)),
            (None, None, Some(id)) => Some(BookingRef::Hotel(id)),
            (None, None, None) => None,
            _ => return Err(DbError::corrupt(ENTITY, "booking", row.id)),
        };

        let recipient = match (row.recipient_kind, row.recipient_id) {
            (Some(kind), Some(id)) => Some(
                Recipient::from_parts(&kind, id).map_err(|_| DbError::corrupt(ENTITY, "recipient_kind", kind))?,
            ),
            (None, None) => None,
            (kind, _) => return Err(DbError::corrupt(ENTITY, "recipient", kind.unwrap_or_default())),
        };

        Ok(Payment {
            booking,
            recipient,
            amount: codec::opt_decimal(ENTITY, "amount", row.amount.as_deref())?,
            currency: codec::opt_parsed(ENTITY, "currency", row.currency.as_deref())?,
            amount_in_euros: codec::opt_decimal(ENTITY, "amount_in_euros", row.amount_in_euros.as_deref())?,
            payment_type: codec::opt_parsed(ENTITY, "payment_type", row.payment_type.as_deref())?,
            cc_fee: codec::decimal(ENTITY, "cc_fee", &row.cc_fee)?,
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parent_column(kind: BookingKind) -> &'static str {
    match kind {
        BookingKind::Job => "job_id",
        BookingKind::Shuttle => "shuttle_id",
        BookingKind::Hotel => "hotel_booking_id",
    }
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Payment::try_from).transpose()
    }

    /// All payments attached to a booking, in entry order.
    pub async fn list_for(&self, booking: &BookingRef) -> DbResult<Vec<Payment>> {
        let column = parent_column(booking.kind());
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE {column} = ?1 ORDER BY created_at, id"
        ))
        .bind(booking.id())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    /// Same as [`PaymentRepository::list_for`], read inside the caller's
    /// transaction.
    pub async fn fetch_for(&self, conn: &mut SqliteConnection, booking: &BookingRef) -> DbResult<Vec<Payment>> {
        let column = parent_column(booking.kind());
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE {column} = ?1 ORDER BY created_at, id"
        ))
        .bind(booking.id())
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    /// Payments not attached to any booking.
    pub async fn list_unattached(&self) -> DbResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE job_id IS NULL AND shuttle_id IS NULL AND hotel_booking_id IS NULL \
             ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    pub async fn upsert(&self, conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            complete = payment.is_complete(),
            "Saving payment"
        );

        let parent = |kind: BookingKind| {
            payment
                .booking
                .as_ref()
                .filter(|b| b.kind() == kind)
                .map(BookingRef::id)
        };

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, job_id, shuttle_id, hotel_booking_id,
                amount, currency, amount_in_euros, payment_type,
                recipient_kind, recipient_id, cc_fee, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13
            )
            ON CONFLICT(id) DO UPDATE SET
                job_id = excluded.job_id,
                shuttle_id = excluded.shuttle_id,
                hotel_booking_id = excluded.hotel_booking_id,
                amount = excluded.amount,
                currency = excluded.currency,
                amount_in_euros = excluded.amount_in_euros,
                payment_type = excluded.payment_type,
                recipient_kind = excluded.recipient_kind,
                recipient_id = excluded.recipient_id,
                cc_fee = excluded.cc_fee,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&payment.id)
        .bind(parent(BookingKind::Job))
        .bind(parent(BookingKind::Shuttle))
        .bind(parent(BookingKind::Hotel))
        .bind(codec::opt_text(payment.amount))
        .bind(payment.currency.map(|c| c.code()))
        .bind(codec::opt_text(payment.amount_in_euros))
        .bind(payment.payment_type.map(|t| t.as_str()))
        .bind(payment.recipient.as_ref().map(Recipient::kind))
        .bind(payment.recipient.as_ref().map(Recipient::id))
        .bind(codec::text(payment.cc_fee))
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting payment");

        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::{NaiveDate, NaiveTime};
    use kt_core::{Currency, Job, PaymentType, PersonKind};
    use rust_decimal_macros::dec;

    async fn saved_job(db: &crate::Database) -> Job {
        let job = Job::new(
            "Anna Kovacs",
            "+36 30 123 4567",
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            dec!(300),
            Currency::Eur,
        );
        let mut tx = db.begin().await.unwrap();
        db.jobs().upsert(&mut *tx, &job).await.unwrap();
        tx.commit().await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_payments_follow_their_booking() {
        let db = test_support::db().await;
        let driver = test_support::person(&db, PersonKind::Driver, "Laszlo").await;
        let job = saved_job(&db).await;
        let booking = BookingRef::Job(job.id.clone());

        let mut full = Payment::complete(
            Some(booking.clone()),
            dec!(80.00),
            Currency::Eur,
            PaymentType::Cash,
            driver.as_recipient(),
        );
        full.amount_in_euros = Some(dec!(80.00));
        let partial = Payment::new(Some(booking.clone()));
        let loose = Payment::new(None);

        let mut tx = db.begin().await.unwrap();
        for payment in [&full, &partial, &loose] {
            db.payments().upsert(&mut *tx, payment).await.unwrap();
        }
        tx.commit().await.unwrap();

        let listed = db.payments().list_for(&booking).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|p| p == &full));
        assert_eq!(db.payments().list_unattached().await.unwrap(), vec![loose]);

        // Deleting the job cascades to its payments
        let mut conn = db.acquire().await.unwrap();
        db.jobs().delete(&mut *conn, &job.id).await.unwrap();
        drop(conn);
        assert!(db.payments().list_for(&booking).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_must_exist() {
        let db = test_support::db().await;
        let payment = Payment::complete(
            None,
            dec!(10),
            Currency::Eur,
            PaymentType::Cash,
            Recipient::Staff("ghost".to_string()),
        );

        let mut conn = db.pool().acquire().await.unwrap();
        let err = db.payments().upsert(&mut *conn, &payment).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
