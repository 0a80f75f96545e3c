//! # Job Repository
//!
//! Database operations for jobs (chauffeured transfers).
//!
//! Writes run on a caller-supplied connection so the job and its payments
//! commit together. Reads use the pool, except `fetch`, which reads inside
//! the caller's transaction.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{BookingStatus, Job};

const ENTITY: &str = "job";

const SELECT: &str = r#"
    SELECT
        id, customer_name, customer_number, job_date, job_time, job_description,
        no_of_passengers, vehicle_type,
        job_price, job_currency, job_price_in_euros,
        driver_id, number_plate, driver_fee, driver_currency, driver_fee_in_euros,
        agent_id, agent_fee_tier, agent_fee_amount,
        payment_type, cc_fee, subtotal,
        status, created_at, updated_at
    FROM jobs
"#;

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    customer_name: String,
    customer_number: String,
    job_date: NaiveDate,
    job_time: NaiveTime,
    job_description: String,
    no_of_passengers: i64,
    vehicle_type: String,
    job_price: String,
    job_currency: String,
    job_price_in_euros: Option<String>,
    driver_id: Option<String>,
    number_plate: Option<String>,
    driver_fee: Option<String>,
    driver_currency: String,
    driver_fee_in_euros: Option<String>,
    agent_id: Option<String>,
    agent_fee_tier: Option<String>,
    agent_fee_amount: String,
    payment_type: Option<String>,
    cc_fee: String,
    subtotal: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> DbResult<Self> {
        Ok(Job {
            no_of_passengers: codec::count(ENTITY, "no_of_passengers", row.no_of_passengers)?,
            vehicle_type: codec::parsed(ENTITY, "vehicle_type", &row.vehicle_type)?,
            job_price: codec::decimal(ENTITY, "job_price", &row.job_price)?,
            job_currency: codec::parsed(ENTITY, "job_currency", &row.job_currency)?,
            job_price_in_euros: codec::opt_decimal(
                ENTITY,
                "job_price_in_euros",
                row.job_price_in_euros.as_deref(),
            )?,
            driver_fee: codec::opt_decimal(ENTITY, "driver_fee", row.driver_fee.as_deref())?,
            driver_currency: codec::parsed(ENTITY, "driver_currency", &row.driver_currency)?,
            driver_fee_in_euros: codec::opt_decimal(
                ENTITY,
                "driver_fee_in_euros",
                row.driver_fee_in_euros.as_deref(),
            )?,
            agent_fee_tier: codec::opt_parsed(ENTITY, "agent_fee_tier", row.agent_fee_tier.as_deref())?,
            agent_fee_amount: codec::decimal(ENTITY, "agent_fee_amount", &row.agent_fee_amount)?,
            payment_type: codec::opt_parsed(ENTITY, "payment_type", row.payment_type.as_deref())?,
            cc_fee: codec::decimal(ENTITY, "cc_fee", &row.cc_fee)?,
            subtotal: codec::decimal(ENTITY, "subtotal", &row.subtotal)?,
            status: codec::parsed(ENTITY, "status", &row.status)?,
            id: row.id,
            customer_name: row.customer_name,
            customer_number: row.customer_number,
            job_date: row.job_date,
            job_time: row.job_time,
            job_description: row.job_description,
            driver_id: row.driver_id,
            number_plate: row.number_plate,
            agent_id: row.agent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for job database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut tx = db.begin().await?;
/// db.jobs().upsert(&mut *tx, &job).await?;
/// tx.commit().await?;
///
/// let job = db.jobs().get(&job.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        JobRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    /// Reads the job on the caller's connection, inside its transaction.
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Job::try_from).transpose()
    }

    /// Jobs dated within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE job_date BETWEEN ?1 AND ?2 ORDER BY job_date, job_time"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    /// Every job, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!("{SELECT} ORDER BY job_date, job_time"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    /// Inserts the job or overwrites an existing one.
    ///
    /// An update never deletes the row, so payments and the calculation
    /// attached to the job survive. It also leaves `status` alone; status
    /// only moves through [`JobRepository::update_status`].
    pub async fn upsert(&self, conn: &mut SqliteConnection, job: &Job) -> DbResult<()> {
        debug!(id = %job.id, status = %job.status, "Saving job");

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, customer_name, customer_number, job_date, job_time, job_description,
                no_of_passengers, vehicle_type,
                job_price, job_currency, job_price_in_euros,
                driver_id, number_plate, driver_fee, driver_currency, driver_fee_in_euros,
                agent_id, agent_fee_tier, agent_fee_amount,
                payment_type, cc_fee, subtotal,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21, ?22,
                ?23, ?24, ?25
            )
            ON CONFLICT(id) DO UPDATE SET
                customer_name = excluded.customer_name,
                customer_number = excluded.customer_number,
                job_date = excluded.job_date,
                job_time = excluded.job_time,
                job_description = excluded.job_description,
                no_of_passengers = excluded.no_of_passengers,
                vehicle_type = excluded.vehicle_type,
                job_price = excluded.job_price,
                job_currency = excluded.job_currency,
                job_price_in_euros = excluded.job_price_in_euros,
                driver_id = excluded.driver_id,
                number_plate = excluded.number_plate,
                driver_fee = excluded.driver_fee,
                driver_currency = excluded.driver_currency,
                driver_fee_in_euros = excluded.driver_fee_in_euros,
                agent_id = excluded.agent_id,
                agent_fee_tier = excluded.agent_fee_tier,
                agent_fee_amount = excluded.agent_fee_amount,
                payment_type = excluded.payment_type,
                cc_fee = excluded.cc_fee,
                subtotal = excluded.subtotal,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job.id)
        .bind(&job.customer_name)
        .bind(&job.customer_number)
        .bind(job.job_date)
        .bind(job.job_time)
        .bind(&job.job_description)
        .bind(i64::from(job.no_of_passengers))
        .bind(job.vehicle_type.as_str())
        .bind(codec::text(job.job_price))
        .bind(job.job_currency.code())
        .bind(codec::opt_text(job.job_price_in_euros))
        .bind(&job.driver_id)
        .bind(&job.number_plate)
        .bind(codec::opt_text(job.driver_fee))
        .bind(job.driver_currency.code())
        .bind(codec::opt_text(job.driver_fee_in_euros))
        .bind(&job.agent_id)
        .bind(job.agent_fee_tier.map(|t| t.as_str()))
        .bind(codec::text(job.agent_fee_amount))
        .bind(job.payment_type.map(|t| t.as_str()))
        .bind(codec::text(job.cc_fee))
        .bind(codec::text(job.subtotal))
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the status column and nothing else.
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: BookingStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating job status");

        let result = sqlx::query("UPDATE jobs SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job", id));
        }
        Ok(())
    }

    /// Deletes the job together with its payments and calculation.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting job");

        let result = sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job", id));
        }
        Ok(())
    }
}
