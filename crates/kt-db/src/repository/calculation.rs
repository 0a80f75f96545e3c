//! # Calculation Repository
//!
//! One cost sheet per job, keyed by `job_id`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::Calculation;

const ENTITY: &str = "calculation";

#[derive(Debug, FromRow)]
struct CalculationRow {
    id: String,
    job_id: String,
    fuel_cost: Option<String>,
    fuel_currency: String,
    fuel_cost_in_euros: Option<String>,
    driver_fee: Option<String>,
    driver_currency: String,
    driver_fee_in_euros: Option<String>,
    agent_id: Option<String>,
    agent_fee_tier: Option<String>,
    kilometers: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CalculationRow> for Calculation {
    type Error = DbError;

    fn try_from(row: CalculationRow) -> DbResult<Self> {
        Ok(Calculation {
            fuel_cost: codec::opt_decimal(ENTITY, "fuel_cost", row.fuel_cost.as_deref())?,
            fuel_currency: codec::parsed(ENTITY, "fuel_currency", &row.fuel_currency)?,
            fuel_cost_in_euros: codec::opt_decimal(
                ENTITY,
                "fuel_cost_in_euros",
                row.fuel_cost_in_euros.as_deref(),
            )?,
            driver_fee: codec::opt_decimal(ENTITY, "driver_fee", row.driver_fee.as_deref())?,
            driver_currency: codec::parsed(ENTITY, "driver_currency", &row.driver_currency)?,
            driver_fee_in_euros: codec::opt_decimal(
                ENTITY,
                "driver_fee_in_euros",
                row.driver_fee_in_euros.as_deref(),
            )?,
            agent_fee_tier: codec::opt_parsed(ENTITY, "agent_fee_tier", row.agent_fee_tier.as_deref())?,
            kilometers: codec::opt_decimal(ENTITY, "kilometers", row.kilometers.as_deref())?,
            id: row.id,
            job_id: row.job_id,
            agent_id: row.agent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CalculationRepository {
    pool: SqlitePool,
}

impl CalculationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CalculationRepository { pool }
    }

    pub async fn get_for_job(&self, job_id: &str) -> DbResult<Option<Calculation>> {
        let row: Option<CalculationRow> = sqlx::query_as(
            r#"
            SELECT
                id, job_id, fuel_cost, fuel_currency, fuel_cost_in_euros,
                driver_fee, driver_currency, driver_fee_in_euros,
                agent_id, agent_fee_tier, kilometers, created_at, updated_at
            FROM calculations
            WHERE job_id = ?1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Calculation::try_from).transpose()
    }

    /// Saves the job's cost sheet. A second sheet for the same job replaces
    /// the first one's figures but keeps its id.
    pub async fn upsert(&self, conn: &mut SqliteConnection, calc: &Calculation) -> DbResult<()> {
        debug!(id = %calc.id, job_id = %calc.job_id, "Saving calculation");

        sqlx::query(
            r#"
            INSERT INTO calculations (
                id, job_id, fuel_cost, fuel_currency, fuel_cost_in_euros,
                driver_fee, driver_currency, driver_fee_in_euros,
                agent_id, agent_fee_tier, kilometers, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(job_id) DO UPDATE SET
                fuel_cost = excluded.fuel_cost,
                fuel_currency = excluded.fuel_currency,
                fuel_cost_in_euros = excluded.fuel_cost_in_euros,
                driver_fee = excluded.driver_fee,
                driver_currency = excluded.driver_currency,
                driver_fee_in_euros = excluded.driver_fee_in_euros,
                agent_id = excluded.agent_id,
                agent_fee_tier = excluded.agent_fee_tier,
                kilometers = excluded.kilometers,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&calc.id)
        .bind(&calc.job_id)
        .bind(codec::opt_text(calc.fuel_cost))
        .bind(calc.fuel_currency.code())
        .bind(codec::opt_text(calc.fuel_cost_in_euros))
        .bind(codec::opt_text(calc.driver_fee))
        .bind(calc.driver_currency.code())
        .bind(codec::opt_text(calc.driver_fee_in_euros))
        .bind(&calc.agent_id)
        .bind(calc.agent_fee_tier.map(|t| t.as_str()))
        .bind(codec::opt_text(calc.kilometers))
        .bind(calc.created_at)
        .bind(calc.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
