//! # Expense Repository

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::Expense;

const ENTITY: &str = "expense";

const SELECT: &str = r#"
    SELECT
        id, driver_id, expense_type, amount, currency, amount_in_euros,
        expense_date, expense_time, notes, created_at, updated_at
    FROM expenses
"#;

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: String,
    driver_id: Option<String>,
    expense_type: String,
    amount: String,
    currency: String,
    amount_in_euros: Option<String>,
    expense_date: NaiveDate,
    expense_time: Option<NaiveTime>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = DbError;

    fn try_from(row: ExpenseRow) -> DbResult<Self> {
        Ok(Expense {
            expense_type: codec::parsed(ENTITY, "expense_type", &row.expense_type)?,
            amount: codec::decimal(ENTITY, "amount", &row.amount)?,
            currency: codec::parsed(ENTITY, "currency", &row.currency)?,
            amount_in_euros: codec::opt_decimal(ENTITY, "amount_in_euros", row.amount_in_euros.as_deref())?,
            id: row.id,
            driver_id: row.driver_id,
            expense_date: row.expense_date,
            expense_time: row.expense_time,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Expense>> {
        let row: Option<ExpenseRow> = sqlx::query_as(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Expense::try_from).transpose()
    }

    /// Expenses dated within `[from, to]`, newest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(&format!(
            "{SELECT} WHERE expense_date BETWEEN ?1 AND ?2 ORDER BY expense_date DESC, expense_time DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Expense::try_from).collect()
    }

    pub async fn list_all(&self) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> =
            sqlx::query_as(&format!("{SELECT} ORDER BY expense_date DESC, expense_time DESC"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Expense::try_from).collect()
    }

    pub async fn upsert(&self, conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
        debug!(id = %expense.id, expense_type = %expense.expense_type, "Saving expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, driver_id, expense_type, amount, currency, amount_in_euros,
                expense_date, expense_time, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                driver_id = excluded.driver_id,
                expense_type = excluded.expense_type,
                amount = excluded.amount,
                currency = excluded.currency,
                amount_in_euros = excluded.amount_in_euros,
                expense_date = excluded.expense_date,
                expense_time = excluded.expense_time,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.driver_id)
        .bind(expense.expense_type.as_str())
        .bind(codec::text(expense.amount))
        .bind(expense.currency.code())
        .bind(codec::opt_text(expense.amount_in_euros))
        .bind(expense.expense_date)
        .bind(expense.expense_time)
        .bind(&expense.notes)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use kt_core::{Currency, ExpenseType};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = test_support::db().await;
        let day = |d| NaiveDate::from_ymd_opt(2026, 5, d).unwrap();

        let mut early = Expense::new(ExpenseType::Fuel, dec!(18000), Currency::Huf, day(2));
        early.amount_in_euros = Some(dec!(45.00));
        early.expense_time = NaiveTime::from_hms_opt(8, 15, 0);
        let late = Expense::new(ExpenseType::CarWash, dec!(12), Currency::Eur, day(20));
        let outside = Expense::new(ExpenseType::Toll, dec!(9), Currency::Eur, day(31));

        let mut tx = db.begin().await.unwrap();
        for expense in [&early, &late, &outside] {
            db.expenses().upsert(&mut *tx, expense).await.unwrap();
        }
        tx.commit().await.unwrap();

        let listed = db.expenses().list_between(day(1), day(30)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, late.id);
        assert_eq!(listed[1], early);

        db.expenses().delete(&outside.id).await.unwrap();
        assert_eq!(db.expenses().list_all().await.unwrap().len(), 2);
    }
}
