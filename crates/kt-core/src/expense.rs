//! # Expenses
//!
//! Running costs of the business: fuel bills, wages, repairs and the like.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::budapest_time;
use crate::error::{CoreResult, ValidationError};
use crate::money::Currency;
use crate::normalize::{foreign_currencies, FinancialRecord, NormalizeContext};
use crate::validation::validate_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Fuel,
    Wages,
    Repair,
    Renovations,
    CarWash,
    Toll,
    Other,
}

impl ExpenseType {
    pub const ALL: [ExpenseType; 7] = [
        ExpenseType::Fuel,
        ExpenseType::Wages,
        ExpenseType::Repair,
        ExpenseType::Renovations,
        ExpenseType::CarWash,
        ExpenseType::Toll,
        ExpenseType::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Fuel => "fuel",
            ExpenseType::Wages => "wages",
            ExpenseType::Repair => "repair",
            ExpenseType::Renovations => "renovations",
            ExpenseType::CarWash => "car_wash",
            ExpenseType::Toll => "toll",
            ExpenseType::Other => "other",
        }
    }

    /// Label shown in the expense list.
    pub const fn label(&self) -> &'static str {
        match self {
            ExpenseType::Fuel => "Fuel Bill",
            ExpenseType::Wages => "Wages",
            ExpenseType::Repair => "Car Repair",
            ExpenseType::Renovations => "Office Works/repairs",
            ExpenseType::CarWash => "Car Wash",
            ExpenseType::Toll => "Tolls",
            ExpenseType::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ExpenseType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ValidationError::not_allowed(
                    "expense_type",
                    &ExpenseType::ALL.map(|t| t.as_str()),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub driver_id: Option<String>,
    pub expense_type: ExpenseType,
    pub amount: Decimal,
    pub currency: Currency,
    pub amount_in_euros: Option<Decimal>,
    pub expense_date: NaiveDate,
    /// Budapest wall-clock time. Filled with the save time when left empty.
    pub expense_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(expense_type: ExpenseType, amount: Decimal, currency: Currency, expense_date: NaiveDate) -> Self {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4().to_string(),
            driver_id: None,
            expense_type,
            amount,
            currency,
            amount_in_euros: None,
            expense_date,
            expense_time: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl FinancialRecord for Expense {
    const KIND: &'static str = "expense";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([(Some(self.amount), self.currency)])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_amount("expense_amount", self.amount)
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let amount_eur = ctx.rates.convert(Some(self.amount), self.currency)?;
        let expense_time = self.expense_time.unwrap_or_else(|| budapest_time(ctx.now));

        self.amount_in_euros = amount_eur;
        self.expense_time = Some(expense_time);
        self.updated_at = ctx.now;
        Ok(())
    }
}
