//! # Shuttle Day Costs
//!
//! What a driver is paid for running the shuttle on a given day. One day may
//! carry several drivers; each entry is its own row.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  shuttle_date ─┬─ Shuttle (passengers, price_in_euros) ...       │
//! │                └─ ShuttleDailyCost (driver, driver_fee) ...      │
//! │                                                                  │
//! │  income       = Σ shuttle price_in_euros                         │
//! │  driver_costs = Σ driver_fee_in_euros                            │
//! │  profit       = income − driver_costs                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Shuttle;
use crate::error::{CoreResult, ValidationError};
use crate::money::{quantize, Currency};
use crate::normalize::{foreign_currencies, FinancialRecord, NormalizeContext};
use crate::validation::{validate_amount, validate_optional, validate_required};

const NUMBER_PLATE_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuttleDailyCost {
    pub id: String,
    pub shuttle_date: NaiveDate,
    pub driver_id: String,
    pub number_plate: Option<String>,
    pub driver_fee: Decimal,
    pub currency: Currency,
    pub driver_fee_in_euros: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShuttleDailyCost {
    pub fn new(
        shuttle_date: NaiveDate,
        driver_id: impl Into<String>,
        driver_fee: Decimal,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        ShuttleDailyCost {
            id: Uuid::new_v4().to_string(),
            shuttle_date,
            driver_id: driver_id.into(),
            number_plate: None,
            driver_fee,
            currency,
            driver_fee_in_euros: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl FinancialRecord for ShuttleDailyCost {
    const KIND: &'static str = "shuttle daily cost";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([(Some(self.driver_fee), self.currency)])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required("driver", &self.driver_id, 36)?;
        validate_optional("number_plate", self.number_plate.as_deref(), NUMBER_PLATE_MAX)?;
        validate_amount("driver_fee", self.driver_fee)
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let fee_eur = ctx.rates.convert(Some(self.driver_fee), self.currency)?;

        self.driver_fee_in_euros = fee_eur;
        self.number_plate = self
            .number_plate
            .take()
            .map(|plate| plate.trim().to_uppercase())
            .filter(|plate| !plate.is_empty());
        self.updated_at = ctx.now;
        Ok(())
    }
}

// =============================================================================
// Per-Day Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuttleDaySummary {
    pub shuttle_date: NaiveDate,
    pub shuttles: usize,
    pub passengers: u32,
    pub income: Decimal,
    pub driver_costs: Decimal,
    pub profit: Decimal,
}

/// Totals for one shuttle day. Rows dated on other days are skipped.
pub fn summarize_day(
    shuttle_date: NaiveDate,
    shuttles: &[Shuttle],
    costs: &[ShuttleDailyCost],
) -> ShuttleDaySummary {
    let day_shuttles: Vec<&Shuttle> = shuttles
        .iter()
        .filter(|s| s.shuttle_date == shuttle_date)
        .collect();

    let income = quantize(
        day_shuttles
            .iter()
            .map(|s| s.price_in_euros.unwrap_or_default())
            .sum(),
    );
    let driver_costs = quantize(
        costs
            .iter()
            .filter(|c| c.shuttle_date == shuttle_date)
            .map(|c| c.driver_fee_in_euros.unwrap_or_default())
            .sum(),
    );

    ShuttleDaySummary {
        shuttle_date,
        shuttles: day_shuttles.len(),
        passengers: day_shuttles.iter().map(|s| s.no_of_passengers).sum(),
        income,
        driver_costs,
        profit: quantize(income - driver_costs),
    }
}
