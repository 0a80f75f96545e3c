//! # Job Calculation
//!
//! The per-job cost sheet: fuel, driver fee and the agent arrangement.
//! Agent fee and profit are never stored; they are recomputed from the
//! job's current EUR price every time they are asked for.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::fees::{self, AgentFeeTier};
use crate::money::{quantize, Currency};
use crate::normalize::{foreign_currencies, FinancialRecord, NormalizeContext};
use crate::validation::validate_optional_amount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: String,
    /// One calculation per job.
    pub job_id: String,

    pub fuel_cost: Option<Decimal>,
    pub fuel_currency: Currency,
    pub fuel_cost_in_euros: Option<Decimal>,

    pub driver_fee: Option<Decimal>,
    pub driver_currency: Currency,
    pub driver_fee_in_euros: Option<Decimal>,

    pub agent_id: Option<String>,
    pub agent_fee_tier: Option<AgentFeeTier>,
    pub kilometers: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Calculation {
    pub fn new(job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Calculation {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            fuel_cost: None,
            fuel_currency: Currency::Eur,
            fuel_cost_in_euros: None,
            driver_fee: None,
            driver_currency: Currency::Eur,
            driver_fee_in_euros: None,
            agent_id: None,
            agent_fee_tier: None,
            kilometers: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Agent fee against the job's EUR price. A job without a EUR price
    /// yields no fee.
    pub fn agent_fee_amount(&self, job_price_in_euros: Option<Decimal>) -> Decimal {
        match job_price_in_euros {
            Some(price) if !price.is_zero() => fees::agent_fee(
                self.agent_fee_tier,
                price,
                self.driver_fee_in_euros,
                self.fuel_cost_in_euros,
            ),
            _ => quantize(Decimal::ZERO),
        }
    }

    /// Job price less fuel, driver fee and agent fee.
    pub fn profit(&self, job_price_in_euros: Option<Decimal>) -> Decimal {
        fees::calculation_profit(
            job_price_in_euros.unwrap_or(Decimal::ZERO),
            self.fuel_cost_in_euros,
            self.driver_fee_in_euros,
            self.agent_fee_amount(job_price_in_euros),
        )
    }
}

impl FinancialRecord for Calculation {
    const KIND: &'static str = "calculation";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([
            (self.fuel_cost, self.fuel_currency),
            (self.driver_fee, self.driver_currency),
        ])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_amount("fuel_cost", self.fuel_cost)?;
        validate_optional_amount("driver_fee", self.driver_fee)?;
        validate_optional_amount("kilometers", self.kilometers)?;
        Ok(())
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let fuel_eur = ctx.rates.convert(self.fuel_cost, self.fuel_currency)?;
        let driver_eur = ctx.rates.convert(self.driver_fee, self.driver_currency)?;

        self.fuel_cost_in_euros = fuel_eur;
        self.driver_fee_in_euros = driver_eur;
        self.updated_at = ctx.now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeePolicy;
    use crate::money::RateTable;
    use rust_decimal_macros::dec;

    #[test]
    fn test_half_profit_includes_fuel() {
        let rates = RateTable::new();
        let policy = FeePolicy::default();

        let mut calc = Calculation::new("job-1");
        calc.fuel_cost = Some(dec!(300.00));
        calc.driver_fee = Some(dec!(150.00));
        calc.agent_fee_tier = Some(AgentFeeTier::HalfProfit);
        calc.normalize(&NormalizeContext::new(&rates, &policy, Utc::now()))
            .unwrap();

        let price = Some(dec!(3000.00));
        assert_eq!(calc.agent_fee_amount(price), dec!(1275.00));
        assert_eq!(calc.profit(price), dec!(1275.00));
    }

    #[test]
    fn test_flat_tier_profit() {
        let rates = RateTable::new().with_rate(Currency::Huf, dec!(0.0025)).unwrap();
        let policy = FeePolicy::default();

        let mut calc = Calculation::new("job-2");
        calc.fuel_cost = Some(dec!(20000));
        calc.fuel_currency = Currency::Huf;
        calc.driver_fee = Some(dec!(100.00));
        calc.agent_fee_tier = Some(AgentFeeTier::TenPercent);
        assert_eq!(calc.required_currencies().len(), 1);
        calc.normalize(&NormalizeContext::new(&rates, &policy, Utc::now()))
            .unwrap();

        // 2000 − 50 − 100 − 200
        assert_eq!(calc.profit(Some(dec!(2000.00))), dec!(1650.00));
    }

    #[test]
    fn test_job_without_eur_price() {
        let mut calc = Calculation::new("job-3");
        calc.agent_fee_tier = Some(AgentFeeTier::FivePercent);
        calc.fuel_cost_in_euros = Some(dec!(40));
        assert_eq!(calc.agent_fee_amount(None), dec!(0.00));
        assert_eq!(calc.profit(None), dec!(-40.00));
    }
}
