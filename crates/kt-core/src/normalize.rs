//! # Save-Time Normalization
//!
//! Every money-bearing record runs the same pipeline before it is stored.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. required_currencies()  → caller resolves rates (may hit network)    │
//! │  2. validate()             → field rules                                │
//! │  3. normalize(ctx)         → EUR twins, card fee, derived totals        │
//! │  4. persist                → storage, one transaction                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `normalize` computes every derived value before assigning any of them,
//! so an error leaves the record exactly as it was.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{CoreResult, ValidationError};
use crate::fees::FeePolicy;
use crate::money::{Currency, RateTable};

/// Everything a record needs from outside itself to normalize.
///
/// Built once per save: the fee policy is read fresh and the rates are
/// resolved before any record is touched.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub rates: &'a RateTable,
    pub fee_policy: &'a FeePolicy,
    pub now: DateTime<Utc>,
}

impl<'a> NormalizeContext<'a> {
    pub fn new(rates: &'a RateTable, fee_policy: &'a FeePolicy, now: DateTime<Utc>) -> Self {
        NormalizeContext {
            rates,
            fee_policy,
            now,
        }
    }
}

/// A record with one or more (amount, currency) pairs.
pub trait FinancialRecord {
    /// Short record name used in logs and errors ("job", "payment", ...).
    const KIND: &'static str;

    fn record_id(&self) -> &str;

    /// Non-EUR currencies this record needs a rate for. Pairs whose amount
    /// is absent are skipped.
    fn required_currencies(&self) -> BTreeSet<Currency>;

    /// Field-level checks. Runs before `normalize`.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Fills the EUR twins and derived amounts.
    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()>;
}

/// Collects the foreign currencies of the present amounts.
pub(crate) fn foreign_currencies<const N: usize>(
    pairs: [(Option<Decimal>, Currency); N],
) -> BTreeSet<Currency> {
    pairs
        .into_iter()
        .filter(|(amount, currency)| amount.is_some() && !currency.is_eur())
        .map(|(_, currency)| currency)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_foreign_currencies_skip_eur_and_absent_amounts() {
        let set = foreign_currencies([
            (Some(dec!(10)), Currency::Huf),
            (None, Currency::Gbp),
            (Some(dec!(1)), Currency::Eur),
            (Some(dec!(5)), Currency::Huf),
        ]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![Currency::Huf]);
    }
}
