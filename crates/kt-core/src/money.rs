//! # Money Module
//!
//! Currencies, cent quantization and EUR conversion arithmetic.
//!
//! ## EUR Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every (amount, currency) field pair gets a EUR twin at save time:      │
//! │                                                                         │
//! │    amount = None            →  eur = None   (no rate lookup)            │
//! │    currency = EUR           →  eur = quantize(amount)                   │
//! │    otherwise                →  eur = quantize(amount × rate)            │
//! │                                                                         │
//! │  quantize = round to 0.01, half away from zero ("half-up")              │
//! │    12.345 → 12.35      12.344 → 12.34      -0.005 → -0.01               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are `rust_decimal::Decimal` end to end. No floats touch money.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};

/// Decimal places kept on every stored money amount.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept on a stored to-EUR rate. At this scale the rate
/// error stays under a cent for amounts up to a billion units.
pub const RATE_DP: u32 = 12;

// =============================================================================
// Rounding
// =============================================================================

/// Rounds to cents, half away from zero.
#[inline]
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a to-EUR rate to its stored precision.
#[inline]
pub fn quantize_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Currency
// =============================================================================

/// Currencies the business takes and pays in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Gbp,
    Huf,
    Usd,
}

impl Currency {
    /// Every supported currency, EUR first.
    pub const ALL: [Currency; 4] = [Currency::Eur, Currency::Gbp, Currency::Huf, Currency::Usd];

    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Huf => "HUF",
            Currency::Usd => "USD",
        }
    }

    #[inline]
    pub const fn is_eur(&self) -> bool {
        matches!(self, Currency::Eur)
    }

    /// Every supported currency except EUR.
    pub fn foreign() -> impl Iterator<Item = Currency> {
        Currency::ALL.into_iter().filter(|c| !c.is_eur())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Eur
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "HUF" => Ok(Currency::Huf),
            "USD" => Ok(Currency::Usd),
            _ => Err(ValidationError::not_allowed(
                "currency",
                &["EUR", "GBP", "HUF", "USD"],
            )),
        }
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts an optional amount to EUR with a known to-EUR rate.
///
/// The rate is ignored for EUR amounts, which are only quantized.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use kt_core::money::{to_eur, Currency};
///
/// let rate = Decimal::new(11625, 4); // 1 GBP = 1.1625 EUR
/// let eur = to_eur(Some(Decimal::new(10000, 2)), Currency::Gbp, rate);
/// assert_eq!(eur, Some(Decimal::new(11625, 2)));
///
/// assert_eq!(to_eur(None, Currency::Gbp, rate), None);
/// ```
pub fn to_eur(amount: Option<Decimal>, currency: Currency, rate: Decimal) -> Option<Decimal> {
    let amount = amount?;
    if currency.is_eur() {
        Some(quantize(amount))
    } else {
        Some(quantize(amount * rate))
    }
}

// =============================================================================
// Rate Table
// =============================================================================

/// The to-EUR rates resolved for one save.
///
/// Built by the caller before normalization so that every network lookup
/// has already succeeded (or failed) before a record is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: HashMap<Currency, Decimal>,
}

impl RateTable {
    /// A table holding only EUR → EUR = 1.
    pub fn new() -> Self {
        let mut rates = HashMap::new();
        rates.insert(Currency::Eur, Decimal::ONE);
        RateTable { rates }
    }

    /// Records the to-EUR rate for a currency.
    ///
    /// EUR is always 1 and cannot be overridden.
    pub fn insert(&mut self, currency: Currency, rate: Decimal) -> CoreResult<()> {
        if currency.is_eur() {
            return Ok(());
        }
        if rate <= Decimal::ZERO {
            return Err(CoreError::InvalidRate { currency, rate });
        }
        self.rates.insert(currency, rate);
        Ok(())
    }

    /// Builder form of [`RateTable::insert`].
    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> CoreResult<Self> {
        self.insert(currency, rate)?;
        Ok(self)
    }

    /// Returns the to-EUR rate for a currency.
    pub fn rate(&self, currency: Currency) -> CoreResult<Decimal> {
        self.rates
            .get(&currency)
            .copied()
            .ok_or(CoreError::MissingRate(currency))
    }

    /// Converts one field pair. `None` amounts never need a rate.
    pub fn convert(&self, amount: Option<Decimal>, currency: Currency) -> CoreResult<Option<Decimal>> {
        match amount {
            None => Ok(None),
            Some(_) => Ok(to_eur(amount, currency, self.rate(currency)?)),
        }
    }

    /// Whether the table can convert the currency.
    pub fn contains(&self, currency: Currency) -> bool {
        self.rates.contains_key(&currency)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        RateTable::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantize_rounds_half_up() {
        assert_eq!(quantize(dec!(12.345)), dec!(12.35));
        assert_eq!(quantize(dec!(12.344)), dec!(12.34));
        assert_eq!(quantize(dec!(0.125)), dec!(0.13));
        assert_eq!(quantize(dec!(-0.005)), dec!(-0.01));
        assert_eq!(quantize(dec!(7)), dec!(7.00));
    }

    #[test]
    fn test_eur_amounts_pass_through() {
        for amount in [dec!(0), dec!(1000.00), dec!(19.999), dec!(0.001)] {
            assert_eq!(
                to_eur(Some(amount), Currency::Eur, dec!(123.456)),
                Some(quantize(amount))
            );
        }
    }

    #[test]
    fn test_foreign_amount_is_multiplied_and_quantized() {
        // 100,000 HUF at 0.002535 EUR/HUF = 253.50
        assert_eq!(
            to_eur(Some(dec!(100000)), Currency::Huf, dec!(0.002535)),
            Some(dec!(253.50))
        );
        // 33.33 USD at 0.921234 = 30.704729... → 30.70
        assert_eq!(
            to_eur(Some(dec!(33.33)), Currency::Usd, dec!(0.921234)),
            Some(dec!(30.70))
        );
    }

    #[test]
    fn test_large_huf_amount_keeps_its_cents() {
        // The API quotes 1 EUR = 395.37 HUF
        let rate = quantize_rate(Decimal::ONE / dec!(395.37));
        assert_eq!(rate, dec!(0.002529276374));
        // 1,000,000 / 395.37 = 2529.2764...
        assert_eq!(to_eur(Some(dec!(1000000)), Currency::Huf, rate), Some(dec!(2529.28)));
        assert_eq!(to_eur(Some(dec!(250000000)), Currency::Huf, rate), Some(dec!(632319.09)));
    }

    #[test]
    fn test_none_amount_needs_no_rate() {
        let table = RateTable::new();
        assert_eq!(table.convert(None, Currency::Gbp).unwrap(), None);
        assert!(matches!(
            table.convert(Some(dec!(1)), Currency::Gbp),
            Err(CoreError::MissingRate(Currency::Gbp))
        ));
    }

    #[test]
    fn test_rate_table_keeps_eur_at_one() {
        let table = RateTable::new()
            .with_rate(Currency::Eur, dec!(2))
            .unwrap()
            .with_rate(Currency::Gbp, dec!(1.17))
            .unwrap();
        assert_eq!(table.rate(Currency::Eur).unwrap(), Decimal::ONE);
        assert_eq!(table.rate(Currency::Gbp).unwrap(), dec!(1.17));
    }

    #[test]
    fn test_rate_table_rejects_non_positive_rates() {
        let mut table = RateTable::new();
        assert!(table.insert(Currency::Usd, Decimal::ZERO).is_err());
        assert!(table.insert(Currency::Usd, dec!(-1)).is_err());
        assert!(!table.contains(Currency::Usd));
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(" HUF ".parse::<Currency>().unwrap(), Currency::Huf);
        assert!("CHF".parse::<Currency>().is_err());
        assert_eq!(Currency::Gbp.to_string(), "GBP");
        assert_eq!(Currency::foreign().count(), 3);
    }
}
