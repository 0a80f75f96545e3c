//! # Money Conversion
//!
//! EUR amounts for currency-tagged fields. Each field carries its own
//! currency, so two fields on one record may need two different rates.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::debug;

use kt_core::money::{self, quantize};
use kt_core::{Currency, RateTable};

use crate::error::LedgerResult;
use crate::rates::{RateProvider, RateSource};

/// `amount` in EUR, rounded half-up to cents.
///
/// A missing amount converts to nothing without touching the provider.
/// `RateUnavailable` from the provider is passed through unchanged.
pub async fn to_eur<S: RateSource>(
    provider: &RateProvider<S>,
    amount: Option<Decimal>,
    currency: Currency,
) -> LedgerResult<Option<Decimal>> {
    let Some(amount) = amount else {
        return Ok(None);
    };
    if currency.is_eur() {
        return Ok(Some(quantize(amount)));
    }

    let rate = provider.get_rate(currency).await?;
    Ok(money::to_eur(Some(amount), currency, rate))
}

/// Looks up every currency a save needs, before anything is written.
pub async fn resolve_rates<S: RateSource>(
    provider: &RateProvider<S>,
    currencies: &BTreeSet<Currency>,
) -> LedgerResult<RateTable> {
    let mut table = RateTable::new();
    for &currency in currencies {
        if table.contains(currency) {
            continue;
        }
        let rate = provider.get_rate(currency).await?;
        table.insert(currency, rate)?;
    }
    debug!(currencies = currencies.len(), "Resolved rate table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::test_support::{db, provider, utc, FakeSource};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_to_eur() {
        let (_clock, rates) = provider(FakeSource::standard(), utc(2026, 5, 4, 8, 0), db().await);

        assert_eq!(to_eur(&rates, Some(dec!(20000)), Currency::Huf).await.unwrap(), Some(dec!(50.00)));
        // 19.99 × 0.92 = 18.3908
        assert_eq!(to_eur(&rates, Some(dec!(19.99)), Currency::Usd).await.unwrap(), Some(dec!(18.39)));
        // 0.5 × 1.17 = 0.585, half-up
        assert_eq!(to_eur(&rates, Some(dec!(0.5)), Currency::Gbp).await.unwrap(), Some(dec!(0.59)));
        assert_eq!(to_eur(&rates, Some(dec!(12.345)), Currency::Eur).await.unwrap(), Some(dec!(12.35)));
    }

    #[tokio::test]
    async fn test_missing_amount_never_looks_up() {
        let (_clock, rates) = provider(FakeSource::failing(), utc(2026, 5, 4, 8, 0), db().await);

        assert_eq!(to_eur(&rates, None, Currency::Huf).await.unwrap(), None);
        assert_eq!(to_eur(&rates, Some(dec!(10)), Currency::Eur).await.unwrap(), Some(dec!(10.00)));
        assert_eq!(rates.source().fetch_count(), 0);

        let err = to_eur(&rates, Some(dec!(10)), Currency::Huf).await.unwrap_err();
        assert!(matches!(err, LedgerError::RateUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_resolve_rates() {
        let (_clock, rates) = provider(FakeSource::standard(), utc(2026, 5, 4, 8, 0), db().await);
        let wanted: BTreeSet<Currency> = [Currency::Huf, Currency::Gbp].into_iter().collect();

        let table = resolve_rates(&rates, &wanted).await.unwrap();
        assert_eq!(table.rate(Currency::Huf).unwrap(), dec!(0.0025));
        assert_eq!(table.rate(Currency::Gbp).unwrap(), dec!(1.17));
        assert!(!table.contains(Currency::Usd));
        assert!(table.contains(Currency::Eur));
    }
}
