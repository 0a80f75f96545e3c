//! # Rate Source
//!
//! The external exchange-rate API. One GET returns the whole table for base
//! EUR:
//!
//! ```text
//! GET {api_base_url}/{api_key}/latest/EUR
//!
//! { "result": "success",
//!   "base_code": "EUR",
//!   "conversion_rates": { "EUR": 1, "HUF": 400.0, "USD": 1.087, ... } }
//! ```
//!
//! The API quotes `1 EUR = x CUR`. We store the multiplier the other way
//! round (`1 CUR = 1/x EUR`) at twelve decimal places.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use kt_core::money::quantize_rate;
use kt_core::Currency;

use crate::config::RateSettings;
use crate::error::{LedgerError, LedgerResult};

/// Why a fetch produced no table.
#[derive(Debug, Error)]
pub enum RateSourceError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("rate API answered HTTP {0}")]
    Status(u16),

    #[error("rate API reported an error: {0}")]
    Api(String),

    #[error("malformed rate response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RateSourceError {
    fn from(err: reqwest::Error) -> Self {
        RateSourceError::Http(err.to_string())
    }
}

/// Where daily rates come from.
pub trait RateSource: Send + Sync {
    /// To-EUR multipliers for every supported non-EUR currency the source
    /// knows about.
    fn fetch_to_eur(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<Currency, Decimal>, RateSourceError>> + Send;
}

// =============================================================================
// HTTP Source
// =============================================================================

pub struct ExchangeRateApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRateApi {
    pub fn new(settings: &RateSettings) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| LedgerError::Config(format!("HTTP client initialisation failed: {e}")))?;

        Ok(ExchangeRateApi {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}/{}/latest/EUR", self.base_url, self.api_key)
    }
}

impl RateSource for ExchangeRateApi {
    async fn fetch_to_eur(&self) -> Result<BTreeMap<Currency, Decimal>, RateSourceError> {
        // The key is part of the path; keep it out of the logs.
        debug!(base_url = %self.base_url, "Requesting EUR rate table");

        let response = self.client.get(self.latest_url()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Rejected keys and quota errors still carry an error-type body
            return match serde_json::from_str::<LatestResponse>(&body) {
                Ok(LatestResponse { error_type: Some(kind), .. }) => Err(RateSourceError::Api(kind)),
                _ => Err(RateSourceError::Status(status.as_u16())),
            };
        }

        parse_conversion_rates(&body)
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

/// Body of `GET .../latest/EUR`, success or error.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, Decimal>>,
}

/// Extracts to-EUR multipliers from a `latest/EUR` response body.
///
/// Unknown currency codes are ignored. Zero or negative quotes are dropped,
/// which later surfaces as `RateUnavailable` for that currency.
pub fn parse_conversion_rates(body: &str) -> Result<BTreeMap<Currency, Decimal>, RateSourceError> {
    let response: LatestResponse =
        serde_json::from_str(body).map_err(|e| RateSourceError::Malformed(e.to_string()))?;

    if response.result.as_deref() == Some("error") {
        let kind = response.error_type.unwrap_or_else(|| "unknown".to_string());
        return Err(RateSourceError::Api(kind));
    }

    let quotes = response
        .conversion_rates
        .ok_or_else(|| RateSourceError::Malformed("missing conversion_rates object".into()))?;

    let mut rates = BTreeMap::new();
    for currency in Currency::foreign() {
        let Some(&quote) = quotes.get(currency.code()) else {
            continue;
        };

        if quote <= Decimal::ZERO {
            debug!(currency = %currency, %quote, "Dropping non-positive quote");
            continue;
        }
        if let Some(to_eur) = Decimal::ONE.checked_div(quote) {
            rates.insert(currency, quantize_rate(to_eur));
        }
    }

    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_inverts_quotes() {
        let body = json!({
            "result": "success",
            "base_code": "EUR",
            "conversion_rates": {
                "EUR": 1,
                "HUF": 400.0,
                "USD": 1.087,
                "GBP": 0.8,
                "JPY": 160.2
            }
        });

        let rates = parse_conversion_rates(&body.to_string()).unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates[&Currency::Huf], dec!(0.0025));
        assert_eq!(rates[&Currency::Gbp], dec!(1.25));
        // 1 / 1.087 = 0.9199632014719...
        assert_eq!(rates[&Currency::Usd], dec!(0.919963201472));
        assert!(!rates.contains_key(&Currency::Eur));
    }

    #[test]
    fn test_missing_and_zero_quotes_are_dropped() {
        let body = json!({ "conversion_rates": { "HUF": 0, "GBP": -1.0 } });
        let rates = parse_conversion_rates(&body.to_string()).unwrap();
        assert!(rates.is_empty());
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            parse_conversion_rates(&json!({ "rates": {} }).to_string()),
            Err(RateSourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_conversion_rates(&json!({ "conversion_rates": { "HUF": "lots" } }).to_string()),
            Err(RateSourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_conversion_rates(&json!({ "result": "error", "error-type": "invalid-key" }).to_string()),
            Err(RateSourceError::Api(kind)) if kind == "invalid-key"
        ));
        assert!(matches!(
            parse_conversion_rates("<html>Bad Gateway</html>"),
            Err(RateSourceError::Malformed(_))
        ));
    }

    #[test]
    fn test_quotes_sent_as_strings() {
        let body = r#"{ "result": "success", "conversion_rates": { "HUF": "395.37", "USD": 1.25 } }"#;
        let rates = parse_conversion_rates(body).unwrap();
        assert_eq!(rates[&Currency::Usd], dec!(0.8));
        // 1 / 395.37 = 0.00252927637403...
        assert_eq!(rates[&Currency::Huf], dec!(0.002529276374));
    }

    #[test]
    fn test_latest_url_trims_trailing_slash() {
        let settings = RateSettings {
            api_base_url: "https://rates.example/v6/".to_string(),
            api_key: "k123".to_string(),
            timeout_secs: 5,
        };
        let api = ExchangeRateApi::new(&settings).unwrap();
        assert_eq!(api.latest_url(), "https://rates.example/v6/k123/latest/EUR");
    }
}
