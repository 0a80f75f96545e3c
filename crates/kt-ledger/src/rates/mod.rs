//! # Exchange Rates
//!
//! Daily to-EUR rates, looked up in three tiers.
//!
//! ## Lookup Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         get_rate(currency)                              │
//! │                                                                         │
//! │  EUR ───────────────────────────────────────────────────────► 1.00     │
//! │                                                                         │
//! │  1. CacheStore   key exchange_rate:{CUR}:{budapest date}     ──► hit   │
//! │         │ miss                                                          │
//! │  2. exchange_rates table, today's row                        ──► hit   │
//! │         │ miss                   (re-cached until midnight)             │
//! │  3. RateSource (HTTP, base EUR)                                         │
//! │         │ every currency in the response is stored and cached           │
//! │         ▼                                                               │
//! │     rate, or RateUnavailable                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cache entries expire at the next Budapest midnight. Two callers racing
//! on a cold key may both fetch; both write the same value.

pub mod cache;
pub mod provider;
pub mod source;

pub use cache::{CacheStore, MemoryCache};
pub use provider::RateProvider;
pub use source::{ExchangeRateApi, RateSource, RateSourceError};
