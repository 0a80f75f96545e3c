//! # kt-ledger: Services for the KT Back Office
//!
//! The async layer between the web forms and storage. It owns the network
//! (daily exchange rates) and every write that involves money.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KT Back Office Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Web layer (forms, views, login)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kt-ledger (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   rates   │  │ lifecycle │  │transitions│  │  reports  │  │   │
//! │  │   │ provider  │─►│ save_*    │  │ status    │  │ month /   │  │   │
//! │  │   │ cache/api │  │ one tx    │  │ delete    │  │ year / all│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌──────────────────────┐  ┌───▼──────────────────────────────────┐    │
//! │  │ kt-core (rules)      │  │ kt-db (SQLite)                       │    │
//! │  └──────────────────────┘  └──────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `kt.toml` and `KT_*` environment overrides
//! - [`rates`] - Rate source, TTL cache and the provider
//! - [`conversion`] - `to_eur` and per-save rate tables
//! - [`lifecycle`] - The [`Ledger`] and its save pipeline
//! - [`transitions`] - Status changes and deletion
//! - [`reports`] - Income and profit reports
//! - [`clock`] - Wall clock, swappable in tests
//! - [`error`] - [`LedgerError`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kt_ledger::{Ledger, LedgerConfig};
//! use kt_ledger::clock::{Clock, SystemClock};
//! use kt_ledger::rates::{ExchangeRateApi, MemoryCache, RateProvider};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = kt_db::Database::new(config.db_config()).await?;
//!
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let cache = Arc::new(MemoryCache::new(clock.clone()));
//! let source = ExchangeRateApi::new(&config.rates)?;
//! let ledger = Ledger::new(db.clone(), RateProvider::new(source, cache, clock, db));
//!
//! let saved = ledger.save_job(job, payments).await?;
//! ledger.apply_event(&BookingRef::Job(saved.record.id), StatusEvent::Confirm).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod conversion;
pub mod error;
pub mod lifecycle;
pub mod rates;
pub mod reports;
pub mod transitions;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use conversion::{resolve_rates, to_eur};
pub use error::{LedgerError, LedgerResult};
pub use lifecycle::{CalculationSummary, Ledger, Saved};
pub use rates::{RateProvider, RateSource};
