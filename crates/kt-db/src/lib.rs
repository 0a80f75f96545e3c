//! # kt-db: Database Layer for the KT Back Office
//!
//! This crate provides database access for the back office.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KT Back Office Data Flow                         │
//! │                                                                         │
//! │  kt-ledger (save pipeline, status service)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kt-db (THIS CRATE)                          │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ JobRepo       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PaymentRepo   │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ RateRepo ...  │    │ 002_costs    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kt.db)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reads and Writes
//!
//! Reads go through the pool. Writes take a `&mut SqliteConnection` so the
//! caller can put a booking and its payments in one transaction:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! db.jobs().upsert(&mut *tx, &job).await?;
//! for payment in &payments {
//!     db.payments().upsert(&mut *tx, payment).await?;
//! }
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

mod codec;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Connection type taken by the write methods and `fetch` reads
pub use sqlx::SqliteConnection;

// Repository re-exports for convenience
pub use repository::bed_type::BedTypeRepository;
pub use repository::calculation::CalculationRepository;
pub use repository::exchange_rate::{ExchangeRateRepository, StoredRate};
pub use repository::expense::ExpenseRepository;
pub use repository::hotel::HotelBookingRepository;
pub use repository::job::JobRepository;
pub use repository::payment::PaymentRepository;
pub use repository::people::PersonRepository;
pub use repository::settings::SettingsRepository;
pub use repository::shuttle::ShuttleRepository;
pub use repository::shuttle_cost::ShuttleDailyCostRepository;
