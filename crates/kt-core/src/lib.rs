//! # kt-core: Pure Business Logic for the KT Back Office
//!
//! This crate holds the money rules of the back office as pure functions
//! with zero I/O dependencies: EUR normalization, card and agent fees,
//! profit figures, and the booking status machine.
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
//! │  │                    kt-ledger (services)                         │   │
//! │  │   rate provider, save pipeline, status transitions, reports    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kt-core (THIS CRATE) ★                          │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   fees    │  │  status   │  │ normalize │  │   │
//! │  │   │ Currency  │  │ FeePolicy │  │  Booking  │  │ Financial │  │   │
//! │  │   │ RateTable │  │ AgentTier │  │  Status   │  │  Record   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kt-db (Database Layer)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Currencies, cent quantization, rate tables
//! - [`calendar`] - Budapest calendar day helpers
//! - [`fees`] - Card fee, agent fee tiers, subtotal and profit
//! - [`status`] - Booking status machine
//! - [`bedding`] - Hotel bed type catalog and per-booking allocations
//! - [`booking`], [`payment`], [`expense`], [`calculation`], [`people`] - Domain records
//! - [`normalize`] - Save-time normalization shared by every money record
//! - [`report`] - Income/profit aggregation
//! - [`shuttle_day`] - Driver costs per shuttle day and the day summary
//! - [`validation`] - Field validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use kt_core::fees::{agent_fee, job_subtotal, AgentFeeTier};
//!
//! let price = Decimal::new(100000, 2); // 1000.00 EUR
//! let driver_fee = Decimal::new(5000, 2); // 50.00 EUR
//!
//! let fee = agent_fee(Some(AgentFeeTier::FivePercent), price, Some(driver_fee), None);
//! assert_eq!(fee, Decimal::new(5000, 2));
//! assert_eq!(job_subtotal(price, Some(driver_fee), fee), Decimal::new(90000, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bedding;
pub mod booking;
pub mod calculation;
pub mod calendar;
pub mod error;
pub mod expense;
pub mod fees;
pub mod money;
pub mod normalize;
pub mod payment;
pub mod people;
pub mod report;
pub mod shuttle_day;
pub mod status;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bedding::{BedAllocation, BedType};
pub use booking::{HotelBooking, Job, Shuttle, ShuttleConfig, ShuttleDirection, VehicleType};
pub use calculation::Calculation;
pub use error::{CoreError, CoreResult, TransitionError, ValidationError};
pub use expense::{Expense, ExpenseType};
pub use fees::{AgentFeeTier, FeePolicy, PaymentType};
pub use money::{Currency, RateTable};
pub use normalize::{FinancialRecord, NormalizeContext};
pub use payment::{BookingRef, Payment, Recipient};
pub use people::{Person, PersonKind};
pub use report::{FinancialReport, ReportPeriod};
pub use shuttle_day::{ShuttleDailyCost, ShuttleDaySummary};
pub use status::{Actor, BookingKind, BookingStatus, StatusEvent, StatusFlags, TransitionContext};

use rust_decimal::Decimal;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Card surcharge used when no fee policy row has been saved yet (7.00%).
pub const DEFAULT_CARD_FEE_PERCENTAGE: Decimal = Decimal::from_parts(700, 0, 0, false, 2);

/// What a hotel customer pays the agency by default (20.00 EUR).
pub const DEFAULT_CUSTOMER_PAYS: Decimal = Decimal::from_parts(2000, 0, 0, false, 2);

/// Default shuttle seat price (60.00 EUR).
pub const DEFAULT_PRICE_PER_PASSENGER: Decimal = Decimal::from_parts(6000, 0, 0, false, 2);

/// Length of the customer-facing hotel booking reference.
pub const PUBLIC_REFERENCE_LEN: usize = 8;
