//! # Repository Module
//!
//! Database repositories for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  kt-ledger service                                                      │
//! │       │                                                                 │
//! │       │  db.jobs().get("uuid")                                          │
//! │       ▼                                                                 │
//! │  JobRepository                                                          │
//! │  ├── get(&self, id)                   reads: pool                       │
//! │  ├── list_between(&self, from, to)                                      │
//! │  ├── upsert(&self, conn, job)         writes: caller's connection       │
//! │  └── update_status(&self, conn, id, status)                             │
//! │       │                                                                 │
//! │       │  Row struct ──TryFrom──► domain type                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`people::PersonRepository`] - Agents, drivers, staff
//! - [`job::JobRepository`] - Jobs
//! - [`shuttle::ShuttleRepository`] - Shuttles
//! - [`hotel::HotelBookingRepository`] - Hotel bookings and public references
//! - [`bed_type::BedTypeRepository`] - Bed type catalog and hotel bed allocations
//! - [`payment::PaymentRepository`] - Payments per booking
//! - [`calculation::CalculationRepository`] - Per-job cost sheets
//! - [`expense::ExpenseRepository`] - Business expenses
//! - [`shuttle_cost::ShuttleDailyCostRepository`] - Driver costs per shuttle day
//! - [`exchange_rate::ExchangeRateRepository`] - Daily to-EUR rates
//! - [`settings::SettingsRepository`] - Fee policy and shuttle pricing

pub mod bed_type;
pub mod calculation;
pub mod exchange_rate;
pub mod expense;
pub mod hotel;
pub mod job;
pub mod payment;
pub mod people;
pub mod settings;
pub mod shuttle;
pub mod shuttle_cost;
