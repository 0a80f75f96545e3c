//! # Save Pipeline
//!
//! Every money-bearing record goes through the same steps before it is
//! written.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         save_*(record, payments)                        │
//! │                                                                         │
//! │  1. validate        record and every payment; no I/O yet               │
//! │  2. fee policy      read fresh from settings                           │
//! │  3. rates           one lookup per foreign currency on any field       │
//! │                     RateUnavailable stops here, nothing written        │
//! │  4. normalize       EUR fields, card fee, agent fee, subtotal          │
//! │  5. hotel only      public reference checked or allocated              │
//! │  6. BEGIN                                                               │
//! │       read stored status; completed bookings are locked                │
//! │       upsert record                                                     │
//! │       upsert each payment (linked to the record)                       │
//! │     COMMIT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything that reads from the pool happens before `BEGIN`. The
//! transaction reads the stored status and then writes. Saving never changes
//! a booking's status: a new booking starts unconfirmed and an existing one
//! keeps what is stored. A completed booking cannot be saved again.

use std::sync::Arc;

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use kt_core::bedding::{collapse_allocations, total_beds};
use kt_core::validation::normalize_public_reference;
use kt_core::{
    BedAllocation, BedType, BookingKind, BookingRef, BookingStatus, Calculation, Expense,
    FinancialRecord, HotelBooking, Job, NormalizeContext, Payment, PaymentType, Shuttle,
    ShuttleDailyCost, PUBLIC_REFERENCE_LEN,
};
use kt_db::{Database, DbError};

use crate::clock::Clock;
use crate::conversion::resolve_rates;
use crate::error::{LedgerError, LedgerResult};
use crate::rates::{RateProvider, RateSource};

/// How many random public references to try before giving up.
pub const PUBLIC_REFERENCE_ATTEMPTS: u32 = 16;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A booking as written, with the payments saved alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<T> {
    pub record: T,
    pub payments: Vec<Payment>,
}

/// Agent fee and profit for one job's cost sheet, computed on read.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationSummary {
    pub calculation: Calculation,
    pub job_price_in_euros: Option<Decimal>,
    pub agent_fee: Decimal,
    pub profit: Decimal,
}

// =============================================================================
// Ledger
// =============================================================================

/// The back-office service: saves, status changes, deletions and reports.
pub struct Ledger<S> {
    pub(crate) db: Database,
    pub(crate) rates: RateProvider<S>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S> Ledger<S> {
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn rates(&self) -> &RateProvider<S> {
        &self.rates
    }
}

impl<S: RateSource> Ledger<S> {
    /// The ledger shares the provider's clock.
    pub fn new(db: Database, rates: RateProvider<S>) -> Self {
        let clock = Arc::clone(rates.clock());
        Ledger { db, rates, clock }
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    pub async fn save_job(&self, mut job: Job, mut payments: Vec<Payment>) -> LedgerResult<Saved<Job>> {
        attach(&mut payments, BookingRef::Job(job.id.clone()));
        self.prepare(&mut job, &mut payments).await?;

        let mut tx = self.db.begin().await?;
        let stored = self.db.jobs().fetch(&mut *tx, &job.id).await?;
        job.status = carried_status(BookingKind::Job, &job.id, stored.map(|b| b.status))?;
        self.db.jobs().upsert(&mut *tx, &job).await?;
        for payment in &payments {
            self.db.payments().upsert(&mut *tx, payment).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            job_id = %job.id,
            price_eur = ?job.job_price_in_euros,
            subtotal = %job.subtotal,
            payments = payments.len(),
            "Saved job"
        );
        Ok(Saved {
            record: job,
            payments,
        })
    }

    pub async fn save_shuttle(
        &self,
        mut shuttle: Shuttle,
        mut payments: Vec<Payment>,
    ) -> LedgerResult<Saved<Shuttle>> {
        attach(&mut payments, BookingRef::Shuttle(shuttle.id.clone()));
        self.prepare(&mut shuttle, &mut payments).await?;

        let mut tx = self.db.begin().await?;
        let stored = self.db.shuttles().fetch(&mut *tx, &shuttle.id).await?;
        shuttle.status = carried_status(BookingKind::Shuttle, &shuttle.id, stored.map(|b| b.status))?;
        self.db.shuttles().upsert(&mut *tx, &shuttle).await?;
        for payment in &payments {
            self.db.payments().upsert(&mut *tx, payment).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            shuttle_id = %shuttle.id,
            price_eur = ?shuttle.price_in_euros,
            payments = payments.len(),
            "Saved shuttle"
        );
        Ok(Saved {
            record: shuttle,
            payments,
        })
    }

    /// Saves a hotel booking, assigning its public reference on first save.
    pub async fn save_hotel_booking(
        &self,
        mut booking: HotelBooking,
        mut payments: Vec<Payment>,
    ) -> LedgerResult<Saved<HotelBooking>> {
        attach(&mut payments, BookingRef::Hotel(booking.id.clone()));
        self.prepare(&mut booking, &mut payments).await?;
        let reference = self.assign_public_reference(&mut booking).await?;

        let mut tx = self.db.begin().await?;
        let stored = self.db.hotel_bookings().fetch(&mut *tx, &booking.id).await?;
        booking.status = carried_status(BookingKind::Hotel, &booking.id, stored.map(|b| b.status))?;
        self.db
            .hotel_bookings()
            .upsert(&mut *tx, &booking)
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation() => LedgerError::DuplicatePublicReference(reference.clone()),
                e => e.into(),
            })?;
        for payment in &payments {
            self.db.payments().upsert(&mut *tx, payment).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            booking_id = %booking.id,
            public_id = %reference,
            hotel_price_eur = ?booking.hotel_price_in_euros,
            payments = payments.len(),
            "Saved hotel booking"
        );
        Ok(Saved {
            record: booking,
            payments,
        })
    }

    /// Replaces a hotel booking's bed allocations. Zero quantities are
    /// dropped and repeated bed types added together.
    pub async fn set_hotel_beds(
        &self,
        booking_id: &str,
        allocations: &[BedAllocation],
    ) -> LedgerResult<Vec<BedAllocation>> {
        let beds = collapse_allocations(allocations);

        let mut tx = self.db.begin().await?;
        let stored = self
            .db
            .hotel_bookings()
            .fetch(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("HotelBooking", booking_id))?;
        carried_status(BookingKind::Hotel, booking_id, Some(stored.status))?;
        self.db.bed_types().replace_for_booking(&mut *tx, booking_id, &beds).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(booking_id = %booking_id, beds = total_beds(&beds), "Saved hotel beds");
        Ok(beds)
    }

    /// Adds a bed type to the catalog.
    pub async fn add_bed_type(&self, name: &str) -> LedgerResult<BedType> {
        let bed_type = BedType::new(name);
        bed_type.validate()?;
        self.db.bed_types().insert(&bed_type).await?;
        Ok(bed_type)
    }

    // =========================================================================
    // Standalone Records
    // =========================================================================

    /// Saves one payment on its own, linked or not.
    pub async fn save_payment(&self, mut payment: Payment) -> LedgerResult<Payment> {
        self.prepare(&mut payment, &mut []).await?;

        let mut conn = self.db.acquire().await?;
        self.db.payments().upsert(&mut *conn, &payment).await?;

        info!(
            payment_id = %payment.id,
            complete = payment.is_complete(),
            amount_eur = ?payment.amount_in_euros,
            "Saved payment"
        );
        Ok(payment)
    }

    pub async fn save_expense(&self, mut expense: Expense) -> LedgerResult<Expense> {
        self.prepare(&mut expense, &mut []).await?;

        let mut conn = self.db.acquire().await?;
        self.db.expenses().upsert(&mut *conn, &expense).await?;

        info!(
            expense_id = %expense.id,
            expense_type = %expense.expense_type,
            amount_eur = ?expense.amount_in_euros,
            "Saved expense"
        );
        Ok(expense)
    }

    /// Saves what a driver is paid for one shuttle day.
    pub async fn save_shuttle_daily_cost(&self, mut cost: ShuttleDailyCost) -> LedgerResult<ShuttleDailyCost> {
        self.prepare(&mut cost, &mut []).await?;

        let mut conn = self.db.acquire().await?;
        self.db.shuttle_daily_costs().upsert(&mut *conn, &cost).await?;

        info!(
            cost_id = %cost.id,
            shuttle_date = %cost.shuttle_date,
            driver_fee_eur = ?cost.driver_fee_in_euros,
            "Saved shuttle daily cost"
        );
        Ok(cost)
    }

    /// Saves a job's cost sheet. The job must already exist.
    pub async fn save_calculation(&self, mut calc: Calculation) -> LedgerResult<Calculation> {
        self.prepare(&mut calc, &mut []).await?;

        let mut conn = self.db.acquire().await?;
        self.db.calculations().upsert(&mut *conn, &calc).await?;

        info!(job_id = %calc.job_id, "Saved calculation");
        Ok(calc)
    }

    // =========================================================================
    // Fee Helpers
    // =========================================================================

    /// Card fee on `amount` under the fee policy as stored right now.
    pub async fn compute_card_fee(
        &self,
        amount: Decimal,
        payment_type: Option<PaymentType>,
    ) -> LedgerResult<Decimal> {
        let policy = self.db.settings().fee_policy().await?;
        Ok(policy.card_fee(amount, payment_type))
    }

    // =========================================================================
    // Pipeline Steps
    // =========================================================================

    /// Validates, resolves rates and normalizes `record` and `payments`.
    /// Nothing is written.
    async fn prepare<R: FinancialRecord>(&self, record: &mut R, payments: &mut [Payment]) -> LedgerResult<()> {
        record.validate()?;
        let mut currencies = record.required_currencies();
        for payment in payments.iter() {
            payment.validate()?;
            currencies.extend(payment.required_currencies());
        }

        let policy = self.db.settings().fee_policy().await?;
        let rates = resolve_rates(&self.rates, &currencies).await?;
        let ctx = NormalizeContext::new(&rates, &policy, self.clock.now());

        record.normalize(&ctx)?;
        for payment in payments.iter_mut() {
            payment.normalize(&ctx)?;
        }

        debug!(
            kind = R::KIND,
            id = %record.record_id(),
            currencies = currencies.len(),
            "Normalized record"
        );
        Ok(())
    }

    /// Upper-cases an existing public reference, or draws a fresh one.
    async fn assign_public_reference(&self, booking: &mut HotelBooking) -> LedgerResult<String> {
        let hotels = self.db.hotel_bookings();

        if let Some(existing) = booking.public_id.as_deref() {
            let reference = normalize_public_reference(existing)?;
            if hotels.public_id_exists(&reference, Some(booking.id.as_str())).await? {
                return Err(LedgerError::DuplicatePublicReference(reference));
            }
            booking.public_id = Some(reference.clone());
            return Ok(reference);
        }

        for attempt in 1..=PUBLIC_REFERENCE_ATTEMPTS {
            let candidate = random_reference();
            if !hotels.public_id_exists(&candidate, Some(booking.id.as_str())).await? {
                booking.public_id = Some(candidate.clone());
                return Ok(candidate);
            }
            debug!(attempt, "Public reference collision, drawing again");
        }

        Err(LedgerError::PublicReferenceExhausted {
            attempts: PUBLIC_REFERENCE_ATTEMPTS,
        })
    }
}

impl<S> Ledger<S> {
    /// Agent fee and profit for a job's cost sheet against the job's
    /// current EUR price.
    pub async fn calculation_summary(&self, job_id: &str) -> LedgerResult<CalculationSummary> {
        let job = self
            .db
            .jobs()
            .get(job_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Job", job_id))?;
        let calculation = self
            .db
            .calculations()
            .get_for_job(job_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Calculation", job_id))?;

        let price = job.job_price_in_euros;
        Ok(CalculationSummary {
            agent_fee: calculation.agent_fee_amount(price),
            profit: calculation.profit(price),
            job_price_in_euros: price,
            calculation,
        })
    }

    pub async fn hotel_beds(&self, booking_id: &str) -> LedgerResult<Vec<BedAllocation>> {
        Ok(self.db.bed_types().list_for_booking(booking_id).await?)
    }

    /// Customer-facing lookup. Case does not matter.
    pub async fn find_hotel_booking(&self, public_reference: &str) -> LedgerResult<HotelBooking> {
        let reference = normalize_public_reference(public_reference)?;
        self.db
            .hotel_bookings()
            .find_by_public_id(&reference)
            .await?
            .ok_or_else(|| LedgerError::not_found("HotelBooking", reference))
    }
}

/// The status a save carries forward: the stored one, or unconfirmed for a
/// new booking.
fn carried_status(kind: BookingKind, id: &str, stored: Option<BookingStatus>) -> LedgerResult<BookingStatus> {
    match stored {
        Some(BookingStatus::Completed) => {
            warn!(%kind, id = %id, "Edit of completed booking refused");
            Err(LedgerError::Locked {
                kind,
                id: id.to_string(),
            })
        }
        Some(status) => Ok(status),
        None => Ok(BookingStatus::default()),
    }
}

fn attach(payments: &mut [Payment], booking: BookingRef) {
    for payment in payments {
        payment.booking = Some(booking.clone());
    }
}

/// Eight random upper-case letters and digits.
fn random_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..PUBLIC_REFERENCE_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
