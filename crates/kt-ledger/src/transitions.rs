//! # Status Transitions and Deletion
//!
//! Status changes read the stored booking and its payments, run the rules
//! in [`kt_core::status`], and write only the new status. The read, the
//! check and the write share one transaction. A rejected change rolls back
//! and reports the rule it broke.

use tracing::{info, warn};

use kt_core::payment::any_complete;
use kt_core::status::{can_delete, transition_status};
use kt_core::{Actor, BookingRef, BookingStatus, StatusEvent, StatusFlags, TransitionContext};
use kt_db::{Database, DbError, SqliteConnection};

use crate::error::{LedgerError, LedgerResult};
use crate::lifecycle::Ledger;

/// What the rules need to know about a stored booking.
#[derive(Debug, Clone, Copy)]
struct BookingState {
    status: BookingStatus,
    driver_assigned: bool,
}

impl<S> Ledger<S> {
    /// Requests an explicit set of status flags.
    pub async fn transition(&self, booking: &BookingRef, target: StatusFlags) -> LedgerResult<BookingStatus> {
        self.change_status(booking, |_| target).await
    }

    /// Applies a named change (confirm, mark paid, ...).
    pub async fn apply_event(&self, booking: &BookingRef, event: StatusEvent) -> LedgerResult<BookingStatus> {
        self.change_status(booking, |current| event.target(current)).await
    }

    /// Deletes a booking and its payments.
    ///
    /// Confirmed bookings can only be removed by a superuser.
    pub async fn delete_booking(&self, booking: &BookingRef, actor: Actor) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;
        let state = load_state(&self.db, &mut *tx, booking).await?;
        if !can_delete(state.status, actor) {
            warn!(kind = %booking.kind(), id = %booking.id(), ?actor, "Delete refused");
            return Err(LedgerError::PermissionDenied(format!(
                "{} {} is {}; only a superuser can delete it",
                booking.kind(),
                booking.id(),
                state.status
            )));
        }

        match booking {
            BookingRef::Job(id) => self.db.jobs().delete(&mut *tx, id).await?,
            BookingRef::Shuttle(id) => self.db.shuttles().delete(&mut *tx, id).await?,
            BookingRef::Hotel(id) => self.db.hotel_bookings().delete(&mut *tx, id).await?,
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(kind = %booking.kind(), id = %booking.id(), ?actor, "Deleted booking");
        Ok(())
    }

    async fn change_status(
        &self,
        booking: &BookingRef,
        target: impl FnOnce(BookingStatus) -> StatusFlags,
    ) -> LedgerResult<BookingStatus> {
        let mut tx = self.db.begin().await?;
        let state = load_state(&self.db, &mut *tx, booking).await?;
        let target = target(state.status);

        let payments = self.db.payments().fetch_for(&mut *tx, booking).await?;
        let ctx = TransitionContext::new(booking.kind())
            .with_driver(state.driver_assigned)
            .with_complete_payment(any_complete(&payments));

        let next = match transition_status(state.status, target, &ctx) {
            Ok(next) => next,
            Err(rule) => {
                warn!(
                    kind = %booking.kind(),
                    id = %booking.id(),
                    from = %state.status,
                    ?target,
                    %rule,
                    "Status change rejected"
                );
                return Err(rule.into());
            }
        };

        if next == state.status {
            return Ok(next);
        }

        match booking {
            BookingRef::Job(id) => self.db.jobs().update_status(&mut *tx, id, next).await?,
            BookingRef::Shuttle(id) => self.db.shuttles().update_status(&mut *tx, id, next).await?,
            BookingRef::Hotel(id) => {
                self.db.hotel_bookings().update_status(&mut *tx, id, next).await?
            }
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            kind = %booking.kind(),
            id = %booking.id(),
            from = %state.status,
            to = %next,
            "Status changed"
        );
        Ok(next)
    }
}

async fn load_state(
    db: &Database,
    conn: &mut SqliteConnection,
    booking: &BookingRef,
) -> LedgerResult<BookingState> {
    let state = match booking {
        BookingRef::Job(id) => db.jobs().fetch(conn, id).await?.map(|job| BookingState {
            status: job.status,
            driver_assigned: job.driver_assigned(),
        }),
        BookingRef::Shuttle(id) => db.shuttles().fetch(conn, id).await?.map(|shuttle| BookingState {
            status: shuttle.status,
            driver_assigned: shuttle.driver_assigned(),
        }),
        BookingRef::Hotel(id) => db.hotel_bookings().fetch(conn, id).await?.map(|hotel| BookingState {
            status: hotel.status,
            driver_assigned: false,
        }),
    };
    state.ok_or_else(|| LedgerError::not_found(booking.kind().as_str(), booking.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ledger_at, utc, FakeSource};
    use chrono::{Duration, NaiveDate, NaiveTime};
    use kt_core::{
        Currency, HotelBooking, Job, Payment, PaymentType, Person, PersonKind, Recipient,
        TransitionError,
    };
    use rust_decimal_macros::dec;

    async fn setup() -> (Ledger<FakeSource>, Person, BookingRef) {
        let (_clock, ledger) = ledger_at(utc(2026, 5, 4, 7, 0)).await;
        let driver = Person::new(PersonKind::Driver, "Laci");
        ledger.db().people().insert(&driver).await.unwrap();

        let job = Job::new(
            "Anna Kovacs",
            "+36 30 123 4567",
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            dec!(120),
            Currency::Eur,
        );
        let saved = ledger.save_job(job, vec![]).await.unwrap();
        let booking = BookingRef::Job(saved.record.id);
        (ledger, driver, booking)
    }

    fn paid_in_full(booking: &BookingRef, driver: &Person) -> Payment {
        Payment::complete(
            Some(booking.clone()),
            dec!(120),
            Currency::Eur,
            PaymentType::Cash,
            Recipient::Driver(driver.id.clone()),
        )
    }

    async fn stored_status(ledger: &Ledger<FakeSource>, booking: &BookingRef) -> BookingStatus {
        ledger.db().jobs().get(booking.id()).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_completed_before_paid_changes_nothing() {
        let (ledger, _driver, booking) = setup().await;

        let err = ledger
            .transition(&booking, StatusFlags::new(true, false, true))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TransitionError::CompletedBeforePaid)));
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "Booking must be paid before completed.");
        assert_eq!(stored_status(&ledger, &booking).await, BookingStatus::Unconfirmed);
    }

    #[tokio::test]
    async fn test_paid_needs_a_complete_payment() {
        let (ledger, driver, booking) = setup().await;
        ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap();

        let err = ledger.apply_event(&booking, StatusEvent::MarkPaid).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TransitionError::PaidWithoutPayment)));

        // A partial entry does not count
        let mut partial = paid_in_full(&booking, &driver);
        partial.recipient = None;
        ledger.save_payment(partial).await.unwrap();
        assert!(ledger.apply_event(&booking, StatusEvent::MarkPaid).await.is_err());
        assert_eq!(stored_status(&ledger, &booking).await, BookingStatus::Confirmed);

        ledger.save_payment(paid_in_full(&booking, &driver)).await.unwrap();
        let status = ledger.apply_event(&booking, StatusEvent::MarkPaid).await.unwrap();
        assert_eq!(status, BookingStatus::Paid);

        let status = ledger.apply_event(&booking, StatusEvent::Complete).await.unwrap();
        assert_eq!(status, BookingStatus::Completed);
        assert_eq!(stored_status(&ledger, &booking).await, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_unconfirm_guards() {
        let (ledger, driver, booking) = setup().await;
        ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap();

        // Driver assigned
        let mut job = ledger.db().jobs().get(booking.id()).await.unwrap().unwrap();
        job.driver_id = Some(driver.id.clone());
        let job = ledger.save_job(job, vec![]).await.unwrap().record;
        let err = ledger.apply_event(&booking, StatusEvent::Unconfirm).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TransitionError::UnconfirmWithDriver)));

        // Driver gone, complete payment present
        let mut job = job;
        job.driver_id = None;
        ledger.save_job(job, vec![paid_in_full(&booking, &driver)]).await.unwrap();
        let err = ledger.apply_event(&booking, StatusEvent::Unconfirm).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TransitionError::UnconfirmWithPayment)));
        assert_eq!(stored_status(&ledger, &booking).await, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_hotel_follows_the_same_payment_rules() {
        let (ledger, driver, _job) = setup().await;
        let check_in = utc(2026, 6, 1, 14, 0);
        let hotel = HotelBooking::new(
            "Jon Smith",
            "+44 7700 900123",
            check_in,
            check_in + Duration::days(2),
            dec!(200),
            Currency::Eur,
        );
        let hotel = ledger.save_hotel_booking(hotel, vec![]).await.unwrap().record;
        let booking = BookingRef::Hotel(hotel.id);

        ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap();
        let err = ledger.apply_event(&booking, StatusEvent::MarkPaid).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TransitionError::PaidWithoutPayment)));

        // Unconfirming is fine: no driver guard, no payment yet
        let status = ledger.apply_event(&booking, StatusEvent::Unconfirm).await.unwrap();
        assert_eq!(status, BookingStatus::Unconfirmed);

        ledger.save_payment(paid_in_full(&booking, &driver)).await.unwrap();
        let status = ledger
            .transition(&booking, StatusFlags::new(true, true, false))
            .await
            .unwrap();
        assert_eq!(status, BookingStatus::Paid);
    }

    #[tokio::test]
    async fn test_rejected_change_rolls_back() {
        let (ledger, driver, booking) = setup().await;

        // The in-memory pool has one connection; each rejection must hand it back
        for _ in 0..3 {
            assert!(ledger.apply_event(&booking, StatusEvent::MarkPaid).await.is_err());
        }
        ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap();
        assert!(ledger.delete_booking(&booking, Actor::Operator).await.is_err());

        ledger.save_payment(paid_in_full(&booking, &driver)).await.unwrap();
        let status = ledger.apply_event(&booking, StatusEvent::MarkPaid).await.unwrap();
        assert_eq!(status, BookingStatus::Paid);

        // Same flags again: nothing to write
        let status = ledger
            .transition(&booking, StatusFlags::new(true, true, false))
            .await
            .unwrap();
        assert_eq!(status, BookingStatus::Paid);
        assert_eq!(stored_status(&ledger, &booking).await, BookingStatus::Paid);
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let (ledger, driver, booking) = setup().await;
        ledger.save_payment(paid_in_full(&booking, &driver)).await.unwrap();
        ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap();

        let err = ledger.delete_booking(&booking, Actor::Operator).await.unwrap_err();
        assert!(matches!(err, LedgerError::PermissionDenied(_)));

        ledger.delete_booking(&booking, Actor::Superuser).await.unwrap();
        assert!(ledger.db().jobs().get(booking.id()).await.unwrap().is_none());
        assert!(ledger.db().payments().list_for(&booking).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfirmed_booking_deletable_by_anyone() {
        let (ledger, _driver, booking) = setup().await;
        ledger.delete_booking(&booking, Actor::Operator).await.unwrap();

        let err = ledger.apply_event(&booking, StatusEvent::Confirm).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
