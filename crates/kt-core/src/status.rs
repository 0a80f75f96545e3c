//! # Booking Status Machine
//!
//! Governs how a booking moves between unconfirmed, confirmed, paid and
//! completed.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Unconfirmed ──► Confirmed ──► Paid ──► Completed                      │
//! │   (F,F,F)         (T,F,F)       (T,T,F)  (T,T,T)                        │
//! │       ▲               │  ▲         │  ▲      │                          │
//! │       └── unconfirm ──┘  └─unpaid──┘  └reopen┘                          │
//! │                                                                         │
//! │   Flags are (is_confirmed, is_paid, is_completed). The other four       │
//! │   flag combinations are not representable.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules (first failure wins)
//!
//! 1. paid requires confirmed
//! 2. completed requires confirmed
//! 3. completed requires paid
//! 4. leaving confirmed: not while paid, not with a driver assigned (jobs
//!    and shuttles only), not with a complete payment on file
//! 5. newly paid requires a complete payment
//! 6. newly completed requires a complete payment
//!
//! A rejected request leaves the stored booking untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};

// =============================================================================
// Status Flags
// =============================================================================

/// The three status booleans as the web form submits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub is_confirmed: bool,
    pub is_paid: bool,
    pub is_completed: bool,
}

impl StatusFlags {
    pub const fn new(is_confirmed: bool, is_paid: bool, is_completed: bool) -> Self {
        StatusFlags {
            is_confirmed,
            is_paid,
            is_completed,
        }
    }
}

// =============================================================================
// Booking Status
// =============================================================================

/// Where a booking is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Unconfirmed,
    Confirmed,
    Paid,
    Completed,
}

impl BookingStatus {
    pub const fn flags(&self) -> StatusFlags {
        match self {
            BookingStatus::Unconfirmed => StatusFlags::new(false, false, false),
            BookingStatus::Confirmed => StatusFlags::new(true, false, false),
            BookingStatus::Paid => StatusFlags::new(true, true, false),
            BookingStatus::Completed => StatusFlags::new(true, true, true),
        }
    }

    /// Maps flags back to a state. `None` for the four unreachable
    /// combinations (e.g. paid but not confirmed).
    pub const fn from_flags(flags: StatusFlags) -> Option<Self> {
        match (flags.is_confirmed, flags.is_paid, flags.is_completed) {
            (false, false, false) => Some(BookingStatus::Unconfirmed),
            (true, false, false) => Some(BookingStatus::Confirmed),
            (true, true, false) => Some(BookingStatus::Paid),
            (true, true, true) => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_confirmed(&self) -> bool {
        self.flags().is_confirmed
    }

    #[inline]
    pub const fn is_paid(&self) -> bool {
        self.flags().is_paid
    }

    #[inline]
    pub const fn is_completed(&self) -> bool {
        self.flags().is_completed
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Unconfirmed => "unconfirmed",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Completed => "completed",
        }
    }

    /// Applies a named event.
    pub fn apply(self, event: StatusEvent, ctx: &TransitionContext) -> Result<Self, TransitionError> {
        transition_status(self, event.target(self), ctx)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unconfirmed" => Ok(BookingStatus::Unconfirmed),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "paid" => Ok(BookingStatus::Paid),
            "completed" => Ok(BookingStatus::Completed),
            _ => Err(ValidationError::not_allowed(
                "status",
                &["unconfirmed", "confirmed", "paid", "completed"],
            )),
        }
    }
}

// =============================================================================
// Transition Inputs
// =============================================================================

/// Which booking type is changing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Job,
    Shuttle,
    Hotel,
}

impl BookingKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BookingKind::Job => "job",
            BookingKind::Shuttle => "shuttle",
            BookingKind::Hotel => "hotel",
        }
    }

    /// Name used in operator-facing messages.
    pub const fn label(&self) -> &'static str {
        match self {
            BookingKind::Job => "job",
            BookingKind::Shuttle => "shuttle",
            BookingKind::Hotel => "hotel booking",
        }
    }

    /// Hotel bookings have no driver to guard against.
    #[inline]
    pub const fn has_driver(&self) -> bool {
        !matches!(self, BookingKind::Hotel)
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about the stored booking the rules consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    pub kind: BookingKind,
    pub driver_assigned: bool,
    /// At least one attached payment is complete.
    pub has_complete_payment: bool,
}

impl TransitionContext {
    pub fn new(kind: BookingKind) -> Self {
        TransitionContext {
            kind,
            driver_assigned: false,
            has_complete_payment: false,
        }
    }

    pub fn with_driver(mut self, assigned: bool) -> Self {
        self.driver_assigned = assigned;
        self
    }

    pub fn with_complete_payment(mut self, present: bool) -> Self {
        self.has_complete_payment = present;
        self
    }
}

/// Named status changes offered by the booking screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    Confirm,
    Unconfirm,
    MarkPaid,
    MarkUnpaid,
    Complete,
    Reopen,
}

impl StatusEvent {
    /// The flag set this event requests from `current`. Only the flag the
    /// event names changes; the rules decide whether that is legal.
    pub const fn target(&self, current: BookingStatus) -> StatusFlags {
        let cur = current.flags();
        match self {
            StatusEvent::Confirm => StatusFlags::new(true, cur.is_paid, cur.is_completed),
            StatusEvent::Unconfirm => StatusFlags::new(false, false, false),
            StatusEvent::MarkPaid => StatusFlags::new(cur.is_confirmed, true, cur.is_completed),
            StatusEvent::MarkUnpaid => StatusFlags::new(cur.is_confirmed, false, cur.is_completed),
            StatusEvent::Complete => StatusFlags::new(cur.is_confirmed, cur.is_paid, true),
            StatusEvent::Reopen => StatusFlags::new(cur.is_confirmed, cur.is_paid, false),
        }
    }
}

// =============================================================================
// Transition Function
// =============================================================================

/// Validates a requested flag set against the current state.
///
/// Returns the new state, or the first rule the request breaks.
///
/// ## Example
/// ```rust
/// use kt_core::status::{transition_status, BookingKind, BookingStatus, StatusFlags, TransitionContext};
/// use kt_core::TransitionError;
///
/// let ctx = TransitionContext::new(BookingKind::Job);
/// let err = transition_status(BookingStatus::Confirmed, StatusFlags::new(true, false, true), &ctx);
/// assert_eq!(err, Err(TransitionError::CompletedBeforePaid));
///
/// let ctx = ctx.with_complete_payment(true);
/// let ok = transition_status(BookingStatus::Confirmed, StatusFlags::new(true, true, false), &ctx);
/// assert_eq!(ok, Ok(BookingStatus::Paid));
/// ```
pub fn transition_status(
    current: BookingStatus,
    target: StatusFlags,
    ctx: &TransitionContext,
) -> Result<BookingStatus, TransitionError> {
    if target.is_paid && !target.is_confirmed {
        return Err(TransitionError::PaidBeforeConfirmed);
    }
    if target.is_completed && !target.is_confirmed {
        return Err(TransitionError::CompletedBeforeConfirmed);
    }
    if target.is_completed && !target.is_paid {
        return Err(TransitionError::CompletedBeforePaid);
    }

    if !target.is_confirmed && current.is_confirmed() {
        if current.is_paid() {
            return Err(TransitionError::UnconfirmPaid);
        }
        if ctx.kind.has_driver() && ctx.driver_assigned {
            return Err(TransitionError::UnconfirmWithDriver);
        }
        if ctx.has_complete_payment {
            return Err(TransitionError::UnconfirmWithPayment);
        }
    }

    if target.is_paid && !current.is_paid() && !ctx.has_complete_payment {
        return Err(TransitionError::PaidWithoutPayment);
    }
    if target.is_completed && !current.is_completed() && !ctx.has_complete_payment {
        return Err(TransitionError::CompletedWithoutPayment);
    }

    // Rules 1-3 leave only the four reachable combinations.
    Ok(BookingStatus::from_flags(target).unwrap_or(current))
}

// =============================================================================
// Deletion
// =============================================================================

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Operator,
    Superuser,
}

/// Bookings can be removed by a superuser, or by anyone while unconfirmed.
pub fn can_delete(status: BookingStatus, actor: Actor) -> bool {
    matches!(actor, Actor::Superuser) || !status.is_confirmed()
}

// =============================================================================
// Unit Tests
// =============================================================================
