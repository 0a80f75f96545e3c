//! # Error Types
//!
//! Domain-specific error types for kt-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kt-core errors (this file)                                            │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── TransitionError  - Rejected booking status changes                │
//! │                                                                         │
//! │  kt-db errors (separate crate)                                         │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kt-ledger errors                                                      │
//! │  └── LedgerError      - What the web layer sees                        │
//! │                                                                         │
//! │  Flow: ValidationError/TransitionError → CoreError → LedgerError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Currency;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A conversion was attempted without a rate for the currency.
    ///
    /// ## When This Occurs
    /// The caller resolved rates for fewer currencies than the record
    /// declared through `FinancialRecord::required_currencies`. This is
    /// an integration bug, never a user error.
    #[error("No exchange rate supplied for {0}")]
    MissingRate(Currency),

    /// An exchange rate that is zero or negative.
    #[error("Invalid exchange rate for {currency}: {rate}")]
    InvalidRate {
        currency: Currency,
        rate: rust_decimal::Decimal,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Status change rejected (wraps TransitionError).
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when form input doesn't meet requirements.
/// Always recoverable by the user correcting the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad currency code, bad reference).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn not_allowed(field: &str, allowed: &[&str]) -> Self {
        ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Transition Error
// =============================================================================

/// A rejected booking status change.
///
/// Variants are listed in the order the rules are checked; the first
/// failing rule is the one reported. Messages are shown to the operator
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Booking must be confirmed before paid.")]
    PaidBeforeConfirmed,

    #[error("Booking must be confirmed before completed.")]
    CompletedBeforeConfirmed,

    #[error("Booking must be paid before completed.")]
    CompletedBeforePaid,

    #[error("Cannot unconfirm a paid booking.")]
    UnconfirmPaid,

    #[error("Cannot unconfirm once a driver is assigned.")]
    UnconfirmWithDriver,

    #[error("Cannot unconfirm with a completed payment entry.")]
    UnconfirmWithPayment,

    #[error("At least one fully completed payment entry required to mark as paid.")]
    PaidWithoutPayment,

    #[error("At least one fully completed payment entry required to mark as completed.")]
    CompletedWithoutPayment,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_name".to_string(),
        };
        assert_eq!(err.to_string(), "customer_name is required");

        let err = ValidationError::MustNotBeNegative {
            field: "job_price".to_string(),
        };
        assert_eq!(err.to_string(), "job_price cannot be negative");
    }

    #[test]
    fn test_transition_messages_name_the_rule() {
        assert!(TransitionError::CompletedBeforePaid
            .to_string()
            .contains("must be paid before completed"));
        assert!(TransitionError::PaidBeforeConfirmed
            .to_string()
            .contains("must be confirmed before paid"));
        assert!(TransitionError::UnconfirmWithDriver
            .to_string()
            .contains("driver is assigned"));
    }

    #[test]
    fn test_transition_converts_to_core_error_transparently() {
        let core: CoreError = TransitionError::PaidWithoutPayment.into();
        assert!(matches!(core, CoreError::Transition(_)));
        assert_eq!(
            core.to_string(),
            TransitionError::PaidWithoutPayment.to_string()
        );
    }
}
