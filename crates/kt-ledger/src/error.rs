//! # Ledger Error Types
//!
//! One error type for everything the service layer can report.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Ledger Error Categories                            │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌───────────────────────┐  │
//! │  │  User errors     │  │  Rates           │  │  Internal             │  │
//! │  │  (400-class)     │  │                  │  │                       │  │
//! │  │                  │  │  RateUnavailable │  │  Db                   │  │
//! │  │  Validation      │  │                  │  │  Config               │  │
//! │  │  Transition      │  │                  │  │  PublicReference-     │  │
//! │  │  NotFound        │  │                  │  │    Exhausted          │  │
//! │  │  PermissionDenied│  │                  │  │                       │  │
//! │  │  DuplicatePublic-│  │                  │  │  Internal             │  │
//! │  │    Reference     │  │                  │  │                       │  │
//! │  │  Locked          │  │                  │  │                       │  │
//! │  └──────────────────┘  └──────────────────┘  └───────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use kt_core::{BookingKind, CoreError, Currency, TransitionError, ValidationError};
use kt_db::DbError;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    // =========================================================================
    // Rates
    // =========================================================================
    /// No usable to-EUR rate. Fatal to the save that needed it; nothing is
    /// persisted and no fallback rate is used.
    #[error("Exchange rate for {currency} unavailable: {reason}")]
    RateUnavailable { currency: Currency, reason: String },

    // =========================================================================
    // User Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Rejected status change. The message names the violated rule.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Public reference '{0}' is already in use")]
    DuplicatePublicReference(String),

    /// Completed bookings are closed for edits.
    #[error("This {} is marked as completed and cannot be edited", kind.label())]
    Locked { kind: BookingKind, id: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Database error: {0}")]
    Db(DbError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A broken invariant inside the ledger, never caused by input.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Every randomly drawn public reference collided.
    #[error("Could not allocate a public reference after {attempts} attempts")]
    PublicReferenceExhausted { attempts: u32 },
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for failures the user fixes by changing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::Transition(_)
                | LedgerError::NotFound { .. }
                | LedgerError::PermissionDenied(_)
                | LedgerError::DuplicatePublicReference(_)
                | LedgerError::Locked { .. }
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            other => LedgerError::Db(other),
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => LedgerError::Validation(e),
            CoreError::Transition(e) => LedgerError::Transition(e),
            CoreError::MissingRate(currency) => {
                LedgerError::Internal(format!("record converted without a resolved {currency} rate"))
            }
            CoreError::InvalidRate { currency, rate } => LedgerError::RateUnavailable {
                currency,
                reason: format!("source returned unusable rate {rate}"),
            },
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
