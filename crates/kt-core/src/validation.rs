//! # Validation Module
//!
//! Field validation shared by every booking and money record.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Web form                                                      │
//! │  └── Types, choices, required markers                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: FinancialRecord::validate (Rust)                              │
//! │  └── THIS MODULE: names, amounts, counts, dates, references             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── NOT NULL, CHECK, UNIQUE, FOREIGN KEY                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::PUBLIC_REFERENCE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field such as a customer name.
///
/// ## Example
/// ```rust
/// use kt_core::validation::validate_required;
///
/// assert!(validate_required("customer_name", "Anna Kovacs", 255).is_ok());
/// assert!(validate_required("customer_name", "   ", 255).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field: only the length is checked.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Normalizes a customer-facing booking reference.
///
/// References are compared case-insensitively, so they are stored in upper
/// case. Must be exactly eight ASCII letters or digits after trimming.
///
/// ## Example
/// ```rust
/// use kt_core::validation::normalize_public_reference;
///
/// assert_eq!(normalize_public_reference(" ab12cd34 ").unwrap(), "AB12CD34");
/// assert!(normalize_public_reference("AB12").is_err());
/// assert!(normalize_public_reference("AB12-D34").is_err());
/// ```
pub fn normalize_public_reference(reference: &str) -> ValidationResult<String> {
    let reference = reference.trim().to_ascii_uppercase();

    if reference.len() != PUBLIC_REFERENCE_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "public_id".to_string(),
            reason: format!("must be {PUBLIC_REFERENCE_LEN} characters"),
        });
    }

    if !reference.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "public_id".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(reference)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Money amounts are never negative.
pub fn validate_amount(field: &str, amount: Decimal) -> ValidationResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// [`validate_amount`] for optional amounts; `None` is always fine.
pub fn validate_optional_amount(field: &str, amount: Option<Decimal>) -> ValidationResult<()> {
    match amount {
        Some(a) => validate_amount(field, a),
        None => Ok(()),
    }
}

/// Head counts (passengers, people, rooms) start at one.
pub fn validate_count(field: &str, count: u32) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a percentage setting in `0..=100`.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use kt_core::validation::validate_percentage;
///
/// assert!(validate_percentage("card_fee_percentage", Decimal::new(700, 2)).is_ok());
/// assert!(validate_percentage("card_fee_percentage", Decimal::new(101, 0)).is_err());
/// ```
pub fn validate_percentage(field: &str, pct: Decimal) -> ValidationResult<()> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }
    Ok(())
}

/// Hotel star ratings run from one to five.
pub fn validate_hotel_tier(tier: Option<u8>) -> ValidationResult<()> {
    match tier {
        Some(t) if !(1..=5).contains(&t) => Err(ValidationError::OutOfRange {
            field: "hotel_tier".to_string(),
            min: "1".to_string(),
            max: "5".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Date Validators
// =============================================================================

/// A stay must end after it starts.
pub fn validate_stay(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> ValidationResult<()> {
    if check_out <= check_in {
        return Err(ValidationError::InvalidFormat {
            field: "check_out".to_string(),
            reason: "must be after check_in".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
