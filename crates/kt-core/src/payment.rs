//! # Payments
//!
//! Money paid out against a booking. A booking may be settled in several
//! split payments; a payment may also stand alone.
//!
//! A payment counts as *complete* when amount, currency, payment type and
//! recipient are all set. Only complete payments unlock the paid and
//! completed booking states.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::fees::PaymentType;
use crate::money::{quantize, Currency};
use crate::normalize::{foreign_currencies, FinancialRecord, NormalizeContext};
use crate::status::BookingKind;
use crate::validation::validate_optional_amount;

// =============================================================================
// Booking Reference
// =============================================================================

/// The booking a payment belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BookingRef {
    Job(String),
    Shuttle(String),
    Hotel(String),
}

impl BookingRef {
    pub fn kind(&self) -> BookingKind {
        match self {
            BookingRef::Job(_) => BookingKind::Job,
            BookingRef::Shuttle(_) => BookingKind::Shuttle,
            BookingRef::Hotel(_) => BookingKind::Hotel,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BookingRef::Job(id) | BookingRef::Shuttle(id) | BookingRef::Hotel(id) => id,
        }
    }

    pub fn new(kind: BookingKind, id: impl Into<String>) -> Self {
        match kind {
            BookingKind::Job => BookingRef::Job(id.into()),
            BookingKind::Shuttle => BookingRef::Shuttle(id.into()),
            BookingKind::Hotel => BookingRef::Hotel(id.into()),
        }
    }
}

// =============================================================================
// Recipient
// =============================================================================

/// Who received the money. Exactly one, by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Agent(String),
    Driver(String),
    Staff(String),
    FreelancerAgent(String),
}

impl Recipient {
    pub const KINDS: [&'static str; 4] = ["agent", "driver", "staff", "freelancer_agent"];

    pub fn kind(&self) -> &'static str {
        match self {
            Recipient::Agent(_) => "agent",
            Recipient::Driver(_) => "driver",
            Recipient::Staff(_) => "staff",
            Recipient::FreelancerAgent(_) => "freelancer_agent",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Recipient::Agent(id)
            | Recipient::Driver(id)
            | Recipient::Staff(id)
            | Recipient::FreelancerAgent(id) => id,
        }
    }

    /// Rebuilds a recipient from its stored tag and id.
    pub fn from_parts(kind: &str, id: impl Into<String>) -> Result<Self, ValidationError> {
        match kind {
            "agent" => Ok(Recipient::Agent(id.into())),
            "driver" => Ok(Recipient::Driver(id.into())),
            "staff" => Ok(Recipient::Staff(id.into())),
            "freelancer_agent" => Ok(Recipient::FreelancerAgent(id.into())),
            _ => Err(ValidationError::not_allowed("recipient", &Self::KINDS)),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking: Option<BookingRef>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub amount_in_euros: Option<Decimal>,
    pub payment_type: Option<PaymentType>,
    pub recipient: Option<Recipient>,
    /// Card surcharge on `amount`, in the payment currency.
    pub cc_fee: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// An empty payment entry, optionally attached to a booking.
    pub fn new(booking: Option<BookingRef>) -> Self {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4().to_string(),
            booking,
            amount: None,
            currency: None,
            amount_in_euros: None,
            payment_type: None,
            recipient: None,
            cc_fee: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fully filled-in payment.
    pub fn complete(
        booking: Option<BookingRef>,
        amount: Decimal,
        currency: Currency,
        payment_type: PaymentType,
        recipient: Recipient,
    ) -> Self {
        Payment {
            amount: Some(amount),
            currency: Some(currency),
            payment_type: Some(payment_type),
            recipient: Some(recipient),
            ..Payment::new(booking)
        }
    }

    /// Amount, currency, type and recipient are all set.
    pub fn is_complete(&self) -> bool {
        self.amount.is_some()
            && self.currency.is_some()
            && self.payment_type.is_some()
            && self.recipient.is_some()
    }

    /// Amount plus card surcharge; 0.00 when no amount is entered.
    pub fn total_with_cc_fee(&self) -> Decimal {
        match self.amount {
            Some(amount) => quantize(amount + self.cc_fee),
            None => quantize(Decimal::ZERO),
        }
    }
}

/// Whether any payment in the set is complete.
pub fn any_complete<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> bool {
    payments.into_iter().any(Payment::is_complete)
}

impl FinancialRecord for Payment {
    const KIND: &'static str = "payment";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        match self.currency {
            Some(currency) => foreign_currencies([(self.amount, currency)]),
            None => BTreeSet::new(),
        }
    }

    /// Amount and currency are entered together or not at all.
    fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_amount("amount", self.amount)?;
        match (self.amount, self.currency) {
            (Some(_), None) => Err(ValidationError::Required {
                field: "currency".to_string(),
            }),
            (None, Some(_)) => Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: "set without an amount".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let amount_eur = match self.currency {
            Some(currency) => ctx.rates.convert(self.amount, currency)?,
            None => None,
        };
        let cc_fee = match self.amount {
            Some(amount) => ctx.fee_policy.card_fee(amount, self.payment_type),
            None => quantize(Decimal::ZERO),
        };

        self.amount_in_euros = amount_eur;
        self.cc_fee = cc_fee;
        self.updated_at = ctx.now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeePolicy;
    use crate::money::RateTable;
    use rust_decimal_macros::dec;

    fn job_ref() -> Option<BookingRef> {
        Some(BookingRef::Job("job-1".to_string()))
    }

    #[test]
    fn test_completeness_needs_all_four_fields() {
        let full = Payment::complete(
            job_ref(),
            dec!(100),
            Currency::Eur,
            PaymentType::Cash,
            Recipient::Driver("drv-1".to_string()),
        );
        assert!(full.is_complete());

        let mut missing = full.clone();
        missing.recipient = None;
        assert!(!missing.is_complete());

        let mut missing = full.clone();
        missing.payment_type = None;
        assert!(!missing.is_complete());

        let mut missing = full;
        missing.amount = None;
        assert!(!missing.is_complete());

        assert!(!any_complete(&[Payment::new(job_ref())]));
        assert!(!any_complete(&Vec::<Payment>::new()));
    }

    #[test]
    fn test_normalize_card_payment() {
        let rates = RateTable::new().with_rate(Currency::Usd, dec!(0.92)).unwrap();
        let policy = FeePolicy::default();
        let ctx = NormalizeContext::new(&rates, &policy, Utc::now());

        let mut payment = Payment::complete(
            job_ref(),
            dec!(250.00),
            Currency::Usd,
            PaymentType::Card,
            Recipient::Agent("agt-1".to_string()),
        );
        payment.normalize(&ctx).unwrap();

        assert_eq!(payment.amount_in_euros, Some(dec!(230.00)));
        assert_eq!(payment.cc_fee, dec!(17.50));
        assert_eq!(payment.total_with_cc_fee(), dec!(267.50));
    }

    #[test]
    fn test_empty_payment_normalizes_to_nothing() {
        let rates = RateTable::new();
        let policy = FeePolicy::default();
        let mut payment = Payment::new(None);
        payment.payment_type = Some(PaymentType::Card);
        assert!(payment.required_currencies().is_empty());

        payment
            .normalize(&NormalizeContext::new(&rates, &policy, Utc::now()))
            .unwrap();
        assert_eq!(payment.amount_in_euros, None);
        assert_eq!(payment.total_with_cc_fee(), dec!(0.00));
    }

    #[test]
    fn test_partial_entry_is_saveable_but_incomplete() {
        let mut payment = Payment::new(job_ref());
        payment.amount = Some(dec!(10));
        payment.currency = Some(Currency::Huf);
        assert!(payment.validate().is_ok());
        assert!(!payment.is_complete());

        payment.amount = Some(dec!(-10));
        assert!(payment.validate().is_err());
    }

    #[test]
    fn test_amount_and_currency_come_together() {
        let mut payment = Payment::new(None);
        payment.amount = Some(dec!(100));
        payment.payment_type = Some(PaymentType::Cash);
        assert_eq!(
            payment.validate(),
            Err(ValidationError::Required {
                field: "currency".to_string()
            })
        );

        payment.amount = None;
        payment.currency = Some(Currency::Eur);
        assert!(matches!(
            payment.validate(),
            Err(ValidationError::InvalidFormat { field, .. }) if field == "currency"
        ));

        payment.currency = None;
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn test_recipient_round_trips_through_tag() {
        let recipient = Recipient::FreelancerAgent("fa-9".to_string());
        let back = Recipient::from_parts(recipient.kind(), recipient.id()).unwrap();
        assert_eq!(back, recipient);
        assert!(Recipient::from_parts("customer", "x").is_err());
    }
}
