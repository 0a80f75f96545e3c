//! # Fee Rules
//!
//! Card surcharges, agent fee tiers, and the two derived profit figures.
//!
//! ## Agent Fee Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "5%"   →  eur_price × 0.05                                             │
//! │  "10%"  →  eur_price × 0.10                                             │
//! │  "50%"  →  max(0, (eur_price − eur_driver_fee − eur_fuel_cost) × 0.50)  │
//! │  none   →  0.00                                                         │
//! │                                                                         │
//! │  Job.subtotal      = price − driver_fee − agent_fee          (no fuel)  │
//! │  Calculation.profit = price − fuel − driver_fee − agent_fee  (fuel)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two profit figures live on different records and are deliberately
//! different. A Job has no fuel field; its Calculation does.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::quantize;
use crate::DEFAULT_CARD_FEE_PERCENTAGE;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// =============================================================================
// Payment Type
// =============================================================================

/// How a customer settles a booking or how a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    Cash,
    Card,
    Transfer,
    #[serde(rename = "Quick Pay")]
    QuickPay,
}

impl PaymentType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "Cash",
            PaymentType::Card => "Card",
            PaymentType::Transfer => "Transfer",
            PaymentType::QuickPay => "Quick Pay",
        }
    }

    /// Only card payments carry a surcharge.
    #[inline]
    pub const fn is_card(&self) -> bool {
        matches!(self, PaymentType::Card)
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Cash" => Ok(PaymentType::Cash),
            "Card" => Ok(PaymentType::Card),
            "Transfer" => Ok(PaymentType::Transfer),
            "Quick Pay" => Ok(PaymentType::QuickPay),
            _ => Err(ValidationError::not_allowed(
                "payment_type",
                &["Cash", "Card", "Transfer", "Quick Pay"],
            )),
        }
    }
}

// =============================================================================
// Agent Fee Tier
// =============================================================================

/// How much of a booking an intermediary agent takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentFeeTier {
    /// 5% of the EUR price.
    #[serde(rename = "5%")]
    FivePercent,
    /// 10% of the EUR price.
    #[serde(rename = "10%")]
    TenPercent,
    /// Half of what is left after driver and fuel costs.
    #[serde(rename = "50%")]
    HalfProfit,
}

impl AgentFeeTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AgentFeeTier::FivePercent => "5%",
            AgentFeeTier::TenPercent => "10%",
            AgentFeeTier::HalfProfit => "50%",
        }
    }

    /// The tier's multiplier (0.05, 0.10, 0.50).
    pub const fn factor(&self) -> Decimal {
        match self {
            AgentFeeTier::FivePercent => Decimal::from_parts(5, 0, 0, false, 2),
            AgentFeeTier::TenPercent => Decimal::from_parts(10, 0, 0, false, 2),
            AgentFeeTier::HalfProfit => Decimal::from_parts(50, 0, 0, false, 2),
        }
    }
}

impl fmt::Display for AgentFeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentFeeTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "5%" | "5" => Ok(AgentFeeTier::FivePercent),
            "10%" | "10" => Ok(AgentFeeTier::TenPercent),
            "50%" | "50" => Ok(AgentFeeTier::HalfProfit),
            _ => Err(ValidationError::not_allowed("agent_fee", &["5%", "10%", "50%"])),
        }
    }
}

// =============================================================================
// Fee Policy
// =============================================================================

/// Operator-editable fee settings.
///
/// Read fresh for every save. A record keeps the fee computed when it was
/// saved; changing the policy never rewrites history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Card surcharge in percent (7.00 = 7%).
    pub card_fee_percentage: Decimal,
}

impl FeePolicy {
    pub fn new(card_fee_percentage: Decimal) -> Self {
        FeePolicy {
            card_fee_percentage,
        }
    }

    /// Card surcharge on `amount` under this policy.
    pub fn card_fee(&self, amount: Decimal, payment_type: Option<PaymentType>) -> Decimal {
        card_fee(amount, payment_type, self.card_fee_percentage)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::new(DEFAULT_CARD_FEE_PERCENTAGE)
    }
}

// =============================================================================
// Calculations
// =============================================================================

/// Card surcharge: `amount × pct / 100` for card payments, else 0.00.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use kt_core::fees::{card_fee, PaymentType};
///
/// let seven = Decimal::new(700, 2);
/// let amount = Decimal::new(15000, 2); // 150.00
/// assert_eq!(card_fee(amount, Some(PaymentType::Card), seven), Decimal::new(1050, 2));
/// assert_eq!(card_fee(amount, Some(PaymentType::Cash), seven), Decimal::ZERO);
/// ```
pub fn card_fee(amount: Decimal, payment_type: Option<PaymentType>, percentage: Decimal) -> Decimal {
    match payment_type {
        Some(pt) if pt.is_card() => quantize(amount * percentage / ONE_HUNDRED),
        _ => quantize(Decimal::ZERO),
    }
}

/// Agent fee for a tier. Missing costs count as 0.00.
///
/// The profit-split tier never goes negative on a loss-making booking.
pub fn agent_fee(
    tier: Option<AgentFeeTier>,
    eur_price: Decimal,
    eur_driver_fee: Option<Decimal>,
    eur_fuel_cost: Option<Decimal>,
) -> Decimal {
    let Some(tier) = tier else {
        return quantize(Decimal::ZERO);
    };

    match tier {
        AgentFeeTier::FivePercent | AgentFeeTier::TenPercent => quantize(eur_price * tier.factor()),
        AgentFeeTier::HalfProfit => {
            let profit = eur_price
                - eur_driver_fee.unwrap_or(Decimal::ZERO)
                - eur_fuel_cost.unwrap_or(Decimal::ZERO);
            quantize((profit * tier.factor()).max(Decimal::ZERO))
        }
    }
}

/// Job subtotal: price − driver fee − agent fee. Fuel is not part of it.
pub fn job_subtotal(eur_price: Decimal, eur_driver_fee: Option<Decimal>, agent_fee: Decimal) -> Decimal {
    quantize(eur_price - eur_driver_fee.unwrap_or(Decimal::ZERO) - agent_fee)
}

/// Calculation profit: price − fuel − driver fee − agent fee.
pub fn calculation_profit(
    eur_job_price: Decimal,
    eur_fuel_cost: Option<Decimal>,
    eur_driver_fee: Option<Decimal>,
    agent_fee: Decimal,
) -> Decimal {
    quantize(
        eur_job_price
            - eur_fuel_cost.unwrap_or(Decimal::ZERO)
            - eur_driver_fee.unwrap_or(Decimal::ZERO)
            - agent_fee,
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
