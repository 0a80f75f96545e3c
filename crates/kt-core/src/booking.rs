//! # Booking Records
//!
//! The three things a customer can book: a driving job, a seat on the
//! Budapest–Keresztúr shuttle, or a hotel stay.
//!
//! ## Money Fields
//! ```text
//! ┌──────────────┬──────────────────────────────┬──────────────────────────┐
//! │ Record       │ (amount, currency) pairs      │ Derived at save          │
//! ├──────────────┼──────────────────────────────┼──────────────────────────┤
//! │ Job          │ job_price, driver_fee         │ agent fee, cc_fee,       │
//! │              │                              │ subtotal                 │
//! │ Shuttle      │ price                         │ cc_fee                   │
//! │ HotelBooking │ hotel_price, customer_pays    │ cc_fee                   │
//! └──────────────┴──────────────────────────────┴──────────────────────────┘
//! ```
//!
//! The card fee is always taken on the principal price (`job_price`,
//! `price`, `hotel_price`) in that price's own currency.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::fees::{self, AgentFeeTier, PaymentType};
use crate::money::{quantize, Currency};
use crate::normalize::{foreign_currencies, FinancialRecord, NormalizeContext};
use crate::status::{BookingKind, BookingStatus};
use crate::validation::{
    normalize_public_reference, validate_amount, validate_count, validate_hotel_tier,
    validate_optional, validate_optional_amount, validate_required, validate_stay,
};
use crate::{DEFAULT_CUSTOMER_PAYS, DEFAULT_PRICE_PER_PASSENGER};

const NAME_MAX: usize = 255;
const PHONE_MAX: usize = 30;
const PLATE_MAX: usize = 20;

// =============================================================================
// Vehicle Type
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[default]
    Car,
    Minivan,
    Van,
    Bus,
}

impl VehicleType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Minivan => "Minivan",
            VehicleType::Van => "Van",
            VehicleType::Bus => "Bus",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Car" => Ok(VehicleType::Car),
            "Minivan" => Ok(VehicleType::Minivan),
            "Van" => Ok(VehicleType::Van),
            "Bus" => Ok(VehicleType::Bus),
            _ => Err(ValidationError::not_allowed(
                "vehicle_type",
                &["Car", "Minivan", "Van", "Bus"],
            )),
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// A private driving job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub customer_name: String,
    pub customer_number: String,
    pub job_date: NaiveDate,
    pub job_time: NaiveTime,
    pub job_description: String,
    pub no_of_passengers: u32,
    pub vehicle_type: VehicleType,

    pub job_price: Decimal,
    pub job_currency: Currency,
    pub job_price_in_euros: Option<Decimal>,

    pub driver_id: Option<String>,
    pub number_plate: Option<String>,
    pub driver_fee: Option<Decimal>,
    pub driver_currency: Currency,
    pub driver_fee_in_euros: Option<Decimal>,

    pub agent_id: Option<String>,
    pub agent_fee_tier: Option<AgentFeeTier>,
    /// Agent fee in EUR as of the last save.
    pub agent_fee_amount: Decimal,

    pub payment_type: Option<PaymentType>,
    /// Card surcharge in `job_currency`.
    pub cc_fee: Decimal,
    /// EUR price − EUR driver fee − agent fee. Fuel is not part of it.
    pub subtotal: Decimal,

    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A new, unconfirmed job with no driver, agent or derived amounts.
    pub fn new(
        customer_name: impl Into<String>,
        customer_number: impl Into<String>,
        job_date: NaiveDate,
        job_time: NaiveTime,
        job_price: Decimal,
        job_currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            customer_number: customer_number.into(),
            job_date,
            job_time,
            job_description: String::new(),
            no_of_passengers: 1,
            vehicle_type: VehicleType::default(),
            job_price,
            job_currency,
            job_price_in_euros: None,
            driver_id: None,
            number_plate: None,
            driver_fee: None,
            driver_currency: Currency::Eur,
            driver_fee_in_euros: None,
            agent_id: None,
            agent_fee_tier: None,
            agent_fee_amount: Decimal::ZERO,
            payment_type: None,
            cc_fee: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            status: BookingStatus::Unconfirmed,
            created_at: now,
            updated_at: now,
        }
    }

    pub const BOOKING_KIND: BookingKind = BookingKind::Job;

    #[inline]
    pub fn driver_assigned(&self) -> bool {
        self.driver_id.is_some()
    }
}

impl FinancialRecord for Job {
    const KIND: &'static str = "job";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([
            (Some(self.job_price), self.job_currency),
            (self.driver_fee, self.driver_currency),
        ])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required("customer_name", &self.customer_name, NAME_MAX)?;
        validate_required("customer_number", &self.customer_number, PHONE_MAX)?;
        validate_count("no_of_passengers", self.no_of_passengers)?;
        validate_amount("job_price", self.job_price)?;
        validate_optional_amount("driver_fee", self.driver_fee)?;
        validate_optional("number_plate", self.number_plate.as_deref(), PLATE_MAX)?;
        Ok(())
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let price_eur = ctx
            .rates
            .convert(Some(self.job_price), self.job_currency)?
            .unwrap_or(Decimal::ZERO);
        let driver_eur = ctx.rates.convert(self.driver_fee, self.driver_currency)?;

        let agent_fee = fees::agent_fee(self.agent_fee_tier, price_eur, driver_eur, None);
        let cc_fee = ctx.fee_policy.card_fee(self.job_price, self.payment_type);
        let subtotal = fees::job_subtotal(price_eur, driver_eur, agent_fee);

        self.job_price_in_euros = Some(price_eur);
        self.driver_fee_in_euros = driver_eur;
        self.agent_fee_amount = agent_fee;
        self.cc_fee = cc_fee;
        self.subtotal = subtotal;
        self.updated_at = ctx.now;
        Ok(())
    }
}

// =============================================================================
// Shuttle
// =============================================================================

/// Which way a shuttle runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuttleDirection {
    #[default]
    BothWays,
    BudaKeres,
    KeresBuda,
}

impl ShuttleDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShuttleDirection::BothWays => "both_ways",
            ShuttleDirection::BudaKeres => "buda_keres",
            ShuttleDirection::KeresBuda => "keres_buda",
        }
    }
}

impl fmt::Display for ShuttleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShuttleDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "both_ways" => Ok(ShuttleDirection::BothWays),
            "buda_keres" => Ok(ShuttleDirection::BudaKeres),
            "keres_buda" => Ok(ShuttleDirection::KeresBuda),
            _ => Err(ValidationError::not_allowed(
                "shuttle_direction",
                &["both_ways", "buda_keres", "keres_buda"],
            )),
        }
    }
}

/// Singleton shuttle pricing setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuttleConfig {
    /// Seat price in EUR.
    pub price_per_passenger: Decimal,
}

impl ShuttleConfig {
    /// Default price for a shuttle carrying `passengers`.
    ///
    /// ## Example
    /// ```rust
    /// use kt_core::ShuttleConfig;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(ShuttleConfig::default().quote(3), Decimal::new(18000, 2));
    /// ```
    pub fn quote(&self, passengers: u32) -> Decimal {
        quantize(self.price_per_passenger * Decimal::from(passengers))
    }
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        ShuttleConfig {
            price_per_passenger: DEFAULT_PRICE_PER_PASSENGER,
        }
    }
}

/// A shuttle booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shuttle {
    pub id: String,
    pub customer_name: String,
    pub customer_number: String,
    pub customer_email: Option<String>,
    pub shuttle_date: NaiveDate,
    pub direction: ShuttleDirection,
    pub no_of_passengers: u32,

    pub price: Decimal,
    pub price_currency: Currency,
    pub price_in_euros: Option<Decimal>,

    pub driver_id: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub cc_fee: Decimal,
    pub notes: Option<String>,

    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shuttle {
    /// A new shuttle priced from the current [`ShuttleConfig`].
    pub fn new(
        customer_name: impl Into<String>,
        customer_number: impl Into<String>,
        shuttle_date: NaiveDate,
        no_of_passengers: u32,
        config: &ShuttleConfig,
    ) -> Self {
        let now = Utc::now();
        Shuttle {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            customer_number: customer_number.into(),
            customer_email: None,
            shuttle_date,
            direction: ShuttleDirection::default(),
            no_of_passengers,
            price: config.quote(no_of_passengers),
            price_currency: Currency::Eur,
            price_in_euros: None,
            driver_id: None,
            payment_type: None,
            cc_fee: Decimal::ZERO,
            notes: None,
            status: BookingStatus::Unconfirmed,
            created_at: now,
            updated_at: now,
        }
    }

    pub const BOOKING_KIND: BookingKind = BookingKind::Shuttle;

    #[inline]
    pub fn driver_assigned(&self) -> bool {
        self.driver_id.is_some()
    }
}

impl FinancialRecord for Shuttle {
    const KIND: &'static str = "shuttle";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([(Some(self.price), self.price_currency)])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required("customer_name", &self.customer_name, NAME_MAX)?;
        validate_required("customer_number", &self.customer_number, PHONE_MAX)?;
        validate_optional("customer_email", self.customer_email.as_deref(), NAME_MAX)?;
        validate_count("no_of_passengers", self.no_of_passengers)?;
        validate_amount("price", self.price)?;
        Ok(())
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let price_eur = ctx.rates.convert(Some(self.price), self.price_currency)?;
        let cc_fee = ctx.fee_policy.card_fee(self.price, self.payment_type);

        self.price_in_euros = price_eur;
        self.cc_fee = cc_fee;
        self.updated_at = ctx.now;
        Ok(())
    }
}

// =============================================================================
// Hotel Booking
// =============================================================================

/// A hotel stay arranged for a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelBooking {
    pub id: String,
    /// Eight-character customer-facing reference, upper case. Assigned on
    /// first save.
    pub public_id: Option<String>,
    pub customer_name: String,
    pub customer_number: String,

    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub no_of_people: u32,
    pub rooms: u32,
    pub no_of_beds: Option<u32>,
    pub hotel_tier: Option<u8>,

    pub hotel_price: Decimal,
    pub hotel_price_currency: Currency,
    pub hotel_price_in_euros: Option<Decimal>,

    pub customer_pays: Decimal,
    pub customer_pays_currency: Currency,
    pub customer_pays_in_euros: Option<Decimal>,

    pub payment_type: Option<PaymentType>,
    /// Card surcharge on `hotel_price`, in `hotel_price_currency`.
    pub cc_fee: Decimal,

    pub agent_id: Option<String>,
    pub agent_fee_tier: Option<AgentFeeTier>,
    pub special_requests: Option<String>,

    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HotelBooking {
    pub fn new(
        customer_name: impl Into<String>,
        customer_number: impl Into<String>,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        hotel_price: Decimal,
        hotel_price_currency: Currency,
    ) -> Self {
        let now = Utc::now();
        HotelBooking {
            id: Uuid::new_v4().to_string(),
            public_id: None,
            customer_name: customer_name.into(),
            customer_number: customer_number.into(),
            check_in,
            check_out,
            no_of_people: 1,
            rooms: 1,
            no_of_beds: None,
            hotel_tier: None,
            hotel_price,
            hotel_price_currency,
            hotel_price_in_euros: None,
            customer_pays: DEFAULT_CUSTOMER_PAYS,
            customer_pays_currency: Currency::Eur,
            customer_pays_in_euros: None,
            payment_type: None,
            cc_fee: Decimal::ZERO,
            agent_id: None,
            agent_fee_tier: None,
            special_requests: None,
            status: BookingStatus::Unconfirmed,
            created_at: now,
            updated_at: now,
        }
    }

    pub const BOOKING_KIND: BookingKind = BookingKind::Hotel;

    /// What the customer is charged including any card surcharge.
    pub fn total_with_cc_fee(&self) -> Decimal {
        quantize(self.customer_pays + self.cc_fee)
    }
}

impl FinancialRecord for HotelBooking {
    const KIND: &'static str = "hotel_booking";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn required_currencies(&self) -> BTreeSet<Currency> {
        foreign_currencies([
            (Some(self.hotel_price), self.hotel_price_currency),
            (Some(self.customer_pays), self.customer_pays_currency),
        ])
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required("customer_name", &self.customer_name, NAME_MAX)?;
        validate_required("customer_number", &self.customer_number, PHONE_MAX)?;
        validate_stay(self.check_in, self.check_out)?;
        validate_count("no_of_people", self.no_of_people)?;
        validate_count("rooms", self.rooms)?;
        if let Some(beds) = self.no_of_beds {
            validate_count("no_of_beds", beds)?;
        }
        validate_hotel_tier(self.hotel_tier)?;
        validate_amount("hotel_price", self.hotel_price)?;
        validate_amount("customer_pays", self.customer_pays)?;
        if let Some(reference) = &self.public_id {
            normalize_public_reference(reference)?;
        }
        Ok(())
    }

    fn normalize(&mut self, ctx: &NormalizeContext<'_>) -> CoreResult<()> {
        let hotel_eur = ctx.rates.convert(Some(self.hotel_price), self.hotel_price_currency)?;
        let pays_eur = ctx.rates.convert(Some(self.customer_pays), self.customer_pays_currency)?;
        let cc_fee = ctx.fee_policy.card_fee(self.hotel_price, self.payment_type);
        let public_id = match &self.public_id {
            Some(reference) => Some(normalize_public_reference(reference)?),
            None => None,
        };

        self.hotel_price_in_euros = hotel_eur;
        self.customer_pays_in_euros = pays_eur;
        self.cc_fee = cc_fee;
        self.public_id = public_id;
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
    use crate::CoreError;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn time() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 30, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    fn job(price: Decimal, driver_fee: Decimal, tier: AgentFeeTier) -> Job {
        let mut job = Job::new("Anna Kovacs", "+36301234567", date(), time(), price, Currency::Eur);
        job.driver_fee = Some(driver_fee);
        job.agent_fee_tier = Some(tier);
        job
    }

    #[test]
    fn test_job_scenarios() {
        let rates = RateTable::new();
        let policy = FeePolicy::default();
        let ctx = NormalizeContext::new(&rates, &policy, now());

        for (price, driver, tier, fee, subtotal) in [
            (dec!(1000.00), dec!(50.00), AgentFeeTier::FivePercent, dec!(50.00), dec!(900.00)),
            (dec!(2000.00), dec!(100.00), AgentFeeTier::TenPercent, dec!(200.00), dec!(1700.00)),
            (dec!(3000.00), dec!(150.00), AgentFeeTier::HalfProfit, dec!(1425.00), dec!(1425.00)),
        ] {
            let mut job = job(price, driver, tier);
            job.normalize(&ctx).unwrap();
            assert_eq!(job.agent_fee_amount, fee, "{tier}");
            assert_eq!(job.subtotal, subtotal, "{tier}");
            assert_eq!(job.job_price_in_euros, Some(price));
            assert_eq!(job.cc_fee, dec!(0.00));
        }
    }

    #[test]
    fn test_job_fields_convert_with_their_own_rates() {
        let rates = RateTable::new()
            .with_rate(Currency::Gbp, dec!(1.17))
            .unwrap()
            .with_rate(Currency::Huf, dec!(0.0025))
            .unwrap();
        let policy = FeePolicy::default();
        let ctx = NormalizeContext::new(&rates, &policy, now());

        let mut job = Job::new("Ben", "+44700", date(), time(), dec!(500.00), Currency::Gbp);
        job.driver_fee = Some(dec!(20000));
        job.driver_currency = Currency::Huf;
        job.payment_type = Some(PaymentType::Card);
        assert_eq!(
            job.required_currencies().into_iter().collect::<Vec<_>>(),
            vec![Currency::Gbp, Currency::Huf]
        );

        job.normalize(&ctx).unwrap();
        assert_eq!(job.job_price_in_euros, Some(dec!(585.00)));
        assert_eq!(job.driver_fee_in_euros, Some(dec!(50.00)));
        assert_eq!(job.subtotal, dec!(535.00));
        // 7% of 500.00 GBP, kept in GBP
        assert_eq!(job.cc_fee, dec!(35.00));
    }

    #[test]
    fn test_missing_rate_leaves_job_untouched() {
        let rates = RateTable::new();
        let policy = FeePolicy::default();
        let ctx = NormalizeContext::new(&rates, &policy, now());

        let mut job = job(dec!(100), dec!(10), AgentFeeTier::TenPercent);
        job.driver_currency = Currency::Usd;
        let before = job.clone();

        assert!(matches!(job.normalize(&ctx), Err(CoreError::MissingRate(Currency::Usd))));
        assert_eq!(job, before);
    }

    #[test]
    fn test_job_validation() {
        let mut job = job(dec!(100), dec!(10), AgentFeeTier::TenPercent);
        assert!(job.validate().is_ok());
        job.driver_fee = Some(dec!(-1));
        assert!(job.validate().is_err());
        job.driver_fee = None;
        job.customer_name = " ".to_string();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_shuttle_defaults_to_config_quote() {
        let config = ShuttleConfig {
            price_per_passenger: dec!(45.50),
        };
        let mut shuttle = Shuttle::new("Csaba", "+3620", date(), 4, &config);
        assert_eq!(shuttle.price, dec!(182.00));

        shuttle.payment_type = Some(PaymentType::Card);
        let rates = RateTable::new();
        let policy = FeePolicy::new(dec!(10));
        shuttle.normalize(&NormalizeContext::new(&rates, &policy, now())).unwrap();
        assert_eq!(shuttle.price_in_euros, Some(dec!(182.00)));
        assert_eq!(shuttle.cc_fee, dec!(18.20));
    }

    #[test]
    fn test_hotel_converts_both_prices() {
        let check_in = now();
        let mut booking = HotelBooking::new(
            "Dora",
            "+3670",
            check_in,
            check_in + Duration::days(3),
            dec!(40000),
            Currency::Huf,
        );
        booking.public_id = Some("ab12cd34".to_string());

        let rates = RateTable::new().with_rate(Currency::Huf, dec!(0.0025)).unwrap();
        let policy = FeePolicy::default();
        booking.normalize(&NormalizeContext::new(&rates, &policy, now())).unwrap();

        assert_eq!(booking.hotel_price_in_euros, Some(dec!(100.00)));
        assert_eq!(booking.customer_pays_in_euros, Some(dec!(20.00)));
        assert_eq!(booking.cc_fee, dec!(0.00));
        assert_eq!(booking.public_id.as_deref(), Some("AB12CD34"));
    }

    #[test]
    fn test_hotel_card_fee_on_hotel_price() {
        let check_in = now();
        let mut booking = HotelBooking::new(
            "Dora",
            "+3670",
            check_in,
            check_in + Duration::days(1),
            dec!(150.00),
            Currency::Eur,
        );
        booking.payment_type = Some(PaymentType::Card);

        let rates = RateTable::new();
        let policy = FeePolicy::default();
        booking.normalize(&NormalizeContext::new(&rates, &policy, now())).unwrap();

        assert_eq!(booking.cc_fee, dec!(10.50));
        assert_eq!(booking.total_with_cc_fee(), dec!(30.50));
    }

    #[test]
    fn test_hotel_stay_validation() {
        let check_in = now();
        let booking = HotelBooking::new("Eva", "+36", check_in, check_in, dec!(100), Currency::Eur);
        assert!(booking.validate().is_err());
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!("keres_buda".parse::<ShuttleDirection>().unwrap(), ShuttleDirection::KeresBuda);
        assert_eq!("Minivan".parse::<VehicleType>().unwrap(), VehicleType::Minivan);
        assert!("Truck".parse::<VehicleType>().is_err());
    }
}
