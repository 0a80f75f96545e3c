//! # Seed Data Generator
//!
//! Populates the database with people, bookings, payments and expenses
//! for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 jobs (default)
//! cargo run -p kt-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p kt-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p kt-db --bin seed -- --db ./data/kt.db
//! ```
//!
//! ## Generated Data
//! - Drivers, agents and staff
//! - Jobs spread over the last twelve months, priced in EUR or HUF, each
//!   with a cost sheet and, once past confirmation, a complete payment
//! - Shuttles with a driver cost per shuttle, and a handful of hotel
//!   bookings
//! - Monthly fuel and wage expenses
//!
//! Rates are fixed so the output is reproducible; nothing is fetched.

use std::env;

use chrono::{Duration, NaiveTime, Utc};
use kt_core::{
    AgentFeeTier, BookingRef, BookingStatus, Calculation, Currency, Expense, ExpenseType,
    FinancialRecord, HotelBooking, Job, NormalizeContext, Payment, PaymentType, Person,
    PersonKind, RateTable, Shuttle, ShuttleConfig, ShuttleDailyCost, ShuttleDirection,
    VehicleType,
};
use kt_db::{Database, DbConfig};
use rust_decimal::Decimal;

const DRIVERS: &[&str] = &["Laszlo Toth", "Gabor Horvath", "Istvan Varga", "Zoltan Kiss"];
const AGENTS: &[&str] = &["Eva Molnar", "Budapest Travel Desk", "Danube Concierge"];
const STAFF: &[&str] = &["Kata Farkas"];

const CUSTOMERS: &[&str] = &[
    "Anna Kovacs",
    "John Miller",
    "Sophie Laurent",
    "Marco Rossi",
    "Hannah Schmidt",
    "Peter Nagy",
    "Olivia Brown",
    "Lukas Novak",
];

const ROUTES: &[&str] = &[
    "Airport to Keresztur",
    "Keresztur to Vienna",
    "Budapest city tour",
    "Airport to city centre",
    "Lake Balaton day trip",
];

const VEHICLES: &[VehicleType] = &[
    VehicleType::Car,
    VehicleType::Minivan,
    VehicleType::Van,
    VehicleType::Bus,
];

const TIERS: &[Option<AgentFeeTier>] = &[
    None,
    Some(AgentFeeTier::FivePercent),
    Some(AgentFeeTier::TenPercent),
    Some(AgentFeeTier::HalfProfit),
];

const PAYMENT_TYPES: &[PaymentType] = &[
    PaymentType::Cash,
    PaymentType::Card,
    PaymentType::Transfer,
    PaymentType::QuickPay,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./kt_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--count" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("KT Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of jobs to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./kt_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("KT Back Office Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!("Jobs: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.people().list(PersonKind::Driver).await?.is_empty() {
        println!("⚠ Database already has drivers");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let drivers = insert_people(&db, PersonKind::Driver, DRIVERS).await?;
    let agents = insert_people(&db, PersonKind::Agent, AGENTS).await?;
    insert_people(&db, PersonKind::Staff, STAFF).await?;
    println!("✓ Inserted {} people", DRIVERS.len() + AGENTS.len() + STAFF.len());

    let rates = RateTable::new()
        .with_rate(Currency::Huf, Decimal::new(25, 4))?
        .with_rate(Currency::Usd, Decimal::new(92, 2))?
        .with_rate(Currency::Gbp, Decimal::new(117, 2))?;
    let policy = db.settings().fee_policy().await?;
    let shuttle_config = db.settings().shuttle_config().await?;
    let now = Utc::now();
    let ctx = NormalizeContext::new(&rates, &policy, now);

    println!();
    println!("Generating bookings...");
    let start = std::time::Instant::now();

    let mut tx = db.begin().await?;
    for seed in 0..count {
        let (job, calc, payment) = generate_job(seed, &drivers, &agents, &ctx)?;
        db.jobs().upsert(&mut *tx, &job).await?;
        db.calculations().upsert(&mut *tx, &calc).await?;
        if let Some(payment) = payment {
            db.payments().upsert(&mut *tx, &payment).await?;
        }

        if seed % 4 == 0 {
            let shuttle = generate_shuttle(seed, &drivers, &shuttle_config, &ctx)?;
            db.shuttles().upsert(&mut *tx, &shuttle).await?;
            if let Some(driver_id) = &shuttle.driver_id {
                let mut cost = ShuttleDailyCost::new(
                    shuttle.shuttle_date,
                    driver_id,
                    Decimal::from(20_000),
                    Currency::Huf,
                );
                cost.normalize(&ctx)?;
                db.shuttle_daily_costs().upsert(&mut *tx, &cost).await?;
            }
        }
        if seed % 10 == 0 {
            let booking = generate_hotel_booking(seed, &agents, &ctx)?;
            db.hotel_bookings().upsert(&mut *tx, &booking).await?;
        }

        if (seed + 1) % 50 == 0 {
            println!("  Generated {} jobs...", seed + 1);
        }
    }

    for month in 0..12 {
        for expense in generate_expenses(month, &drivers, &ctx)? {
            db.expenses().upsert(&mut *tx, &expense).await?;
        }
    }
    tx.commit().await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} jobs in {:?}", count, elapsed);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

async fn insert_people(
    db: &Database,
    kind: PersonKind,
    names: &[&str],
) -> Result<Vec<Person>, Box<dyn std::error::Error>> {
    let mut people = Vec::with_capacity(names.len());
    for name in names {
        let person = Person::new(kind, *name);
        db.people().insert(&person).await?;
        people.push(person);
    }
    Ok(people)
}

/// A job `seed` days in the past with its cost sheet and, from confirmed
/// onwards, one complete payment to the driver.
fn generate_job(
    seed: usize,
    drivers: &[Person],
    agents: &[Person],
    ctx: &NormalizeContext<'_>,
) -> Result<(Job, Calculation, Option<Payment>), Box<dyn std::error::Error>> {
    let date = (ctx.now - Duration::days((seed % 365) as i64)).date_naive();
    let time = NaiveTime::from_hms_opt(6 + (seed % 14) as u32, ((seed * 7) % 4 * 15) as u32, 0)
        .unwrap_or_default();

    let (price, currency) = if seed % 3 == 0 {
        (Decimal::from(40_000 + (seed * 997) % 160_000), Currency::Huf)
    } else {
        (Decimal::from(80 + (seed * 13) % 600), Currency::Eur)
    };

    let customer = CUSTOMERS[seed % CUSTOMERS.len()];
    let mut job = Job::new(customer, format!("+36 30 {:03} {:04}", seed % 1000, seed), date, time, price, currency);
    job.job_description = ROUTES[seed % ROUTES.len()].to_string();
    job.vehicle_type = VEHICLES[seed % VEHICLES.len()];
    job.no_of_passengers = 1 + (seed % 8) as u32;
    job.payment_type = Some(PAYMENT_TYPES[seed % PAYMENT_TYPES.len()]);

    let driver = &drivers[seed % drivers.len()];
    job.driver_id = Some(driver.id.clone());
    job.driver_fee = Some(Decimal::from(30 + (seed * 11) % 90));

    job.agent_fee_tier = TIERS[seed % TIERS.len()];
    if job.agent_fee_tier.is_some() {
        job.agent_id = Some(agents[seed % agents.len()].id.clone());
    }

    job.status = match seed % 5 {
        0 => BookingStatus::Unconfirmed,
        1 => BookingStatus::Confirmed,
        2 | 3 => BookingStatus::Paid,
        _ => BookingStatus::Completed,
    };
    job.normalize(ctx)?;

    let mut calc = Calculation::new(&job.id);
    calc.fuel_cost = Some(Decimal::from(10_000 + (seed * 313) % 30_000));
    calc.fuel_currency = Currency::Huf;
    calc.driver_fee = job.driver_fee;
    calc.agent_id = job.agent_id.clone();
    calc.agent_fee_tier = job.agent_fee_tier;
    calc.kilometers = Some(Decimal::from(20 + (seed * 17) % 400));
    calc.normalize(ctx)?;

    let payment = match job.status {
        BookingStatus::Unconfirmed => None,
        _ => {
            let mut payment = Payment::complete(
                Some(BookingRef::Job(job.id.clone())),
                job.driver_fee.unwrap_or_default(),
                Currency::Eur,
                PaymentType::Cash,
                driver.as_recipient(),
            );
            payment.normalize(ctx)?;
            Some(payment)
        }
    };

    Ok((job, calc, payment))
}

fn generate_shuttle(
    seed: usize,
    drivers: &[Person],
    config: &ShuttleConfig,
    ctx: &NormalizeContext<'_>,
) -> Result<Shuttle, Box<dyn std::error::Error>> {
    let date = (ctx.now - Duration::days((seed % 300) as i64)).date_naive();
    let passengers = 1 + (seed % 6) as u32;
    let customer = CUSTOMERS[(seed + 3) % CUSTOMERS.len()];

    let mut shuttle = Shuttle::new(customer, format!("+36 20 {:03} {:04}", seed % 1000, seed), date, passengers, config);
    shuttle.direction = match seed % 3 {
        0 => ShuttleDirection::BothWays,
        1 => ShuttleDirection::BudaKeres,
        _ => ShuttleDirection::KeresBuda,
    };
    shuttle.driver_id = Some(drivers[(seed + 1) % drivers.len()].id.clone());
    shuttle.payment_type = Some(PAYMENT_TYPES[(seed + 1) % PAYMENT_TYPES.len()]);
    if seed % 8 != 0 {
        shuttle.status = BookingStatus::Confirmed;
    }
    shuttle.normalize(ctx)?;
    Ok(shuttle)
}

fn generate_hotel_booking(
    seed: usize,
    agents: &[Person],
    ctx: &NormalizeContext<'_>,
) -> Result<HotelBooking, Box<dyn std::error::Error>> {
    let check_in = ctx.now - Duration::days((seed % 200) as i64);
    let check_out = check_in + Duration::days(1 + (seed % 5) as i64);
    let customer = CUSTOMERS[(seed + 5) % CUSTOMERS.len()];

    let mut booking = HotelBooking::new(
        customer,
        format!("+36 70 {:03} {:04}", seed % 1000, seed),
        check_in,
        check_out,
        Decimal::from(90 + (seed * 7) % 400),
        Currency::Eur,
    );
    booking.public_id = Some(format!("SEED{:04}", seed % 10_000));
    booking.no_of_people = 1 + (seed % 4) as u32;
    booking.hotel_tier = Some(3 + (seed % 3) as u8);
    booking.payment_type = Some(PAYMENT_TYPES[seed % PAYMENT_TYPES.len()]);
    booking.agent_id = Some(agents[seed % agents.len()].id.clone());
    booking.agent_fee_tier = Some(AgentFeeTier::TenPercent);
    booking.normalize(ctx)?;
    Ok(booking)
}

/// A fuel bill per driver and one wage payment for month `month` back.
fn generate_expenses(
    month: usize,
    drivers: &[Person],
    ctx: &NormalizeContext<'_>,
) -> Result<Vec<Expense>, Box<dyn std::error::Error>> {
    let date = (ctx.now - Duration::days((month * 30 + 5) as i64)).date_naive();
    let mut expenses = Vec::with_capacity(drivers.len() + 1);

    for (i, driver) in drivers.iter().enumerate() {
        let mut fuel = Expense::new(
            ExpenseType::Fuel,
            Decimal::from(15_000 + (month * 1_300 + i * 2_100) % 25_000),
            Currency::Huf,
            date,
        );
        fuel.driver_id = Some(driver.id.clone());
        fuel.normalize(ctx)?;
        expenses.push(fuel);
    }

    let mut wages = Expense::new(ExpenseType::Wages, Decimal::from(1_800), Currency::Eur, date);
    wages.notes = Some("Monthly wages".to_string());
    wages.normalize(ctx)?;
    expenses.push(wages);

    Ok(expenses)
}
