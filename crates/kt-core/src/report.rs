//! # Financial Reports
//!
//! Income and profit totals for a month, a year, or the whole history.
//!
//! ## Figures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  job_income     = Σ job EUR price                                       │
//! │  driver_fees    = Σ job EUR driver fee                                  │
//! │  agent_fees     = Σ job agent fee (job variant, no fuel)                │
//! │  job_profit     = Σ job subtotal                                        │
//! │  shuttle_income = Σ shuttle EUR price                                   │
//! │  expenses       = Σ expense EUR amount                                  │
//! │                                                                         │
//! │  total_income   = job_income + shuttle_income                           │
//! │  overall_profit = job_profit + shuttle_income − expenses                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Month and year reports count only jobs that have been paid. The
//! all-time report counts every job.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::booking::{Job, Shuttle};
use crate::calendar::budapest_year_month;
use crate::expense::Expense;
use crate::fees::{self, AgentFeeTier};
use crate::money::quantize;

// =============================================================================
// Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum ReportPeriod {
    Month { year: i32, month: u32 },
    Year { year: i32 },
    AllTime,
}

impl ReportPeriod {
    /// The Budapest calendar month containing `now`.
    pub fn current_month(now: DateTime<Utc>) -> Self {
        let (year, month) = budapest_year_month(now);
        ReportPeriod::Month { year, month }
    }

    /// The Budapest calendar year containing `now`.
    pub fn current_year(now: DateTime<Utc>) -> Self {
        let (year, _) = budapest_year_month(now);
        ReportPeriod::Year { year }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            ReportPeriod::Month { year, month } => date.year() == year && date.month() == month,
            ReportPeriod::Year { year } => date.year() == year,
            ReportPeriod::AllTime => true,
        }
    }

    /// First and last day of the period; `None` for all time.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            ReportPeriod::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                Some((first, next.pred_opt()?))
            }
            ReportPeriod::Year { year } => Some((
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            )),
            ReportPeriod::AllTime => None,
        }
    }

    /// Whether unpaid jobs are left out.
    pub fn paid_jobs_only(&self) -> bool {
        !matches!(self, ReportPeriod::AllTime)
    }
}

// =============================================================================
// Report Rows
// =============================================================================

/// One job's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBreakdown {
    pub job_id: String,
    pub customer_name: String,
    pub job_date: NaiveDate,
    pub job_price: Decimal,
    pub driver_fee: Decimal,
    pub agent_id: Option<String>,
    pub agent_fee_tier: Option<AgentFeeTier>,
    pub agent_fee_amount: Decimal,
    pub profit: Decimal,
}

/// Agent fees owed to one agent. `agent_id` is `None` for jobs booked
/// without an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTotal {
    pub agent_id: Option<String>,
    pub jobs: usize,
    pub agent_fees: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub period: ReportPeriod,
    pub job_income: Decimal,
    pub driver_fees: Decimal,
    pub agent_fees: Decimal,
    pub job_profit: Decimal,
    pub shuttle_income: Decimal,
    pub expenses: Decimal,
    pub total_income: Decimal,
    pub overall_profit: Decimal,
    pub agents: Vec<AgentTotal>,
    pub jobs: Vec<JobBreakdown>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Builds a report from already-loaded records. Records outside the period
/// are skipped, so callers may pass a superset.
pub fn build_report(
    period: ReportPeriod,
    jobs: &[Job],
    shuttles: &[Shuttle],
    expenses: &[Expense],
) -> FinancialReport {
    let mut rows: Vec<JobBreakdown> = jobs
        .iter()
        .filter(|job| period.contains(job.job_date))
        .filter(|job| !period.paid_jobs_only() || job.status.is_paid())
        .map(breakdown)
        .collect();

    if period.paid_jobs_only() {
        rows.sort_by(|a, b| b.job_date.cmp(&a.job_date));
    } else {
        rows.sort_by(|a, b| a.job_date.cmp(&b.job_date));
    }

    let job_income = sum(rows.iter().map(|r| r.job_price));
    let driver_fees = sum(rows.iter().map(|r| r.driver_fee));
    let agent_fees = sum(rows.iter().map(|r| r.agent_fee_amount));
    let job_profit = sum(rows.iter().map(|r| r.profit));

    let shuttle_income = sum(
        shuttles
            .iter()
            .filter(|s| period.contains(s.shuttle_date))
            .map(|s| s.price_in_euros.unwrap_or(Decimal::ZERO)),
    );
    let expense_total = sum(
        expenses
            .iter()
            .filter(|e| period.contains(e.expense_date))
            .map(|e| e.amount_in_euros.unwrap_or(Decimal::ZERO)),
    );

    let mut by_agent: BTreeMap<Option<String>, AgentTotal> = BTreeMap::new();
    for row in &rows {
        let entry = by_agent
            .entry(row.agent_id.clone())
            .or_insert_with(|| AgentTotal {
                agent_id: row.agent_id.clone(),
                jobs: 0,
                agent_fees: quantize(Decimal::ZERO),
            });
        entry.jobs += 1;
        entry.agent_fees = quantize(entry.agent_fees + row.agent_fee_amount);
    }

    FinancialReport {
        period,
        job_income,
        driver_fees,
        agent_fees,
        job_profit,
        shuttle_income,
        expenses: expense_total,
        total_income: quantize(job_income + shuttle_income),
        overall_profit: quantize(job_profit + shuttle_income - expense_total),
        agents: by_agent.into_values().collect(),
        jobs: rows,
    }
}

fn breakdown(job: &Job) -> JobBreakdown {
    let price = job.job_price_in_euros.unwrap_or(Decimal::ZERO);
    let driver_fee = job.driver_fee_in_euros.unwrap_or(Decimal::ZERO);
    let agent_fee = fees::agent_fee(job.agent_fee_tier, price, Some(driver_fee), None);

    JobBreakdown {
        job_id: job.id.clone(),
        customer_name: job.customer_name.clone(),
        job_date: job.job_date,
        job_price: price,
        driver_fee,
        agent_id: job.agent_id.clone(),
        agent_fee_tier: job.agent_fee_tier,
        agent_fee_amount: agent_fee,
        profit: fees::job_subtotal(price, Some(driver_fee), agent_fee),
    }
}

fn sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    quantize(values.sum())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::ShuttleConfig;
    use crate::expense::ExpenseType;
    use crate::money::Currency;
    use crate::status::BookingStatus;
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn job(date: NaiveDate, price: Decimal, driver: Decimal, tier: Option<AgentFeeTier>, agent: Option<&str>, status: BookingStatus) -> Job {
        let mut job = Job::new("C", "1", date, NaiveTime::MIN, price, Currency::Eur);
        job.job_price_in_euros = Some(price);
        job.driver_fee = Some(driver);
        job.driver_fee_in_euros = Some(driver);
        job.agent_fee_tier = tier;
        job.agent_id = agent.map(str::to_string);
        job.status = status;
        job
    }

    fn fixture() -> (Vec<Job>, Vec<Shuttle>, Vec<Expense>) {
        let jobs = vec![
            job(day(2026, 5, 3), dec!(1000), dec!(50), Some(AgentFeeTier::FivePercent), Some("agt-a"), BookingStatus::Paid),
            job(day(2026, 5, 20), dec!(3000), dec!(150), Some(AgentFeeTier::HalfProfit), Some("agt-b"), BookingStatus::Completed),
            job(day(2026, 5, 21), dec!(500), dec!(0), None, None, BookingStatus::Confirmed),
            job(day(2026, 2, 1), dec!(2000), dec!(100), Some(AgentFeeTier::TenPercent), Some("agt-a"), BookingStatus::Paid),
            job(day(2025, 12, 30), dec!(700), dec!(0), None, None, BookingStatus::Completed),
        ];

        let mut shuttle = Shuttle::new("S", "1", day(2026, 5, 10), 2, &ShuttleConfig::default());
        shuttle.price_in_euros = Some(shuttle.price);
        let mut old_shuttle = Shuttle::new("S", "1", day(2026, 1, 10), 1, &ShuttleConfig::default());
        old_shuttle.price_in_euros = Some(old_shuttle.price);

        let mut fuel = Expense::new(ExpenseType::Fuel, dec!(80), Currency::Eur, day(2026, 5, 4));
        fuel.amount_in_euros = Some(dec!(80));
        let mut toll = Expense::new(ExpenseType::Toll, dec!(20), Currency::Eur, day(2026, 3, 4));
        toll.amount_in_euros = Some(dec!(20));

        (jobs, vec![shuttle, old_shuttle], vec![fuel, toll])
    }

    #[test]
    fn test_month_report_counts_paid_jobs_only() {
        let (jobs, shuttles, expenses) = fixture();
        let report = build_report(ReportPeriod::Month { year: 2026, month: 5 }, &jobs, &shuttles, &expenses);

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.jobs[0].job_date, day(2026, 5, 20));
        assert_eq!(report.job_income, dec!(4000.00));
        assert_eq!(report.driver_fees, dec!(200.00));
        assert_eq!(report.agent_fees, dec!(1475.00));
        assert_eq!(report.job_profit, dec!(2325.00));
        assert_eq!(report.shuttle_income, dec!(120.00));
        assert_eq!(report.expenses, dec!(80.00));
        assert_eq!(report.total_income, dec!(4120.00));
        assert_eq!(report.overall_profit, dec!(2365.00));
    }

    #[test]
    fn test_year_report_groups_agents() {
        let (jobs, shuttles, expenses) = fixture();
        let report = build_report(ReportPeriod::Year { year: 2026 }, &jobs, &shuttles, &expenses);

        assert_eq!(report.jobs.len(), 3);
        assert_eq!(report.shuttle_income, dec!(180.00));
        assert_eq!(report.expenses, dec!(100.00));

        let a = report
            .agents
            .iter()
            .find(|t| t.agent_id.as_deref() == Some("agt-a"))
            .unwrap();
        assert_eq!(a.jobs, 2);
        assert_eq!(a.agent_fees, dec!(250.00));
    }

    #[test]
    fn test_all_time_includes_unpaid_jobs() {
        let (jobs, shuttles, expenses) = fixture();
        let report = build_report(ReportPeriod::AllTime, &jobs, &shuttles, &expenses);

        assert_eq!(report.jobs.len(), 5);
        assert_eq!(report.jobs[0].job_date, day(2025, 12, 30));
        assert_eq!(report.job_income, dec!(7200.00));
        let unassigned = report.agents.iter().find(|t| t.agent_id.is_none()).unwrap();
        assert_eq!(unassigned.jobs, 2);
        assert_eq!(unassigned.agent_fees, dec!(0.00));
    }

    #[test]
    fn test_current_periods_use_budapest_time() {
        // 23:30 UTC on 31 May is already 1 June in Budapest
        let now = Utc.with_ymd_and_hms(2026, 5, 31, 23, 30, 0).unwrap();
        assert_eq!(ReportPeriod::current_month(now), ReportPeriod::Month { year: 2026, month: 6 });
        assert_eq!(ReportPeriod::current_year(now), ReportPeriod::Year { year: 2026 });
    }

    #[test]
    fn test_period_bounds() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(
            ReportPeriod::Month { year: 2028, month: 2 }.bounds(),
            Some((d(2028, 2, 1), d(2028, 2, 29)))
        );
        assert_eq!(
            ReportPeriod::Month { year: 2026, month: 12 }.bounds(),
            Some((d(2026, 12, 1), d(2026, 12, 31)))
        );
        assert_eq!(ReportPeriod::AllTime.bounds(), None);
    }
}
