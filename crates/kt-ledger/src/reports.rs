//! # Financial Reports
//!
//! Loads the period's rows and hands them to [`kt_core::report`].
//! "Current" periods are Budapest periods.

use chrono::NaiveDate;
use tracing::debug;

use kt_core::report::build_report;
use kt_core::shuttle_day::summarize_day;
use kt_core::{FinancialReport, ReportPeriod, ShuttleDaySummary};

use crate::error::LedgerResult;
use crate::lifecycle::Ledger;

impl<S> Ledger<S> {
    pub async fn report(&self, period: ReportPeriod) -> LedgerResult<FinancialReport> {
        let (jobs, shuttles, expenses) = match period.bounds() {
            Some((from, to)) => (
                self.db.jobs().list_between(from, to).await?,
                self.db.shuttles().list_between(from, to).await?,
                self.db.expenses().list_between(from, to).await?,
            ),
            None => (
                self.db.jobs().list_all().await?,
                self.db.shuttles().list_all().await?,
                self.db.expenses().list_all().await?,
            ),
        };

        let report = build_report(period, &jobs, &shuttles, &expenses);
        debug!(
            ?period,
            jobs = report.jobs.len(),
            total_income = %report.total_income,
            overall_profit = %report.overall_profit,
            "Built financial report"
        );
        Ok(report)
    }

    pub async fn current_month_report(&self) -> LedgerResult<FinancialReport> {
        self.report(ReportPeriod::current_month(self.clock.now())).await
    }

    pub async fn current_year_report(&self) -> LedgerResult<FinancialReport> {
        self.report(ReportPeriod::current_year(self.clock.now())).await
    }

    /// Shuttle income against driver costs for one day.
    pub async fn shuttle_day_summary(&self, shuttle_date: NaiveDate) -> LedgerResult<ShuttleDaySummary> {
        let shuttles = self.db.shuttles().list_between(shuttle_date, shuttle_date).await?;
        let costs = self.db.shuttle_daily_costs().list_for_day(shuttle_date).await?;

        let summary = summarize_day(shuttle_date, &shuttles, &costs);
        debug!(%shuttle_date, profit = %summary.profit, "Built shuttle day summary");
        Ok(summary)
    }
}
