//! Period-over-period change in the personal balance.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::models::DailyPerformanceRow;
use crate::storage::Storage;

/// Lookback window for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "all")]
    AllTime,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::OneDay,
        Period::SevenDays,
        Period::OneMonth,
        Period::OneYear,
        Period::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::SevenDays => "7d",
            Period::OneMonth => "1m",
            Period::OneYear => "1y",
            Period::AllTime => "all",
        }
    }

    /// The date the window starts from, or `None` for all-time.
    ///
    /// Month and year offsets use calendar arithmetic; when the day does not
    /// exist in the target month it is clamped to that month's last day
    /// (2024-03-31 minus one month is 2024-02-29).
    pub fn target_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::OneDay => today.checked_sub_days(Days::new(1)),
            Period::SevenDays => today.checked_sub_days(Days::new(7)),
            Period::OneMonth => today.checked_sub_months(Months::new(1)),
            Period::OneYear => today.checked_sub_months(Months::new(12)),
            Period::AllTime => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::validation(format!("invalid period {s:?}. Use: 1d, 7d, 1m, 1y, all")))
    }
}

/// Change in personal balance over a period, as of the latest computed date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub current_balance: f64,
    pub period_change_usd: f64,
    pub period_change_pct: f64,
    /// Fund-wide end balance on `as_of`. Passed through, not derived.
    pub fund_balance: f64,
    pub as_of: NaiveDate,
}

fn positive_balance(row: &DailyPerformanceRow) -> Option<f64> {
    row.personal_balance.filter(|b| *b > 0.0)
}

/// Compute the summary for `period` over `rows` (ascending by date).
///
/// Returns `None` when no row has a personal balance yet.
pub fn summarize(
    rows: &[DailyPerformanceRow],
    period: Period,
    today: NaiveDate,
) -> Option<PeriodSummary> {
    let (current, current_balance) = rows
        .iter()
        .rev()
        .find_map(|row| row.personal_balance.map(|b| (row, b)))?;

    let earliest_positive = rows.iter().find_map(positive_balance);

    let start_balance = match period.target_date(today) {
        None => earliest_positive,
        Some(target) => rows
            .iter()
            .rev()
            .filter(|row| row.date <= target)
            .find_map(positive_balance)
            // The window predates the first funded day.
            .or(earliest_positive),
    }
    .unwrap_or(current_balance);

    let period_change_usd = current_balance - start_balance;
    let period_change_pct = if start_balance != 0.0 {
        period_change_usd / start_balance * 100.0
    } else {
        0.0
    };

    Some(PeriodSummary {
        current_balance,
        period_change_usd,
        period_change_pct,
        fund_balance: current.end_balance,
        as_of: current.date,
    })
}

/// Store-backed summary queries.
pub struct SummaryService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl SummaryService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn summary(&self, period: Period) -> Result<Option<PeriodSummary>> {
        let rows = self.storage.list_rows().await?;
        let today = self.clock.today();
        debug!(%period, %today, rows = rows.len(), "computing period summary");
        Ok(summarize(&rows, period, today))
    }
}
