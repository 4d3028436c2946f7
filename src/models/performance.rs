use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day of fund-wide trading performance, keyed by calendar date.
///
/// All money fields are fund-wide figures except `personal_balance`, which is
/// the investor's reconstructed balance and is only ever written by the
/// balance replicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPerformanceRow {
    pub date: NaiveDate,
    pub start_balance: f64,
    pub end_balance: f64,
    pub won: u32,
    pub lost: u32,
    pub total_trades: u32,
    /// Percentage in the range 0..=100.
    pub win_rate: f64,
    pub deposits: f64,
    pub withdrawals: f64,
    pub realized_profit: f64,
    /// Percentage return for this date.
    pub daily_growth: f64,
    /// Cumulative percentage return. Informational only.
    pub running_growth: f64,
    #[serde(default)]
    pub personal_balance: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}

impl DailyPerformanceRow {
    /// A row with only a date and a growth rate set. Handy for tests and for
    /// callers that only care about the replay inputs.
    pub fn with_growth(date: NaiveDate, daily_growth: f64) -> Self {
        Self {
            date,
            start_balance: 0.0,
            end_balance: 0.0,
            won: 0,
            lost: 0,
            total_trades: 0,
            win_rate: 0.0,
            deposits: 0.0,
            withdrawals: 0.0,
            realized_profit: 0.0,
            daily_growth,
            running_growth: 0.0,
            personal_balance: None,
            scraped_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn with_end_balance(mut self, end_balance: f64) -> Self {
        self.end_balance = end_balance;
        self
    }

    pub fn with_personal_balance(mut self, personal_balance: f64) -> Self {
        self.personal_balance = Some(personal_balance);
        self
    }
}

/// A computed personal balance for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub date: NaiveDate,
    pub personal_balance: f64,
}
