//! Normalization of upstream daily performance rows.
//!
//! The upstream report sends most numeric fields as strings (`"1234.56"`) and
//! a few as numbers, sometimes either. Everything is parsed strictly here so
//! that nothing downstream sees a malformed value.

#[cfg(feature = "source")]
mod source;

#[cfg(feature = "source")]
pub use source::FinanceApiSource;

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::DailyPerformanceRow;

/// A numeric field that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Number(f64),
    Text(String),
}

impl NumericValue {
    pub fn to_f64(&self, field: &str) -> Result<f64, Error> {
        let value = match self {
            NumericValue::Number(n) => *n,
            NumericValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                Error::validation(format!("{field}: {s:?} is not a number"))
            })?,
        };
        if !value.is_finite() {
            return Err(Error::validation(format!("{field}: value must be finite")));
        }
        Ok(value)
    }

    pub fn to_count(&self, field: &str) -> Result<u32, Error> {
        let value = self.to_f64(field)?;
        if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
            return Err(Error::validation(format!(
                "{field}: {value} is not a non-negative whole number"
            )));
        }
        Ok(value as u32)
    }
}

impl From<f64> for NumericValue {
    fn from(value: f64) -> Self {
        NumericValue::Number(value)
    }
}

impl From<&str> for NumericValue {
    fn from(value: &str) -> Self {
        NumericValue::Text(value.to_string())
    }
}

/// A row as returned by the performance report endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPerformanceRow {
    pub date: String,
    pub start_balance: NumericValue,
    pub end_balance: NumericValue,
    pub won_count: NumericValue,
    pub lost_count: NumericValue,
    pub win_rate: NumericValue,
    pub deposits: NumericValue,
    pub withdrawals: NumericValue,
    pub profit: NumericValue,
    #[serde(rename = "growthdaily")]
    pub growth_daily: NumericValue,
    pub growth: NumericValue,
}

/// Parse `YYYY-MM-DD`, ignoring any time component that follows it.
pub fn parse_row_date(value: &str) -> Result<NaiveDate, Error> {
    let trimmed = value.trim();
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| Error::validation(format!("date: {value:?} is not a YYYY-MM-DD date")))
}

/// Convert one upstream row into the canonical shape.
pub fn normalize(raw: &RawPerformanceRow, scraped_at: DateTime<Utc>) -> Result<DailyPerformanceRow, Error> {
    let date = parse_row_date(&raw.date)?;
    let with_date = |err: Error| match err {
        Error::Validation(msg) => Error::validation(format!("row {date}: {msg}")),
        other => other,
    };

    let won = raw.won_count.to_count("wonCount").map_err(with_date)?;
    let lost = raw.lost_count.to_count("lostCount").map_err(with_date)?;
    let total_trades = won
        .checked_add(lost)
        .ok_or_else(|| with_date(Error::validation("trade count overflow")))?;

    Ok(DailyPerformanceRow {
        date,
        start_balance: raw.start_balance.to_f64("startBalance").map_err(with_date)?,
        end_balance: raw.end_balance.to_f64("endBalance").map_err(with_date)?,
        won,
        lost,
        total_trades,
        win_rate: raw.win_rate.to_f64("winRate").map_err(with_date)?,
        deposits: raw.deposits.to_f64("deposits").map_err(with_date)?,
        withdrawals: raw.withdrawals.to_f64("withdrawals").map_err(with_date)?,
        realized_profit: raw.profit.to_f64("profit").map_err(with_date)?,
        daily_growth: raw.growth_daily.to_f64("growthdaily").map_err(with_date)?,
        running_growth: raw.growth.to_f64("growth").map_err(with_date)?,
        personal_balance: None,
        scraped_at,
    })
}

/// Normalize a batch and return it sorted by date.
///
/// Any malformed row rejects the whole batch, so nothing partial reaches the
/// store. If the source repeats a date, the later row wins.
pub fn normalize_all(
    raws: &[RawPerformanceRow],
    scraped_at: DateTime<Utc>,
) -> Result<Vec<DailyPerformanceRow>, Error> {
    let mut by_date = BTreeMap::new();
    for raw in raws {
        let row = normalize(raw, scraped_at)?;
        by_date.insert(row.date, row);
    }
    Ok(by_date.into_values().collect())
}

/// Supplier of raw daily performance rows.
#[async_trait::async_trait]
pub trait PerformanceSource: Send + Sync {
    /// Rows for `start..=end`, in whatever order the source returns them.
    async fn fetch_daily_performance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPerformanceRow>>;

    fn name(&self) -> &str;
}
