#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use balancebook::ingest::{NumericValue, PerformanceSource, RawPerformanceRow};
use chrono::NaiveDate;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// An upstream-shaped row with string money fields, as the report sends them.
pub fn raw_row(date: &str, daily_growth: f64, end_balance: f64) -> RawPerformanceRow {
    RawPerformanceRow {
        date: date.to_string(),
        start_balance: NumericValue::from("50000.00"),
        end_balance: NumericValue::Text(format!("{end_balance:.2}")),
        won_count: NumericValue::from(3.0),
        lost_count: NumericValue::from("1"),
        win_rate: NumericValue::from("75.00"),
        deposits: NumericValue::from("0.00"),
        withdrawals: NumericValue::from("0.00"),
        profit: NumericValue::from("120.50"),
        growth_daily: NumericValue::from(daily_growth),
        growth: NumericValue::from(daily_growth),
    }
}

/// Source that serves canned rows filtered to the requested range and records
/// every request it receives.
pub struct StubSource {
    rows: Vec<RawPerformanceRow>,
    requests: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl StubSource {
    pub fn new(rows: Vec<RawPerformanceRow>) -> Self {
        Self {
            rows,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PerformanceSource for StubSource {
    async fn fetch_daily_performance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPerformanceRow>> {
        self.requests.lock().unwrap().push((start, end));
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                let d = date(&row.date[..10]);
                d >= start && d <= end
            })
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}
