use chrono::NaiveDate;
use serde::Serialize;

use crate::balance::{RecomputeOutcome, RecomputeReport};
use crate::models::AccountEvent;

/// JSON output for backfill and ingest runs
#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub source: String,
    pub requested_start: NaiveDate,
    pub requested_end: NaiveDate,
    pub fetched: usize,
    pub upserted: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub balance: RecomputeOutcome,
}

/// JSON output for a recorded account event
#[derive(Debug, Serialize)]
pub struct EventOutput {
    pub success: bool,
    pub event: AccountEvent,
    pub recompute: RecomputeReport,
    /// Set when the event's date has no performance row to apply it on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// JSON output for stored performance rows
#[derive(Debug, Serialize)]
pub struct RowOutput {
    pub date: NaiveDate,
    pub daily_growth: f64,
    pub running_growth: f64,
    pub end_balance: f64,
    pub total_trades: u32,
    pub win_rate: f64,
    pub personal_balance: Option<f64>,
}
