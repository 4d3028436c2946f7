//! Personal balance reconstruction.
//!
//! The personal balance series is a left fold over the daily performance rows:
//! each date first applies that date's contributions and withdrawals, then
//! compounds the fund's daily growth onto a positive balance. [`replay`] is the
//! fold itself; [`BalanceReplicator`] drives it against a [`Storage`] for full
//! and incremental passes.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{AccountEvent, BalanceUpdate, DailyPerformanceRow};
use crate::storage::{sort_events, Storage};

/// Group ledger events by date. Events within a date keep insertion (`id`)
/// order, which is the order they are applied in.
pub fn group_events_by_date(
    mut events: Vec<AccountEvent>,
) -> BTreeMap<NaiveDate, Vec<AccountEvent>> {
    sort_events(&mut events);
    let mut grouped: BTreeMap<NaiveDate, Vec<AccountEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.date).or_default().push(event);
    }
    grouped
}

/// Apply one date's events and growth to `balance`.
pub fn step(balance: f64, events: &[AccountEvent], daily_growth: f64) -> f64 {
    let mut balance = events
        .iter()
        .fold(balance, |acc, event| acc + event.signed_amount());

    // No growth or decay on an empty or overdrawn balance; a zero rate is
    // skipped outright to avoid multiplying by exactly 1.0.
    if balance > 0.0 && daily_growth != 0.0 {
        balance *= 1.0 + daily_growth / 100.0;
    }
    balance
}

/// Replay `rows` (ascending by date) starting from `seed`.
///
/// Use `seed = 0.0` for a from-scratch run, or the last known balance before
/// the first row for an incremental run. Events on dates without a row are
/// never applied.
pub fn replay(
    seed: f64,
    rows: &[DailyPerformanceRow],
    events_by_date: &BTreeMap<NaiveDate, Vec<AccountEvent>>,
) -> Vec<BalanceUpdate> {
    let mut balance = seed;
    rows.iter()
        .map(|row| {
            let events = events_by_date
                .get(&row.date)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            balance = step(balance, events, row.daily_growth);
            BalanceUpdate {
                date: row.date,
                personal_balance: balance,
            }
        })
        .collect()
}

/// Tuning for how a recompute pass writes its results.
#[derive(Debug, Clone)]
pub struct RecomputeOptions {
    /// Number of balance updates sent to the store per call.
    pub batch_size: usize,
    /// Attempts per batch before the pass is abandoned.
    pub max_write_attempts: u32,
    /// Delay before the n-th retry is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for RecomputeOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_write_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Summary of a completed recompute pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeReport {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub latest_balance: Option<f64>,
}

impl RecomputeReport {
    fn from_updates(updates: &[BalanceUpdate]) -> Self {
        Self {
            rows: updates.len(),
            first_date: updates.first().map(|u| u.date),
            last_date: updates.last().map(|u| u.date),
            latest_balance: updates.last().map(|u| u.personal_balance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecomputeOutcome {
    Completed(RecomputeReport),
    /// Nothing to chain from: no row before the range has a personal balance.
    Skipped { reason: String },
}

/// Writes the replayed personal balance series back to a store.
pub struct BalanceReplicator<'a> {
    storage: &'a dyn Storage,
    options: RecomputeOptions,
}

impl<'a> BalanceReplicator<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            options: RecomputeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RecomputeOptions) -> Self {
        self.options = options;
        self
    }

    /// Recompute every row from a zero seed.
    ///
    /// Fails with [`Error::Precondition`], before writing anything, when the
    /// ledger holds no events.
    pub async fn recompute_all(&self) -> Result<RecomputeReport> {
        let events_by_date = self.storage.get_events_by_date().await?;
        if events_by_date.is_empty() {
            return Err(Error::precondition(
                "no account events found; record an initial contribution before computing balances",
            )
            .into());
        }

        let rows = self.storage.list_rows().await?;
        info!(rows = rows.len(), "recomputing personal balance from scratch");

        let updates = replay(0.0, &rows, &events_by_date);
        self.write(&updates).await?;

        let report = RecomputeReport::from_updates(&updates);
        info!(
            rows = report.rows,
            latest_balance = ?report.latest_balance,
            last_date = ?report.last_date,
            "personal balance recompute complete"
        );
        Ok(report)
    }

    /// Recompute rows dated `start` or later, seeded from the latest personal
    /// balance before `start`. Earlier balances are trusted as-is.
    pub async fn recompute_from(&self, start: NaiveDate) -> Result<RecomputeOutcome> {
        let Some(seed) = self.storage.get_latest_personal_balance_before(start).await? else {
            info!(%start, "no prior personal balance found, skipping balance computation");
            return Ok(RecomputeOutcome::Skipped {
                reason: format!("no personal balance recorded before {start}"),
            });
        };

        let rows = self.storage.get_rows_from(start).await?;
        let events_by_date = self.storage.get_events_by_date().await?;
        debug!(%start, seed, rows = rows.len(), "recomputing personal balance incrementally");

        let updates = replay(seed, &rows, &events_by_date);
        self.write(&updates).await?;

        let report = RecomputeReport::from_updates(&updates);
        info!(
            rows = report.rows,
            latest_balance = ?report.latest_balance,
            "incremental personal balance recompute complete"
        );
        Ok(RecomputeOutcome::Completed(report))
    }

    /// Recompute after a ledger change on `date`: incrementally when a balance
    /// exists before it, from scratch otherwise.
    pub async fn recompute_after_event(&self, date: NaiveDate) -> Result<RecomputeReport> {
        match self.recompute_from(date).await? {
            RecomputeOutcome::Completed(report) => Ok(report),
            RecomputeOutcome::Skipped { .. } => self.recompute_all().await,
        }
    }

    async fn write(&self, updates: &[BalanceUpdate]) -> Result<()> {
        let batch_size = self.options.batch_size.max(1);
        let max_attempts = self.options.max_write_attempts.max(1);

        for (index, batch) in updates.chunks(batch_size).enumerate() {
            let mut attempt = 1;
            loop {
                match self.storage.update_personal_balances(batch).await {
                    Ok(()) => break,
                    Err(err) if attempt < max_attempts => {
                        warn!(
                            batch = index,
                            attempt,
                            error = %err,
                            "personal balance batch write failed, retrying"
                        );
                        tokio::time::sleep(self.options.retry_backoff * attempt).await;
                        attempt += 1;
                    }
                    Err(err) => {
                        let resume_from = batch.first().map(|u| u.date);
                        return Err(err.context(format!(
                            "failed to write personal balances after {attempt} attempts; \
                             re-run from {resume_from:?} to resume"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
