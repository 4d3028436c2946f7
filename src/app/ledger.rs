use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};

use crate::balance::{BalanceReplicator, RecomputeOutcome, RecomputeReport};
use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::ingest::{normalize_all, PerformanceSource};
use crate::models::DailyPerformanceRow;
use crate::storage::Storage;

use super::types::IngestOutput;

/// Fetch, normalize and upsert rows for `start..=end`.
async fn fetch_and_store(
    storage: &dyn Storage,
    source: &dyn PerformanceSource,
    clock: &dyn Clock,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(usize, Vec<DailyPerformanceRow>)> {
    info!(source = source.name(), %start, %end, "fetching daily performance");
    let raws = source.fetch_daily_performance(start, end).await?;
    info!(fetched = raws.len(), "fetched daily performance rows");

    if raws.is_empty() {
        return Ok((0, Vec::new()));
    }

    // Validate the whole batch before touching the store.
    let rows = normalize_all(&raws, clock.now())?;
    storage.upsert_rows(&rows).await?;
    info!(upserted = rows.len(), "upserted daily performance rows");

    Ok((raws.len(), rows))
}

fn ingest_output(
    source: &dyn PerformanceSource,
    start: NaiveDate,
    end: NaiveDate,
    fetched: usize,
    rows: &[DailyPerformanceRow],
    balance: RecomputeOutcome,
) -> IngestOutput {
    IngestOutput {
        source: source.name().to_string(),
        requested_start: start,
        requested_end: end,
        fetched,
        upserted: rows.len(),
        first_date: rows.first().map(|r| r.date),
        last_date: rows.last().map(|r| r.date),
        balance,
    }
}

pub async fn backfill(
    storage: &dyn Storage,
    source: &dyn PerformanceSource,
    config: &ResolvedConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<IngestOutput> {
    backfill_with(storage, source, config, start, end, &SystemClock).await
}

/// Load the full history and rebuild the personal balance chain from scratch.
///
/// With no account events yet the rows are still stored, and the balance chain
/// is skipped with a warning rather than failing the whole backfill.
pub async fn backfill_with(
    storage: &dyn Storage,
    source: &dyn PerformanceSource,
    config: &ResolvedConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clock: &dyn Clock,
) -> Result<IngestOutput> {
    let start = start.unwrap_or(config.ingest.backfill_start);
    let end = end.unwrap_or(config.ingest.backfill_end);
    if start > end {
        anyhow::bail!("Backfill start {start} is after end {end}");
    }

    let (fetched, rows) = fetch_and_store(storage, source, clock, start, end).await?;
    if rows.is_empty() {
        info!("no data to backfill");
        let balance = RecomputeOutcome::Skipped {
            reason: "source returned no rows".to_string(),
        };
        return Ok(ingest_output(source, start, end, fetched, &rows, balance));
    }

    let balance = if storage.list_events().await?.is_empty() {
        warn!("no account events found; personal balance will not be computed until an initial contribution is recorded");
        RecomputeOutcome::Skipped {
            reason: "no account events recorded".to_string(),
        }
    } else {
        let report = BalanceReplicator::new(storage)
            .with_options(config.ingest.recompute_options())
            .recompute_all()
            .await?;
        RecomputeOutcome::Completed(report)
    };

    Ok(ingest_output(source, start, end, fetched, &rows, balance))
}

/// Rebuild every personal balance from a zero seed.
///
/// Fails with a precondition error when the ledger is empty.
pub async fn recompute(storage: &dyn Storage, config: &ResolvedConfig) -> Result<RecomputeReport> {
    BalanceReplicator::new(storage)
        .with_options(config.ingest.recompute_options())
        .recompute_all()
        .await
}

pub async fn ingest(
    storage: &dyn Storage,
    source: &dyn PerformanceSource,
    config: &ResolvedConfig,
    lookback_days: Option<u64>,
) -> Result<IngestOutput> {
    ingest_with(storage, source, config, lookback_days, &SystemClock).await
}

/// Re-fetch the recent window and extend the personal balance chain over it.
///
/// Upstream figures for recent days get corrected after the fact, so the
/// window is re-fetched in full and recomputed from its first date, seeded by
/// the last balance before it. When nothing before the window carries a
/// balance the whole chain is rebuilt from zero.
pub async fn ingest_with(
    storage: &dyn Storage,
    source: &dyn PerformanceSource,
    config: &ResolvedConfig,
    lookback_days: Option<u64>,
    clock: &dyn Clock,
) -> Result<IngestOutput> {
    let lookback = lookback_days.unwrap_or(config.ingest.lookback_days);
    let end = clock.today();
    let start = end
        .checked_sub_days(Days::new(lookback))
        .unwrap_or(NaiveDate::MIN);

    let (fetched, rows) = fetch_and_store(storage, source, clock, start, end).await?;
    let Some(earliest) = rows.first().map(|r| r.date) else {
        info!("no data returned, skipping");
        let balance = RecomputeOutcome::Skipped {
            reason: "source returned no rows".to_string(),
        };
        return Ok(ingest_output(source, start, end, fetched, &rows, balance));
    };

    // The upsert cleared balances in the window, so with any events recorded
    // the chain must be rebuilt even when nothing before the window is seeded.
    let balance = if storage.list_events().await?.is_empty() {
        info!("no account events found, skipping balance computation");
        RecomputeOutcome::Skipped {
            reason: "no account events recorded".to_string(),
        }
    } else {
        let report = BalanceReplicator::new(storage)
            .with_options(config.ingest.recompute_options())
            .recompute_after_event(earliest)
            .await?;
        RecomputeOutcome::Completed(report)
    };

    Ok(ingest_output(source, start, end, fetched, &rows, balance))
}
