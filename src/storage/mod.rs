mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::{AccountEvent, BalanceUpdate, DailyPerformanceRow, NewAccountEvent};

/// Persistence for the daily performance series and the account ledger.
///
/// All reads return rows in ascending date order and events in ascending
/// `(date, id)` order. Implementations are not expected to guard against
/// concurrent recompute passes; callers serialize those.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Daily performance
    async fn list_rows(&self) -> Result<Vec<DailyPerformanceRow>>;

    /// Rows with `start <= date <= end`.
    async fn get_rows_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPerformanceRow>>;

    /// Rows with `date >= start`.
    async fn get_rows_from(&self, start: NaiveDate) -> Result<Vec<DailyPerformanceRow>> {
        self.get_rows_by_date_range(start, NaiveDate::MAX).await
    }

    /// Latest non-null `personal_balance` strictly before `date`.
    async fn get_latest_personal_balance_before(&self, date: NaiveDate) -> Result<Option<f64>>;

    /// Insert or replace rows by date. A replaced row takes the incoming
    /// `personal_balance`, which is normally `None` until recomputed.
    async fn upsert_rows(&self, rows: &[DailyPerformanceRow]) -> Result<()>;

    /// Set `personal_balance` on existing rows. Dates without a row are ignored.
    async fn update_personal_balances(&self, updates: &[BalanceUpdate]) -> Result<()>;

    async fn update_personal_balance(&self, date: NaiveDate, value: f64) -> Result<()> {
        self.update_personal_balances(&[BalanceUpdate {
            date,
            personal_balance: value,
        }])
        .await
    }

    // Account events
    async fn list_events(&self) -> Result<Vec<AccountEvent>>;

    /// Append an event, assigning the next id.
    async fn append_event(&self, event: NewAccountEvent) -> Result<AccountEvent>;

    async fn get_events_by_date(&self) -> Result<BTreeMap<NaiveDate, Vec<AccountEvent>>> {
        let events = self.list_events().await?;
        Ok(crate::balance::group_events_by_date(events))
    }
}

/// Sort events into ledger order: by date, then by insertion id.
pub(crate) fn sort_events(events: &mut [AccountEvent]) {
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}
