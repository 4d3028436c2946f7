// src/storage/memory.rs
//! In-memory storage implementation for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::models::{AccountEvent, BalanceUpdate, DailyPerformanceRow, NewAccountEvent};

use super::{sort_events, Storage};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    rows: Mutex<BTreeMap<NaiveDate, DailyPerformanceRow>>,
    events: Mutex<Vec<AccountEvent>>,
    balance_writes: AtomicUsize,
    failing_balance_writes: StdMutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            events: Mutex::new(Vec::new()),
            balance_writes: AtomicUsize::new(0),
            failing_balance_writes: StdMutex::new(0),
        }
    }

    /// Number of successful `update_personal_balances` calls so far.
    pub fn balance_write_count(&self) -> usize {
        self.balance_writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` balance writes fail before touching any row.
    pub fn fail_next_balance_writes(&self, count: usize) {
        let mut failing = self
            .failing_balance_writes
            .lock()
            .expect("failure counter lock poisoned");
        *failing = count;
    }

    pub async fn personal_balance(&self, date: NaiveDate) -> Option<f64> {
        let rows = self.rows.lock().await;
        rows.get(&date).and_then(|row| row.personal_balance)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn list_rows(&self) -> Result<Vec<DailyPerformanceRow>> {
        let rows = self.rows.lock().await;
        Ok(rows.values().cloned().collect())
    }

    async fn get_rows_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPerformanceRow>> {
        if start > end {
            return Ok(Vec::new());
        }
        let rows = self.rows.lock().await;
        Ok(rows.range(start..=end).map(|(_, row)| row.clone()).collect())
    }

    async fn get_latest_personal_balance_before(&self, date: NaiveDate) -> Result<Option<f64>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .range(..date)
            .rev()
            .find_map(|(_, row)| row.personal_balance))
    }

    async fn upsert_rows(&self, new_rows: &[DailyPerformanceRow]) -> Result<()> {
        let mut rows = self.rows.lock().await;
        for row in new_rows {
            rows.insert(row.date, row.clone());
        }
        Ok(())
    }

    async fn update_personal_balances(&self, updates: &[BalanceUpdate]) -> Result<()> {
        {
            let mut failing = self
                .failing_balance_writes
                .lock()
                .expect("failure counter lock poisoned");
            if *failing > 0 {
                *failing -= 1;
                anyhow::bail!("Simulated balance write failure");
            }
        }

        let mut rows = self.rows.lock().await;
        for update in updates {
            if let Some(row) = rows.get_mut(&update.date) {
                row.personal_balance = Some(update.personal_balance);
            }
        }
        self.balance_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<AccountEvent>> {
        let mut events = self.events.lock().await.clone();
        sort_events(&mut events);
        Ok(events)
    }

    async fn append_event(&self, event: NewAccountEvent) -> Result<AccountEvent> {
        let mut events = self.events.lock().await;
        let next_id = events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let event = event.into_event(next_id);
        events.push(event.clone());
        Ok(event)
    }
}
