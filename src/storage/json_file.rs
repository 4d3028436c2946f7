use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::models::{AccountEvent, BalanceUpdate, DailyPerformanceRow, NewAccountEvent};

use super::{sort_events, Storage};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   performance/
///     {year}.jsonl      one DailyPerformanceRow per line, sorted by date
///   account_events.jsonl  append-only ledger
/// ```
///
/// Year files are rewritten whole through a temporary file and a rename, so a
/// reader sees either the old or the new contents of a year, never a mix.
pub struct JsonFileStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn performance_dir(&self) -> PathBuf {
        self.base_path.join("performance")
    }

    fn year_file(&self, year: i32) -> PathBuf {
        self.performance_dir().join(format!("{year:04}.jsonl"))
    }

    fn events_file(&self) -> PathBuf {
        self.base_path.join("account_events.jsonl")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line in {}: {line}", path.display()))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        self.ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.flush().await?;

        Ok(())
    }

    /// Replace `path` with `items` via a sibling temp file and a rename.
    async fn write_jsonl_atomic<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        self.ensure_dir(path).await?;

        let mut content = String::new();
        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            content.push_str(&line);
            content.push('\n');
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn list_years(&self) -> Result<Vec<i32>> {
        let mut entries = match fs::read_dir(self.performance_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read performance directory"),
        };

        let mut years = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(year) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i32>().ok())
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    async fn read_year(&self, year: i32) -> Result<BTreeMap<NaiveDate, DailyPerformanceRow>> {
        let rows: Vec<DailyPerformanceRow> = self.read_jsonl(&self.year_file(year)).await?;
        // Last line wins if a date was ever written twice.
        Ok(rows.into_iter().map(|row| (row.date, row)).collect())
    }

    async fn write_year(
        &self,
        year: i32,
        rows: &BTreeMap<NaiveDate, DailyPerformanceRow>,
    ) -> Result<()> {
        let items: Vec<&DailyPerformanceRow> = rows.values().collect();
        self.write_jsonl_atomic(&self.year_file(year), &items).await
    }

    async fn rows_in_years(
        &self,
        first_year: i32,
        last_year: i32,
    ) -> Result<Vec<DailyPerformanceRow>> {
        let mut out = Vec::new();
        for year in self.list_years().await? {
            if year < first_year || year > last_year {
                continue;
            }
            out.extend(self.read_year(year).await?.into_values());
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn list_rows(&self) -> Result<Vec<DailyPerformanceRow>> {
        self.rows_in_years(i32::MIN, i32::MAX).await
    }

    async fn get_rows_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPerformanceRow>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut rows = self.rows_in_years(start.year(), end.year()).await?;
        rows.retain(|row| row.date >= start && row.date <= end);
        Ok(rows)
    }

    async fn get_latest_personal_balance_before(&self, date: NaiveDate) -> Result<Option<f64>> {
        for year in self.list_years().await?.into_iter().rev() {
            if year > date.year() {
                continue;
            }
            let rows = self.read_year(year).await?;
            if let Some(balance) = rows
                .range(..date)
                .rev()
                .find_map(|(_, row)| row.personal_balance)
            {
                return Ok(Some(balance));
            }
        }
        Ok(None)
    }

    async fn upsert_rows(&self, rows: &[DailyPerformanceRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let mut by_year: BTreeMap<i32, Vec<&DailyPerformanceRow>> = BTreeMap::new();
        for row in rows {
            by_year.entry(row.date.year()).or_default().push(row);
        }

        for (year, incoming) in by_year {
            let mut existing = self.read_year(year).await?;
            for row in incoming {
                existing.insert(row.date, row.clone());
            }
            self.write_year(year, &existing).await?;
        }
        Ok(())
    }

    async fn update_personal_balances(&self, updates: &[BalanceUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let years: BTreeSet<i32> = updates.iter().map(|u| u.date.year()).collect();
        for year in years {
            let mut rows = self.read_year(year).await?;
            let mut touched = false;
            for update in updates.iter().filter(|u| u.date.year() == year) {
                if let Some(row) = rows.get_mut(&update.date) {
                    row.personal_balance = Some(update.personal_balance);
                    touched = true;
                }
            }
            if touched {
                self.write_year(year, &rows).await?;
            }
        }
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<AccountEvent>> {
        let mut events: Vec<AccountEvent> = self.read_jsonl(&self.events_file()).await?;
        sort_events(&mut events);
        Ok(events)
    }

    async fn append_event(&self, event: NewAccountEvent) -> Result<AccountEvent> {
        let _guard = self.write_lock.lock().await;

        let existing: Vec<AccountEvent> = self.read_jsonl(&self.events_file()).await?;
        let next_id = existing.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let event = event.into_event(next_id);
        self.append_jsonl(&self.events_file(), std::slice::from_ref(&event))
            .await?;
        Ok(event)
    }
}
