use anyhow::Result;
use chrono::NaiveDate;

use crate::storage::Storage;

use super::types::RowOutput;

pub async fn list_rows(
    storage: &dyn Storage,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<RowOutput>> {
    let rows = match (start, end) {
        (None, None) => storage.list_rows().await?,
        (start, end) => {
            storage
                .get_rows_by_date_range(
                    start.unwrap_or(NaiveDate::MIN),
                    end.unwrap_or(NaiveDate::MAX),
                )
                .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|row| RowOutput {
            date: row.date,
            daily_growth: row.daily_growth,
            running_growth: row.running_growth,
            end_balance: row.end_balance,
            total_trades: row.total_trades,
            win_rate: row.win_rate,
            personal_balance: row.personal_balance,
        })
        .collect())
}
