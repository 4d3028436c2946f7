use std::sync::Arc;

use anyhow::Result;

use crate::clock::{Clock, SystemClock};
use crate::storage::Storage;
use crate::summary::{Period, SummaryService};

pub async fn summary(storage: Arc<dyn Storage>, period: Period) -> Result<serde_json::Value> {
    summary_with(storage, period, Arc::new(SystemClock)).await
}

/// Summary for `period`, or an error object when no personal balance exists yet.
pub async fn summary_with(
    storage: Arc<dyn Storage>,
    period: Period,
    clock: Arc<dyn Clock>,
) -> Result<serde_json::Value> {
    let service = SummaryService::with_clock(storage, clock);
    match service.summary(period).await? {
        Some(summary) => Ok(serde_json::to_value(summary)?),
        None => Ok(serde_json::json!({ "error": "No data available" })),
    }
}
