use anyhow::Result;
use tracing::{info, warn};

use crate::balance::BalanceReplicator;
use crate::config::ResolvedConfig;
use crate::models::{AccountEvent, NewAccountEvent};
use crate::storage::Storage;

use super::types::EventOutput;

/// Record a contribution or withdrawal and bring personal balances up to date.
///
/// Input is validated before anything is written. The chain is recomputed
/// from the event's date, or from scratch when no earlier balance exists.
pub async fn add_event(
    storage: &dyn Storage,
    config: &ResolvedConfig,
    date: &str,
    kind: &str,
    amount: &str,
    notes: Option<&str>,
) -> Result<EventOutput> {
    let mut new_event = NewAccountEvent::parse(date, kind, amount)?;
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        new_event = new_event.with_notes(notes);
    }

    let event = storage.append_event(new_event).await?;
    info!(
        id = event.id,
        date = %event.date,
        kind = %event.kind,
        amount = event.amount,
        "recorded account event"
    );

    // Events only take effect on dates that have a performance row.
    let warning = if storage
        .get_rows_by_date_range(event.date, event.date)
        .await?
        .is_empty()
    {
        warn!(
            id = event.id,
            date = %event.date,
            "no performance row for event date; event will not affect personal balance until a row exists"
        );
        Some(format!(
            "no performance row on {}; the event is not applied until one is ingested",
            event.date
        ))
    } else {
        None
    };

    let recompute = BalanceReplicator::new(storage)
        .with_options(config.ingest.recompute_options())
        .recompute_after_event(event.date)
        .await?;

    Ok(EventOutput {
        success: true,
        event,
        recompute,
        warning,
    })
}

/// All recorded events in ledger order.
pub async fn list_events(storage: &dyn Storage) -> Result<Vec<AccountEvent>> {
    storage.list_events().await
}
