mod config;
mod events;
mod ledger;
mod list;
mod summary;
mod types;

pub use config::config_output;
pub use events::{add_event, list_events};
pub use ledger::{backfill, backfill_with, ingest, ingest_with, recompute};
pub use list::list_rows;
pub use summary::{summary, summary_with};
pub use types::{EventOutput, IngestOutput, RowOutput};

#[cfg(feature = "source")]
pub use source::build_source;

#[cfg(feature = "source")]
mod source {
    use anyhow::{Context, Result};

    use crate::config::ResolvedConfig;
    use crate::ingest::FinanceApiSource;

    /// Build the HTTP performance source from `[source]` settings.
    pub fn build_source(config: &ResolvedConfig) -> Result<FinanceApiSource> {
        let base_url = config
            .source
            .base_url
            .as_deref()
            .context("source.base_url is not configured")?;
        let account_id = config
            .source
            .account_id
            .context("source.account_id is not configured")?;
        let token = config.source.token()?;
        Ok(FinanceApiSource::new(base_url, account_id, token))
    }
}
