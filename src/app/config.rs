use std::path::Path;

use crate::config::ResolvedConfig;
use crate::duration::format_days;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "source": {
            "base_url": config.source.base_url,
            "account_id": config.source.account_id,
            "token_env": config.source.token_env,
            "token_set": config.source.token().is_ok(),
        },
        "ingest": {
            "lookback": format_days(config.ingest.lookback_days),
            "backfill_start": config.ingest.backfill_start.to_string(),
            "backfill_end": config.ingest.backfill_end.to_string(),
            "batch_size": config.ingest.batch_size,
            "max_write_attempts": config.ingest.max_write_attempts,
            "retry_backoff_ms": config.ingest.retry_backoff.as_millis() as u64,
        }
    })
}
