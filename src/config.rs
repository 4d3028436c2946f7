use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::balance::RecomputeOptions;
use crate::duration::{deserialize_days, deserialize_delay};

fn default_token_env() -> String {
    "BALANCEBOOK_API_TOKEN".to_string()
}

/// Upstream performance report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// API root, e.g. `https://api.example.com`.
    pub base_url: Option<String>,

    /// Account whose daily performance report is fetched.
    pub account_id: Option<u64>,

    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            account_id: None,
            token_env: default_token_env(),
        }
    }
}

impl SourceConfig {
    /// Read the bearer token from the configured environment variable.
    pub fn token(&self) -> Result<SecretString> {
        let value = std::env::var(&self.token_env)
            .with_context(|| format!("API token not set: export {}", self.token_env))?;
        if value.trim().is_empty() {
            anyhow::bail!("API token in {} is empty", self.token_env);
        }
        Ok(SecretString::from(value))
    }
}

fn default_lookback_days() -> u64 {
    5
}

fn default_backfill_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date")
}

fn default_backfill_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).expect("valid date")
}

fn default_batch_size() -> usize {
    20
}

fn default_max_write_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

/// Ingestion and recompute settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// How many days back a scheduled ingest re-fetches, to pick up
    /// corrections to recent rows.
    #[serde(
        default = "default_lookback_days",
        deserialize_with = "deserialize_days"
    )]
    pub lookback_days: u64,

    /// First date requested by a backfill.
    #[serde(default = "default_backfill_start")]
    pub backfill_start: NaiveDate,

    /// Last date requested by a backfill.
    #[serde(default = "default_backfill_end")]
    pub backfill_end: NaiveDate,

    /// Personal balance updates written per store call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch write before giving up.
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Base delay between batch write retries.
    #[serde(
        default = "default_retry_backoff",
        deserialize_with = "deserialize_delay"
    )]
    pub retry_backoff: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            backfill_start: default_backfill_start(),
            backfill_end: default_backfill_end(),
            batch_size: default_batch_size(),
            max_write_attempts: default_max_write_attempts(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

impl IngestConfig {
    pub fn recompute_options(&self) -> RecomputeOptions {
        RecomputeOptions {
            batch_size: self.batch_size,
            max_write_attempts: self.max_write_attempts,
            retry_backoff: self.retry_backoff,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Upstream performance report settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Ingestion and recompute settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.ingest.backfill_start > config.ingest.backfill_end {
            anyhow::bail!(
                "ingest.backfill_start ({}) is after ingest.backfill_end ({})",
                config.ingest.backfill_start,
                config.ingest.backfill_end
            );
        }

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub source: SourceConfig,

    pub ingest: IngestConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./balancebook.toml` if it exists in current directory
/// 2. `~/.local/share/balancebook/balancebook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("balancebook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("balancebook").join("balancebook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            source: config.source,
            ingest: config.ingest,
        })
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the intended config directory becomes the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self {
            data_dir: config_dir.to_path_buf(),
            source: SourceConfig::default(),
            ingest: IngestConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_relative_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(Path::new("/srv/fund")),
            PathBuf::from("/srv/fund/data")
        );
    }

    #[test]
    fn test_default_ingest_config() {
        let config = Config::default();
        assert_eq!(config.ingest.lookback_days, 5);
        assert_eq!(config.ingest.batch_size, 20);
        assert_eq!(config.ingest.max_write_attempts, 3);
        assert_eq!(config.ingest.backfill_start.to_string(), "2020-01-01");
        assert_eq!(config.ingest.backfill_end.to_string(), "2030-12-31");
        assert_eq!(config.source.token_env, "BALANCEBOOK_API_TOKEN");
    }

    #[test]
    fn test_load_full_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("balancebook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "data_dir = \"./ledger\"")?;
        writeln!(file, "[source]")?;
        writeln!(file, "base_url = \"https://api.example.com\"")?;
        writeln!(file, "account_id = 17")?;
        writeln!(file, "token_env = \"FUND_TOKEN\"")?;
        writeln!(file, "[ingest]")?;
        writeln!(file, "lookback_days = \"2w\"")?;
        writeln!(file, "backfill_start = \"2023-06-01\"")?;
        writeln!(file, "batch_size = 50")?;
        writeln!(file, "retry_backoff = \"2s\"")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("ledger"));
        assert_eq!(resolved.source.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(resolved.source.account_id, Some(17));
        assert_eq!(resolved.source.token_env, "FUND_TOKEN");
        assert_eq!(resolved.ingest.lookback_days, 14);
        assert_eq!(resolved.ingest.backfill_start.to_string(), "2023-06-01");
        assert_eq!(resolved.ingest.backfill_end.to_string(), "2030-12-31");
        assert_eq!(resolved.ingest.batch_size, 50);
        assert_eq!(resolved.ingest.max_write_attempts, 3);
        assert_eq!(resolved.ingest.retry_backoff, Duration::from_secs(2));

        Ok(())
    }

    #[test]
    fn test_load_rejects_inverted_backfill_range() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("balancebook.toml");
        std::fs::write(
            &config_path,
            "[ingest]\nbackfill_start = \"2025-01-01\"\nbackfill_end = \"2024-01-01\"\n",
        )?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("balancebook.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.ingest.lookback_days, 5);
        assert!(resolved.source.base_url.is_none());

        Ok(())
    }

    #[test]
    fn test_token_reads_named_env_var() {
        let source = SourceConfig {
            token_env: "BALANCEBOOK_TEST_TOKEN_UNSET_VAR".to_string(),
            ..Default::default()
        };
        let err = source.token().unwrap_err();
        assert!(err.to_string().contains("BALANCEBOOK_TEST_TOKEN_UNSET_VAR"));
    }
}
