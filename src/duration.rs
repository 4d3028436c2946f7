//! Parsing for the human-readable spans used in configuration: calendar
//! lookbacks such as `"5d"` or `"2w"` and short delays such as `"500ms"`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

fn split_unit<'a>(s: &'a str, units: &[&'static str]) -> Result<(&'a str, &'static str)> {
    // Longest suffix first so "ms" is not read as "s".
    let mut sorted = units.to_vec();
    sorted.sort_by_key(|u| std::cmp::Reverse(u.len()));
    for unit in sorted {
        if let Some(num) = s.strip_suffix(unit) {
            return Ok((num, unit));
        }
    }
    anyhow::bail!("Span must end with one of: {}", units.join(", "))
}

/// Parse a lookback in whole calendar days: `"5d"` or `"2w"`.
///
/// ```
/// use balancebook::duration::parse_days;
///
/// assert_eq!(parse_days("5d").unwrap(), 5);
/// assert_eq!(parse_days("2W").unwrap(), 14);
/// ```
pub fn parse_days(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let (num, unit) = split_unit(&s, &["d", "w"])?;
    let num: u64 = num.parse().context("Invalid number in day span")?;
    match unit {
        "w" => num.checked_mul(7).context("Day span is too large"),
        _ => Ok(num),
    }
}

/// Parse a short delay: `"500ms"`, `"2s"` or `"1m"`.
///
/// ```
/// use balancebook::duration::parse_delay;
/// use std::time::Duration;
///
/// assert_eq!(parse_delay("500ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_delay("1m").unwrap(), Duration::from_secs(60));
/// ```
pub fn parse_delay(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (num, unit) = split_unit(&s, &["ms", "s", "m"])?;
    let num: u64 = num.parse().context("Invalid number in delay")?;
    let millis = match unit {
        "ms" => num,
        "s" => num.checked_mul(1_000).context("Delay is too large")?,
        _ => num.checked_mul(60_000).context("Delay is too large")?,
    };
    Ok(Duration::from_millis(millis))
}

/// Render a day count the way [`parse_days`] reads it.
pub fn format_days(days: u64) -> String {
    if days > 0 && days % 7 == 0 {
        format!("{}w", days / 7)
    } else {
        format!("{days}d")
    }
}

/// Serde deserializer for day spans.
///
/// Use with `#[serde(deserialize_with = "deserialize_days")]`.
pub fn deserialize_days<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_days(&s).map_err(de::Error::custom)
}

/// Serde deserializer for delays.
///
/// Use with `#[serde(deserialize_with = "deserialize_delay")]`.
pub fn deserialize_delay<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_delay(&s).map_err(de::Error::custom)
}
