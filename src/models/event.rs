use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::Error;

/// Direction of an external cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Contribution,
    Withdrawal,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Contribution => "CONTRIBUTION",
            EventKind::Withdrawal => "WITHDRAWAL",
        }
    }

    /// Amount with the sign implied by the kind.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            EventKind::Contribution => amount,
            EventKind::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTRIBUTION" => Ok(EventKind::Contribution),
            "WITHDRAWAL" => Ok(EventKind::Withdrawal),
            other => Err(Error::validation(format!(
                "event type must be CONTRIBUTION or WITHDRAWAL, got {other:?}"
            ))),
        }
    }
}

/// An entry in the append-only account ledger.
///
/// `id` is assigned by the store and increases with insertion order; it is the
/// tie-break between events that share a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub id: u64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccountEvent {
    pub fn signed_amount(&self) -> f64 {
        self.kind.signed(self.amount)
    }
}

/// A validated event waiting for the store to assign its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccountEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub amount: f64,
    pub notes: Option<String>,
}

impl NewAccountEvent {
    /// Amounts must be finite and strictly positive; the sign lives in `kind`.
    pub fn new(date: NaiveDate, kind: EventKind, amount: f64) -> Result<Self, Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::validation(format!(
                "event amount must be a positive number, got {amount}"
            )));
        }
        Ok(Self {
            date,
            kind,
            amount,
            notes: None,
        })
    }

    pub fn contribution(date: NaiveDate, amount: f64) -> Result<Self, Error> {
        Self::new(date, EventKind::Contribution, amount)
    }

    pub fn withdrawal(date: NaiveDate, amount: f64) -> Result<Self, Error> {
        Self::new(date, EventKind::Withdrawal, amount)
    }

    /// Parse user-supplied strings, rejecting anything malformed.
    pub fn parse(date: &str, kind: &str, amount: &str) -> Result<Self, Error> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| Error::validation(format!("invalid event date {date:?}, expected YYYY-MM-DD")))?;
        let kind: EventKind = kind.parse()?;
        let amount: f64 = amount
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("event amount {amount:?} is not a number")))?;
        Self::new(date, kind, amount)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        self
    }

    pub fn into_event(self, id: u64) -> AccountEvent {
        self.into_event_at(id, &SystemClock)
    }

    pub fn into_event_at(self, id: u64, clock: &dyn Clock) -> AccountEvent {
        AccountEvent {
            id,
            date: self.date,
            kind: self.kind,
            amount: self.amount,
            notes: self.notes,
            created_at: clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_exact_event_kinds() {
        assert_eq!("CONTRIBUTION".parse::<EventKind>(), Ok(EventKind::Contribution));
        assert_eq!("WITHDRAWAL".parse::<EventKind>(), Ok(EventKind::Withdrawal));
        for input in ["DIVIDEND", "contribution", " WITHDRAWAL ", "Withdrawal", ""] {
            assert!(
                matches!(input.parse::<EventKind>(), Err(Error::Validation(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_positive_and_non_numeric_amounts() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(NewAccountEvent::contribution(date, 0.0).is_err());
        assert!(NewAccountEvent::withdrawal(date, -5.0).is_err());
        assert!(NewAccountEvent::contribution(date, f64::NAN).is_err());
        assert!(NewAccountEvent::parse("2024-01-01", "CONTRIBUTION", "abc").is_err());
        assert!(NewAccountEvent::parse("01/01/2024", "CONTRIBUTION", "10").is_err());
    }

    #[test]
    fn parse_builds_valid_event() {
        let event = NewAccountEvent::parse("2024-02-03", "WITHDRAWAL", " 600 ").unwrap();
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(event.kind, EventKind::Withdrawal);
        assert_eq!(event.kind.signed(event.amount), -600.0);
    }

    #[test]
    fn event_serializes_type_in_upper_case() {
        let event = NewAccountEvent::contribution(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1000.0)
            .unwrap()
            .with_notes("initial")
            .into_event(1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CONTRIBUTION");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["notes"], "initial");
    }
}
