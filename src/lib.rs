//! Daily fund performance ledger with personal balance reconstruction.
//!
//! Daily rows (growth percentage, fund balances, trade counts) are ingested
//! from an upstream report. The personal balance for each day is rebuilt by
//! replaying the investor's contributions and withdrawals against the fund's
//! daily growth, and summarized over standard lookback periods.

pub mod app;
pub mod balance;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod ingest;
pub mod models;
pub mod storage;
pub mod summary;

pub use error::Error;
