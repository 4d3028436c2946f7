//! Typed failures raised by the ledger engine.
//!
//! Application code works in `anyhow::Result`; these errors travel inside it and
//! can be recovered with `err.downcast_ref::<Error>()`.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// A computation was requested before the data it depends on exists.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Input was rejected before any state was touched.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl Error {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
