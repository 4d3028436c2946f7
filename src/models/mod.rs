mod event;
mod performance;

pub use event::{AccountEvent, EventKind, NewAccountEvent};
pub use performance::{BalanceUpdate, DailyPerformanceRow};
