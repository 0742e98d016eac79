//! Pure computation engine for the liquidation-distribution ledger.
//!
//! No I/O and no locking: callers serialize access (see `orchestration::service`).

pub mod events;
pub mod ledger;
pub mod registry;
pub mod settlement;

pub use events::{LedgerEvent, LedgerEventKind};
pub use ledger::{Ledger, LedgerError, LedgerSettings, MarketSummary};
pub use registry::Registry;
pub use settlement::Settlement;
