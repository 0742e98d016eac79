pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use domain::{Amount, CollateralClass, Fixed, LiquidationPool, Ratio, Trove, TroveId};
pub use engine::{Ledger, LedgerError, LedgerEvent, LedgerSettings, Settlement};
pub use error::AppError;
pub use orchestration::{FlaggedTroves, LedgerService, LiquidationAuthority, Unrestricted};
