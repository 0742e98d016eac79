//! Domain types and determinism layer for the trove ledger.
//!
//! This module provides:
//! - Deterministic fixed-point quantities via the Fixed wrapper
//! - Domain primitives: TroveId, CollateralClass
//! - Trove and LiquidationPool state

pub mod fixed;
pub mod pool;
pub mod primitives;
pub mod trove;

pub use fixed::{Amount, ArithmeticOverflow, Fixed, ParseFixedError, Ratio};
pub use pool::LiquidationPool;
pub use primitives::{CollateralClass, CollateralClassParseError, TroveId};
pub use trove::Trove;
