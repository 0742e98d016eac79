use crate::domain::{Amount, CollateralClass, Ratio, TroveId};
use serde::Serialize;

/// A committed ledger state change, numbered in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub seq: u64,
    pub trove: TroveId,
    pub class: CollateralClass,
    #[serde(flatten)]
    pub kind: LedgerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LedgerEventKind {
    TroveCreated {
        collateral: Amount,
        debt: Amount,
        ratio_snapshot: Ratio,
    },
    /// Pending liquidation rewards moved from the pool into the trove.
    LiquidationClaimed {
        collateral: Amount,
        debt: Amount,
        ratio: Ratio,
    },
    CollateralDeposited {
        amount: Amount,
        collateral: Amount,
    },
    CollateralWithdrawn {
        amount: Amount,
        collateral: Amount,
    },
    TroveLiquidated {
        collateral: Amount,
        debt: Amount,
        ratio: Ratio,
    },
}
