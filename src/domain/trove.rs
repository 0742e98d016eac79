//! Trove: a collateral/debt position and its settlement snapshot.

use crate::domain::{Amount, CollateralClass, Ratio, TroveId};
use serde::Serialize;

/// A position in one collateral class.
///
/// `collateral` and `debt` are the settled balances; pending liquidation rewards are derived from
/// `ratio_snapshot` and the class's pool, and only become part of the balances on settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trove {
    pub id: TroveId,
    pub class: CollateralClass,
    pub collateral: Amount,
    pub debt: Amount,
    /// Pool ratio at the last settlement.
    pub ratio_snapshot: Ratio,
}

impl Trove {
    pub fn new(
        id: TroveId,
        class: CollateralClass,
        collateral: Amount,
        debt: Amount,
        ratio_snapshot: Ratio,
    ) -> Self {
        Self {
            id,
            class,
            collateral,
            debt,
            ratio_snapshot,
        }
    }
}
