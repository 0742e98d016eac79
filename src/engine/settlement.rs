use crate::domain::{Amount, ArithmeticOverflow, Fixed, LiquidationPool, Trove};
use serde::Serialize;

/// Collateral and debt owed to a trove by its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub collateral: Amount,
    pub debt: Amount,
}

impl Settlement {
    pub fn zero() -> Self {
        Self {
            collateral: Fixed::ZERO,
            debt: Fixed::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collateral.is_zero() && self.debt.is_zero()
    }
}

/// Compute what `trove` would receive if it settled against `pool` now.
///
/// The trove's share is `collateral * ratio / ratio_snapshot - collateral`. Debt follows the
/// collateral share of the pool. Both are clamped to the pool balances so rounding dust can
/// never drive the pool negative; an empty pool yields no debt.
pub fn pending(trove: &Trove, pool: &LiquidationPool) -> Result<Settlement, ArithmeticOverflow> {
    if trove.ratio_snapshot == pool.ratio || trove.collateral.is_zero() {
        return Ok(Settlement::zero());
    }

    let value = trove
        .collateral
        .mul_div(pool.ratio, trove.ratio_snapshot)?;
    let collateral = value
        .saturating_sub(trove.collateral)
        .min(pool.collateral_balance);

    let debt = if pool.debt_balance.is_positive() && pool.collateral_balance.is_positive() {
        pool.debt_balance
            .mul_div(collateral, pool.collateral_balance)?
            .min(pool.debt_balance)
    } else {
        Fixed::ZERO
    };

    Ok(Settlement { collateral, debt })
}
