//! Liquidation pool state for one collateral class.

use crate::domain::{Amount, Fixed, Ratio};
use serde::Serialize;

/// Collateral and debt seized by liquidations and not yet claimed, plus the distribution ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationPool {
    pub collateral_balance: Amount,
    pub debt_balance: Amount,
    /// Cumulative growth factor since genesis. Starts at 1 and never decreases.
    pub ratio: Ratio,
}

impl LiquidationPool {
    pub fn new() -> Self {
        Self {
            collateral_balance: Fixed::ZERO,
            debt_balance: Fixed::ZERO,
            ratio: Fixed::ONE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collateral_balance.is_zero() && self.debt_balance.is_zero()
    }
}

impl Default for LiquidationPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_starts_at_unit_ratio() {
        let pool = LiquidationPool::new();
        assert_eq!(pool.ratio, Fixed::ONE);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_json_uses_camel_case_strings() {
        let json = serde_json::to_value(LiquidationPool::new()).unwrap();
        assert_eq!(json["collateralBalance"], "0");
        assert_eq!(json["debtBalance"], "0");
        assert_eq!(json["ratio"], "1");
    }
}
