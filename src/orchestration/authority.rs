//! Liquidation authorization supplied by the external collateralization check.

use crate::domain::{Trove, TroveId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

/// Decides whether a trove may be liquidated.
///
/// The ledger never looks at prices; implementations relay the verdict of whatever service
/// computes collateralization.
#[async_trait]
pub trait LiquidationAuthority: Send + Sync + fmt::Debug {
    /// Returns true if `trove` may be liquidated now.
    async fn authorize(&self, trove: &Trove) -> Result<bool, AuthorityError>;

    /// Called after `trove` has been liquidated.
    async fn release(&self, _trove: TroveId) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("liquidation authority unavailable: {0}")]
    Unavailable(String),
}

/// Troves flagged as undercollateralized by an external service.
#[derive(Debug, Default)]
pub struct FlaggedTroves {
    flagged: RwLock<HashSet<TroveId>>,
}

impl FlaggedTroves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the liquidatable flag of a trove.
    pub async fn set(&self, trove: TroveId, liquidatable: bool) {
        let mut flagged = self.flagged.write().await;
        if liquidatable {
            flagged.insert(trove);
        } else {
            flagged.remove(&trove);
        }
    }

    pub async fn is_flagged(&self, trove: TroveId) -> bool {
        self.flagged.read().await.contains(&trove)
    }
}

#[async_trait]
impl LiquidationAuthority for FlaggedTroves {
    async fn authorize(&self, trove: &Trove) -> Result<bool, AuthorityError> {
        Ok(self.is_flagged(trove.id).await)
    }

    async fn release(&self, trove: TroveId) {
        self.set(trove, false).await;
    }
}

/// Authorizes every live trove. For deployments where callers are trusted to check
/// collateralization themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

#[async_trait]
impl LiquidationAuthority for Unrestricted {
    async fn authorize(&self, _trove: &Trove) -> Result<bool, AuthorityError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CollateralClass, Fixed};

    fn trove(id: u64) -> Trove {
        Trove::new(
            TroveId::new(id),
            CollateralClass::new("WETH"),
            Fixed::from(100),
            Fixed::from(500),
            Fixed::ONE,
        )
    }

    #[tokio::test]
    async fn test_flags_gate_authorization() {
        let flags = FlaggedTroves::new();
        assert!(!flags.authorize(&trove(1)).await.unwrap());

        flags.set(TroveId::new(1), true).await;
        assert!(flags.authorize(&trove(1)).await.unwrap());
        assert!(!flags.authorize(&trove(2)).await.unwrap());

        flags.set(TroveId::new(1), false).await;
        assert!(!flags.authorize(&trove(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_clears_flag() {
        let flags = FlaggedTroves::new();
        flags.set(TroveId::new(3), true).await;
        flags.release(TroveId::new(3)).await;
        assert!(!flags.is_flagged(TroveId::new(3)).await);
    }

    #[tokio::test]
    async fn test_unrestricted_always_authorizes() {
        assert!(Unrestricted.authorize(&trove(9)).await.unwrap());
    }
}
