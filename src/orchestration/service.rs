use crate::domain::{Amount, CollateralClass, Trove, TroveId};
use crate::engine::{Ledger, LedgerError, LedgerEvent, MarketSummary, Settlement};
use crate::orchestration::authority::{AuthorityError, FlaggedTroves, LiquidationAuthority};
use crate::orchestration::journal::EventJournal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("trove {0} is not authorized for liquidation")]
    NotLiquidatable(TroveId),
    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// A trove together with what it would receive on settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroveView {
    pub trove: Trove,
    pub pending: Settlement,
}

/// A page of the event journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<LedgerEvent>,
    pub oldest_seq: Option<u64>,
    pub latest_seq: Option<u64>,
}

struct ServiceState {
    ledger: Ledger,
    journal: EventJournal,
}

impl ServiceState {
    fn flush_events(&mut self) {
        let events = self.ledger.drain_events();
        self.journal.extend(events);
    }
}

/// Single-writer front of the ledger.
///
/// All operations, reads included, run under one async mutex so callers observe a strictly
/// serialized sequence of operations. The liquidation authority is consulted while the lock is
/// held, so the verdict cannot go stale before the liquidation commits.
#[derive(Clone)]
pub struct LedgerService {
    state: Arc<Mutex<ServiceState>>,
    authority: Arc<dyn LiquidationAuthority>,
}

impl LedgerService {
    pub fn new(
        ledger: Ledger,
        authority: Arc<dyn LiquidationAuthority>,
        journal_capacity: usize,
    ) -> Self {
        let mut state = ServiceState {
            ledger,
            journal: EventJournal::new(journal_capacity),
        };
        state.flush_events();
        Self {
            state: Arc::new(Mutex::new(state)),
            authority,
        }
    }

    pub async fn classes(&self) -> Vec<CollateralClass> {
        let state = self.state.lock().await;
        state.ledger.classes().cloned().collect()
    }

    pub async fn create_trove(&self, class: &CollateralClass) -> Result<Trove, ServiceError> {
        let mut state = self.state.lock().await;
        let result = state.ledger.create_trove(class);
        let id = match result {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(class=%class, error=%e, "Trove creation rejected");
                return Err(e.into());
            }
        };
        state.flush_events();
        let trove = state
            .ledger
            .trove(id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        tracing::info!(trove=%id, class=%class, collateral=%trove.collateral, debt=%trove.debt, "Trove created");
        Ok(trove)
    }

    pub async fn deposit(&self, id: TroveId, amount: Amount) -> Result<Trove, ServiceError> {
        let mut state = self.state.lock().await;
        match state.ledger.deposit(id, amount) {
            Ok(trove) => {
                state.flush_events();
                tracing::info!(trove=%id, class=%trove.class, amount=%amount, collateral=%trove.collateral, "Collateral deposited");
                Ok(trove)
            }
            Err(e) => {
                tracing::warn!(trove=%id, amount=%amount, error=%e, "Deposit rejected");
                Err(e.into())
            }
        }
    }

    pub async fn withdraw(&self, id: TroveId, amount: Amount) -> Result<Trove, ServiceError> {
        let mut state = self.state.lock().await;
        match state.ledger.withdraw(id, amount) {
            Ok(trove) => {
                state.flush_events();
                tracing::info!(trove=%id, class=%trove.class, amount=%amount, collateral=%trove.collateral, "Collateral withdrawn");
                Ok(trove)
            }
            Err(e) => {
                tracing::warn!(trove=%id, amount=%amount, error=%e, "Withdrawal rejected");
                Err(e.into())
            }
        }
    }

    pub async fn claim(&self, id: TroveId) -> Result<(Settlement, Trove), ServiceError> {
        let mut state = self.state.lock().await;
        let claimed = match state.ledger.claim(id) {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!(trove=%id, error=%e, "Claim rejected");
                return Err(e.into());
            }
        };
        state.flush_events();
        let trove = state
            .ledger
            .trove(id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        tracing::debug!(trove=%id, collateral=%claimed.collateral, debt=%claimed.debt, "Liquidation rewards claimed");
        Ok((claimed, trove))
    }

    /// Liquidate a trove if the authority allows it. Returns the collateral moved to the pool.
    pub async fn liquidate(&self, id: TroveId) -> Result<Amount, ServiceError> {
        let mut state = self.state.lock().await;
        let trove = state
            .ledger
            .trove(id)
            .ok_or(LedgerError::TroveNotFound(id))?;

        if !self.authority.authorize(&trove).await? {
            tracing::warn!(trove=%id, class=%trove.class, "Liquidation not authorized");
            return Err(ServiceError::NotLiquidatable(id));
        }

        match state.ledger.liquidate(id) {
            Ok(collateral) => {
                state.flush_events();
                self.authority.release(id).await;
                tracing::info!(trove=%id, class=%trove.class, collateral=%collateral, "Trove liquidated");
                Ok(collateral)
            }
            Err(e) => {
                tracing::warn!(trove=%id, error=%e, "Liquidation failed");
                Err(e.into())
            }
        }
    }

    /// Record the external collateralization verdict for a live trove.
    ///
    /// Runs under the ledger lock, so a trove cannot be liquidated between the existence check
    /// and the flag write.
    pub async fn set_liquidatable(
        &self,
        flags: &FlaggedTroves,
        id: TroveId,
        liquidatable: bool,
    ) -> Result<(), ServiceError> {
        let state = self.state.lock().await;
        if state.ledger.trove(id).is_none() {
            tracing::warn!(trove=%id, liquidatable, "Flag for unknown trove rejected");
            return Err(LedgerError::TroveNotFound(id).into());
        }
        flags.set(id, liquidatable).await;
        tracing::info!(trove=%id, liquidatable, "Liquidation flag updated");
        Ok(())
    }

    pub async fn trove(&self, id: TroveId) -> Result<TroveView, ServiceError> {
        let state = self.state.lock().await;
        let trove = state
            .ledger
            .trove(id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        let pending = state.ledger.pending(id)?;
        Ok(TroveView { trove, pending })
    }

    pub async fn troves(&self, class: &CollateralClass) -> Result<Vec<Trove>, ServiceError> {
        let state = self.state.lock().await;
        ensure_class(&state.ledger, class)?;
        Ok(state.ledger.troves(class))
    }

    pub async fn market(&self, class: &CollateralClass) -> Result<MarketSummary, ServiceError> {
        let state = self.state.lock().await;
        state
            .ledger
            .market(class)
            .ok_or_else(|| LedgerError::UnknownCollateralClass(class.clone()).into())
    }

    pub async fn first_trove(
        &self,
        class: &CollateralClass,
    ) -> Result<Option<TroveId>, ServiceError> {
        let state = self.state.lock().await;
        ensure_class(&state.ledger, class)?;
        Ok(state.ledger.first_trove(class))
    }

    pub async fn last_trove(
        &self,
        class: &CollateralClass,
    ) -> Result<Option<TroveId>, ServiceError> {
        let state = self.state.lock().await;
        ensure_class(&state.ledger, class)?;
        Ok(state.ledger.last_trove(class))
    }

    pub async fn next_trove(
        &self,
        class: &CollateralClass,
        id: TroveId,
    ) -> Result<Option<TroveId>, ServiceError> {
        let state = self.state.lock().await;
        ensure_class(&state.ledger, class)?;
        Ok(state.ledger.next_trove(class, id))
    }

    pub async fn prev_trove(
        &self,
        class: &CollateralClass,
        id: TroveId,
    ) -> Result<Option<TroveId>, ServiceError> {
        let state = self.state.lock().await;
        ensure_class(&state.ledger, class)?;
        Ok(state.ledger.prev_trove(class, id))
    }

    pub async fn events_since(&self, since: u64, limit: usize) -> EventPage {
        let state = self.state.lock().await;
        EventPage {
            events: state.journal.since(since, limit),
            oldest_seq: state.journal.oldest_seq(),
            latest_seq: state.journal.latest_seq(),
        }
    }
}

fn ensure_class(ledger: &Ledger, class: &CollateralClass) -> Result<(), LedgerError> {
    if ledger.classes().any(|c| c == class) {
        Ok(())
    } else {
        Err(LedgerError::UnknownCollateralClass(class.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Fixed;
    use crate::engine::LedgerSettings;
    use crate::orchestration::authority::Unrestricted;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Offline;

    #[async_trait]
    impl LiquidationAuthority for Offline {
        async fn authorize(&self, _trove: &Trove) -> Result<bool, AuthorityError> {
            Err(AuthorityError::Unavailable("price feed down".to_string()))
        }
    }

    fn weth() -> CollateralClass {
        CollateralClass::new("WETH")
    }

    fn service(authority: Arc<dyn LiquidationAuthority>) -> LedgerService {
        let settings = LedgerSettings {
            seed_collateral: Fixed::from(100),
            seed_debt: Fixed::from(500),
        };
        LedgerService::new(Ledger::with_classes(settings, [weth()]), authority, 100)
    }

    #[tokio::test]
    async fn test_flagged_liquidation_requires_flag() {
        let flags = Arc::new(FlaggedTroves::new());
        let svc = service(flags.clone());
        let a = svc.create_trove(&weth()).await.unwrap();
        let _b = svc.create_trove(&weth()).await.unwrap();

        let err = svc.liquidate(a.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotLiquidatable(id) if id == a.id));
        assert!(svc.trove(a.id).await.is_ok());

        flags.set(a.id, true).await;
        assert_eq!(svc.liquidate(a.id).await.unwrap(), Fixed::from(100));
        assert!(!flags.is_flagged(a.id).await);
    }

    #[tokio::test]
    async fn test_liquidated_trove_cannot_be_flagged() {
        let flags = Arc::new(FlaggedTroves::new());
        let svc = service(flags.clone());
        let a = svc.create_trove(&weth()).await.unwrap();
        let _b = svc.create_trove(&weth()).await.unwrap();

        svc.set_liquidatable(&flags, a.id, true).await.unwrap();
        svc.liquidate(a.id).await.unwrap();

        let err = svc.set_liquidatable(&flags, a.id, true).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::TroveNotFound(id)) if id == a.id
        ));
        assert!(!flags.is_flagged(a.id).await);
    }

    #[tokio::test]
    async fn test_failed_claim_leaves_journal_untouched() {
        let svc = service(Arc::new(Unrestricted));
        let a = svc.create_trove(&weth()).await.unwrap();

        let err = svc.claim(TroveId::new(99)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::TroveNotFound(_))
        ));
        let page = svc.events_since(0, 100).await;
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].trove, a.id);
    }

    #[tokio::test]
    async fn test_authority_failure_aborts_liquidation() {
        let svc = service(Arc::new(Offline));
        let a = svc.create_trove(&weth()).await.unwrap();
        let _b = svc.create_trove(&weth()).await.unwrap();

        let err = svc.liquidate(a.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authority(_)));
        assert_eq!(svc.market(&weth()).await.unwrap().trove_count, 2);
    }

    #[tokio::test]
    async fn test_journal_records_committed_operations_only() {
        let svc = service(Arc::new(Unrestricted));
        let a = svc.create_trove(&weth()).await.unwrap();
        let b = svc.create_trove(&weth()).await.unwrap();
        svc.liquidate(a.id).await.unwrap();
        assert!(svc.withdraw(b.id, Fixed::from(1000)).await.is_err());
        svc.claim(b.id).await.unwrap();

        let page = svc.events_since(0, 100).await;
        assert_eq!(page.events.len(), 4);
        assert_eq!(page.oldest_seq, Some(1));
        assert_eq!(page.latest_seq, Some(4));
        assert!(svc.events_since(4, 100).await.events.is_empty());
    }

    #[tokio::test]
    async fn test_trove_view_reports_pending_share() {
        let svc = service(Arc::new(Unrestricted));
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(svc.create_trove(&weth()).await.unwrap().id);
        }
        svc.liquidate(ids[2]).await.unwrap();

        let view = svc.trove(ids[0]).await.unwrap();
        assert_eq!(view.pending.collateral, Fixed::from(25));
        assert_eq!(view.pending.debt, Fixed::from(125));

        let (claimed, trove) = svc.claim(ids[0]).await.unwrap();
        assert_eq!(claimed.collateral, Fixed::from(25));
        assert_eq!(trove.collateral, Fixed::from(125));
    }

    #[tokio::test]
    async fn test_traversal_of_unknown_class_is_an_error() {
        let svc = service(Arc::new(Unrestricted));
        let err = svc
            .first_trove(&CollateralClass::new("DOGE"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::UnknownCollateralClass(_))
        ));
    }
}
