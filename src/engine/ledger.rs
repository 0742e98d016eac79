use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    Amount, ArithmeticOverflow, CollateralClass, Fixed, LiquidationPool, Trove, TroveId,
};

use super::events::{LedgerEvent, LedgerEventKind};
use super::registry::Registry;
use super::settlement::{self, Settlement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("trove {0} not found")]
    TroveNotFound(TroveId),
    #[error("unknown collateral class {0}")]
    UnknownCollateralClass(CollateralClass),
    #[error("insufficient collateral: requested {requested}, available {available}")]
    InsufficientCollateral { requested: Amount, available: Amount },
    #[error("no surviving collateral in {0} to absorb the liquidation")]
    NoSurvivingCollateral(CollateralClass),
    #[error("trove identities exhausted")]
    TroveIdsExhausted,
    #[error(transparent)]
    ArithmeticOverflow(#[from] ArithmeticOverflow),
}

/// Deployment constants applied to every new trove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub seed_collateral: Amount,
    pub seed_debt: Amount,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            seed_collateral: Fixed::ZERO,
            seed_debt: Fixed::ZERO,
        }
    }
}

/// Registry aggregates and pool state of one collateral class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub class: CollateralClass,
    pub trove_count: usize,
    pub total_collateral: Amount,
    pub total_debt: Amount,
    pub pool: LiquidationPool,
}

#[derive(Debug, Clone)]
struct Market {
    registry: Registry,
    pool: LiquidationPool,
}

/// Uncommitted copy of a trove and its market after settlement.
#[derive(Debug, Clone)]
struct Working {
    trove: Trove,
    pool: LiquidationPool,
    total_collateral: Amount,
    total_debt: Amount,
    claimed: Settlement,
}

/// Proportional liquidation-distribution ledger.
///
/// Each collateral class has a registry of live troves and a liquidation pool. A liquidation
/// moves the trove's balances into the pool and raises the pool ratio; every surviving trove
/// collects its share the next time it settles. No operation iterates over troves.
///
/// Every operation builds a working copy with checked arithmetic and commits only on success,
/// so a failed operation leaves the ledger unchanged.
#[derive(Debug, Clone)]
pub struct Ledger {
    settings: LedgerSettings,
    markets: BTreeMap<CollateralClass, Market>,
    locations: HashMap<TroveId, CollateralClass>,
    next_trove_id: u64,
    next_event_seq: u64,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            settings,
            markets: BTreeMap::new(),
            locations: HashMap::new(),
            next_trove_id: 1,
            next_event_seq: 1,
            events: Vec::new(),
        }
    }

    pub fn with_classes(
        settings: LedgerSettings,
        classes: impl IntoIterator<Item = CollateralClass>,
    ) -> Self {
        let mut ledger = Self::new(settings);
        for class in classes {
            ledger.open_class(class);
        }
        ledger
    }

    /// Register a collateral class. Returns false if it already exists.
    pub fn open_class(&mut self, class: CollateralClass) -> bool {
        if self.markets.contains_key(&class) {
            return false;
        }
        let market = Market {
            registry: Registry::new(class.clone()),
            pool: LiquidationPool::new(),
        };
        self.markets.insert(class, market);
        true
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn classes(&self) -> impl Iterator<Item = &CollateralClass> + '_ {
        self.markets.keys()
    }

    /// Open a trove in `class`, seeded with the configured collateral and debt.
    ///
    /// The trove snapshots the current pool ratio, so it has no claim on earlier liquidations.
    pub fn create_trove(&mut self, class: &CollateralClass) -> Result<TroveId, LedgerError> {
        let market = self
            .markets
            .get(class)
            .ok_or_else(|| LedgerError::UnknownCollateralClass(class.clone()))?;

        let id = TroveId::new(self.next_trove_id);
        let next_trove_id = self
            .next_trove_id
            .checked_add(1)
            .ok_or(LedgerError::TroveIdsExhausted)?;

        let LedgerSettings {
            seed_collateral,
            seed_debt,
        } = self.settings;
        let total_collateral = market
            .registry
            .total_collateral()
            .checked_add(seed_collateral)?;
        let total_debt = market.registry.total_debt().checked_add(seed_debt)?;
        let ratio_snapshot = market.pool.ratio;

        let trove = Trove::new(id, class.clone(), seed_collateral, seed_debt, ratio_snapshot);

        let market = self
            .markets
            .get_mut(class)
            .ok_or_else(|| LedgerError::UnknownCollateralClass(class.clone()))?;
        market.registry.push_back(trove);
        market.registry.set_totals(total_collateral, total_debt);
        self.next_trove_id = next_trove_id;
        self.locations.insert(id, class.clone());
        self.emit(
            id,
            class.clone(),
            LedgerEventKind::TroveCreated {
                collateral: seed_collateral,
                debt: seed_debt,
                ratio_snapshot,
            },
        );

        Ok(id)
    }

    /// Settle the trove, then add `amount` to its collateral.
    pub fn deposit(&mut self, id: TroveId, amount: Amount) -> Result<Trove, LedgerError> {
        let mut working = self.settle(id)?;
        working.trove.collateral = working.trove.collateral.checked_add(amount)?;
        working.total_collateral = working.total_collateral.checked_add(amount)?;

        self.commit(&working)?;
        let collateral = working.trove.collateral;
        self.emit(
            id,
            working.trove.class.clone(),
            LedgerEventKind::CollateralDeposited { amount, collateral },
        );
        Ok(working.trove)
    }

    /// Settle the trove, then remove `amount` from its collateral.
    ///
    /// Fails with [`LedgerError::InsufficientCollateral`] if the settled balance is too small;
    /// in that case not even the settlement is committed.
    pub fn withdraw(&mut self, id: TroveId, amount: Amount) -> Result<Trove, LedgerError> {
        let mut working = self.settle(id)?;
        let available = working.trove.collateral;
        working.trove.collateral =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientCollateral {
                    requested: amount,
                    available,
                })?;
        working.total_collateral = working
            .total_collateral
            .checked_sub(amount)
            .ok_or(ArithmeticOverflow)?;

        self.commit(&working)?;
        let collateral = working.trove.collateral;
        self.emit(
            id,
            working.trove.class.clone(),
            LedgerEventKind::CollateralWithdrawn { amount, collateral },
        );
        Ok(working.trove)
    }

    /// Move the trove's pending share of the pool into its balances.
    ///
    /// Calling it again without an intervening liquidation moves nothing.
    pub fn claim(&mut self, id: TroveId) -> Result<Settlement, LedgerError> {
        let working = self.settle(id)?;
        self.commit(&working)?;
        Ok(working.claimed)
    }

    /// Absorb the trove into its pool and remove it. Returns the collateral moved.
    ///
    /// The trove settles first. Its collateral `C` raises the ratio by `C * ratio / S`, where `S`
    /// is the collateral the surviving troves are entitled to (their settled balances plus the
    /// pool balance). Each survivor's next settlement then receives `C` in proportion to its
    /// entitlement.
    ///
    /// Fails with [`LedgerError::NoSurvivingCollateral`] when no other trove of the class holds
    /// settled collateral and the trove still carries a balance.
    ///
    /// Authorization (the collateralization check) is the caller's responsibility.
    pub fn liquidate(&mut self, id: TroveId) -> Result<Amount, LedgerError> {
        let mut working = self.settle(id)?;
        let class = working.trove.class.clone();
        let collateral = working.trove.collateral;
        let debt = working.trove.debt;

        let remaining_collateral = working
            .total_collateral
            .checked_sub(collateral)
            .ok_or(ArithmeticOverflow)?;
        let remaining_debt = working
            .total_debt
            .checked_sub(debt)
            .ok_or(ArithmeticOverflow)?;
        let survivors = remaining_collateral.checked_add(working.pool.collateral_balance)?;

        // Troves with no settled collateral can never claim, so rounding dust left in the pool
        // does not count as a survivor.
        if remaining_collateral.is_zero() {
            if collateral.is_positive() || debt.is_positive() {
                return Err(LedgerError::NoSurvivingCollateral(class));
            }
        } else if collateral.is_positive() {
            let increment = collateral.mul_div(working.pool.ratio, survivors)?;
            working.pool.ratio = working.pool.ratio.checked_add(increment)?;
        }

        working.pool.collateral_balance = working.pool.collateral_balance.checked_add(collateral)?;
        working.pool.debt_balance = working.pool.debt_balance.checked_add(debt)?;

        let market = self
            .markets
            .get_mut(&class)
            .ok_or_else(|| LedgerError::UnknownCollateralClass(class.clone()))?;
        market
            .registry
            .remove(id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        market.registry.set_totals(remaining_collateral, remaining_debt);
        market.pool = working.pool;
        self.locations.remove(&id);

        self.emit_claim(&working);
        self.emit(
            id,
            class,
            LedgerEventKind::TroveLiquidated {
                collateral,
                debt,
                ratio: working.pool.ratio,
            },
        );

        Ok(collateral)
    }

    /// Collateral the trove would receive if it settled now.
    pub fn unclaimed_collateral(&self, id: TroveId) -> Result<Amount, LedgerError> {
        let (trove, market) = self.locate(id)?;
        Ok(settlement::pending(trove, &market.pool)?.collateral)
    }

    /// Debt the trove would take on if it settled now.
    pub fn unclaimed_debt(&self, id: TroveId) -> Result<Amount, LedgerError> {
        let (trove, market) = self.locate(id)?;
        Ok(settlement::pending(trove, &market.pool)?.debt)
    }

    /// Pending collateral and debt together.
    pub fn pending(&self, id: TroveId) -> Result<Settlement, LedgerError> {
        let (trove, market) = self.locate(id)?;
        Ok(settlement::pending(trove, &market.pool)?)
    }

    pub fn trove(&self, id: TroveId) -> Option<Trove> {
        self.locate(id).ok().map(|(trove, _)| trove.clone())
    }

    /// Live troves of a class, oldest first.
    pub fn troves(&self, class: &CollateralClass) -> Vec<Trove> {
        self.markets
            .get(class)
            .map(|market| market.registry.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn pool(&self, class: &CollateralClass) -> Option<LiquidationPool> {
        self.markets.get(class).map(|market| market.pool)
    }

    pub fn market(&self, class: &CollateralClass) -> Option<MarketSummary> {
        self.markets.get(class).map(|market| MarketSummary {
            class: class.clone(),
            trove_count: market.registry.len(),
            total_collateral: market.registry.total_collateral(),
            total_debt: market.registry.total_debt(),
            pool: market.pool,
        })
    }

    pub fn first_trove(&self, class: &CollateralClass) -> Option<TroveId> {
        self.markets.get(class)?.registry.first()
    }

    pub fn next_trove(&self, class: &CollateralClass, id: TroveId) -> Option<TroveId> {
        self.markets.get(class)?.registry.next(id)
    }

    pub fn last_trove(&self, class: &CollateralClass) -> Option<TroveId> {
        self.markets.get(class)?.registry.last()
    }

    pub fn prev_trove(&self, class: &CollateralClass, id: TroveId) -> Option<TroveId> {
        self.markets.get(class)?.registry.prev(id)
    }

    /// Take the events committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    fn locate(&self, id: TroveId) -> Result<(&Trove, &Market), LedgerError> {
        let class = self
            .locations
            .get(&id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        let market = self
            .markets
            .get(class)
            .ok_or(LedgerError::TroveNotFound(id))?;
        let trove = market
            .registry
            .get(id)
            .ok_or(LedgerError::TroveNotFound(id))?;
        Ok((trove, market))
    }

    /// Build the settled working copy of a trove without touching the ledger.
    fn settle(&self, id: TroveId) -> Result<Working, LedgerError> {
        let (trove, market) = self.locate(id)?;
        let claimed = settlement::pending(trove, &market.pool)?;

        let mut pool = market.pool;
        pool.collateral_balance = pool
            .collateral_balance
            .checked_sub(claimed.collateral)
            .ok_or(ArithmeticOverflow)?;
        pool.debt_balance = pool
            .debt_balance
            .checked_sub(claimed.debt)
            .ok_or(ArithmeticOverflow)?;

        let mut trove = trove.clone();
        trove.collateral = trove.collateral.checked_add(claimed.collateral)?;
        trove.debt = trove.debt.checked_add(claimed.debt)?;
        trove.ratio_snapshot = pool.ratio;

        Ok(Working {
            trove,
            pool,
            total_collateral: market
                .registry
                .total_collateral()
                .checked_add(claimed.collateral)?,
            total_debt: market.registry.total_debt().checked_add(claimed.debt)?,
            claimed,
        })
    }

    fn commit(&mut self, working: &Working) -> Result<(), LedgerError> {
        let id = working.trove.id;
        let market = self
            .markets
            .get_mut(&working.trove.class)
            .ok_or(LedgerError::TroveNotFound(id))?;
        if !market.registry.replace(working.trove.clone()) {
            return Err(LedgerError::TroveNotFound(id));
        }
        market
            .registry
            .set_totals(working.total_collateral, working.total_debt);
        market.pool = working.pool;
        self.emit_claim(working);
        Ok(())
    }

    fn emit_claim(&mut self, working: &Working) {
        if working.claimed.is_empty() {
            return;
        }
        self.emit(
            working.trove.id,
            working.trove.class.clone(),
            LedgerEventKind::LiquidationClaimed {
                collateral: working.claimed.collateral,
                debt: working.claimed.debt,
                ratio: working.pool.ratio,
            },
        );
    }

    fn emit(&mut self, trove: TroveId, class: CollateralClass, kind: LedgerEventKind) {
        let seq = self.next_event_seq;
        self.next_event_seq = self.next_event_seq.saturating_add(1);
        self.events.push(LedgerEvent {
            seq,
            trove,
            class,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> CollateralClass {
        CollateralClass::new("WETH")
    }

    fn f(s: &str) -> Fixed {
        Fixed::from_str_canonical(s).unwrap()
    }

    fn seeded_ledger(count: usize) -> (Ledger, Vec<TroveId>) {
        let settings = LedgerSettings {
            seed_collateral: Fixed::from(100),
            seed_debt: Fixed::from(500),
        };
        let mut ledger = Ledger::with_classes(settings, [weth()]);
        let ids = (0..count)
            .map(|_| ledger.create_trove(&weth()).unwrap())
            .collect();
        (ledger, ids)
    }

    #[test]
    fn test_create_trove_seeds_and_aggregates() {
        let (ledger, ids) = seeded_ledger(3);
        assert_eq!(ids, vec![TroveId::new(1), TroveId::new(2), TroveId::new(3)]);

        let market = ledger.market(&weth()).unwrap();
        assert_eq!(market.trove_count, 3);
        assert_eq!(market.total_collateral, Fixed::from(300));
        assert_eq!(market.total_debt, Fixed::from(1500));
        assert_eq!(ledger.trove(ids[0]).unwrap().ratio_snapshot, Fixed::ONE);
    }

    #[test]
    fn test_create_trove_in_unknown_class_fails() {
        let (mut ledger, _) = seeded_ledger(0);
        let err = ledger
            .create_trove(&CollateralClass::new("DOGE"))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownCollateralClass(CollateralClass::new("DOGE"))
        );
    }

    #[test]
    fn test_liquidation_raises_ratio_by_survivor_share() {
        let (mut ledger, ids) = seeded_ledger(5);
        let moved = ledger.liquidate(ids[2]).unwrap();
        assert_eq!(moved, Fixed::from(100));

        let pool = ledger.pool(&weth()).unwrap();
        assert_eq!(pool.ratio, f("1.25"));
        assert_eq!(pool.collateral_balance, Fixed::from(100));
        assert_eq!(pool.debt_balance, Fixed::from(500));

        let market = ledger.market(&weth()).unwrap();
        assert_eq!(market.total_collateral, Fixed::from(400));
        assert_eq!(market.total_debt, Fixed::from(2000));
        assert_eq!(ledger.trove(ids[2]), None);
    }

    #[test]
    fn test_withdraw_rejection_leaves_state_untouched() {
        let (mut ledger, ids) = seeded_ledger(5);
        ledger.liquidate(ids[0]).unwrap();
        ledger.drain_events();
        let before = ledger.clone();

        let err = ledger.withdraw(ids[1], Fixed::from(126)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientCollateral {
                requested: Fixed::from(126),
                available: Fixed::from(125),
            }
        );
        assert_eq!(ledger.trove(ids[1]), before.trove(ids[1]));
        assert_eq!(ledger.market(&weth()), before.market(&weth()));
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn test_withdraw_uses_settled_balance() {
        let (mut ledger, ids) = seeded_ledger(5);
        ledger.liquidate(ids[0]).unwrap();

        let trove = ledger.withdraw(ids[1], Fixed::from(125)).unwrap();
        assert_eq!(trove.collateral, Fixed::ZERO);
        assert_eq!(trove.debt, Fixed::from(625));
        assert_eq!(trove.ratio_snapshot, f("1.25"));
    }

    #[test]
    fn test_operations_on_liquidated_trove_fail() {
        let (mut ledger, ids) = seeded_ledger(3);
        ledger.liquidate(ids[1]).unwrap();

        let not_found = LedgerError::TroveNotFound(ids[1]);
        assert_eq!(ledger.liquidate(ids[1]).unwrap_err(), not_found);
        assert_eq!(ledger.deposit(ids[1], Fixed::ONE).unwrap_err(), not_found);
        assert_eq!(ledger.withdraw(ids[1], Fixed::ONE).unwrap_err(), not_found);
        assert_eq!(ledger.claim(ids[1]).unwrap_err(), not_found);
        assert_eq!(ledger.unclaimed_collateral(ids[1]).unwrap_err(), not_found);
        assert_eq!(ledger.next_trove(&weth(), ids[1]), None);
    }

    #[test]
    fn test_liquidating_last_collateral_is_refused() {
        let (mut ledger, ids) = seeded_ledger(1);
        let err = ledger.liquidate(ids[0]).unwrap_err();
        assert_eq!(err, LedgerError::NoSurvivingCollateral(weth()));
        assert!(ledger.trove(ids[0]).is_some());
        assert_eq!(ledger.pool(&weth()).unwrap(), LiquidationPool::new());
    }

    #[test]
    fn test_pool_dust_does_not_count_as_survivor() {
        let settings = LedgerSettings {
            seed_collateral: Fixed::ONE,
            seed_debt: Fixed::ZERO,
        };
        let mut ledger = Ledger::with_classes(settings, [weth()]);
        let ids: Vec<TroveId> = (0..4)
            .map(|_| ledger.create_trove(&weth()).unwrap())
            .collect();

        ledger.liquidate(ids[3]).unwrap();
        for id in &ids[..3] {
            ledger.claim(*id).unwrap();
        }
        assert_eq!(
            ledger.pool(&weth()).unwrap().collateral_balance,
            f("0.000000000001")
        );

        for id in &ids[..2] {
            let collateral = ledger.trove(*id).unwrap().collateral;
            ledger.withdraw(*id, collateral).unwrap();
        }
        let before = ledger.clone();

        let err = ledger.liquidate(ids[2]).unwrap_err();
        assert_eq!(err, LedgerError::NoSurvivingCollateral(weth()));
        assert_eq!(ledger.market(&weth()), before.market(&weth()));
        assert_eq!(ledger.trove(ids[2]), before.trove(ids[2]));
    }

    #[test]
    fn test_empty_trove_can_be_liquidated_alone() {
        let mut ledger = Ledger::with_classes(LedgerSettings::default(), [weth()]);
        let id = ledger.create_trove(&weth()).unwrap();
        assert_eq!(ledger.liquidate(id).unwrap(), Fixed::ZERO);
        assert_eq!(ledger.pool(&weth()).unwrap().ratio, Fixed::ONE);
        assert_eq!(ledger.first_trove(&weth()), None);
    }

    #[test]
    fn test_classes_are_isolated() {
        let settings = LedgerSettings {
            seed_collateral: Fixed::from(100),
            seed_debt: Fixed::from(500),
        };
        let wbtc = CollateralClass::new("WBTC");
        let mut ledger = Ledger::with_classes(settings, [weth(), wbtc.clone()]);
        let a = ledger.create_trove(&weth()).unwrap();
        let _b = ledger.create_trove(&weth()).unwrap();
        let c = ledger.create_trove(&wbtc).unwrap();
        let _d = ledger.create_trove(&wbtc).unwrap();

        ledger.liquidate(a).unwrap();
        assert_eq!(ledger.unclaimed_collateral(c).unwrap(), Fixed::ZERO);
        assert_eq!(ledger.pool(&wbtc).unwrap(), LiquidationPool::new());
        assert_eq!(ledger.first_trove(&wbtc), Some(c));
    }

    #[test]
    fn test_events_are_sequenced_in_commit_order() {
        let (mut ledger, ids) = seeded_ledger(2);
        ledger.liquidate(ids[0]).unwrap();
        ledger.deposit(ids[1], Fixed::from(10)).unwrap();

        let events = ledger.drain_events();
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert!(matches!(events[0].kind, LedgerEventKind::TroveCreated { .. }));
        assert!(matches!(events[2].kind, LedgerEventKind::TroveLiquidated { .. }));
        assert!(matches!(
            events[3].kind,
            LedgerEventKind::LiquidationClaimed { .. }
        ));
        assert_eq!(
            events[4].kind,
            LedgerEventKind::CollateralDeposited {
                amount: Fixed::from(10),
                collateral: Fixed::from(210),
            }
        );
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn test_deposit_overflow_rolls_back() {
        let (mut ledger, ids) = seeded_ledger(2);
        let max = Fixed::from_decimal(rust_decimal::Decimal::MAX).unwrap();
        let before = ledger.market(&weth());

        let err = ledger.deposit(ids[0], max).unwrap_err();
        assert_eq!(err, LedgerError::ArithmeticOverflow(ArithmeticOverflow));
        assert_eq!(ledger.market(&weth()), before);
        assert_eq!(ledger.trove(ids[0]).unwrap().collateral, Fixed::from(100));
    }
}
