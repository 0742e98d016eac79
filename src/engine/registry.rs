use crate::domain::{Amount, CollateralClass, Fixed, Trove, TroveId};
use std::collections::HashMap;

/// A live trove plus its links in the insertion-ordered list.
#[derive(Debug, Clone)]
struct Node {
    trove: Trove,
    prev: Option<TroveId>,
    next: Option<TroveId>,
}

/// Live troves of one collateral class.
///
/// Lookup is by id through the map; enumeration follows the intrusive `prev`/`next` links from
/// oldest to newest. Removal is O(1) and unlinks the id so it can no longer be resolved.
#[derive(Debug, Clone)]
pub struct Registry {
    class: CollateralClass,
    nodes: HashMap<TroveId, Node>,
    head: Option<TroveId>,
    tail: Option<TroveId>,
    total_collateral: Amount,
    total_debt: Amount,
}

impl Registry {
    pub fn new(class: CollateralClass) -> Self {
        Self {
            class,
            nodes: HashMap::new(),
            head: None,
            tail: None,
            total_collateral: Fixed::ZERO,
            total_debt: Fixed::ZERO,
        }
    }

    pub fn class(&self) -> &CollateralClass {
        &self.class
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TroveId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: TroveId) -> Option<&Trove> {
        self.nodes.get(&id).map(|node| &node.trove)
    }

    /// Sum of the settled collateral of all live troves.
    pub fn total_collateral(&self) -> Amount {
        self.total_collateral
    }

    /// Sum of the settled debt of all live troves.
    pub fn total_debt(&self) -> Amount {
        self.total_debt
    }

    pub fn first(&self) -> Option<TroveId> {
        self.head
    }

    pub fn last(&self) -> Option<TroveId> {
        self.tail
    }

    pub fn next(&self, id: TroveId) -> Option<TroveId> {
        self.nodes.get(&id).and_then(|node| node.next)
    }

    pub fn prev(&self, id: TroveId) -> Option<TroveId> {
        self.nodes.get(&id).and_then(|node| node.prev)
    }

    /// Iterate live troves from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Trove> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(&cursor?)?;
            cursor = node.next;
            Some(&node.trove)
        })
    }

    /// Append a trove at the tail. Returns false if the id is already present.
    ///
    /// Aggregates are not touched; the ledger sets them when it commits.
    pub(crate) fn push_back(&mut self, trove: Trove) -> bool {
        let id = trove.id;
        if self.nodes.contains_key(&id) {
            return false;
        }

        let prev = self.tail;
        if let Some(tail) = prev.and_then(|tail| self.nodes.get_mut(&tail)) {
            tail.next = Some(id);
        }
        if self.head.is_none() {
            self.head = Some(id);
        }
        self.tail = Some(id);
        self.nodes.insert(
            id,
            Node {
                trove,
                prev,
                next: None,
            },
        );
        true
    }

    /// Unlink and return a trove.
    pub(crate) fn remove(&mut self, id: TroveId) -> Option<Trove> {
        let node = self.nodes.remove(&id)?;

        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.nodes.get_mut(&prev) {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.nodes.get_mut(&next) {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        Some(node.trove)
    }

    /// Overwrite the stored state of a live trove. Returns false if the id is unknown.
    pub(crate) fn replace(&mut self, trove: Trove) -> bool {
        match self.nodes.get_mut(&trove.id) {
            Some(node) => {
                node.trove = trove;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_totals(&mut self, total_collateral: Amount, total_debt: Amount) {
        self.total_collateral = total_collateral;
        self.total_debt = total_debt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[u64]) -> Registry {
        let class = CollateralClass::new("WETH");
        let mut registry = Registry::new(class.clone());
        for &id in ids {
            assert!(registry.push_back(Trove::new(
                TroveId::new(id),
                class.clone(),
                Fixed::from(100),
                Fixed::from(500),
                Fixed::ONE,
            )));
        }
        registry
    }

    fn order(registry: &Registry) -> Vec<u64> {
        registry.iter().map(|t| t.id.as_u64()).collect()
    }

    #[test]
    fn test_empty_registry_has_no_first() {
        let registry = registry_with(&[]);
        assert!(registry.is_empty());
        assert_eq!(registry.first(), None);
        assert_eq!(registry.last(), None);
        assert_eq!(order(&registry), Vec::<u64>::new());
    }

    #[test]
    fn test_traversal_follows_insertion_order() {
        let registry = registry_with(&[3, 1, 2]);
        assert_eq!(registry.first(), Some(TroveId::new(3)));
        assert_eq!(registry.next(TroveId::new(3)), Some(TroveId::new(1)));
        assert_eq!(registry.next(TroveId::new(1)), Some(TroveId::new(2)));
        assert_eq!(registry.next(TroveId::new(2)), None);
        assert_eq!(registry.prev(TroveId::new(2)), Some(TroveId::new(1)));
        assert_eq!(registry.last(), Some(TroveId::new(2)));
        assert_eq!(order(&registry), vec![3, 1, 2]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut registry = registry_with(&[1]);
        let dup = registry.get(TroveId::new(1)).cloned().unwrap();
        assert!(!registry.push_back(dup));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_middle_relinks_neighbours() {
        let mut registry = registry_with(&[1, 2, 3]);
        assert!(registry.remove(TroveId::new(2)).is_some());
        assert_eq!(registry.next(TroveId::new(1)), Some(TroveId::new(3)));
        assert_eq!(registry.prev(TroveId::new(3)), Some(TroveId::new(1)));
        assert_eq!(registry.next(TroveId::new(2)), None);
        assert!(!registry.contains(TroveId::new(2)));
        assert_eq!(order(&registry), vec![1, 3]);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut registry = registry_with(&[1, 2, 3]);
        registry.remove(TroveId::new(1));
        assert_eq!(registry.first(), Some(TroveId::new(2)));
        registry.remove(TroveId::new(3));
        assert_eq!(registry.last(), Some(TroveId::new(2)));
        registry.remove(TroveId::new(2));
        assert_eq!(registry.first(), None);
        assert_eq!(registry.last(), None);
        assert!(registry.remove(TroveId::new(2)).is_none());
    }

    #[test]
    fn test_append_after_removal_goes_to_tail() {
        let mut registry = registry_with(&[1, 2]);
        registry.remove(TroveId::new(2));
        let class = registry.class().clone();
        registry.push_back(Trove::new(
            TroveId::new(4),
            class,
            Fixed::ZERO,
            Fixed::ZERO,
            Fixed::ONE,
        ));
        assert_eq!(order(&registry), vec![1, 4]);
    }

    #[test]
    fn test_replace_unknown_id_fails() {
        let mut registry = registry_with(&[1]);
        let mut ghost = registry.get(TroveId::new(1)).cloned().unwrap();
        ghost.id = TroveId::new(9);
        assert!(!registry.replace(ghost));
    }
}
