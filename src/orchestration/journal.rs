use crate::engine::LedgerEvent;
use std::collections::VecDeque;

/// Bounded, ordered buffer of committed ledger events for indexers to poll.
///
/// When full, the oldest events are evicted; a poller that falls behind detects the gap by
/// comparing its cursor with [`EventJournal::oldest_seq`].
#[derive(Debug, Clone)]
pub struct EventJournal {
    capacity: usize,
    events: VecDeque<LedgerEvent>,
}

impl EventJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LedgerEvent>) {
        for event in events {
            if self.events.len() == self.capacity {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
    }

    /// Events with `seq > since`, oldest first, at most `limit` of them.
    pub fn since(&self, since: u64, limit: usize) -> Vec<LedgerEvent> {
        let start = self.events.partition_point(|event| event.seq <= since);
        self.events.iter().skip(start).take(limit).cloned().collect()
    }

    pub fn oldest_seq(&self) -> Option<u64> {
        self.events.front().map(|event| event.seq)
    }

    pub fn latest_seq(&self) -> Option<u64> {
        self.events.back().map(|event| event.seq)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CollateralClass, Fixed, TroveId};
    use crate::engine::LedgerEventKind;

    fn event(seq: u64) -> LedgerEvent {
        LedgerEvent {
            seq,
            trove: TroveId::new(1),
            class: CollateralClass::new("WETH"),
            kind: LedgerEventKind::CollateralDeposited {
                amount: Fixed::ONE,
                collateral: Fixed::ONE,
            },
        }
    }

    fn seqs(events: &[LedgerEvent]) -> Vec<u64> {
        events.iter().map(|e| e.seq).collect()
    }

    #[test]
    fn test_since_returns_newer_events_in_order() {
        let mut journal = EventJournal::new(10);
        journal.extend((1..=5).map(event));
        assert_eq!(seqs(&journal.since(0, 100)), vec![1, 2, 3, 4, 5]);
        assert_eq!(seqs(&journal.since(3, 100)), vec![4, 5]);
        assert_eq!(seqs(&journal.since(1, 2)), vec![2, 3]);
        assert!(journal.since(5, 100).is_empty());
    }

    #[test]
    fn test_oldest_events_are_evicted() {
        let mut journal = EventJournal::new(3);
        journal.extend((1..=5).map(event));
        assert_eq!(journal.len(), 3);
        assert_eq!(journal.oldest_seq(), Some(3));
        assert_eq!(journal.latest_seq(), Some(5));
        assert_eq!(seqs(&journal.since(0, 100)), vec![3, 4, 5]);
    }
}
