//! Append-only event log of one bridge instance
//!
//! Positions start at 1 and play the role of block numbers for consumers:
//! `events_since(p)` returns everything strictly after `p`, so a cursor of 0
//! reads the whole log.

use std::sync::{RwLock, RwLockReadGuard};

use crate::types::{BridgeEvent, LoggedEvent};

#[derive(Debug, Default)]
pub struct EventLog {
    events: RwLock<Vec<LoggedEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<LoggedEvent>> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn append(&self, event: BridgeEvent) -> LoggedEvent {
        let mut events = self
            .events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let logged = LoggedEvent {
            position: events.len() as u64 + 1,
            event,
        };
        events.push(logged.clone());
        logged
    }

    /// Position of the latest event, 0 when empty
    pub fn head(&self) -> u64 {
        self.read().len() as u64
    }

    /// Events with `position > after`
    pub fn since(&self, after: u64) -> Vec<LoggedEvent> {
        let events = self.read();
        let start = (after as usize).min(events.len());
        events[start..].to_vec()
    }

    /// Events with `from <= position <= to`
    pub fn range(&self, from: u64, to: u64) -> Vec<LoggedEvent> {
        let events = self.read();
        let start = (from.max(1) as usize - 1).min(events.len());
        let end = (to as usize).min(events.len());
        if start >= end {
            return Vec::new();
        }
        events[start..end].to_vec()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn deposit(n: u64) -> BridgeEvent {
        BridgeEvent::EthDeposited {
            from: Address::ZERO,
            amount: U256::from(n),
        }
    }

    #[test]
    fn test_positions_are_one_based() {
        let log = EventLog::new();
        assert_eq!(log.head(), 0);
        assert_eq!(log.append(deposit(1)).position, 1);
        assert_eq!(log.append(deposit(2)).position, 2);
        assert_eq!(log.head(), 2);
    }

    #[test]
    fn test_since_and_range() {
        let log = EventLog::new();
        for n in 1..=5 {
            log.append(deposit(n));
        }

        assert_eq!(log.since(0).len(), 5);
        let tail = log.since(3);
        assert_eq!(tail.iter().map(|e| e.position).collect::<Vec<_>>(), vec![4, 5]);
        assert!(log.since(5).is_empty());
        assert!(log.since(100).is_empty());

        let window = log.range(2, 3);
        assert_eq!(window.iter().map(|e| e.position).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(log.range(0, 1).len(), 1);
        assert_eq!(log.range(4, 99).len(), 2);
        assert!(log.range(4, 3).is_empty());
    }
}
