//! Per-attacker memory of recent stab contacts.
//!
//! A kinetic weapon must not hit the same target on consecutive ticks. The
//! ledger remembers when each target was last struck and whether it was a
//! living entity, and forgets entries lazily once their cooldown lapses.

use ahash::AHashMap;
use riposte_common::EntityId;

/// A remembered contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabRecord {
    /// Tick the target was struck.
    pub tick: u64,
    /// Whether the target was a living entity.
    pub living: bool,
}

/// Recently-stabbed targets of a single attacker.
#[derive(Debug, Clone, Default)]
pub struct StabLedger {
    records: AHashMap<EntityId, StabRecord>,
}

impl StabLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if `target` was struck less than `cooldown` ticks ago.
    ///
    /// An entry older than the cooldown is dropped on the way.
    pub fn was_recently_stabbed(&mut self, target: EntityId, now: u64, cooldown: u64) -> bool {
        let Some(record) = self.records.get(&target) else {
            return false;
        };
        let elapsed = now.saturating_sub(record.tick);
        if elapsed > cooldown {
            self.records.remove(&target);
        }
        elapsed < cooldown
    }

    /// Records a contact at `now`, replacing any older entry.
    pub fn remember(&mut self, target: EntityId, now: u64, living: bool) {
        self.records.insert(target, StabRecord { tick: now, living });
    }

    /// Living targets struck within the cooldown window, in id order.
    #[must_use]
    pub fn recent_living(&self, now: u64, cooldown: u64) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.living && now.saturating_sub(record.tick) < cooldown)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Tick `target` was last struck, if remembered.
    #[must_use]
    pub fn last_stabbed(&self, target: EntityId) -> Option<u64> {
        self.records.get(&target).map(|record| record.tick)
    }

    /// Number of remembered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unknown_target_is_not_recent() {
        let mut ledger = StabLedger::new();
        assert!(!ledger.was_recently_stabbed(EntityId::from_raw(1), 100, 10));
    }

    #[test]
    fn test_cooldown_window() {
        let mut ledger = StabLedger::new();
        let target = EntityId::from_raw(7);
        ledger.remember(target, 100, true);

        assert!(ledger.was_recently_stabbed(target, 100, 10));
        assert!(ledger.was_recently_stabbed(target, 109, 10));
        // Exactly at the cooldown: no longer recent, but still remembered
        assert!(!ledger.was_recently_stabbed(target, 110, 10));
        assert_eq!(ledger.last_stabbed(target), Some(100));
        // Past the cooldown: forgotten
        assert!(!ledger.was_recently_stabbed(target, 111, 10));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_zero_cooldown_never_recent() {
        let mut ledger = StabLedger::new();
        let target = EntityId::from_raw(3);
        ledger.remember(target, 5, true);
        assert!(!ledger.was_recently_stabbed(target, 5, 0));
    }

    #[test]
    fn test_recent_living() {
        let mut ledger = StabLedger::new();
        ledger.remember(EntityId::from_raw(3), 100, true);
        ledger.remember(EntityId::from_raw(1), 104, true);
        ledger.remember(EntityId::from_raw(2), 104, false);

        assert_eq!(
            ledger.recent_living(105, 10),
            vec![EntityId::from_raw(1), EntityId::from_raw(3)]
        );
        assert_eq!(ledger.recent_living(112, 10), vec![EntityId::from_raw(1)]);

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_expiry_only_touches_the_target_read() {
        let mut ledger = StabLedger::new();
        let near = EntityId::from_raw(1);
        let far = EntityId::from_raw(2);
        ledger.remember(near, 100, true);
        ledger.remember(far, 100, true);

        // A short cooldown forgets the entry it reads and nothing else
        assert!(!ledger.was_recently_stabbed(near, 106, 4));
        assert_eq!(ledger.last_stabbed(near), None);
        assert_eq!(ledger.last_stabbed(far), Some(100));

        // A longer cooldown still sees the other contact
        assert!(ledger.was_recently_stabbed(far, 107, 20));
    }

    proptest! {
        #[test]
        fn prop_recent_iff_within_cooldown(
            stabbed_at in 0u64..1_000,
            delay in 0u64..100,
            cooldown in 0u64..50,
        ) {
            let mut ledger = StabLedger::new();
            let target = EntityId::from_raw(42);
            ledger.remember(target, stabbed_at, true);
            let now = stabbed_at + delay;
            prop_assert_eq!(ledger.was_recently_stabbed(target, now, cooldown), delay < cooldown);
        }
    }
}
