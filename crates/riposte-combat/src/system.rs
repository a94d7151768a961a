//! Per-entity driver for weapon uses.
//!
//! [`CombatSystem`] owns what a host would otherwise store on each entity:
//! the stab ledger and the kinetic use in progress. Hosts call
//! [`CombatSystem::tick`] once per simulation tick.

use ahash::AHashMap;
use riposte_common::EntityId;
use serde::Serialize;
use tracing::{debug, warn};

use crate::attack_range::AttackRange;
use crate::definitions::ItemCombatProfile;
use crate::kinetic_weapon::{KineticTickReport, KineticUse, KineticWeapon};
use crate::piercing_weapon::PiercingReport;
use crate::stab_ledger::StabLedger;
use crate::world::{Attribute, CombatWorld, EquipmentSlot};

/// Result of trying to start using an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UseResult {
    /// The use started.
    Started,
    /// The item has no kinetic strike policy.
    NotKinetic,
    /// The wielder is already using a kinetic item.
    AlreadyUsing,
    /// The wielder does not exist or is dead.
    UnknownEntity,
}

#[derive(Debug, Clone)]
struct ActiveLunge {
    weapon: KineticWeapon,
    range: AttackRange,
    usage: KineticUse,
}

/// Tracks kinetic uses and stab ledgers by entity.
#[derive(Debug, Default)]
pub struct CombatSystem {
    /// Ledgers by attacker; kept across uses.
    ledgers: AHashMap<EntityId, StabLedger>,
    /// Kinetic uses in progress.
    active: AHashMap<EntityId, ActiveLunge>,
}

impl CombatSystem {
    /// Create new combat system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts using a kinetic item.
    pub fn start_using<W: CombatWorld + ?Sized>(
        &mut self,
        world: &mut W,
        wielder: EntityId,
        profile: &ItemCombatProfile,
        slot: EquipmentSlot,
    ) -> UseResult {
        if !world.entity(wielder).is_some_and(|e| e.alive) {
            return UseResult::UnknownEntity;
        }
        if self.active.contains_key(&wielder) {
            return UseResult::AlreadyUsing;
        }
        let Some(weapon) = profile.strike.as_ref().and_then(|s| s.as_kinetic()) else {
            return UseResult::NotKinetic;
        };

        let interaction_range = world.attribute_value(wielder, Attribute::InteractionRange);
        let lunge = ActiveLunge {
            weapon: weapon.clone(),
            range: profile.reach(interaction_range),
            usage: KineticUse::new(
                slot,
                profile.use_duration_ticks,
                profile.weapon_stats().item_damage_per_attack,
            ),
        };
        weapon.start_using(world, wielder);
        self.active.insert(wielder, lunge);

        debug!(wielder = %wielder, item = %profile.name, "kinetic use started");
        UseResult::Started
    }

    /// Releases the item. Returns `false` if nothing was in use.
    pub fn stop_using(&mut self, wielder: EntityId) -> bool {
        self.active.remove(&wielder).is_some()
    }

    /// Checks if an entity is using a kinetic item.
    #[must_use]
    pub fn is_using(&self, wielder: EntityId) -> bool {
        self.active.contains_key(&wielder)
    }

    /// Kinetic use in progress.
    #[must_use]
    pub fn active_use(&self, wielder: EntityId) -> Option<&KineticUse> {
        self.active.get(&wielder).map(|lunge| &lunge.usage)
    }

    /// Stab ledger of an attacker.
    #[must_use]
    pub fn ledger(&self, attacker: EntityId) -> Option<&StabLedger> {
        self.ledgers.get(&attacker)
    }

    /// Swings a piercing item. `None` if the item has no piercing policy.
    pub fn swing<W: CombatWorld + ?Sized>(
        &mut self,
        world: &mut W,
        attacker: EntityId,
        profile: &ItemCombatProfile,
        slot: EquipmentSlot,
    ) -> Option<PiercingReport> {
        let weapon = profile.strike.as_ref().and_then(|s| s.as_piercing())?;
        let interaction_range = world.attribute_value(attacker, Attribute::InteractionRange);
        let range = profile.reach(interaction_range);
        let cost = profile.weapon_stats().item_damage_per_attack;
        Some(weapon.attack(world, attacker, &range, slot, cost))
    }

    /// Runs one tick of every kinetic use, in entity order.
    ///
    /// Uses whose wielder vanished or died are dropped along with the
    /// wielder's stab ledger; uses that ran out
    /// end after their last tick.
    pub fn tick<W: CombatWorld + ?Sized>(&mut self, world: &mut W) -> Vec<(EntityId, KineticTickReport)> {
        let mut wielders: Vec<EntityId> = self.active.keys().copied().collect();
        wielders.sort_unstable();

        let mut reports = Vec::with_capacity(wielders.len());
        for wielder in wielders {
            if !world.entity(wielder).is_some_and(|e| e.alive) {
                warn!(wielder = %wielder, "dropping kinetic use of missing entity");
                self.active.remove(&wielder);
                self.ledgers.remove(&wielder);
                continue;
            }
            let Some(lunge) = self.active.get_mut(&wielder) else {
                continue;
            };
            let ledger = self.ledgers.entry(wielder).or_default();
            let report = lunge
                .weapon
                .damage_entities(world, wielder, &lunge.range, &lunge.usage, ledger);

            if !lunge.usage.advance() {
                debug!(wielder = %wielder, "kinetic use ran out");
                self.active.remove(&wielder);
            }
            reports.push((wielder, report));
        }
        reports
    }

    /// Forgets an entity.
    pub fn remove_entity(&mut self, id: EntityId) {
        self.active.remove(&id);
        self.ledgers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::world::{CombatEntity, GameMode, WorldQuery};
    use glam::Vec3;

    fn charger(arena: &mut Arena) -> EntityId {
        arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::ZERO).with_view(Vec3::X))
    }

    #[test]
    fn test_spear_lunge_goes_live_after_delay() {
        let mut arena = Arena::new(1);
        let mut system = CombatSystem::new();
        let player = charger(&mut arena);
        let target = arena.spawn(CombatEntity::mob(Vec3::new(3.5, 0.0, 0.0)));
        let spear = ItemCombatProfile::spear();

        assert_eq!(
            system.start_using(&mut arena, player, &spear, EquipmentSlot::MainHand),
            UseResult::Started
        );
        assert_eq!(
            system.start_using(&mut arena, player, &spear, EquipmentSlot::MainHand),
            UseResult::AlreadyUsing
        );
        assert!((arena.velocity(player).expect("exists").x - 0.38).abs() < 1e-5);
        assert_eq!(arena.sound_count("item.spear.use"), 1);

        for _ in 0..10 {
            let reports = system.tick(&mut arena);
            assert_eq!(reports.len(), 1);
            assert!(reports[0].1.live_ticks.is_none());
            arena.skip_ticks(1);
        }

        arena.set_velocity(player, Vec3::new(0.5, 0.0, 0.0));
        let reports = system.tick(&mut arena);
        assert_eq!(reports[0].1.live_ticks, Some(0));
        assert_eq!(reports[0].1.hits.len(), 1);
        // 1 base + floor(0.5 * 5)
        assert_eq!(arena.health(target), Some(17.0));
        assert_eq!(system.ledger(player).map(StabLedger::len), Some(1));
    }

    #[test]
    fn test_use_runs_out() {
        let mut arena = Arena::new(1);
        let mut system = CombatSystem::new();
        let player = charger(&mut arena);
        let mut spear = ItemCombatProfile::spear();
        spear.use_duration_ticks = 3;

        system.start_using(&mut arena, player, &spear, EquipmentSlot::MainHand);
        for _ in 0..3 {
            assert!(system.is_using(player));
            system.tick(&mut arena);
        }
        assert!(!system.is_using(player));
        assert!(system.tick(&mut arena).is_empty());
    }

    #[test]
    fn test_dead_wielder_is_dropped() {
        let mut arena = Arena::new(1);
        let mut system = CombatSystem::new();
        let player = charger(&mut arena);
        system.start_using(&mut arena, player, &ItemCombatProfile::spear(), EquipmentSlot::MainHand);
        assert_eq!(system.tick(&mut arena).len(), 1);
        assert!(system.ledger(player).is_some());
        arena.skip_ticks(1);

        arena.set_health(player, 0.0);
        assert!(system.tick(&mut arena).is_empty());
        assert!(!system.is_using(player));
        assert!(system.ledger(player).is_none());
        assert_eq!(
            system.start_using(&mut arena, player, &ItemCombatProfile::spear(), EquipmentSlot::MainHand),
            UseResult::UnknownEntity
        );
    }

    #[test]
    fn test_dispatch_by_policy() {
        let mut arena = Arena::new(1);
        let mut system = CombatSystem::new();
        let player = charger(&mut arena);
        let target = arena.spawn(CombatEntity::mob(Vec3::new(2.0, 0.0, 0.0)));

        assert_eq!(
            system.start_using(&mut arena, player, &ItemCombatProfile::trident(), EquipmentSlot::MainHand),
            UseResult::NotKinetic
        );
        assert!(system
            .swing(&mut arena, player, &ItemCombatProfile::spear(), EquipmentSlot::MainHand)
            .is_none());

        let report = system
            .swing(&mut arena, player, &ItemCombatProfile::trident(), EquipmentSlot::MainHand)
            .expect("trident pierces");
        assert_eq!(report.landed(), 1);
        assert!(arena.health(target).expect("exists") < 20.0);
        assert!(arena.entity(target).is_some());

        system.remove_entity(player);
        assert!(system.ledger(player).is_none());
    }
}
