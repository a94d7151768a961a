//! Discrete multi-target swings.
//!
//! A piercing swing strikes every eligible entity along the reach segment at
//! once, with no contact ledger: each swing is a one-shot event.

use riposte_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attack_range::AttackRange;
use crate::stab::{stab_attack, StabEffects, StabOutcome};
use crate::world::{Attribute, CombatEntity, CombatWorld, EquipmentSlot, SoundId, WorldQuery};

fn default_true() -> bool {
    true
}

/// Strike policy that damages everything along the reach segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiercingWeapon {
    /// Knock struck targets back.
    #[serde(default = "default_true")]
    pub deals_knockback: bool,
    /// Force struck targets off their vehicles.
    #[serde(default)]
    pub dismounts: bool,
    /// Played on every swing.
    #[serde(default)]
    pub sound: Option<SoundId>,
    /// Played once when at least one target was struck.
    #[serde(default)]
    pub hit_sound: Option<SoundId>,
}

impl Default for PiercingWeapon {
    fn default() -> Self {
        Self {
            deals_knockback: true,
            dismounts: false,
            sound: None,
            hit_sound: None,
        }
    }
}

/// Result of one piercing swing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PiercingReport {
    /// Whether the swing happened (the attacker existed).
    pub swung: bool,
    /// Per-target outcomes, nearest first.
    pub hits: Vec<StabOutcome>,
}

impl PiercingReport {
    /// Number of targets the swing had an effect on.
    #[must_use]
    pub fn landed(&self) -> usize {
        self.hits.iter().filter(|hit| hit.landed()).count()
    }
}

impl PiercingWeapon {
    /// Checks if `attacker` may strike `target` at all.
    ///
    /// Shared by every multi-target strike. Rejects invulnerable, dead and
    /// unpickable targets, targets riding with the attacker, and players the
    /// world's harm rule protects.
    pub fn can_hit_entity<W: WorldQuery + ?Sized>(
        world: &W,
        attacker: &CombatEntity,
        target: &CombatEntity,
    ) -> bool {
        if target.invulnerable || !target.alive || !target.pickable {
            return false;
        }
        if attacker.is_passenger_of_same_vehicle(target) {
            return false;
        }
        if attacker.is_player() && target.is_player() && !world.can_harm_player(attacker, target) {
            return false;
        }
        true
    }

    /// Effects applied to each struck target.
    #[must_use]
    pub fn effects(&self) -> StabEffects {
        StabEffects {
            damage: true,
            knockback: self.deals_knockback,
            dismount: self.dismounts,
        }
    }

    /// Swings once at everything in reach.
    ///
    /// `durability_cost` is charged to the item in `slot` when at least one
    /// target was struck.
    pub fn attack<W: CombatWorld + ?Sized>(
        &self,
        world: &mut W,
        attacker_id: EntityId,
        range: &AttackRange,
        slot: EquipmentSlot,
        durability_cost: u32,
    ) -> PiercingReport {
        let Some(attacker) = world.entity(attacker_id) else {
            warn!(attacker = %attacker_id, "piercing swing from unknown entity");
            return PiercingReport::default();
        };

        let targets = {
            let world_ref: &W = world;
            range
                .hit_entities_along(&attacker, world_ref, &|target| {
                    Self::can_hit_entity(world_ref, &attacker, target)
                })
                .into_entities()
        };

        let damage = world.attribute_value(attacker.id, Attribute::AttackDamage);
        let effects = self.effects();
        let hits: Vec<StabOutcome> = targets
            .iter()
            .map(|hit| stab_attack(world, &attacker, &hit.target, damage, effects))
            .collect();

        world.on_attack(attacker.id);

        let report = PiercingReport { swung: true, hits };
        let location = attacker.eye_position();
        if report.landed() > 0 {
            if let Some(sound) = &self.hit_sound {
                world.play_sound(location, sound, 1.0, 1.0);
            }
            world.damage_item(attacker.id, slot, durability_cost);
        }
        if let Some(sound) = &self.sound {
            world.play_sound(location, sound, 1.0, 1.0);
        }
        world.swing(attacker.id, slot);

        debug!(
            attacker = %attacker.id,
            candidates = report.hits.len(),
            landed = report.landed(),
            "piercing swing resolved"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, FeedbackEvent};
    use crate::world::GameMode;
    use glam::Vec3;

    fn weapon() -> PiercingWeapon {
        PiercingWeapon {
            sound: Some(SoundId::new("item.trident.swing")),
            hit_sound: Some(SoundId::new("item.trident.hit")),
            ..PiercingWeapon::default()
        }
    }

    fn arena_with_attacker(mode: GameMode) -> (Arena, EntityId) {
        let mut arena = Arena::new(11);
        let attacker = arena.spawn(CombatEntity::player(mode, Vec3::ZERO).with_view(Vec3::X));
        arena.set_attribute(attacker, Attribute::AttackDamage, 6.0);
        (arena, attacker)
    }

    #[test]
    fn test_strikes_every_target_in_line() {
        let (mut arena, attacker) = arena_with_attacker(GameMode::Survival);
        let first = arena.spawn(CombatEntity::mob(Vec3::new(1.2, 0.0, 0.0)));
        let second = arena.spawn(CombatEntity::mob(Vec3::new(2.4, 0.0, 0.0)));

        let report = weapon().attack(&mut arena, attacker, &AttackRange::default(), EquipmentSlot::MainHand, 1);

        assert!(report.swung);
        assert_eq!(report.landed(), 2);
        assert_eq!(report.hits[0].target, first);
        assert_eq!(arena.health(first), Some(14.0));
        assert_eq!(arena.health(second), Some(14.0));
        assert!(arena.velocity(first).expect("exists").x > 0.0);
        assert_eq!(arena.durability_used(attacker, EquipmentSlot::MainHand), 1);
        assert_eq!(arena.sound_count("item.trident.hit"), 1);
        assert_eq!(arena.sound_count("item.trident.swing"), 1);
    }

    #[test]
    fn test_miss_still_swings_and_counts_as_attack() {
        let (mut arena, attacker) = arena_with_attacker(GameMode::Survival);
        arena.advance();

        let report = weapon().attack(&mut arena, attacker, &AttackRange::default(), EquipmentSlot::MainHand, 1);

        assert!(report.swung);
        assert!(report.hits.is_empty());
        assert_eq!(arena.sound_count("item.trident.hit"), 0);
        assert_eq!(arena.sound_count("item.trident.swing"), 1);
        assert_eq!(arena.durability_used(attacker, EquipmentSlot::MainHand), 0);
        assert_eq!(arena.last_attack_tick(attacker), Some(1));
        assert!(arena
            .feedback()
            .iter()
            .any(|event| matches!(event, FeedbackEvent::Swing { entity, .. } if *entity == attacker)));
    }

    #[test]
    fn test_ineligible_targets_are_skipped() {
        let (mut arena, attacker) = arena_with_attacker(GameMode::Survival);
        let mut ghost = CombatEntity::mob(Vec3::new(1.2, 0.0, 0.0));
        ghost.invulnerable = true;
        let ghost = arena.spawn(ghost);
        let mut corpse = CombatEntity::mob(Vec3::new(1.8, 0.0, 0.0));
        corpse.alive = false;
        arena.spawn(corpse);
        let rival = arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::new(2.4, 0.0, 0.0)));
        arena.set_pvp(false);

        let report = weapon().attack(&mut arena, attacker, &AttackRange::default(), EquipmentSlot::MainHand, 1);

        assert!(report.hits.is_empty());
        assert_eq!(arena.health(ghost), Some(20.0));
        assert_eq!(arena.health(rival), Some(20.0));
    }

    #[test]
    fn test_same_vehicle_passengers_are_safe() {
        let mut arena = Arena::new(11);
        let boat = arena.spawn(CombatEntity::mob(Vec3::new(20.0, 0.0, 0.0)));
        let attacker = arena.spawn(
            CombatEntity::player(GameMode::Survival, Vec3::ZERO)
                .with_view(Vec3::X)
                .riding(boat),
        );
        let friend = arena.spawn(CombatEntity::mob(Vec3::new(1.2, 0.0, 0.0)).riding(boat));
        let stranger = arena.spawn(CombatEntity::mob(Vec3::new(2.4, 0.0, 0.0)));

        let report = PiercingWeapon::default().attack(
            &mut arena,
            attacker,
            &AttackRange::default(),
            EquipmentSlot::MainHand,
            1,
        );

        let struck: Vec<_> = report.hits.iter().map(|hit| hit.target).collect();
        assert_eq!(struck, vec![stranger]);
        assert_eq!(arena.health(friend), Some(20.0));
    }

    #[test]
    fn test_dismounting_swing() {
        let (mut arena, attacker) = arena_with_attacker(GameMode::Survival);
        let horse = arena.spawn(CombatEntity::mob(Vec3::new(10.0, 0.0, 0.0)));
        let rider = arena.spawn(CombatEntity::mob(Vec3::new(1.5, 0.0, 0.0)).riding(horse));
        let weapon = PiercingWeapon {
            deals_knockback: false,
            dismounts: true,
            ..PiercingWeapon::default()
        };

        let report = weapon.attack(&mut arena, attacker, &AttackRange::default(), EquipmentSlot::MainHand, 1);

        assert!(report.hits[0].dismounted);
        assert!(!report.hits[0].knocked_back);
        assert_eq!(arena.entity(rider).and_then(|e| e.vehicle), None);
    }

    #[test]
    fn test_unknown_attacker_does_nothing() {
        let mut arena = Arena::new(11);
        let report = weapon().attack(
            &mut arena,
            EntityId::from_raw(u64::MAX),
            &AttackRange::default(),
            EquipmentSlot::MainHand,
            1,
        );
        assert!(!report.swung);
        assert!(arena.feedback().is_empty());
    }
}
