//! # Riposte Combat
//!
//! Reach, strike and block resolution for melee and kinetic weapons.
//!
//! This crate provides:
//! - Attack reach envelopes and closest-hit resolution
//! - Piercing swings that strike everything along the reach segment
//! - Kinetic (lunge) weapons gated on time and speed, with a stab ledger
//! - Block mitigation, item wear and block disabling
//! - Data-driven item combat profiles (TOML and RON)
//! - An in-memory arena implementing the world traits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod attack_range;
pub mod blocking;
pub mod blocks_attacks;
pub mod damage;
pub mod definitions;
pub mod kinetic_weapon;
pub mod piercing_weapon;
pub mod stab;
pub mod stab_ledger;
pub mod strike;
pub mod system;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::arena::*;
    pub use crate::attack_range::*;
    pub use crate::blocking::*;
    pub use crate::blocks_attacks::*;
    pub use crate::damage::*;
    pub use crate::definitions::*;
    pub use crate::kinetic_weapon::*;
    pub use crate::piercing_weapon::*;
    pub use crate::stab::*;
    pub use crate::stab_ledger::*;
    pub use crate::strike::*;
    pub use crate::system::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_shield_blocks_trident_swing() {
        let mut arena = Arena::new(9);
        let mut system = CombatSystem::new();
        let registry = ProfileRegistry::with_presets().expect("presets are valid");
        let trident = registry.get_by_name("Trident").expect("preset").clone();
        let shield = registry.get_by_name("shield").expect("preset").clone();

        let attacker = arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::ZERO).with_view(Vec3::X));
        let defender = arena.spawn(CombatEntity::mob(Vec3::new(2.0, 0.0, 0.0)).with_view(Vec3::NEG_X));
        arena.set_attribute(attacker, Attribute::AttackDamage, 5.0);
        let blocks = shield.blocks_attacks.clone().expect("shield blocks");
        arena.equip_guard(defender, blocks, shield.blocking_item(EquipmentSlot::OffHand));
        assert!(arena.raise_guard(defender));
        arena.skip_ticks(5);

        let report = system
            .swing(&mut arena, attacker, &trident, EquipmentSlot::MainHand)
            .expect("trident pierces");

        // Damage fully absorbed, knockback still lands
        assert_eq!(report.landed(), 1);
        assert!(!report.hits[0].damaged);
        assert!(report.hits[0].knocked_back);
        assert_eq!(arena.health(defender), Some(20.0));
        assert_eq!(arena.sound_count("item.shield.block"), 1);
        assert_eq!(arena.durability_used(defender, EquipmentSlot::OffHand), 6);
        assert_eq!(
            arena.durability_used(attacker, EquipmentSlot::MainHand),
            trident.weapon_stats().item_damage_per_attack
        );
    }
}
