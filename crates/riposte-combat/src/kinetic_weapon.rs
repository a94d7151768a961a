//! Continuous, velocity-gated strikes (spears and lances).
//!
//! While the item is in use, every tick after `delay_ticks` sweeps the
//! reach segment and evaluates three independent gates per target:
//! dismount, knockback and damage. A [`StabLedger`] keeps one lunge from
//! striking the same target on consecutive ticks.

use glam::Vec3;
use riposte_common::{horizontal, EntityId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::attack_range::AttackRange;
use crate::definitions::{DefinitionError, DefinitionResult};
use crate::piercing_weapon::PiercingWeapon;
use crate::stab::{stab_attack, StabEffects, StabOutcome};
use crate::stab_ledger::StabLedger;
use crate::world::{Attribute, CombatEntity, CombatWorld, EquipmentSlot, SoundId};

/// Speed threshold scale applied to non-player wielders by default.
pub const DEFAULT_MOB_SPEED_FACTOR: f32 = 0.2;

fn default_mob_speed_factor() -> f32 {
    DEFAULT_MOB_SPEED_FACTOR
}

/// A time and velocity gate.
///
/// Armed while `j <= max_duration_ticks` and both speeds reach their
/// thresholds (scaled by the wielder's speed factor). `j` counts ticks since
/// the weapon went live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticCondition {
    /// Last tick (relative to going live) the gate can arm.
    pub max_duration_ticks: u32,
    /// Minimum wielder speed along the view direction.
    #[serde(default)]
    pub min_speed: f32,
    /// Minimum closing speed between wielder and target.
    #[serde(default)]
    pub min_relative_speed: f32,
}

impl KineticCondition {
    /// Creates a gate.
    #[must_use]
    pub const fn new(max_duration_ticks: u32, min_speed: f32, min_relative_speed: f32) -> Self {
        Self {
            max_duration_ticks,
            min_speed,
            min_relative_speed,
        }
    }

    /// Gate on the wielder's own speed only.
    #[must_use]
    pub const fn of_attacker_speed(max_duration_ticks: u32, min_speed: f32) -> Self {
        Self::new(max_duration_ticks, min_speed, 0.0)
    }

    /// Gate on closing speed only.
    #[must_use]
    pub const fn of_relative_speed(max_duration_ticks: u32, min_relative_speed: f32) -> Self {
        Self::new(max_duration_ticks, 0.0, min_relative_speed)
    }

    /// Checks if the gate is armed.
    #[must_use]
    pub fn test(&self, j: u32, attacker_speed: f32, relative_speed: f32, factor: f32) -> bool {
        j <= self.max_duration_ticks
            && attacker_speed >= self.min_speed * factor
            && relative_speed >= self.min_relative_speed * factor
    }

    fn validate(&self, owner: &str, label: &str) -> DefinitionResult<()> {
        if self.min_speed >= 0.0 && self.min_relative_speed >= 0.0 {
            Ok(())
        } else {
            Err(DefinitionError::Validation(format!(
                "{owner}: kinetic {label} condition has a negative speed threshold"
            )))
        }
    }
}

/// Per-wielder state of an item being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KineticUse {
    /// Slot holding the weapon.
    pub slot: EquipmentSlot,
    /// Total use duration in ticks.
    pub use_duration: u32,
    /// Ticks left before the use ends by itself.
    pub ticks_remaining: u32,
    /// Durability charged per tick that lands a hit.
    pub durability_cost: u32,
}

impl KineticUse {
    /// Starts a use of `use_duration` ticks.
    #[must_use]
    pub const fn new(slot: EquipmentSlot, use_duration: u32, durability_cost: u32) -> Self {
        Self {
            slot,
            use_duration,
            ticks_remaining: use_duration,
            durability_cost,
        }
    }

    /// Ticks elapsed since the use started.
    #[must_use]
    pub fn ticks_used(&self) -> u32 {
        self.use_duration.saturating_sub(self.ticks_remaining)
    }

    /// Consumes one tick. Returns `false` once the use has run out.
    pub fn advance(&mut self) -> bool {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        self.ticks_remaining > 0
    }
}

/// What one kinetic tick did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KineticTickReport {
    /// Ticks since the weapon went live, when it was live this tick.
    pub live_ticks: Option<u32>,
    /// Targets struck this tick.
    pub hits: Vec<StabOutcome>,
    /// Candidates skipped because they were struck too recently.
    pub skipped: usize,
}

/// Strike policy of a charged lunge weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticWeapon {
    /// Ticks before the same target can be struck again.
    #[serde(default)]
    pub contact_cooldown_ticks: u32,
    /// Ticks of use before the weapon goes live.
    #[serde(default)]
    pub delay_ticks: u32,
    /// Gate for forced dismounts.
    #[serde(default)]
    pub dismount_conditions: Option<KineticCondition>,
    /// Gate for knockback.
    #[serde(default)]
    pub knockback_conditions: Option<KineticCondition>,
    /// Gate for damage.
    #[serde(default)]
    pub damage_conditions: Option<KineticCondition>,
    /// Horizontal lunge impulse applied when use starts.
    #[serde(default)]
    pub forward_movement: f32,
    /// Bonus damage per unit of closing speed.
    #[serde(default)]
    pub damage_multiplier: f32,
    /// Speed threshold scale for non-player wielders.
    #[serde(default = "default_mob_speed_factor")]
    pub mob_speed_factor: f32,
    /// Played when use starts.
    #[serde(default)]
    pub sound: Option<SoundId>,
    /// Played on a tick that struck something.
    #[serde(default)]
    pub hit_sound: Option<SoundId>,
}

impl Default for KineticWeapon {
    fn default() -> Self {
        Self {
            contact_cooldown_ticks: 0,
            delay_ticks: 0,
            dismount_conditions: None,
            knockback_conditions: None,
            damage_conditions: None,
            forward_movement: 0.0,
            damage_multiplier: 0.0,
            mob_speed_factor: DEFAULT_MOB_SPEED_FACTOR,
            sound: None,
            hit_sound: None,
        }
    }
}

impl KineticWeapon {
    /// Stock spear.
    #[must_use]
    pub fn spear() -> Self {
        Self {
            contact_cooldown_ticks: 10,
            delay_ticks: 10,
            dismount_conditions: Some(KineticCondition::of_attacker_speed(100, 0.7)),
            knockback_conditions: Some(KineticCondition::of_attacker_speed(200, 0.25)),
            damage_conditions: Some(KineticCondition::of_relative_speed(300, 0.25)),
            forward_movement: 0.38,
            damage_multiplier: 5.0,
            mob_speed_factor: DEFAULT_MOB_SPEED_FACTOR,
            sound: Some(SoundId::new("item.spear.use")),
            hit_sound: Some(SoundId::new("item.spear.hit")),
        }
    }

    /// Threshold scale for a wielder: 1 for players.
    #[must_use]
    pub fn speed_factor(&self, wielder: &CombatEntity) -> f32 {
        if wielder.is_player() {
            1.0
        } else {
            self.mob_speed_factor
        }
    }

    /// Use duration over which the weapon can still deal damage.
    #[must_use]
    pub fn compute_damage_use_duration(&self) -> u32 {
        let window = self.damage_conditions.map_or(0, |c| c.max_duration_ticks);
        self.delay_ticks.saturating_add(window)
    }

    /// Evaluates all three gates. Pure.
    #[must_use]
    pub fn evaluate(&self, j: u32, attacker_speed: f32, relative_speed: f32, factor: f32) -> StabEffects {
        let armed = |condition: &Option<KineticCondition>| {
            condition
                .as_ref()
                .is_some_and(|c| c.test(j, attacker_speed, relative_speed, factor))
        };
        StabEffects {
            damage: armed(&self.damage_conditions),
            knockback: armed(&self.knockback_conditions),
            dismount: armed(&self.dismount_conditions),
        }
    }

    /// Damage of a stab at `relative_speed`.
    #[must_use]
    pub fn stab_damage(&self, base_damage: f32, relative_speed: f32) -> f32 {
        base_damage + (relative_speed * self.damage_multiplier).floor()
    }

    /// Starts a use: lunges the wielder forward and plays the use sound.
    pub fn start_using<W: CombatWorld + ?Sized>(&self, world: &mut W, wielder_id: EntityId) {
        let Some(wielder) = world.entity(wielder_id) else {
            return;
        };
        let push = horizontal(wielder.view) * self.forward_movement;
        if push != Vec3::ZERO {
            world.apply_impulse(wielder.id, push);
        }
        if let Some(sound) = &self.sound {
            world.play_sound(wielder.eye_position(), sound, 1.0, 1.0);
        }
    }

    /// Runs one tick of an ongoing use.
    pub fn damage_entities<W: CombatWorld + ?Sized>(
        &self,
        world: &mut W,
        attacker_id: EntityId,
        range: &AttackRange,
        active: &KineticUse,
        ledger: &mut StabLedger,
    ) -> KineticTickReport {
        let ticks_used = active.ticks_used();
        if ticks_used < self.delay_ticks {
            return KineticTickReport::default();
        }
        let j = ticks_used - self.delay_ticks;

        let Some(attacker) = world.entity(attacker_id) else {
            warn!(attacker = %attacker_id, "kinetic tick for unknown entity");
            return KineticTickReport::default();
        };

        let view = attacker.view;
        let attacker_speed = view.dot(attacker.known_velocity);
        let factor = self.speed_factor(&attacker);
        let now = world.game_time();
        let cooldown = u64::from(self.contact_cooldown_ticks);

        let candidates = {
            let world_ref: &W = world;
            range
                .hit_entities_along(&attacker, world_ref, &|target| {
                    PiercingWeapon::can_hit_entity(world_ref, &attacker, target)
                })
                .into_entities()
        };

        let base_damage = world.attribute_value(attacker.id, Attribute::AttackDamage);
        let mut report = KineticTickReport {
            live_ticks: Some(j),
            ..KineticTickReport::default()
        };

        for hit in candidates {
            let target = hit.target;
            if ledger.was_recently_stabbed(target.id, now, cooldown) {
                trace!(target = %target.id, "recently stabbed, skipping");
                report.skipped += 1;
                continue;
            }
            ledger.remember(target.id, now, target.living);

            let relative_speed = (attacker_speed - view.dot(target.known_velocity)).max(0.0);
            let effects = self.evaluate(j, attacker_speed, relative_speed, factor);
            trace!(target = %target.id, attacker_speed, relative_speed, ?effects, "gates evaluated");
            if !effects.any() {
                continue;
            }

            let damage = self.stab_damage(base_damage, relative_speed);
            let outcome = stab_attack(world, &attacker, &target, damage, effects);
            if outcome.landed() {
                report.hits.push(outcome);
            }
        }

        if !report.hits.is_empty() {
            world.spawn_hit_particles(attacker.id);
            if let Some(sound) = &self.hit_sound {
                world.play_sound(attacker.eye_position(), sound, 1.0, 1.0);
            }
            world.damage_item(attacker.id, active.slot, active.durability_cost);
            if attacker.is_player() {
                let stabbed = ledger.recent_living(now, cooldown);
                world.report_multi_stab(attacker.id, &stabbed);
            }
            debug!(attacker = %attacker.id, j, hits = report.hits.len(), "kinetic tick landed");
        }
        report
    }

    /// Validates thresholds.
    pub fn validate(&self, owner: &str) -> DefinitionResult<()> {
        for (label, condition) in [
            ("dismount", &self.dismount_conditions),
            ("knockback", &self.knockback_conditions),
            ("damage", &self.damage_conditions),
        ] {
            if let Some(condition) = condition {
                condition.validate(owner, label)?;
            }
        }
        if !(0.0..).contains(&self.damage_multiplier) {
            return Err(DefinitionError::Validation(format!(
                "{owner}: kinetic damage_multiplier must be non-negative"
            )));
        }
        if !(0.0..=1.0).contains(&self.mob_speed_factor) {
            return Err(DefinitionError::Validation(format!(
                "{owner}: kinetic mob_speed_factor {} outside [0, 1]",
                self.mob_speed_factor
            )));
        }
        if !self.forward_movement.is_finite() {
            return Err(DefinitionError::Validation(format!(
                "{owner}: kinetic forward_movement must be finite"
            )));
        }
        Ok(())
    }
}
