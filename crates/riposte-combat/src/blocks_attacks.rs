//! Defender-side damage mitigation.
//!
//! This module provides:
//! - Ordered, angle- and type-scoped damage reduction rules
//! - Durability cost of blocked hits (with a threshold gate)
//! - Disabling a block after a strong hit (cooldown on the blocking item)
//! - Block feedback sounds with pitch jitter

use riposte_common::{EntityId, ItemTypeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::damage::{DamageKind, DamageSource, DamageTypeFilter};
use crate::definitions::{DefinitionError, DefinitionResult};
use crate::world::{CombatWorld, CooldownGroup, EquipmentSlot, SoundId};

/// Ticks per second of simulation.
pub const TICKS_PER_SECOND: f32 = 20.0;

fn default_blocking_angle() -> f32 {
    90.0
}

fn one() -> f32 {
    1.0
}

fn default_reductions() -> Vec<DamageReduction> {
    vec![DamageReduction::default()]
}

/// Clamps `value` into `[0, upper]`, never below zero.
fn clamp_absorbed(value: f32, upper: f32) -> f32 {
    value.min(upper).max(0.0)
}

/// One damage reduction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageReduction {
    /// Half-angle of the blocking arc, in degrees.
    #[serde(default = "default_blocking_angle")]
    pub horizontal_blocking_angle: f32,
    /// Damage kinds this rule applies to; all when absent.
    #[serde(default)]
    pub damage_types: Option<DamageTypeFilter>,
    /// Flat absorbed amount.
    #[serde(default)]
    pub base: f32,
    /// Fraction of dealt damage absorbed.
    #[serde(default = "one")]
    pub factor: f32,
}

impl Default for DamageReduction {
    fn default() -> Self {
        Self {
            horizontal_blocking_angle: default_blocking_angle(),
            damage_types: None,
            base: 0.0,
            factor: 1.0,
        }
    }
}

impl DamageReduction {
    /// Contribution of this rule to the absorbed amount.
    #[must_use]
    pub fn resolve(&self, source: &DamageSource, dealt: f32, angle: f32) -> f32 {
        if angle > self.horizontal_blocking_angle.to_radians() {
            return 0.0;
        }
        if let Some(filter) = &self.damage_types {
            if !filter.matches(source) {
                return 0.0;
            }
        }
        clamp_absorbed(self.base + self.factor * dealt, dealt)
    }
}

/// Durability cost of a blocked hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemDamageFunction {
    /// Blocked amounts below this cost nothing.
    pub threshold: f32,
    /// Flat cost.
    pub base: f32,
    /// Cost per absorbed point.
    pub factor: f32,
}

impl Default for ItemDamageFunction {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            base: 0.0,
            factor: 1.0,
        }
    }
}

impl ItemDamageFunction {
    /// Durability lost for blocking `absorbed` damage.
    #[must_use]
    pub fn apply(&self, absorbed: f32) -> u32 {
        if absorbed < self.threshold {
            return 0;
        }
        (self.base + self.factor * absorbed).floor().max(0.0) as u32
    }
}

/// Blocking policy of an item (shields and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlocksAttacks {
    /// Seconds after raising before the block is effective.
    #[serde(default)]
    pub block_delay_seconds: f32,
    /// Scale on how long a strong hit disables the block.
    #[serde(default = "one")]
    pub disable_cooldown_scale: f32,
    /// Reduction rules, evaluated in order.
    #[serde(default = "default_reductions")]
    pub damage_reductions: Vec<DamageReduction>,
    /// Durability cost function.
    #[serde(default)]
    pub item_damage: ItemDamageFunction,
    /// Damage kinds that go straight through the block.
    #[serde(default)]
    pub bypassed_by: Option<DamageTypeFilter>,
    /// Played when a hit is blocked.
    #[serde(default)]
    pub block_sound: Option<SoundId>,
    /// Played when the block is disabled.
    #[serde(default)]
    pub disable_sound: Option<SoundId>,
}

impl Default for BlocksAttacks {
    fn default() -> Self {
        Self {
            block_delay_seconds: 0.0,
            disable_cooldown_scale: 1.0,
            damage_reductions: default_reductions(),
            item_damage: ItemDamageFunction::default(),
            bypassed_by: None,
            block_sound: None,
            disable_sound: None,
        }
    }
}

impl BlocksAttacks {
    /// Stock shield.
    #[must_use]
    pub fn shield() -> Self {
        Self {
            block_delay_seconds: 0.25,
            disable_cooldown_scale: 1.0,
            damage_reductions: vec![DamageReduction::default()],
            item_damage: ItemDamageFunction {
                threshold: 3.0,
                base: 1.0,
                factor: 1.0,
            },
            bypassed_by: Some(DamageTypeFilter::new([
                DamageKind::Fall,
                DamageKind::OnFire,
                DamageKind::Magic,
            ])),
            block_sound: Some(SoundId::new("item.shield.block")),
            disable_sound: Some(SoundId::new("item.shield.break")),
        }
    }

    /// Ticks between raising the item and the block taking effect.
    #[must_use]
    pub fn block_delay_ticks(&self) -> u32 {
        (self.block_delay_seconds * TICKS_PER_SECOND).round().max(0.0) as u32
    }

    /// Ticks a hit with `base_seconds` of disabling power disables the block.
    #[must_use]
    pub fn disable_blocking_for_ticks(&self, base_seconds: f32) -> u32 {
        (base_seconds * self.disable_cooldown_scale * TICKS_PER_SECOND)
            .round()
            .max(0.0) as u32
    }

    /// Checks if the source ignores this block.
    #[must_use]
    pub fn is_bypassed_by(&self, source: &DamageSource) -> bool {
        self.bypassed_by
            .as_ref()
            .is_some_and(|filter| filter.matches(source))
    }

    /// Damage absorbed out of `dealt`, for a strike `angle` radians off the
    /// defender's facing. Always within `[0, dealt]`.
    #[must_use]
    pub fn resolve_blocked_damage(&self, source: &DamageSource, dealt: f32, angle: f32) -> f32 {
        let total: f32 = self
            .damage_reductions
            .iter()
            .map(|rule| rule.resolve(source, dealt, angle))
            .sum();
        clamp_absorbed(total, dealt)
    }

    /// Charges the blocking item for an absorbed hit.
    pub fn hurt_blocking_item<W: CombatWorld + ?Sized>(
        &self,
        world: &mut W,
        owner: EntityId,
        item: ItemTypeId,
        slot: EquipmentSlot,
        absorbed: f32,
    ) {
        world.award_item_used(owner, item);
        let cost = self.item_damage.apply(absorbed);
        if cost > 0 {
            world.damage_item(owner, slot, cost);
        }
    }

    /// Disables the block after a strong hit. Returns the cooldown applied.
    pub fn disable<W: CombatWorld + ?Sized>(
        &self,
        world: &mut W,
        user: EntityId,
        base_seconds: f32,
        group: &CooldownGroup,
    ) -> u32 {
        let ticks = self.disable_blocking_for_ticks(base_seconds);
        if ticks > 0 {
            world.add_cooldown(user, group, ticks);
            world.stop_using_item(user);
            if let Some(sound) = &self.disable_sound {
                play_jittered(world, user, sound);
            }
            debug!(user = %user, ticks, group = group.as_str(), "block disabled");
        }
        ticks
    }

    /// Block feedback.
    pub fn on_blocked<W: CombatWorld + ?Sized>(&self, world: &mut W, entity: EntityId) {
        if let Some(sound) = &self.block_sound {
            play_jittered(world, entity, sound);
        }
    }

    /// Validates timings and rule angles.
    pub fn validate(&self, owner: &str) -> DefinitionResult<()> {
        if !(0.0..).contains(&self.block_delay_seconds) {
            return Err(DefinitionError::Validation(format!(
                "{owner}: block_delay_seconds must be non-negative"
            )));
        }
        if !(0.0..).contains(&self.disable_cooldown_scale) {
            return Err(DefinitionError::Validation(format!(
                "{owner}: disable_cooldown_scale must be non-negative"
            )));
        }
        for (index, rule) in self.damage_reductions.iter().enumerate() {
            let angle = rule.horizontal_blocking_angle;
            if !(angle > 0.0 && angle <= 180.0) {
                return Err(DefinitionError::Validation(format!(
                    "{owner}: damage_reductions[{index}] angle {angle} outside (0, 180]"
                )));
            }
        }
        if !(0.0..).contains(&self.item_damage.factor) {
            return Err(DefinitionError::Validation(format!(
                "{owner}: item_damage.factor must be non-negative"
            )));
        }
        Ok(())
    }
}

fn play_jittered<W: CombatWorld + ?Sized>(world: &mut W, entity: EntityId, sound: &SoundId) {
    let Some(location) = world.entity(entity).map(|e| e.position) else {
        return;
    };
    let pitch = 0.8 + world.random_unit() * 0.4;
    world.play_sound(location, sound, 1.0, pitch);
}
