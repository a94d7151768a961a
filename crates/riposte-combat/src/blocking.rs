//! Defender blocking lifecycle and the full blocked-hit pipeline.
//!
//! A defender raising a blocking item goes `Idle → Raising → Blocking`. A
//! strong melee hit against the block puts it in `Disabled` until the item
//! cooldown runs out, after which it is `Idle` again.

use std::f32::consts::PI;

use glam::Vec3;
use riposte_common::{horizontal, ItemTypeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks_attacks::BlocksAttacks;
use crate::damage::DamageSource;
use crate::strike::WeaponStats;
use crate::world::{CombatEntity, CombatWorld, CooldownGroup, EquipmentSlot};

/// Phase of a defender's block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingPhase {
    /// Not blocking.
    #[default]
    Idle,
    /// Item raised; the block takes effect once `ticks_left` reaches zero.
    Raising {
        /// Ticks until the block is effective.
        ticks_left: u32,
    },
    /// Block in effect.
    Blocking,
    /// Knocked out of blocking; cannot raise again yet.
    Disabled {
        /// Ticks until the defender may raise again.
        ticks_left: u32,
    },
}

/// Blocking lifecycle of one defender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingState {
    phase: BlockingPhase,
}

impl BlockingState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BlockingPhase {
        self.phase
    }

    /// Checks if the block is in effect.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.phase == BlockingPhase::Blocking
    }

    /// Raises the item. Returns `false` while disabled.
    pub fn raise(&mut self, delay_ticks: u32) -> bool {
        match self.phase {
            BlockingPhase::Idle => {
                self.phase = if delay_ticks == 0 {
                    BlockingPhase::Blocking
                } else {
                    BlockingPhase::Raising {
                        ticks_left: delay_ticks,
                    }
                };
                true
            },
            BlockingPhase::Raising { .. } | BlockingPhase::Blocking => true,
            BlockingPhase::Disabled { .. } => false,
        }
    }

    /// Lowers the item. A disabled block stays disabled.
    pub fn lower(&mut self) {
        if matches!(self.phase, BlockingPhase::Raising { .. } | BlockingPhase::Blocking) {
            self.phase = BlockingPhase::Idle;
        }
    }

    /// Advances one tick.
    pub fn tick(&mut self) {
        self.phase = match self.phase {
            BlockingPhase::Raising { ticks_left } if ticks_left <= 1 => BlockingPhase::Blocking,
            BlockingPhase::Raising { ticks_left } => BlockingPhase::Raising {
                ticks_left: ticks_left - 1,
            },
            BlockingPhase::Disabled { ticks_left } if ticks_left <= 1 => BlockingPhase::Idle,
            BlockingPhase::Disabled { ticks_left } => BlockingPhase::Disabled {
                ticks_left: ticks_left - 1,
            },
            phase => phase,
        };
    }

    /// Disables the block for `ticks`. Zero leaves the state alone.
    pub fn disable(&mut self, ticks: u32) {
        if ticks > 0 {
            self.phase = BlockingPhase::Disabled { ticks_left: ticks };
        }
    }
}

/// Horizontal angle in radians between the defender's facing and the
/// direction to the damage source. `π` when the source has no position
/// or the defender looks straight up or down.
#[must_use]
pub fn strike_angle(defender: &CombatEntity, source: &DamageSource) -> f32 {
    let Some(at) = source.source_position else {
        return PI;
    };
    let facing = horizontal(defender.view);
    if facing == Vec3::ZERO {
        return PI;
    }
    let to_source = horizontal(at - defender.position);
    facing.dot(to_source).max(-1.0).min(1.0).acos()
}

/// The item a defender blocks with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingItem {
    /// Slot holding the item.
    pub slot: EquipmentSlot,
    /// Item type, for statistics.
    pub item_type: ItemTypeId,
    /// Cooldown group put on cooldown when the block is disabled.
    pub cooldown_group: CooldownGroup,
}

/// What a block did to an incoming hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BlockOutcome {
    /// Damage absorbed.
    pub absorbed: f32,
    /// Ticks the block was disabled for (0 if not disabled).
    pub disabled_ticks: u32,
    /// The damage kind ignores this block.
    pub bypassed: bool,
}

/// Runs an incoming hit against an active block.
///
/// `attacker_weapon` is the stats of the weapon the direct attacker holds;
/// its `disable_blocking_for_seconds` decides whether a melee hit disables
/// the block.
pub fn apply_item_blocking<W: CombatWorld + ?Sized>(
    world: &mut W,
    defender: &CombatEntity,
    blocks: &BlocksAttacks,
    item: &BlockingItem,
    source: &DamageSource,
    amount: f32,
    attacker_weapon: Option<&WeaponStats>,
) -> BlockOutcome {
    if amount <= 0.0 {
        return BlockOutcome::default();
    }
    if blocks.is_bypassed_by(source) {
        return BlockOutcome {
            bypassed: true,
            ..BlockOutcome::default()
        };
    }

    let angle = strike_angle(defender, source);
    let absorbed = blocks.resolve_blocked_damage(source, amount, angle);
    blocks.hurt_blocking_item(world, defender.id, item.item_type, item.slot, absorbed);

    let mut outcome = BlockOutcome {
        absorbed,
        ..BlockOutcome::default()
    };
    if absorbed <= 0.0 {
        return outcome;
    }

    blocks.on_blocked(world, defender.id);
    if !source.is_projectile() {
        let melee_attacker = source
            .direct
            .and_then(|id| world.entity(id))
            .filter(|attacker| attacker.living);
        let seconds = attacker_weapon.map_or(0.0, |weapon| weapon.disable_blocking_for_seconds);
        if melee_attacker.is_some() && seconds > 0.0 {
            outcome.disabled_ticks = blocks.disable(world, defender.id, seconds, &item.cooldown_group);
        }
    }

    debug!(
        defender = %defender.id,
        amount,
        absorbed,
        angle_degrees = angle.to_degrees(),
        disabled_ticks = outcome.disabled_ticks,
        "hit blocked"
    );
    outcome
}
