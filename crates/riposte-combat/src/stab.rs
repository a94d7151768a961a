//! Applying a single stab to a single target.

use glam::Vec3;
use riposte_common::{horizontal, EntityId};
use serde::Serialize;
use tracing::trace;

use crate::damage::DamageSource;
use crate::world::{Attribute, CombatEntity, CombatWorld};

/// Horizontal knockback strength of a stab.
pub const STAB_KNOCKBACK_STRENGTH: f32 = 0.4;

/// Which effects a stab should apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StabEffects {
    /// Deal damage.
    pub damage: bool,
    /// Push the target away.
    pub knockback: bool,
    /// Force the target off its vehicle.
    pub dismount: bool,
}

impl StabEffects {
    /// Every effect.
    pub const ALL: Self = Self {
        damage: true,
        knockback: true,
        dismount: true,
    };

    /// Checks if any effect is requested.
    #[must_use]
    pub fn any(&self) -> bool {
        self.damage || self.knockback || self.dismount
    }
}

/// What a stab actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StabOutcome {
    /// Target of the stab.
    pub target: EntityId,
    /// The target took damage.
    pub damaged: bool,
    /// Knockback was applied.
    pub knocked_back: bool,
    /// The target was dismounted.
    pub dismounted: bool,
}

impl StabOutcome {
    /// Checks if the stab had any effect.
    #[must_use]
    pub fn landed(&self) -> bool {
        self.damaged || self.knocked_back || self.dismounted
    }
}

/// Applies the requested effects of one stab.
///
/// Knockback pushes along the attacker's horizontal facing and is scaled
/// down by the target's knockback resistance. Dismounting only happens for
/// targets that ride something.
pub fn stab_attack<W: CombatWorld + ?Sized>(
    world: &mut W,
    attacker: &CombatEntity,
    target: &CombatEntity,
    amount: f32,
    effects: StabEffects,
) -> StabOutcome {
    let mut outcome = StabOutcome {
        target: target.id,
        damaged: false,
        knocked_back: false,
        dismounted: false,
    };

    if effects.damage {
        outcome.damaged = world.hurt(target.id, &DamageSource::melee(attacker), amount);
    }

    if effects.knockback {
        let resistance = world
            .attribute_value(target.id, Attribute::KnockbackResistance)
            .max(0.0)
            .min(1.0);
        let strength = STAB_KNOCKBACK_STRENGTH * (1.0 - resistance);
        let push = horizontal(attacker.view);
        if strength > 0.0 && push != Vec3::ZERO {
            world.apply_impulse(target.id, push * strength);
            outcome.knocked_back = true;
        }
    }

    if effects.dismount && target.is_passenger() {
        world.stop_riding(target.id);
        outcome.dismounted = true;
    }

    trace!(attacker = %attacker.id, ?outcome, "stab applied");
    outcome
}
