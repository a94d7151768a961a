//! Strike policies and per-weapon stats.

use serde::{Deserialize, Serialize};

use crate::definitions::{DefinitionError, DefinitionResult};
use crate::kinetic_weapon::KineticWeapon;
use crate::piercing_weapon::PiercingWeapon;

fn one() -> u32 {
    1
}

/// How a weapon resolves its strikes. A weapon is exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrikePolicy {
    /// One swing hits everything along the reach segment.
    Piercing(PiercingWeapon),
    /// A charged lunge gated on time and speed.
    Kinetic(KineticWeapon),
}

impl StrikePolicy {
    /// The kinetic policy, if this is one.
    #[must_use]
    pub fn as_kinetic(&self) -> Option<&KineticWeapon> {
        match self {
            Self::Kinetic(weapon) => Some(weapon),
            Self::Piercing(_) => None,
        }
    }

    /// The piercing policy, if this is one.
    #[must_use]
    pub fn as_piercing(&self) -> Option<&PiercingWeapon> {
        match self {
            Self::Piercing(weapon) => Some(weapon),
            Self::Kinetic(_) => None,
        }
    }

    /// Validates the wrapped policy.
    pub fn validate(&self, owner: &str) -> DefinitionResult<()> {
        match self {
            Self::Piercing(_) => Ok(()),
            Self::Kinetic(weapon) => weapon.validate(owner),
        }
    }
}

/// Stats of a weapon that matter outside its strike policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Durability lost per swing (or lunge tick) that lands.
    #[serde(default = "one")]
    pub item_damage_per_attack: u32,
    /// Seconds a blocked hit from this weapon disables the block.
    #[serde(default)]
    pub disable_blocking_for_seconds: f32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            item_damage_per_attack: 1,
            disable_blocking_for_seconds: 0.0,
        }
    }
}

impl WeaponStats {
    /// Validates the stats.
    pub fn validate(&self, owner: &str) -> DefinitionResult<()> {
        if (0.0..).contains(&self.disable_blocking_for_seconds) {
            Ok(())
        } else {
            Err(DefinitionError::Validation(format!(
                "{owner}: disable_blocking_for_seconds must be non-negative"
            )))
        }
    }
}
