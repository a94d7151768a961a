//! Damage sources and damage-type filters.

use glam::Vec3;
use riposte_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::world::CombatEntity;

/// Kind of damage, used by block rules and bypass filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    /// Melee hit from a player.
    PlayerAttack,
    /// Melee hit from a mob.
    MobAttack,
    /// Arrow or bolt.
    Arrow,
    /// Thrown trident.
    Trident,
    /// Other thrown projectile.
    Thrown,
    /// Explosion.
    Explosion,
    /// Burning.
    OnFire,
    /// Magic/potion damage.
    Magic,
    /// Falling.
    Fall,
    /// Anything else.
    Generic,
}

impl DamageKind {
    /// Checks if this damage comes from a projectile.
    #[must_use]
    pub const fn is_projectile(self) -> bool {
        matches!(self, Self::Arrow | Self::Trident | Self::Thrown)
    }
}

/// A set of damage kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageTypeFilter(Vec<DamageKind>);

impl DamageTypeFilter {
    /// Creates a filter from kinds.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = DamageKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// Checks membership.
    #[must_use]
    pub fn contains(&self, kind: DamageKind) -> bool {
        self.0.contains(&kind)
    }

    /// Checks if the filter matches a damage source.
    #[must_use]
    pub fn matches(&self, source: &DamageSource) -> bool {
        self.contains(source.kind)
    }

    /// Checks if the filter is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a piece of damage came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    /// Damage kind.
    pub kind: DamageKind,
    /// Entity responsible (owner of a projectile, or the attacker).
    pub attacker: Option<EntityId>,
    /// Entity that made contact (the projectile, or the attacker).
    pub direct: Option<EntityId>,
    /// World position the damage came from.
    pub source_position: Option<Vec3>,
}

impl DamageSource {
    /// Melee damage from an entity; the kind follows the attacker's role.
    #[must_use]
    pub fn melee(attacker: &CombatEntity) -> Self {
        let kind = if attacker.is_player() {
            DamageKind::PlayerAttack
        } else {
            DamageKind::MobAttack
        };
        Self {
            kind,
            attacker: Some(attacker.id),
            direct: Some(attacker.id),
            source_position: Some(attacker.position),
        }
    }

    /// Projectile damage.
    #[must_use]
    pub fn projectile(kind: DamageKind, projectile: EntityId, owner: Option<EntityId>, at: Vec3) -> Self {
        Self {
            kind,
            attacker: owner,
            direct: Some(projectile),
            source_position: Some(at),
        }
    }

    /// Damage with no entity or position behind it.
    #[must_use]
    pub const fn environmental(kind: DamageKind) -> Self {
        Self {
            kind,
            attacker: None,
            direct: None,
            source_position: None,
        }
    }

    /// Checks if this source is a projectile.
    #[must_use]
    pub fn is_projectile(&self) -> bool {
        self.kind.is_projectile()
    }
}
