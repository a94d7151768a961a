//! Collaborator interfaces consumed by combat resolution.
//!
//! Combat never owns the world. It reads entity snapshots and terrain through
//! [`WorldQuery`], mutates health, motion, items and cooldowns through
//! [`CombatStorage`], and reports sounds and telemetry through
//! [`FeedbackSink`]. [`crate::arena::Arena`] implements all three in memory.

use glam::{IVec3, Vec3};
use riposte_common::{Aabb, Direction, EntityId, ItemTypeId};
use serde::{Deserialize, Serialize};

use crate::damage::DamageSource;

/// Default entity width in blocks.
pub const DEFAULT_WIDTH: f32 = 0.6;
/// Default entity height in blocks.
pub const DEFAULT_HEIGHT: f32 = 1.8;
/// Default eye height above the feet.
pub const DEFAULT_EYE_HEIGHT: f32 = 1.62;

/// Player game mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Normal play.
    Survival,
    /// Building mode with extended reach.
    Creative,
    /// Map-restricted play.
    Adventure,
    /// Non-interacting observer.
    Spectator,
}

/// Whether an entity is a player (and in which mode) or a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRole {
    /// A player in the given game mode.
    Player(GameMode),
    /// Any non-player entity.
    Mob,
}

/// Numeric attributes combat reads from the attribute system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Damage dealt per hit.
    AttackDamage,
    /// Swings per second.
    AttackSpeed,
    /// Fraction of knockback ignored (0.0-1.0).
    KnockbackResistance,
    /// Reach used when no weapon overrides it.
    InteractionRange,
}

impl Attribute {
    /// Value used when an entity has no explicit value.
    #[must_use]
    pub const fn default_value(self) -> f32 {
        match self {
            Self::AttackDamage => 1.0,
            Self::AttackSpeed => 4.0,
            Self::KnockbackResistance => 0.0,
            Self::InteractionRange => 3.0,
        }
    }
}

/// Equipment slot holding an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    /// Primary hand.
    MainHand,
    /// Secondary hand.
    OffHand,
}

/// Reference to a sound event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(String);

impl SoundId {
    /// Creates a sound reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the sound name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Group of items sharing one use cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownGroup(String);

impl CooldownGroup {
    /// Creates a cooldown group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Snapshot of an entity as seen by combat resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatEntity {
    /// Entity identity.
    pub id: EntityId,
    /// Player or mob.
    pub role: EntityRole,
    /// Feet position this tick.
    pub position: Vec3,
    /// Feet position last tick (for interpolation).
    pub previous_position: Vec3,
    /// Eye height above the feet.
    pub eye_height: f32,
    /// Hitbox width.
    pub width: f32,
    /// Hitbox height.
    pub height: f32,
    /// Unit view vector.
    pub view: Vec3,
    /// Velocity as last replicated (blocks per tick).
    pub known_velocity: Vec3,
    /// Whether the entity is alive.
    pub alive: bool,
    /// Whether the entity ignores all damage.
    pub invulnerable: bool,
    /// Whether attacks can strike this entity at all.
    pub pickable: bool,
    /// Whether this is a living entity (has health).
    pub living: bool,
    /// Entity currently ridden, if any.
    pub vehicle: Option<EntityId>,
}

impl CombatEntity {
    /// Creates a living entity with default dimensions, looking south.
    #[must_use]
    pub fn new(role: EntityRole, position: Vec3) -> Self {
        Self {
            id: EntityId::new(),
            role,
            position,
            previous_position: position,
            eye_height: DEFAULT_EYE_HEIGHT,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            view: Vec3::Z,
            known_velocity: Vec3::ZERO,
            alive: true,
            invulnerable: false,
            pickable: true,
            living: true,
            vehicle: None,
        }
    }

    /// Creates a player in the given mode.
    #[must_use]
    pub fn player(mode: GameMode, position: Vec3) -> Self {
        Self::new(EntityRole::Player(mode), position)
    }

    /// Creates a mob.
    #[must_use]
    pub fn mob(position: Vec3) -> Self {
        Self::new(EntityRole::Mob, position)
    }

    /// Sets the view vector (normalized).
    #[must_use]
    pub fn with_view(mut self, view: Vec3) -> Self {
        self.view = view.normalize_or_zero();
        self
    }

    /// Sets the known velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.known_velocity = velocity;
        self
    }

    /// Sets the ridden vehicle.
    #[must_use]
    pub fn riding(mut self, vehicle: EntityId) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    /// Checks if this entity is a player.
    #[must_use]
    pub fn is_player(&self) -> bool {
        matches!(self.role, EntityRole::Player(_))
    }

    /// Game mode, for players.
    #[must_use]
    pub fn game_mode(&self) -> Option<GameMode> {
        match self.role {
            EntityRole::Player(mode) => Some(mode),
            EntityRole::Mob => None,
        }
    }

    /// Eye position this tick.
    #[must_use]
    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::Y * self.eye_height
    }

    /// Eye position interpolated between last tick and this tick.
    #[must_use]
    pub fn eye_position_at(&self, partial_tick: f32) -> Vec3 {
        self.previous_position.lerp(self.position, partial_tick) + Vec3::Y * self.eye_height
    }

    /// Current hitbox.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_feet(self.position, self.width, self.height)
    }

    /// Checks if this entity rides something.
    #[must_use]
    pub fn is_passenger(&self) -> bool {
        self.vehicle.is_some()
    }

    /// Checks if both entities share the same root vehicle.
    #[must_use]
    pub fn is_passenger_of_same_vehicle(&self, other: &CombatEntity) -> bool {
        let root = self.vehicle.unwrap_or(self.id);
        let other_root = other.vehicle.unwrap_or(other.id);
        root == other_root
    }
}

/// A terrain hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockHit {
    /// Exact hit point.
    pub location: Vec3,
    /// Face of the block that was struck.
    pub face: Direction,
    /// Block cell.
    pub cell: IVec3,
}

/// Spatial queries against terrain and entities.
pub trait WorldQuery {
    /// Current simulation tick.
    fn game_time(&self) -> u64;

    /// Casts a ray against block outlines.
    fn ray_cast_terrain(&self, origin: Vec3, direction: Vec3, max_distance: f32)
        -> Option<BlockHit>;

    /// Returns entities whose hitbox overlaps `volume` and passes `predicate`.
    fn entities_intersecting(
        &self,
        volume: &Aabb,
        predicate: &dyn Fn(&CombatEntity) -> bool,
    ) -> Vec<CombatEntity>;

    /// Looks up an entity snapshot.
    fn entity(&self, id: EntityId) -> Option<CombatEntity>;

    /// Player-vs-player harm rule (teams, server pvp flag).
    fn can_harm_player(&self, attacker: &CombatEntity, target: &CombatEntity) -> bool {
        let _ = (attacker, target);
        true
    }
}

/// Attribute access and world mutation used while applying combat effects.
pub trait CombatStorage {
    /// Current attribute value including modifiers.
    fn attribute_value(&self, entity: EntityId, attribute: Attribute) -> f32;

    /// Deals damage. Returns whether the target was actually hurt.
    fn hurt(&mut self, target: EntityId, source: &DamageSource, amount: f32) -> bool;

    /// Adds an impulse to an entity's velocity.
    fn apply_impulse(&mut self, target: EntityId, impulse: Vec3);

    /// Forces an entity off its vehicle.
    fn stop_riding(&mut self, target: EntityId);

    /// Reduces durability of the item in `slot` by `amount`.
    fn damage_item(&mut self, owner: EntityId, slot: EquipmentSlot, amount: u32);

    /// Puts an item cooldown group on cooldown.
    fn add_cooldown(&mut self, owner: EntityId, group: &CooldownGroup, ticks: u32);

    /// Forces an entity to release the item it is using.
    fn stop_using_item(&mut self, owner: EntityId);

    /// Awards the "item used" statistic.
    fn award_item_used(&mut self, owner: EntityId, item: ItemTypeId);

    /// Resets the attacker's time-since-last-attack.
    fn on_attack(&mut self, attacker: EntityId);
}

/// Sound, particle and telemetry output.
pub trait FeedbackSink {
    /// Plays a sound at a location.
    fn play_sound(&mut self, location: Vec3, sound: &SoundId, volume: f32, pitch: f32);

    /// Spawns hit particles around an entity.
    fn spawn_hit_particles(&mut self, entity: EntityId);

    /// Plays the swing animation.
    fn swing(&mut self, entity: EntityId, slot: EquipmentSlot);

    /// Reports the entities one attacker stabbed during a lunge.
    fn report_multi_stab(&mut self, attacker: EntityId, targets: &[EntityId]);

    /// Uniform random value in `[0, 1)` for pitch jitter.
    fn random_unit(&mut self) -> f32;
}

/// Everything combat resolution needs from the host world.
pub trait CombatWorld: WorldQuery + CombatStorage + FeedbackSink {}

impl<T: WorldQuery + CombatStorage + FeedbackSink> CombatWorld for T {}
