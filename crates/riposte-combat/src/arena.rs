//! In-memory combat world.
//!
//! [`Arena`] implements [`WorldQuery`], [`CombatStorage`] and
//! [`FeedbackSink`] over plain tables: a voxel terrain of unit cubes, an
//! entity table, attributes, health, durability, cooldowns and a log of
//! every feedback event. It backs the simulator and the unit tests.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use glam::{IVec3, Vec3};
use riposte_common::{Aabb, Direction, EntityId, ItemTypeId};
use serde::Serialize;
use tracing::{debug, trace};

use crate::blocking::{apply_item_blocking, BlockingItem, BlockingState};
use crate::blocks_attacks::BlocksAttacks;
use crate::damage::DamageSource;
use crate::strike::WeaponStats;
use crate::world::{
    Attribute, BlockHit, CombatEntity, CombatStorage, CooldownGroup, EquipmentSlot, FeedbackSink,
    SoundId, WorldQuery,
};

/// Health of a freshly spawned entity.
pub const DEFAULT_HEALTH: f32 = 20.0;

/// Fraction of velocity kept from one tick to the next.
pub const VELOCITY_DAMPING: f32 = 0.8;

/// Direction components smaller than this are treated as zero by the raycast.
const RAY_EPSILON: f32 = 1.0e-7;

// ============================================================================
// Feedback
// ============================================================================

/// A sound, particle, animation or telemetry event emitted during combat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedbackEvent {
    /// A sound was played.
    Sound {
        /// Tick it was played on.
        tick: u64,
        /// Where.
        location: Vec3,
        /// Which sound.
        sound: SoundId,
        /// Volume.
        volume: f32,
        /// Pitch.
        pitch: f32,
    },
    /// Hit particles around an entity.
    HitParticles {
        /// Tick.
        tick: u64,
        /// Entity the particles surround.
        entity: EntityId,
    },
    /// Swing animation.
    Swing {
        /// Tick.
        tick: u64,
        /// Entity swinging.
        entity: EntityId,
        /// Hand used.
        slot: EquipmentSlot,
    },
    /// Multi-target lunge report.
    MultiStab {
        /// Tick.
        tick: u64,
        /// Lunging entity.
        attacker: EntityId,
        /// Living entities it stabbed recently.
        targets: Vec<EntityId>,
    },
}

// ============================================================================
// Guards
// ============================================================================

/// A blocking item held by an arena entity, with its lifecycle.
#[derive(Debug, Clone)]
pub struct Guard {
    /// Blocking policy of the item.
    pub blocks: BlocksAttacks,
    /// The item itself.
    pub item: BlockingItem,
    /// Lifecycle state.
    pub state: BlockingState,
}

// ============================================================================
// Arena
// ============================================================================

/// In-memory world for combat resolution.
#[derive(Debug)]
pub struct Arena {
    tick: u64,
    entities: BTreeMap<EntityId, CombatEntity>,
    solid: AHashSet<IVec3>,
    attributes: AHashMap<(EntityId, Attribute), f32>,
    health: AHashMap<EntityId, f32>,
    durability_used: AHashMap<(EntityId, EquipmentSlot), u32>,
    cooldowns: AHashMap<(EntityId, CooldownGroup), u64>,
    using_item: AHashSet<EntityId>,
    items_used: AHashMap<(EntityId, ItemTypeId), u32>,
    last_attack: AHashMap<EntityId, u64>,
    guards: AHashMap<EntityId, Guard>,
    weapons: AHashMap<EntityId, WeaponStats>,
    pvp: bool,
    feedback: Vec<FeedbackEvent>,
    rng: fastrand::Rng,
}

impl Arena {
    /// Creates an empty arena. `seed` drives sound pitch jitter.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            entities: BTreeMap::new(),
            solid: AHashSet::new(),
            attributes: AHashMap::new(),
            health: AHashMap::new(),
            durability_used: AHashMap::new(),
            cooldowns: AHashMap::new(),
            using_item: AHashSet::new(),
            items_used: AHashMap::new(),
            last_attack: AHashMap::new(),
            guards: AHashMap::new(),
            weapons: AHashMap::new(),
            pvp: true,
            feedback: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    // --- terrain ---

    /// Marks a cell solid.
    pub fn set_solid(&mut self, cell: IVec3) {
        self.solid.insert(cell);
    }

    /// Marks every cell in the inclusive box `min..=max` solid.
    pub fn fill_solid(&mut self, min: IVec3, max: IVec3) {
        let (lo, hi) = (min.min(max), min.max(max));
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    self.solid.insert(IVec3::new(x, y, z));
                }
            }
        }
    }

    /// Checks if a cell is solid.
    #[must_use]
    pub fn is_solid(&self, cell: IVec3) -> bool {
        self.solid.contains(&cell)
    }

    // --- entities ---

    /// Adds an entity with full health. Returns its id.
    pub fn spawn(&mut self, entity: CombatEntity) -> EntityId {
        let id = entity.id;
        self.health.insert(id, DEFAULT_HEALTH);
        self.entities.insert(id, entity);
        trace!(entity = %id, "spawned");
        id
    }

    /// Removes an entity and everything attached to it.
    pub fn despawn(&mut self, id: EntityId) -> Option<CombatEntity> {
        self.health.remove(&id);
        self.guards.remove(&id);
        self.weapons.remove(&id);
        self.using_item.remove(&id);
        self.last_attack.remove(&id);
        self.entities.remove(&id)
    }

    /// Mutable access to an entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut CombatEntity> {
        self.entities.get_mut(&id)
    }

    /// Ids of every entity, in order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Current health.
    #[must_use]
    pub fn health(&self, id: EntityId) -> Option<f32> {
        self.health.get(&id).copied()
    }

    /// Overrides health. Zero or less kills the entity.
    pub fn set_health(&mut self, id: EntityId, value: f32) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.alive = value > 0.0;
            self.health.insert(id, value);
        }
    }

    /// Current velocity.
    #[must_use]
    pub fn velocity(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(&id).map(|e| e.known_velocity)
    }

    /// Overrides velocity.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec3) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.known_velocity = velocity;
        }
    }

    /// Sets an attribute value.
    pub fn set_attribute(&mut self, id: EntityId, attribute: Attribute, value: f32) {
        self.attributes.insert((id, attribute), value);
    }

    /// Enables or disables player-vs-player damage.
    pub fn set_pvp(&mut self, enabled: bool) {
        self.pvp = enabled;
    }

    // --- items ---

    /// Equips a weapon's stats on an entity.
    pub fn equip_weapon(&mut self, id: EntityId, weapon: WeaponStats) {
        self.weapons.insert(id, weapon);
    }

    /// Equips a blocking item. It starts lowered.
    pub fn equip_guard(&mut self, id: EntityId, blocks: BlocksAttacks, item: BlockingItem) {
        self.guards.insert(
            id,
            Guard {
                blocks,
                item,
                state: BlockingState::new(),
            },
        );
    }

    /// Raises the blocking item. Fails while it is on cooldown or disabled.
    pub fn raise_guard(&mut self, id: EntityId) -> bool {
        let Some(guard) = self.guards.get(&id) else {
            return false;
        };
        if self.cooldown_remaining(id, &guard.item.cooldown_group) > 0 {
            return false;
        }
        let Some(guard) = self.guards.get_mut(&id) else {
            return false;
        };
        let delay = guard.blocks.block_delay_ticks();
        let raised = guard.state.raise(delay);
        if raised {
            self.using_item.insert(id);
        }
        raised
    }

    /// Lowers the blocking item.
    pub fn lower_guard(&mut self, id: EntityId) {
        if let Some(guard) = self.guards.get_mut(&id) {
            guard.state.lower();
        }
        self.using_item.remove(&id);
    }

    /// Blocking state of an entity's guard.
    #[must_use]
    pub fn guard_state(&self, id: EntityId) -> Option<BlockingState> {
        self.guards.get(&id).map(|guard| guard.state)
    }

    /// Marks an entity as using its held item.
    pub fn start_using_item(&mut self, id: EntityId) {
        self.using_item.insert(id);
    }

    /// Checks if an entity is using an item.
    #[must_use]
    pub fn is_using_item(&self, id: EntityId) -> bool {
        self.using_item.contains(&id)
    }

    /// Durability lost by the item in a slot so far.
    #[must_use]
    pub fn durability_used(&self, id: EntityId, slot: EquipmentSlot) -> u32 {
        self.durability_used.get(&(id, slot)).copied().unwrap_or(0)
    }

    /// Ticks left on a cooldown group.
    #[must_use]
    pub fn cooldown_remaining(&self, id: EntityId, group: &CooldownGroup) -> u32 {
        self.cooldowns
            .get(&(id, group.clone()))
            .map_or(0, |&until| until.saturating_sub(self.tick) as u32)
    }

    /// "Item used" statistic.
    #[must_use]
    pub fn items_used(&self, id: EntityId, item: ItemTypeId) -> u32 {
        self.items_used.get(&(id, item)).copied().unwrap_or(0)
    }

    /// Tick of the entity's last attack.
    #[must_use]
    pub fn last_attack_tick(&self, id: EntityId) -> Option<u64> {
        self.last_attack.get(&id).copied()
    }

    // --- feedback ---

    /// Every feedback event so far.
    #[must_use]
    pub fn feedback(&self) -> &[FeedbackEvent] {
        &self.feedback
    }

    /// Drains the feedback log.
    pub fn take_feedback(&mut self) -> Vec<FeedbackEvent> {
        std::mem::take(&mut self.feedback)
    }

    /// Number of times a sound was played.
    #[must_use]
    pub fn sound_count(&self, name: &str) -> usize {
        self.feedback
            .iter()
            .filter(|event| matches!(event, FeedbackEvent::Sound { sound, .. } if sound.as_str() == name))
            .count()
    }

    // --- time ---

    /// Advances one tick: moves entities, damps velocity, ticks guards.
    pub fn advance(&mut self) {
        for entity in self.entities.values_mut() {
            entity.previous_position = entity.position;
            entity.position += entity.known_velocity;
            entity.known_velocity *= VELOCITY_DAMPING;
        }
        self.skip_ticks(1);
    }

    /// Advances the clock without moving anything.
    pub fn skip_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick += 1;
            for guard in self.guards.values_mut() {
                guard.state.tick();
            }
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(0)
    }
}

// ============================================================================
// Collaborator implementations
// ============================================================================

impl WorldQuery for Arena {
    fn game_time(&self) -> u64 {
        self.tick
    }

    fn ray_cast_terrain(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<BlockHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || self.solid.is_empty() {
            return None;
        }

        let mut cell = origin.floor().as_ivec3();
        let mut step = IVec3::ZERO;
        let mut t_delta = Vec3::splat(f32::INFINITY);
        let mut t_max = Vec3::splat(f32::INFINITY);
        for axis in 0..3 {
            let d = dir[axis];
            if d.abs() < RAY_EPSILON {
                continue;
            }
            let boundary = if d > 0.0 {
                cell[axis] as f32 + 1.0
            } else {
                cell[axis] as f32
            };
            step[axis] = if d > 0.0 { 1 } else { -1 };
            t_delta[axis] = 1.0 / d.abs();
            t_max[axis] = ((boundary - origin[axis]) / d).max(0.0);
        }

        // Starting inside a block hits at the origin
        let mut face = Direction::approximate_nearest(-dir);
        let mut t = 0.0;
        loop {
            if self.solid.contains(&cell) {
                return Some(BlockHit {
                    location: origin + dir * t,
                    face,
                    cell,
                });
            }

            let axis = if t_max.x < t_max.y {
                if t_max.x < t_max.z {
                    0
                } else {
                    2
                }
            } else if t_max.y < t_max.z {
                1
            } else {
                2
            };
            t = t_max[axis];
            if t > max_distance {
                return None;
            }
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];
            face = Direction::entry_face(axis, step[axis] > 0);
        }
    }

    fn entities_intersecting(
        &self,
        volume: &Aabb,
        predicate: &dyn Fn(&CombatEntity) -> bool,
    ) -> Vec<CombatEntity> {
        self.entities
            .values()
            .filter(|entity| entity.bounding_box().overlaps(volume) && predicate(entity))
            .copied()
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<CombatEntity> {
        self.entities.get(&id).copied()
    }

    fn can_harm_player(&self, _attacker: &CombatEntity, _target: &CombatEntity) -> bool {
        self.pvp
    }
}

impl CombatStorage for Arena {
    fn attribute_value(&self, entity: EntityId, attribute: Attribute) -> f32 {
        self.attributes
            .get(&(entity, attribute))
            .copied()
            .unwrap_or_else(|| attribute.default_value())
    }

    fn hurt(&mut self, target: EntityId, source: &DamageSource, amount: f32) -> bool {
        let Some(entity) = self.entities.get(&target).copied() else {
            return false;
        };
        if !entity.alive || entity.invulnerable || amount <= 0.0 {
            return false;
        }

        let mut dealt = amount;
        let raised = self
            .guards
            .get(&target)
            .filter(|guard| guard.state.is_blocking())
            .map(|guard| (guard.blocks.clone(), guard.item.clone()));
        if let Some((blocks, item)) = raised {
            let weapon = source
                .direct
                .and_then(|id| self.weapons.get(&id))
                .copied();
            let outcome = apply_item_blocking(self, &entity, &blocks, &item, source, amount, weapon.as_ref());
            dealt -= outcome.absorbed;
            if outcome.disabled_ticks > 0 {
                if let Some(guard) = self.guards.get_mut(&target) {
                    guard.state.disable(outcome.disabled_ticks);
                }
            }
        }
        if dealt <= 0.0 {
            return false;
        }

        let health = self.health.entry(target).or_insert(DEFAULT_HEALTH);
        *health -= dealt;
        let died = *health <= 0.0;
        if died {
            if let Some(entity) = self.entities.get_mut(&target) {
                entity.alive = false;
            }
        }
        debug!(target = %target, kind = ?source.kind, dealt, died, "entity hurt");
        true
    }

    fn apply_impulse(&mut self, target: EntityId, impulse: Vec3) {
        if let Some(entity) = self.entities.get_mut(&target) {
            entity.known_velocity += impulse;
        }
    }

    fn stop_riding(&mut self, target: EntityId) {
        if let Some(entity) = self.entities.get_mut(&target) {
            entity.vehicle = None;
        }
    }

    fn damage_item(&mut self, owner: EntityId, slot: EquipmentSlot, amount: u32) {
        let used = self.durability_used.entry((owner, slot)).or_insert(0);
        *used = used.saturating_add(amount);
    }

    fn add_cooldown(&mut self, owner: EntityId, group: &CooldownGroup, ticks: u32) {
        let until = self.tick + u64::from(ticks);
        let entry = self.cooldowns.entry((owner, group.clone())).or_insert(until);
        *entry = (*entry).max(until);
    }

    fn stop_using_item(&mut self, owner: EntityId) {
        self.lower_guard(owner);
    }

    fn award_item_used(&mut self, owner: EntityId, item: ItemTypeId) {
        *self.items_used.entry((owner, item)).or_insert(0) += 1;
    }

    fn on_attack(&mut self, attacker: EntityId) {
        self.last_attack.insert(attacker, self.tick);
    }
}

impl FeedbackSink for Arena {
    fn play_sound(&mut self, location: Vec3, sound: &SoundId, volume: f32, pitch: f32) {
        self.feedback.push(FeedbackEvent::Sound {
            tick: self.tick,
            location,
            sound: sound.clone(),
            volume,
            pitch,
        });
    }

    fn spawn_hit_particles(&mut self, entity: EntityId) {
        self.feedback.push(FeedbackEvent::HitParticles {
            tick: self.tick,
            entity,
        });
    }

    fn swing(&mut self, entity: EntityId, slot: EquipmentSlot) {
        self.feedback.push(FeedbackEvent::Swing {
            tick: self.tick,
            entity,
            slot,
        });
    }

    fn report_multi_stab(&mut self, attacker: EntityId, targets: &[EntityId]) {
        self.feedback.push(FeedbackEvent::MultiStab {
            tick: self.tick,
            attacker,
            targets: targets.to_vec(),
        });
    }

    fn random_unit(&mut self) -> f32 {
        self.rng.f32()
    }
}
