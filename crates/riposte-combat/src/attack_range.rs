//! Reach envelopes and hit resolution along an attacker's view ray.
//!
//! This module provides:
//! - Role-dependent reach (survival, creative, spectator, mob scaling)
//! - Point and volume range checks with a two-sided hitbox margin
//! - Closest-hit resolution against terrain and entities
//! - The multi-target query shared by piercing and kinetic weapons

use glam::Vec3;
use riposte_common::{Aabb, Direction};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::definitions::{DefinitionError, DefinitionResult};
use crate::world::{BlockHit, CombatEntity, EntityRole, GameMode, WorldQuery};

/// Largest reach a definition may declare.
pub const MAX_REACH: f32 = 64.0;

/// Extra room around the reach segment when asking the world for candidates.
const SEARCH_PADDING: f32 = 1.0;

/// Reach policy of a weapon or entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackRange {
    /// Minimum reach outside creative mode.
    pub min_range: f32,
    /// Maximum reach outside creative mode.
    pub max_range: f32,
    /// Minimum reach in creative mode.
    pub min_creative_range: f32,
    /// Maximum reach in creative mode.
    pub max_creative_range: f32,
    /// Widens the envelope on both sides to absorb hitbox imprecision.
    pub hitbox_margin: f32,
    /// Multiplier on reach for non-player attackers.
    pub mob_factor: f32,
}

impl Default for AttackRange {
    fn default() -> Self {
        Self::new(0.0, 3.0, 0.0, 5.0, 0.3, 1.0)
    }
}

/// An entity struck by a reach query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityHit {
    /// Snapshot of the entity that was hit.
    pub target: CombatEntity,
    /// Where the ray entered the (margin-inflated) hitbox.
    pub location: Vec3,
    /// Squared distance from the attacker's eye to `location`.
    pub distance_sqr: f32,
}

/// Synthetic result when nothing was struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissHit {
    /// One unit along the view vector from the eye.
    pub location: Vec3,
    /// Facing closest to the view vector.
    pub direction: Direction,
}

/// Outcome of a closest-hit query. Never absent: a miss is a value too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    /// Terrain occluded the ray.
    Block(BlockHit),
    /// The nearest entity along the ray.
    Entity(EntityHit),
    /// Nothing in reach.
    Miss(MissHit),
}

impl HitResult {
    /// Hit (or miss) location.
    #[must_use]
    pub fn location(&self) -> Vec3 {
        match self {
            Self::Block(hit) => hit.location,
            Self::Entity(hit) => hit.location,
            Self::Miss(miss) => miss.location,
        }
    }

    /// Checks if nothing was struck.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }

    /// Returns the entity hit, if any.
    #[must_use]
    pub fn entity(&self) -> Option<&EntityHit> {
        match self {
            Self::Entity(hit) => Some(hit),
            _ => None,
        }
    }
}

/// Everything struck along the reach segment.
#[derive(Debug, Clone, PartialEq)]
pub enum RayHits {
    /// Terrain came first and no entity was reachable.
    Blocked(BlockHit),
    /// Entity hits ordered nearest first (possibly empty).
    Entities(Vec<EntityHit>),
}

impl RayHits {
    /// Entity hits, or nothing when terrain blocked the ray.
    #[must_use]
    pub fn into_entities(self) -> Vec<EntityHit> {
        match self {
            Self::Blocked(_) => Vec::new(),
            Self::Entities(hits) => hits,
        }
    }
}

impl AttackRange {
    /// Creates a reach policy.
    #[must_use]
    pub const fn new(
        min_range: f32,
        max_range: f32,
        min_creative_range: f32,
        max_creative_range: f32,
        hitbox_margin: f32,
        mob_factor: f32,
    ) -> Self {
        Self {
            min_range,
            max_range,
            min_creative_range,
            max_creative_range,
            hitbox_margin,
            mob_factor,
        }
    }

    /// Reach of an entity with no weapon override, from its interaction range.
    #[must_use]
    pub const fn default_for(interaction_range: f32) -> Self {
        Self::new(0.0, interaction_range, 0.0, interaction_range, 0.0, 1.0)
    }

    /// Picks the weapon's reach when it has one, else the entity default.
    #[must_use]
    pub fn resolve(weapon: Option<&AttackRange>, interaction_range: f32) -> Self {
        weapon
            .copied()
            .unwrap_or_else(|| Self::default_for(interaction_range))
    }

    fn envelope(&self, entity: &CombatEntity) -> (f32, f32) {
        match entity.role {
            EntityRole::Player(GameMode::Creative) => {
                (self.min_creative_range, self.max_creative_range)
            },
            EntityRole::Player(GameMode::Spectator) => (0.0, self.max_range),
            EntityRole::Player(_) => (self.min_range, self.max_range),
            EntityRole::Mob => (
                self.min_range * self.mob_factor,
                self.max_range * self.mob_factor,
            ),
        }
    }

    /// Minimum reach for this entity.
    #[must_use]
    pub fn effective_min_range(&self, entity: &CombatEntity) -> f32 {
        self.envelope(entity).0
    }

    /// Maximum reach for this entity.
    #[must_use]
    pub fn effective_max_range(&self, entity: &CombatEntity) -> f32 {
        self.envelope(entity).1
    }

    fn within_envelope(&self, attacker: &CombatEntity, distance: f32, extra_buffer: f32) -> bool {
        let (min, max) = self.envelope(attacker);
        let slack = self.hitbox_margin + extra_buffer;
        distance >= min - slack && distance <= max + slack
    }

    /// Checks if a point is within reach of the attacker's eye.
    #[must_use]
    pub fn is_in_range(&self, attacker: &CombatEntity, point: Vec3) -> bool {
        let distance = attacker.eye_position().distance(point);
        self.within_envelope(attacker, distance, 0.0)
    }

    /// Checks if the nearest point of a volume is within reach.
    #[must_use]
    pub fn is_in_range_of_box(&self, attacker: &CombatEntity, volume: &Aabb, extra_buffer: f32) -> bool {
        let distance = volume.distance_to(attacker.eye_position());
        self.within_envelope(attacker, distance, extra_buffer)
    }

    /// Returns every eligible entity along the attacker's reach segment.
    ///
    /// Terrain truncates the segment; an entity behind the first block hit
    /// is never returned.
    pub fn hit_entities_along<W: WorldQuery + ?Sized>(
        &self,
        attacker: &CombatEntity,
        world: &W,
        predicate: &dyn Fn(&CombatEntity) -> bool,
    ) -> RayHits {
        self.sweep(attacker.eye_position(), attacker, world, predicate)
    }

    /// Resolves the single hit an attack at `partial_tick` lands on.
    ///
    /// Terrain in front of every entity wins; otherwise the entity hit
    /// nearest the eye wins, first found on ties. With nothing in reach the
    /// result is a miss one unit along the view vector.
    pub fn closest_hit<W: WorldQuery + ?Sized>(
        &self,
        attacker: &CombatEntity,
        partial_tick: f32,
        world: &W,
        predicate: &dyn Fn(&CombatEntity) -> bool,
    ) -> HitResult {
        let eye = attacker.eye_position_at(partial_tick);
        let result = match self.sweep(eye, attacker, world, predicate) {
            RayHits::Blocked(block) => HitResult::Block(block),
            RayHits::Entities(hits) => match hits.into_iter().next() {
                Some(hit) => HitResult::Entity(hit),
                None => HitResult::Miss(MissHit {
                    location: eye + attacker.view,
                    direction: Direction::approximate_nearest(attacker.view),
                }),
            },
        };
        debug!(attacker = %attacker.id, ?result, "resolved closest hit");
        result
    }

    fn sweep<W: WorldQuery + ?Sized>(
        &self,
        eye: Vec3,
        attacker: &CombatEntity,
        world: &W,
        predicate: &dyn Fn(&CombatEntity) -> bool,
    ) -> RayHits {
        let view = attacker.view;
        let (min, max) = self.envelope(attacker);

        let terrain = world.ray_cast_terrain(eye, view, max);
        let reach_end = terrain.map_or(max, |block| block.location.distance(eye));
        if let Some(block) = terrain {
            if reach_end < min {
                return RayHits::Blocked(block);
            }
        }

        let from = eye + view * min;
        let to = eye + view * reach_end;
        let margin = self.hitbox_margin;
        let search = Aabb::new(from, to).inflate(margin + SEARCH_PADDING);
        let attacker_id = attacker.id;
        let candidates =
            world.entities_intersecting(&search, &|e| e.id != attacker_id && predicate(e));

        let mut hits = Vec::with_capacity(candidates.len());
        for target in candidates {
            let hitbox = target.bounding_box().inflate(margin);
            let location = if hitbox.contains(from) {
                Some(from)
            } else {
                hitbox.clip(from, to).map(|clip| clip.point)
            };
            match location {
                Some(location) => {
                    trace!(target = %target.id, ?location, "ray entered hitbox");
                    hits.push(EntityHit {
                        target,
                        location,
                        distance_sqr: location.distance_squared(eye),
                    });
                },
                None => trace!(target = %target.id, "candidate off the ray"),
            }
        }

        if hits.is_empty() {
            if let Some(block) = terrain {
                return RayHits::Blocked(block);
            }
        }
        hits.sort_by(|a, b| a.distance_sqr.total_cmp(&b.distance_sqr));
        RayHits::Entities(hits)
    }

    /// Validates declared distances.
    pub fn validate(&self, owner: &str) -> DefinitionResult<()> {
        let check = |label: &str, value: f32, lo: f32, hi: f32| {
            if (lo..=hi).contains(&value) {
                Ok(())
            } else {
                Err(DefinitionError::Validation(format!(
                    "{owner}: attack_range.{label} {value} outside [{lo}, {hi}]"
                )))
            }
        };
        check("min_range", self.min_range, 0.0, MAX_REACH)?;
        check("max_range", self.max_range, 0.0, MAX_REACH)?;
        check("min_creative_range", self.min_creative_range, 0.0, MAX_REACH)?;
        check("max_creative_range", self.max_creative_range, 0.0, MAX_REACH)?;
        check("hitbox_margin", self.hitbox_margin, 0.0, 1.0)?;
        check("mob_factor", self.mob_factor, 0.0, 2.0)?;

        if self.min_range > self.max_range || self.min_creative_range > self.max_creative_range {
            return Err(DefinitionError::Validation(format!(
                "{owner}: attack_range minimum exceeds maximum"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use glam::IVec3;
    use proptest::prelude::*;

    fn survival_at_origin() -> CombatEntity {
        CombatEntity::player(GameMode::Survival, Vec3::ZERO).with_view(Vec3::X)
    }

    fn survival_at_cell_center() -> CombatEntity {
        CombatEntity::player(GameMode::Survival, Vec3::new(0.5, 0.0, 0.5)).with_view(Vec3::X)
    }

    fn scenario_range() -> AttackRange {
        AttackRange::new(0.0, 3.0, 0.0, 5.0, 0.3, 1.0)
    }

    #[test]
    fn test_effective_ranges_by_role() {
        let range = AttackRange::new(1.0, 3.0, 0.5, 5.0, 0.3, 0.5);

        let survival = CombatEntity::player(GameMode::Survival, Vec3::ZERO);
        assert_eq!(range.effective_min_range(&survival), 1.0);
        assert_eq!(range.effective_max_range(&survival), 3.0);

        let creative = CombatEntity::player(GameMode::Creative, Vec3::ZERO);
        assert_eq!(range.effective_min_range(&creative), 0.5);
        assert_eq!(range.effective_max_range(&creative), 5.0);

        let spectator = CombatEntity::player(GameMode::Spectator, Vec3::ZERO);
        assert_eq!(range.effective_min_range(&spectator), 0.0);
        assert_eq!(range.effective_max_range(&spectator), 3.0);

        let mob = CombatEntity::mob(Vec3::ZERO);
        assert_eq!(range.effective_min_range(&mob), 0.5);
        assert_eq!(range.effective_max_range(&mob), 1.5);
    }

    #[test]
    fn test_survival_player_reach_scenario() {
        let range = scenario_range();
        let attacker = survival_at_origin();
        let eye = attacker.eye_position();

        assert!(range.is_in_range(&attacker, eye + Vec3::X * 3.2));
        assert!(!range.is_in_range(&attacker, eye + Vec3::X * 3.4));
    }

    #[test]
    fn test_point_at_max_is_in_range() {
        let range = scenario_range();
        let attacker = survival_at_origin();
        let eye = attacker.eye_position();

        assert!(range.is_in_range(&attacker, eye + Vec3::X * 3.0));
        assert!(!range.is_in_range(&attacker, eye + Vec3::X * (3.3 + 0.01)));
    }

    #[test]
    fn test_min_range_with_margin() {
        let range = AttackRange::new(2.0, 4.0, 0.0, 5.0, 0.25, 1.0);
        let attacker = survival_at_origin();
        let eye = attacker.eye_position();

        assert!(range.is_in_range(&attacker, eye + Vec3::X * 1.8));
        assert!(!range.is_in_range(&attacker, eye + Vec3::X * 1.7));
    }

    #[test]
    fn test_box_range_uses_nearest_point_and_buffer() {
        let range = scenario_range();
        let attacker = survival_at_origin();
        let eye = attacker.eye_position();
        let far = Aabb::from_center(eye + Vec3::X * 4.0, Vec3::splat(0.5));

        // Nearest face is 3.5 away
        assert!(!range.is_in_range_of_box(&attacker, &far, 0.0));
        assert!(range.is_in_range_of_box(&attacker, &far, 0.25));
    }

    #[test]
    fn test_default_for_interaction_range() {
        let range = AttackRange::default_for(4.5);
        let player = CombatEntity::player(GameMode::Creative, Vec3::ZERO);
        assert_eq!(range.effective_max_range(&player), 4.5);
        assert_eq!(range.hitbox_margin, 0.0);

        let spear = AttackRange::new(2.0, 4.5, 2.0, 6.5, 0.125, 0.5);
        assert_eq!(AttackRange::resolve(Some(&spear), 3.0), spear);
        assert_eq!(AttackRange::resolve(None, 3.0), AttackRange::default_for(3.0));
    }

    #[test]
    fn test_closest_hit_miss_points_along_view() {
        let arena = Arena::new(1);
        let attacker = survival_at_origin();

        let hit = scenario_range().closest_hit(&attacker, 1.0, &arena, &|_| true);
        match hit {
            HitResult::Miss(miss) => {
                assert!((miss.location - (attacker.eye_position() + Vec3::X)).length() < 1e-6);
                assert_eq!(miss.direction, Direction::East);
            },
            other => panic!("expected a miss, got {other:?}"),
        }
    }

    #[test]
    fn test_closest_hit_terrain_without_entities() {
        let mut arena = Arena::new(1);
        arena.set_solid(IVec3::new(2, 1, 0));
        let attacker = survival_at_cell_center();

        let hit = scenario_range().closest_hit(&attacker, 1.0, &arena, &|_| true);
        match hit {
            HitResult::Block(block) => {
                assert_eq!(block.cell, IVec3::new(2, 1, 0));
                assert_eq!(block.face, Direction::West);
                assert!((block.location.x - 2.0).abs() < 1e-5);
            },
            other => panic!("expected a block hit, got {other:?}"),
        }
    }

    #[test]
    fn test_closest_hit_picks_nearest_entity() {
        let mut arena = Arena::new(1);
        let attacker = arena.spawn(survival_at_origin());
        let near = arena.spawn(CombatEntity::mob(Vec3::new(1.5, 0.0, 0.0)));
        arena.spawn(CombatEntity::mob(Vec3::new(2.5, 0.0, 0.0)));
        let attacker = arena.entity(attacker).expect("spawned");

        let hit = scenario_range().closest_hit(&attacker, 1.0, &arena, &|_| true);
        assert_eq!(hit.entity().map(|h| h.target.id), Some(near));
    }

    #[test]
    fn test_terrain_occludes_entity_behind_it() {
        let mut arena = Arena::new(1);
        let attacker_id = arena.spawn(survival_at_cell_center());
        arena.set_solid(IVec3::new(1, 1, 0));
        arena.spawn(CombatEntity::mob(Vec3::new(2.8, 0.0, 0.5)));
        let attacker = arena.entity(attacker_id).expect("spawned");

        let hit = scenario_range().closest_hit(&attacker, 1.0, &arena, &|_| true);
        assert!(matches!(hit, HitResult::Block(_)));

        let along = scenario_range().hit_entities_along(&attacker, &arena, &|_| true);
        assert!(along.into_entities().is_empty());
    }

    #[test]
    fn test_entity_in_front_of_terrain_wins() {
        let mut arena = Arena::new(1);
        let attacker_id = arena.spawn(survival_at_cell_center());
        arena.set_solid(IVec3::new(3, 1, 0));
        let mob = arena.spawn(CombatEntity::mob(Vec3::new(2.0, 0.0, 0.5)));
        let attacker = arena.entity(attacker_id).expect("spawned");

        let hit = scenario_range().closest_hit(&attacker, 1.0, &arena, &|_| true);
        assert_eq!(hit.entity().map(|h| h.target.id), Some(mob));
    }

    #[test]
    fn test_predicate_and_self_exclusion() {
        let mut arena = Arena::new(1);
        let attacker_id = arena.spawn(survival_at_origin());
        let skipped = arena.spawn(CombatEntity::mob(Vec3::new(1.5, 0.0, 0.0)));
        let far = arena.spawn(CombatEntity::mob(Vec3::new(2.5, 0.0, 0.0)));
        let attacker = arena.entity(attacker_id).expect("spawned");

        let hits = scenario_range()
            .hit_entities_along(&attacker, &arena, &|e| e.id != skipped)
            .into_entities();
        let ids: Vec<_> = hits.iter().map(|h| h.target.id).collect();
        assert_eq!(ids, vec![far]);
    }

    #[test]
    fn test_all_hits_ordered_nearest_first() {
        let mut arena = Arena::new(1);
        let attacker_id = arena.spawn(survival_at_origin());
        let far = arena.spawn(CombatEntity::mob(Vec3::new(2.6, 0.0, 0.0)));
        let near = arena.spawn(CombatEntity::mob(Vec3::new(1.2, 0.0, 0.0)));
        // Outside reach entirely
        arena.spawn(CombatEntity::mob(Vec3::new(6.0, 0.0, 0.0)));
        let attacker = arena.entity(attacker_id).expect("spawned");

        let hits = scenario_range()
            .hit_entities_along(&attacker, &arena, &|_| true)
            .into_entities();
        let ids: Vec<_> = hits.iter().map(|h| h.target.id).collect();
        assert_eq!(ids, vec![near, far]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AttackRange::default().validate("test").is_ok());
        assert!(AttackRange::new(-1.0, 3.0, 0.0, 5.0, 0.3, 1.0).validate("test").is_err());
        assert!(AttackRange::new(0.0, 3.0, 0.0, 5.0, 1.5, 1.0).validate("test").is_err());
        assert!(AttackRange::new(0.0, 3.0, 0.0, 5.0, 0.3, 2.5).validate("test").is_err());
        assert!(AttackRange::new(4.0, 3.0, 0.0, 5.0, 0.3, 1.0).validate("test").is_err());
        assert!(AttackRange::new(0.0, f32::NAN, 0.0, 5.0, 0.3, 1.0).validate("test").is_err());
    }

    proptest! {
        #[test]
        fn prop_envelope_is_ordered(
            min in 0.0f32..32.0,
            span in 0.0f32..32.0,
            cmin in 0.0f32..32.0,
            cspan in 0.0f32..32.0,
            margin in 0.0f32..1.0,
            mob_factor in 0.0f32..2.0,
        ) {
            let range = AttackRange::new(min, min + span, cmin, cmin + cspan, margin, mob_factor);
            prop_assert!(range.validate("prop").is_ok());
            for entity in [
                CombatEntity::player(GameMode::Survival, Vec3::ZERO),
                CombatEntity::player(GameMode::Creative, Vec3::ZERO),
                CombatEntity::player(GameMode::Adventure, Vec3::ZERO),
                CombatEntity::player(GameMode::Spectator, Vec3::ZERO),
                CombatEntity::mob(Vec3::ZERO),
            ] {
                prop_assert!(range.effective_min_range(&entity) <= range.effective_max_range(&entity));
            }
        }

        #[test]
        fn prop_empty_world_always_misses(yaw in -180.0f32..180.0, pitch in -89.0f32..89.0) {
            let arena = Arena::new(7);
            let attacker = CombatEntity::player(GameMode::Survival, Vec3::ZERO)
                .with_view(riposte_common::view_vector(pitch, yaw));
            let hit = AttackRange::default().closest_hit(&attacker, 1.0, &arena, &|_| true);
            prop_assert!(hit.is_miss());
        }
    }
}
