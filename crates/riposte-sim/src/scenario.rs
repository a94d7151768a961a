//! Scripted combat scenarios run against an [`Arena`].

use anyhow::{Context, Result};
use glam::{IVec3, Vec3};
use serde::Serialize;
use tracing::{debug, info};

use riposte_combat::prelude::*;
use riposte_common::EntityId;

use crate::config::SimConfig;

/// Final state of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    /// Entity id.
    pub id: EntityId,
    /// Remaining health.
    pub health: f32,
    /// Still alive.
    pub alive: bool,
    /// Final position.
    pub position: Vec3,
}

/// What a scenario did.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: &'static str,
    /// Ticks simulated.
    pub ticks: u64,
    /// Stabs that had an effect.
    pub strikes: usize,
    /// Damage absorbed by blocks.
    pub absorbed: f32,
    /// Entities after the run.
    pub entities: Vec<EntityState>,
    /// Every feedback event, in order.
    pub feedback: Vec<FeedbackEvent>,
}

impl ScenarioReport {
    fn collect(name: &'static str, arena: &mut Arena, strikes: usize, absorbed: f32) -> Self {
        let entities = arena
            .entity_ids()
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|id| {
                let entity = arena.entity(id)?;
                Some(EntityState {
                    id,
                    health: arena.health(id)?,
                    alive: entity.alive,
                    position: entity.position,
                })
            })
            .collect();
        Self {
            name,
            ticks: arena.game_time(),
            strikes,
            absorbed,
            entities,
            feedback: arena.take_feedback(),
        }
    }
}

fn profile<'a>(registry: &'a ProfileRegistry, name: &str) -> Result<&'a ItemCombatProfile> {
    registry
        .get_by_name(name)
        .with_context(|| format!("no combat profile named {name:?}"))
}

/// A player charges through a line of mobs with a spear.
pub fn spear_lunge(config: &SimConfig, registry: &ProfileRegistry) -> Result<ScenarioReport> {
    let spear = profile(registry, "spear")?;
    let mut arena = Arena::new(config.seed);
    let mut system = CombatSystem::new();

    let charger = arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::ZERO).with_view(Vec3::X));
    arena.set_attribute(charger, Attribute::AttackDamage, config.attack_damage);
    for i in 0..config.mob_count {
        let x = 8.0 + i as f32 * config.mob_spacing;
        arena.spawn(CombatEntity::mob(Vec3::new(x, 0.0, 0.0)));
    }
    // Wall at the end of the run
    let wall_x = (8.0 + config.mob_count as f32 * config.mob_spacing + 4.0) as i32;
    arena.fill_solid(IVec3::new(wall_x, 0, -2), IVec3::new(wall_x, 2, 2));

    if system.start_using(&mut arena, charger, spear, EquipmentSlot::MainHand) != UseResult::Started {
        anyhow::bail!("profile {:?} has no kinetic strike", spear.name);
    }

    let mut strikes = 0;
    for _ in 0..config.lunge_ticks {
        arena.set_velocity(charger, Vec3::X * config.charger_speed);
        for (_, report) in system.tick(&mut arena) {
            strikes += report.hits.len();
        }
        arena.advance();
    }
    system.stop_using(charger);

    info!(strikes, "spear lunge finished");
    Ok(ScenarioReport::collect("spear_lunge", &mut arena, strikes, 0.0))
}

/// One trident swing through a line of mobs.
pub fn piercing_swing(config: &SimConfig, registry: &ProfileRegistry) -> Result<ScenarioReport> {
    let trident = profile(registry, "trident")?;
    let mut arena = Arena::new(config.seed);
    let mut system = CombatSystem::new();

    let wielder = arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::ZERO).with_view(Vec3::X));
    arena.set_attribute(wielder, Attribute::AttackDamage, config.attack_damage);
    for x in [1.5, 2.5, 3.5] {
        arena.spawn(CombatEntity::mob(Vec3::new(x, 0.0, 0.0)));
    }

    let report = system
        .swing(&mut arena, wielder, trident, EquipmentSlot::MainHand)
        .with_context(|| format!("profile {:?} has no piercing strike", trident.name))?;
    arena.advance();

    info!(landed = report.landed(), "piercing swing finished");
    Ok(ScenarioReport::collect("piercing_swing", &mut arena, report.landed(), 0.0))
}

/// An axe-wielding mob breaks a player's shield, then hits again.
pub fn shield_break(config: &SimConfig, registry: &ProfileRegistry) -> Result<ScenarioReport> {
    let shield = profile(registry, "shield")?;
    let axe = profile(registry, "axe")?;
    let blocks = shield
        .blocks_attacks
        .clone()
        .with_context(|| format!("profile {:?} cannot block", shield.name))?;

    let mut arena = Arena::new(config.seed);
    let defender = arena.spawn(CombatEntity::player(GameMode::Survival, Vec3::new(2.0, 0.0, 0.0)).with_view(Vec3::NEG_X));
    let brute = arena.spawn(CombatEntity::mob(Vec3::new(0.5, 0.0, 0.0)).with_view(Vec3::X));
    arena.equip_weapon(brute, axe.weapon_stats());
    arena.equip_guard(defender, blocks.clone(), shield.blocking_item(EquipmentSlot::OffHand));

    arena.raise_guard(defender);
    arena.skip_ticks(u64::from(blocks.block_delay_ticks()));

    let before = arena.health(defender).unwrap_or_default();
    let mut strikes = 0;
    for swing in 0..2 {
        let attacker = arena.entity(brute).context("brute vanished")?;
        if arena.hurt(defender, &DamageSource::melee(&attacker), config.axe_damage) {
            strikes += 1;
        }
        let raised = arena.raise_guard(defender);
        debug!(swing, raised, guard = ?arena.guard_state(defender), "axe swing");
        arena.advance();
    }
    let after = arena.health(defender).unwrap_or_default();
    let absorbed = (2.0 * config.axe_damage - (before - after)).max(0.0);

    info!(strikes, absorbed, "shield break finished");
    Ok(ScenarioReport::collect("shield_break", &mut arena, strikes, absorbed))
}

/// Runs every scenario.
pub fn run_all(config: &SimConfig, registry: &ProfileRegistry) -> Result<Vec<ScenarioReport>> {
    Ok(vec![
        spear_lunge(config, registry)?,
        piercing_swing(config, registry)?,
        shield_break(config, registry)?,
    ])
}
