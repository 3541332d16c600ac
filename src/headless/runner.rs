//! Headless scenario execution
//!
//! Builds a world from a `ScenarioConfig`, drives it with [`crate::combat::tick`]
//! at a fixed step and collects the outcome. No window, no real-time clock.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::combat::components::{
    CombatTag, Facing, Health, LinearDamping, Position, StatModifiers, TagFilter, Velocity,
};
use crate::combat::error::{CombatError, CombatResult};
use crate::combat::events::CastSkill;
use crate::combat::log::{AgentMetadata, CombatLog, CombatLogEventType, ScenarioMetadata};
use crate::combat::{self, CombatCorePlugin, CombatRng};
use crate::physics::world::Collider;
use crate::physics::{CollisionWorld, LayerMask, ReferencePhysicsPlugin};
use crate::sensor::{DetectionStrategy, TargetSensor};
use crate::skills::SkillCatalog;

use super::config::{AgentConfig, ScenarioConfig, SensorStrategyConfig};

/// Result of a completed scenario
///
/// Programmatic access to the outcome for tests and analysis.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    /// Ticks actually run
    pub ticks: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Random seed used (if deterministic mode)
    pub seed: Option<u64>,
    pub agents: Vec<AgentResult>,
}

impl ScenarioResult {
    pub fn agent(&self, name: &str) -> Option<&AgentResult> {
        self.agents.iter().find(|agent| agent.name == name)
    }
}

/// Statistics for a single agent after the scenario
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub name: String,
    pub tag: CombatTag,
    /// `None` for agents without a health capability
    pub max_health: Option<f32>,
    pub final_health: Option<f32>,
    pub survived: bool,
    pub final_position: Vec2,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    /// Name of whatever the agent's sensor held at the end
    pub final_target: Option<String>,
}

/// Outcome plus the full combat log
pub struct ScenarioOutcome {
    pub result: ScenarioResult,
    pub log: CombatLog,
}

/// Collision layer an agent's collider sits on
pub fn layer_for(tag: CombatTag) -> LayerMask {
    match tag {
        CombatTag::Player => LayerMask::PLAYER,
        CombatTag::Enemy => LayerMask::ENEMY,
        CombatTag::Ally => LayerMask::ALLY,
        CombatTag::Obstacle => LayerMask::OBSTACLE,
        CombatTag::Neutral => LayerMask::DEFAULT,
    }
}

fn sensor_for(agent: &AgentConfig) -> Option<TargetSensor> {
    let sensor = agent.sensor.as_ref()?;
    let strategy = match sensor.strategy {
        SensorStrategyConfig::Radius => DetectionStrategy::Radius,
        SensorStrategyConfig::Cone { angle_degrees } => DetectionStrategy::Cone { angle_degrees },
        SensorStrategyConfig::LineOfSight => DetectionStrategy::LineOfSight {
            obstacles: LayerMask::OBSTACLE,
        },
    };
    Some(TargetSensor::new(
        sensor.radius,
        strategy,
        TagFilter::new(&sensor.target_tags),
    ))
}

/// Build the app for a scenario: reference provider, combat core, agents.
pub fn build_scenario_app(
    config: &ScenarioConfig,
    catalog: SkillCatalog,
) -> CombatResult<(App, HashMap<String, Entity>)> {
    config.check_skills(&catalog)?;

    let mut app = App::new();
    app.insert_resource(catalog)
        .insert_resource(match config.seed {
            Some(seed) => CombatRng::from_seed(seed),
            None => CombatRng::from_entropy(),
        })
        .add_plugins(ReferencePhysicsPlugin)
        .add_plugins(CombatCorePlugin::<CollisionWorld>::default());
    app.finish();
    app.cleanup();

    let world = app.world_mut();
    let mut agents = HashMap::new();

    for agent in &config.agents {
        let position = Vec2::from(agent.position);
        let mut entity = world.spawn((
            Name::new(agent.name.clone()),
            Position(position),
            Facing(agent.facing),
            agent.tag,
            Collider::circle(agent.radius).with_layers(layer_for(agent.tag)),
        ));
        if let Some(health) = agent.health {
            entity.insert(Health::new(health));
        }
        if let Some(sensor) = sensor_for(agent) {
            entity.insert(sensor);
        }
        if agent.stat_modifiers {
            entity.insert(StatModifiers::default());
        }
        if agent.physics_body {
            entity.insert((Velocity::default(), LinearDamping(agent.damping)));
        }
        agents.insert(agent.name.clone(), entity.id());
    }

    for (index, obstacle) in config.obstacles.iter().enumerate() {
        world.spawn((
            Name::new(format!("Obstacle {}", index + 1)),
            Position(Vec2::from(obstacle.position)),
            CombatTag::Obstacle,
            Collider::rect(Vec2::from(obstacle.half_extents)).with_layers(LayerMask::OBSTACLE),
        ));
    }

    Ok((app, agents))
}

/// Run a scenario to completion.
pub fn run_scenario(config: &ScenarioConfig, catalog: SkillCatalog) -> CombatResult<ScenarioOutcome> {
    let (mut app, agents) = build_scenario_app(config, catalog)?;
    let lookup = |name: &str| {
        agents
            .get(name)
            .copied()
            .ok_or_else(|| CombatError::InvalidScenario(format!("unknown agent '{name}'")))
    };

    let dt = 1.0 / config.tick_rate;
    let total_ticks = config.total_ticks();

    let mut scheduled = config.casts.clone();
    scheduled.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
    let mut next_scheduled = 0;
    let mut cooldowns = vec![0.0_f32; config.auto_casts.len()];

    app.world_mut()
        .resource_mut::<CombatLog>()
        .log(CombatLogEventType::MatchEvent, format!("Scenario '{}' started", config.name));
    info!(
        "Running scenario '{}': {} agents, {:.1}s at {} ticks/s",
        config.name,
        config.agents.len(),
        config.duration_secs,
        config.tick_rate
    );

    let mut ticks = 0;
    while ticks < total_ticks {
        let now = ticks as f32 * dt;

        while next_scheduled < scheduled.len() && scheduled[next_scheduled].at_secs <= now + 1e-4 {
            let cast = &scheduled[next_scheduled];
            app.world_mut().send_event(CastSkill {
                caster: lookup(&cast.caster)?,
                skill_id: cast.skill.clone(),
                level: cast.level,
                aim: cast.aim.map(Vec2::from),
            });
            next_scheduled += 1;
        }

        for (auto, cooldown) in config.auto_casts.iter().zip(cooldowns.iter_mut()) {
            *cooldown -= dt;
            if *cooldown > 1e-4 {
                continue;
            }
            let caster = lookup(&auto.caster)?;
            if let Some(aim) = auto_cast_aim(app.world(), caster) {
                app.world_mut().send_event(CastSkill {
                    caster,
                    skill_id: auto.skill.clone(),
                    level: auto.level,
                    aim: Some(aim),
                });
                *cooldown = auto.cooldown;
            }
        }

        combat::tick(app.world_mut(), dt);
        ticks += 1;

        if config.stop_on_elimination && side_eliminated(app.world_mut()) {
            info!("Scenario '{}' ended early: one side eliminated", config.name);
            break;
        }
    }

    let elapsed = ticks as f32 * dt;
    let world = app.world_mut();
    world
        .resource_mut::<CombatLog>()
        .log(CombatLogEventType::MatchEvent, format!("Scenario '{}' ended", config.name));
    let log = std::mem::take(&mut *world.resource_mut::<CombatLog>());

    let result = ScenarioResult {
        name: config.name.clone(),
        ticks,
        elapsed,
        seed: config.seed,
        agents: collect_agent_results(world, config, &agents, &log),
    };
    info!(
        "Scenario '{}' complete after {} ticks ({} log entries)",
        config.name,
        ticks,
        log.entries.len()
    );
    Ok(ScenarioOutcome { result, log })
}

/// Direction from a living caster to its sensed target, if it has one
fn auto_cast_aim(world: &World, caster: Entity) -> Option<Vec2> {
    let entity = world.get_entity(caster).ok()?;
    if entity.get::<Health>().is_some_and(Health::is_dead) {
        return None;
    }
    let target = entity.get::<TargetSensor>()?.target()?;
    let from = entity.get::<Position>()?.0;
    let to = world.get::<Position>(target)?.0;
    Some(to - from)
}

fn side_eliminated(world: &mut World) -> bool {
    let mut players = (0, 0);
    let mut enemies = (0, 0);
    let mut query = world.query::<(&CombatTag, &Health)>();
    for (tag, health) in query.iter(world) {
        let side = match tag {
            CombatTag::Player => &mut players,
            CombatTag::Enemy => &mut enemies,
            _ => continue,
        };
        side.0 += 1;
        if health.is_alive() {
            side.1 += 1;
        }
    }
    (players.0 > 0 && players.1 == 0) || (enemies.0 > 0 && enemies.1 == 0)
}

fn collect_agent_results(
    world: &World,
    config: &ScenarioConfig,
    agents: &HashMap<String, Entity>,
    log: &CombatLog,
) -> Vec<AgentResult> {
    config
        .agents
        .iter()
        .filter_map(|agent| {
            let entity = world.get_entity(*agents.get(&agent.name)?).ok()?;
            let health = entity.get::<Health>();
            let final_target = entity
                .get::<TargetSensor>()
                .and_then(TargetSensor::target)
                .and_then(|target| world.get::<Name>(target))
                .map(|name| name.as_str().to_string());

            Some(AgentResult {
                name: agent.name.clone(),
                tag: agent.tag,
                max_health: health.map(|h| h.maximum),
                final_health: health.map(|h| h.current),
                survived: health.map_or(true, Health::is_alive),
                final_position: entity.get::<Position>().map_or(Vec2::ZERO, |p| p.0),
                damage_dealt: log.total_damage_dealt(&agent.name),
                damage_taken: log.total_damage_taken(&agent.name),
                healing_done: log.total_healing_done(&agent.name),
                final_target,
            })
        })
        .collect()
}

/// Header metadata for writing the log of a finished scenario
pub fn scenario_metadata(result: &ScenarioResult) -> ScenarioMetadata {
    ScenarioMetadata {
        scenario_name: result.name.clone(),
        seed: result.seed,
        duration: result.elapsed,
        agents: result
            .agents
            .iter()
            .map(|agent| AgentMetadata {
                name: agent.name.clone(),
                tag: agent.tag.name().to_string(),
                max_health: agent.max_health.unwrap_or(0.0),
                final_health: agent.final_health.unwrap_or(0.0),
                final_position: (agent.final_position.x, agent.final_position.y),
            })
            .collect(),
    }
}

/// Load the scenario's skills, run it and save the combat log.
pub fn run_headless_scenario(
    config: &ScenarioConfig,
    skills_override: Option<&str>,
    output_override: Option<&str>,
) -> CombatResult<ScenarioResult> {
    let skills_path = skills_override.unwrap_or(&config.skills_path);
    let catalog = SkillCatalog::load(skills_path)?;
    let outcome = run_scenario(config, catalog)?;

    let output = output_override.or(config.output_path.as_deref());
    let metadata = scenario_metadata(&outcome.result);
    match outcome.log.save_to_file(&metadata, output) {
        Ok(path) => println!("Scenario complete. Log saved to: {}", path),
        Err(e) => eprintln!("Failed to save combat log: {}", e),
    }

    Ok(outcome.result)
}
