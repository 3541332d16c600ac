//! Shared helpers for integration tests
//!
//! Builds an `App` with the reference collision world and the combat core,
//! and records every combat event so tests can inspect what happened.

#![allow(dead_code)]

use arenacore::combat::components::{CombatTag, Facing, Health, Position, StatModifiers};
use arenacore::combat::events::*;
use arenacore::effects::EffectInstance;
use arenacore::physics::world::Collider;
use arenacore::physics::LayerMask;
use arenacore::{
    CollisionWorld, CombatCorePlugin, CombatPhase, CombatRng, CombatTick, ReferencePhysicsPlugin,
    SkillCatalog,
};
use bevy::prelude::*;

/// Every event of type `E` seen so far
#[derive(Resource)]
pub struct Recorded<E: Event>(pub Vec<E>);

impl<E: Event> Default for Recorded<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn record<E: Event + Clone>(mut reader: EventReader<E>, mut recorded: ResMut<Recorded<E>>) {
    recorded.0.extend(reader.read().cloned());
}

fn record_events<E: Event + Clone>(app: &mut App) {
    app.init_resource::<Recorded<E>>()
        .add_systems(CombatTick, record::<E>.in_set(CombatPhase::Bookkeeping));
}

/// App with the reference provider, the combat core and `skills` loaded from RON
pub fn test_app(skills: &str) -> App {
    let catalog = SkillCatalog::from_ron_str(skills, "test skills").expect("test skills should parse");

    let mut app = App::new();
    app.insert_resource(catalog)
        .insert_resource(CombatRng::from_seed(7))
        .add_plugins(ReferencePhysicsPlugin)
        .add_plugins(CombatCorePlugin::<CollisionWorld>::default());

    record_events::<TargetAcquired>(&mut app);
    record_events::<TargetLost>(&mut app);
    record_events::<SkillCast>(&mut app);
    record_events::<CastRejected>(&mut app);
    record_events::<EffectExpired>(&mut app);
    record_events::<DamageDealt>(&mut app);
    record_events::<HealApplied>(&mut app);
    record_events::<BuffApplied>(&mut app);
    record_events::<AgentDied>(&mut app);
    record_events::<KnockbackImpulse>(&mut app);
    record_events::<SpawnVisual>(&mut app);

    app.finish();
    app.cleanup();
    app
}

/// App with no skills
pub fn sensor_app() -> App {
    test_app("(skills: [])")
}

pub fn layer_for(tag: CombatTag) -> LayerMask {
    arenacore::headless::runner::layer_for(tag)
}

/// Spawn a tagged agent with a 0.5 radius collider, facing +X
pub fn spawn_agent(app: &mut App, name: &str, tag: CombatTag, position: Vec2, health: Option<f32>) -> Entity {
    let mut entity = app.world_mut().spawn((
        Name::new(name.to_string()),
        Position(position),
        Facing::RIGHT,
        tag,
        Collider::circle(0.5).with_layers(layer_for(tag)),
        StatModifiers::default(),
    ));
    if let Some(health) = health {
        entity.insert(Health::new(health));
    }
    entity.id()
}

/// Spawn an axis-aligned obstacle
pub fn spawn_wall(app: &mut App, position: Vec2, half_extents: Vec2) -> Entity {
    app.world_mut()
        .spawn((
            Name::new("Wall"),
            Position(position),
            CombatTag::Obstacle,
            Collider::rect(half_extents).with_layers(LayerMask::OBSTACLE),
        ))
        .id()
}

pub fn step(app: &mut App, dt: f32) {
    arenacore::tick(app.world_mut(), dt);
}

pub fn run_for(app: &mut App, dt: f32, ticks: usize) {
    for _ in 0..ticks {
        step(app, dt);
    }
}

pub fn cast(app: &mut App, caster: Entity, skill: &str, aim: Option<Vec2>) {
    app.world_mut().send_event(CastSkill {
        caster,
        skill_id: skill.to_string(),
        level: 1,
        aim,
    });
}

pub fn events<E: Event + Clone>(app: &App) -> Vec<E> {
    app.world().resource::<Recorded<E>>().0.clone()
}

pub fn clear_events<E: Event>(app: &mut App) {
    app.world_mut().resource_mut::<Recorded<E>>().0.clear();
}

pub fn health(app: &App, entity: Entity) -> f32 {
    app.world()
        .get::<Health>(entity)
        .map(|health| health.current)
        .expect("entity should have health")
}

pub fn set_health(app: &mut App, entity: Entity, current: f32, maximum: f32) {
    app.world_mut()
        .entity_mut(entity)
        .insert(Health { current, maximum });
}

pub fn set_position(app: &mut App, entity: Entity, position: Vec2) {
    app.world_mut()
        .get_mut::<Position>(entity)
        .expect("entity should have a position")
        .0 = position;
}

pub fn position(app: &App, entity: Entity) -> Vec2 {
    app.world()
        .get::<Position>(entity)
        .map(|p| p.0)
        .expect("entity should have a position")
}

/// All live effect instances
pub fn effect_instances(app: &mut App) -> Vec<(Entity, EffectInstance)> {
    let world = app.world_mut();
    let mut query = world.query::<(Entity, &EffectInstance)>();
    query
        .iter(world)
        .map(|(entity, instance)| (entity, instance.clone()))
        .collect()
}
