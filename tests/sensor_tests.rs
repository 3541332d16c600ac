//! Integration tests for target sensors
//!
//! These tests verify that:
//! - Radius, cone and line-of-sight detection pick the right candidates
//! - Only transitions are reported (one acquisition while a target is held)
//! - Destroyed targets are dropped or silently replaced
//! - Swapping between two eligible candidates is silent
//! - Dead or stunned agents keep their state
//! - Manual overrides report acquisitions and losses

mod common;

use arenacore::combat::components::{CombatTag, Facing, Stunned, TagFilter};
use arenacore::combat::events::{SensorOverride, SensorOverrideAction, TargetAcquired, TargetLost};
use arenacore::physics::LayerMask;
use arenacore::sensor::{DetectionStrategy, TargetSensor};
use bevy::prelude::*;
use common::*;

const DT: f32 = 1.0 / 30.0;

fn add_sensor(app: &mut App, agent: Entity, radius: f32, strategy: DetectionStrategy) {
    app.world_mut().entity_mut(agent).insert(TargetSensor::new(
        radius,
        strategy,
        TagFilter::new(&[CombatTag::Enemy]),
    ));
}

fn held_target(app: &App, agent: Entity) -> Option<Entity> {
    app.world().get::<TargetSensor>(agent).and_then(TargetSensor::target)
}

// =============================================================================
// Radius
// =============================================================================

#[test]
fn test_radius_requires_centre_within_range() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);

    // Collider overlaps the circle, but the centre is outside it
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(5.4, 0.0), Some(50.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None);

    set_position(&mut app, goblin, Vec2::new(5.0, 0.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin), "range boundary is inclusive");
}

#[test]
fn test_radius_filters_by_tag_and_excludes_self() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Enemy, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    spawn_agent(&mut app, "Villager", CombatTag::Neutral, Vec2::new(1.0, 0.0), Some(20.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None, "neither self nor neutrals qualify");

    let orc = spawn_agent(&mut app, "Orc", CombatTag::Enemy, Vec2::new(-3.0, 0.0), Some(80.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(orc));
}

#[test]
fn test_dead_candidates_are_ignored() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));
    set_health(&mut app, goblin, 0.0, 50.0);

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None);
}

// =============================================================================
// Cone
// =============================================================================

#[test]
fn test_cone_boundary_is_inclusive() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 8.0, DetectionStrategy::Cone { angle_degrees: 90.0 });

    let at = |degrees: f32| Vec2::from_angle(degrees.to_radians()) * 4.0;
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, at(50.0), Some(50.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None, "50 degrees is outside a 90 degree cone");

    set_position(&mut app, goblin, at(45.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin), "exactly half the cone angle counts");
}

#[test]
fn test_cone_follows_facing() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 8.0, DetectionStrategy::Cone { angle_degrees: 60.0 });
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(-4.0, 0.0), Some(50.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None, "target is behind the guard");

    app.world_mut().entity_mut(guard).insert(Facing::LEFT);
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin));
}

// =============================================================================
// Line of sight
// =============================================================================

#[test]
fn test_line_of_sight_obstacle_insert_and_remove() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(
        &mut app,
        guard,
        8.0,
        DetectionStrategy::LineOfSight {
            obstacles: LayerMask::OBSTACLE,
        },
    );
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(6.0, 0.0), Some(50.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin));

    let wall = spawn_wall(&mut app, Vec2::new(3.0, 0.0), Vec2::new(0.25, 1.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None);
    assert_eq!(events::<TargetLost>(&app).len(), 1);

    app.world_mut().despawn(wall);
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin));
    assert_eq!(events::<TargetAcquired>(&app).len(), 2);
}

#[test]
fn test_line_of_sight_ignores_other_layers() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(
        &mut app,
        guard,
        8.0,
        DetectionStrategy::LineOfSight {
            obstacles: LayerMask::OBSTACLE,
        },
    );
    // Another agent standing in the way doesn't block sight
    spawn_agent(&mut app, "Villager", CombatTag::Neutral, Vec2::new(3.0, 0.0), Some(20.0));
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(6.0, 0.0), Some(50.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin));
}

// =============================================================================
// Transitions
// =============================================================================

#[test]
fn test_single_acquisition_while_held() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));

    run_for(&mut app, DT, 10);

    let acquired = events::<TargetAcquired>(&app);
    assert_eq!(acquired.len(), 1);
    assert_eq!(acquired[0].sensor, guard);
    assert_eq!(acquired[0].target, goblin);
    assert!(events::<TargetLost>(&app).is_empty());
}

#[test]
fn test_destroyed_target_is_lost() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));
    step(&mut app, DT);

    app.world_mut().despawn(goblin);
    step(&mut app, DT);

    let lost = events::<TargetLost>(&app);
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].target, goblin);
    assert_eq!(held_target(&app, guard), None);
}

#[test]
fn test_destroyed_target_replaced_silently() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let first = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));
    let second = spawn_agent(&mut app, "Orc", CombatTag::Enemy, Vec2::new(-2.0, 0.0), Some(50.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(first));

    app.world_mut().despawn(first);
    step(&mut app, DT);

    assert_eq!(held_target(&app, guard), Some(second));
    assert_eq!(events::<TargetAcquired>(&app).len(), 1);
    assert!(events::<TargetLost>(&app).is_empty());
}

#[test]
fn test_swap_between_eligible_candidates_is_silent() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let first = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));
    let second = spawn_agent(&mut app, "Orc", CombatTag::Enemy, Vec2::new(-2.0, 0.0), Some(50.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(first));

    // Goblin walks out of range while the orc stays put
    set_position(&mut app, first, Vec2::new(8.0, 0.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(second));

    set_position(&mut app, first, Vec2::new(3.0, 0.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(first));

    assert_eq!(events::<TargetAcquired>(&app).len(), 1, "only the first acquisition is reported");
    assert!(events::<TargetLost>(&app).is_empty());
}

#[test]
fn test_stunned_and_dead_agents_keep_state() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));

    app.world_mut().entity_mut(guard).insert(Stunned);
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None, "stunned sensors don't evaluate");

    app.world_mut().entity_mut(guard).remove::<Stunned>();
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin));

    set_health(&mut app, guard, 0.0, 100.0);
    set_position(&mut app, goblin, Vec2::new(20.0, 0.0));
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(goblin), "dead sensors keep their target");
    assert!(events::<TargetLost>(&app).is_empty());
}

#[test]
fn test_overrides_report_transitions() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    add_sensor(&mut app, guard, 5.0, DetectionStrategy::Radius);
    // Far away: detection alone would never pick it
    let boss = spawn_agent(&mut app, "Boss", CombatTag::Enemy, Vec2::new(50.0, 0.0), Some(500.0));

    app.world_mut().send_event(SensorOverride {
        sensor: guard,
        action: SensorOverrideAction::Set(boss),
    });
    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), Some(boss));
    assert_eq!(events::<TargetAcquired>(&app).len(), 1);

    app.world_mut().send_event(SensorOverride {
        sensor: guard,
        action: SensorOverrideAction::Clear,
    });
    step(&mut app, DT);
    // Detection ran first this tick and already dropped the out-of-range boss
    assert_eq!(held_target(&app, guard), None);
    assert_eq!(events::<TargetLost>(&app).len(), 1);

    app.world_mut().send_event(SensorOverride {
        sensor: guard,
        action: SensorOverrideAction::Clear,
    });
    step(&mut app, DT);
    assert_eq!(events::<TargetLost>(&app).len(), 1, "clearing an empty sensor is silent");
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_origin_offset_moves_detection_circle() {
    let mut app = sensor_app();
    let tower = spawn_agent(&mut app, "Tower", CombatTag::Player, Vec2::ZERO, None);
    app.world_mut().entity_mut(tower).insert(
        TargetSensor::new(2.0, DetectionStrategy::Radius, TagFilter::new(&[CombatTag::Enemy]))
            .with_origin_offset(Vec2::new(4.0, 0.0)),
    );
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(5.0, 0.0), Some(50.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, tower), Some(goblin));
}

#[test]
fn test_layer_mask_limits_candidates() {
    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    app.world_mut().entity_mut(guard).insert(
        TargetSensor::new(5.0, DetectionStrategy::Radius, TagFilter::new(&[CombatTag::Enemy]))
            .with_layers(LayerMask::ALLY),
    );
    spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));

    step(&mut app, DT);
    assert_eq!(held_target(&app, guard), None, "enemy layer is not queried");
}
