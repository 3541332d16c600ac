//! Tests for combat log queries and the log lines written during a tick
//!
//! These tests verify that the CombatLog correctly:
//! - Aggregates damage and healing by skill
//! - Counts killing blows
//! - Lists skill casts per agent
//! - Records live combat events with readable messages

mod common;

use arenacore::combat::components::CombatTag;
use arenacore::combat::log::{
    AgentMetadata, CombatLog, CombatLogEventType, ScenarioMetadata, StructuredEventData,
};
use bevy::prelude::*;
use common::*;
use regex::Regex;

fn create_test_log() -> CombatLog {
    CombatLog::default()
}

fn damage(log: &mut CombatLog, source: &str, target: &str, skill: &str, amount: f32, lethal: bool) {
    log.log_damage(
        source.to_string(),
        target.to_string(),
        skill.to_string(),
        amount,
        lethal,
        "Test".to_string(),
    );
}

// =============================================================================
// Damage Aggregation Tests
// =============================================================================

#[test]
fn test_damage_by_skill_empty_log() {
    let log = create_test_log();
    assert!(log.damage_by_skill("Hero").is_empty(), "Empty log should return empty damage map");
}

#[test]
fn test_damage_by_skill_single_source() {
    let mut log = create_test_log();
    damage(&mut log, "Hero", "Goblin", "fireball", 30.0, false);
    damage(&mut log, "Hero", "Goblin", "fireball", 36.0, false);
    damage(&mut log, "Hero", "Orc", "jab", 8.0, false);
    damage(&mut log, "Orc", "Hero", "jab", 8.0, false);

    let totals = log.damage_by_skill("Hero");
    assert_eq!(totals.len(), 2, "Should have 2 different skills");
    assert_eq!(totals.get("fireball"), Some(&66.0));
    assert_eq!(totals.get("jab"), Some(&8.0));
}

#[test]
fn test_total_damage_dealt_and_taken() {
    let mut log = create_test_log();
    damage(&mut log, "Hero", "Goblin", "fireball", 30.0, false);
    damage(&mut log, "Hero", "Orc", "arc_slash", 18.0, false);
    damage(&mut log, "Orc", "Hero", "jab", 8.0, false);

    assert_eq!(log.total_damage_dealt("Hero"), 48.0);
    assert_eq!(log.total_damage_taken("Hero"), 8.0);
    assert_eq!(log.total_damage_taken("Goblin"), 30.0);
    assert_eq!(log.total_damage_dealt("Nobody"), 0.0);
}

// =============================================================================
// Healing Aggregation Tests
// =============================================================================

#[test]
fn test_healing_by_skill() {
    let mut log = create_test_log();
    log.log_healing(
        "Cleric".to_string(),
        "Hero".to_string(),
        "mend".to_string(),
        35.0,
        "Test".to_string(),
    );
    log.log_healing(
        "Cleric".to_string(),
        "Cleric".to_string(),
        "regrowth".to_string(),
        15.0,
        "Test".to_string(),
    );
    log.log_healing(
        "Cleric".to_string(),
        "Hero".to_string(),
        "regrowth".to_string(),
        15.0,
        "Test".to_string(),
    );

    let totals = log.healing_by_skill("Cleric");
    assert_eq!(totals.get("mend"), Some(&35.0));
    assert_eq!(totals.get("regrowth"), Some(&30.0));
    assert_eq!(log.total_healing_done("Cleric"), 65.0);
    assert_eq!(log.count(CombatLogEventType::Healing), 3);
}

// =============================================================================
// Killing Blow Tests
// =============================================================================

#[test]
fn test_killing_blows_counted_per_source() {
    let mut log = create_test_log();
    damage(&mut log, "Hero", "Goblin", "fireball", 30.0, false);
    damage(&mut log, "Hero", "Goblin", "fireball", 60.0, true);
    damage(&mut log, "Shaman", "Hero", "piercing_lance", 20.0, false);
    damage(&mut log, "Hero", "Shaman", "jab", 8.0, true);

    assert_eq!(log.killing_blows("Hero"), 2);
    assert_eq!(log.killing_blows("Shaman"), 0);
}

// =============================================================================
// Cast Timeline Tests
// =============================================================================

#[test]
fn test_skill_casts_for_agent() {
    let mut log = create_test_log();
    log.log_skill_cast("Hero".to_string(), "haste".to_string(), "Test".to_string());
    log.log_skill_cast("Goblin".to_string(), "seeker_bolt".to_string(), "Test".to_string());
    log.log_skill_cast("Hero".to_string(), "fireball".to_string(), "Test".to_string());

    assert_eq!(log.skill_casts_for("Hero"), vec!["haste", "fireball"]);
    assert_eq!(log.skill_casts_for("Goblin"), vec!["seeker_bolt"]);
}

// =============================================================================
// Filter Tests
// =============================================================================

#[test]
fn test_filters() {
    let mut log = create_test_log();
    log.log(CombatLogEventType::MatchEvent, "start".to_string());
    damage(&mut log, "Hero", "Goblin", "fireball", 30.0, false);
    log.log(CombatLogEventType::Perception, "Hero acquires Goblin".to_string());
    log.log_healing(
        "Cleric".to_string(),
        "Hero".to_string(),
        "mend".to_string(),
        10.0,
        "Test".to_string(),
    );

    assert_eq!(log.hp_changes_only().len(), 2);
    assert_eq!(log.filter_by_type(CombatLogEventType::Perception).len(), 1);
    let recent = log.recent(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].event_type, CombatLogEventType::Healing);
}

#[test]
fn test_render_includes_header_and_entries() {
    let mut log = create_test_log();
    log.match_time = 2.5;
    damage(&mut log, "Hero", "Goblin", "fireball", 30.0, false);

    let metadata = ScenarioMetadata {
        scenario_name: "duel".to_string(),
        seed: Some(7),
        duration: 3.0,
        agents: vec![AgentMetadata {
            name: "Goblin".to_string(),
            tag: "Enemy".to_string(),
            max_health: 90.0,
            final_health: 60.0,
            final_position: (6.0, 0.5),
        }],
    };
    let rendered = log.render(&metadata);

    assert!(rendered.contains("=== duel ==="));
    assert!(rendered.contains("Seed: 7"));
    assert!(rendered.contains("Goblin [Enemy] 60/90 HP"));
    assert!(rendered.contains("[   2.50] Damage: Test"));
}

// =============================================================================
// Live Recording Tests
// =============================================================================

const SKILLS: &str = r#"(
    skills: [
        (id: "fireball", damage: (base: 30.0), damage_type: Fire, effects: [Damage((radius: 2.0))]),
        (id: "mend", effects: [Heal((amount: Some((base: 20.0))))]),
    ],
)"#;

#[test]
fn test_live_events_are_logged() {
    let mut app = test_app(SKILLS);
    let hero = spawn_agent(&mut app, "Hero", CombatTag::Player, Vec2::ZERO, Some(100.0));
    set_health(&mut app, hero, 50.0, 100.0);
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(1.0, 0.0), Some(45.0));

    cast(&mut app, hero, "fireball", None);
    cast(&mut app, hero, "mend", None);
    step(&mut app, 0.1);
    cast(&mut app, hero, "fireball", None);
    step(&mut app, 0.1);
    assert_eq!(health(&app, goblin), 0.0);

    let log = app.world().resource::<CombatLog>();

    let damage_line = Regex::new(r"^Hero's fireball hits Goblin for \d+ Fire damage$").unwrap();
    let damage_entries = log.filter_by_type(CombatLogEventType::Damage);
    assert_eq!(damage_entries.len(), 2);
    assert!(
        damage_entries.iter().all(|e| damage_line.is_match(&e.message)),
        "unexpected damage lines: {:?}",
        damage_entries.iter().map(|e| &e.message).collect::<Vec<_>>()
    );

    let heal_line = Regex::new(r"^Hero's mend heals Hero for 20$").unwrap();
    assert!(log
        .filter_by_type(CombatLogEventType::Healing)
        .iter()
        .any(|e| heal_line.is_match(&e.message)));

    let cast_line = Regex::new(r"^Hero casts fireball \(level 1, 30 damage, 0\.0s\)$").unwrap();
    assert!(log
        .filter_by_type(CombatLogEventType::SkillCast)
        .iter()
        .any(|e| cast_line.is_match(&e.message)));

    let deaths = log.filter_by_type(CombatLogEventType::Death);
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths[0].message, "Goblin has been killed by Hero");

    assert_eq!(log.killing_blows("Hero"), 1, "only the lethal hit is flagged");
    assert_eq!(log.total_damage_dealt("Hero"), 60.0);
    assert_eq!(log.skill_casts_for("Hero"), vec!["fireball", "mend", "fireball"]);
    assert!(matches!(
        damage_entries[1].data,
        Some(StructuredEventData::Damage {
            is_killing_blow: true,
            ..
        })
    ));
}

#[test]
fn test_perception_is_logged() {
    use arenacore::combat::components::TagFilter;
    use arenacore::sensor::{DetectionStrategy, TargetSensor};

    let mut app = sensor_app();
    let guard = spawn_agent(&mut app, "Guard", CombatTag::Player, Vec2::ZERO, Some(100.0));
    app.world_mut().entity_mut(guard).insert(TargetSensor::new(
        5.0,
        DetectionStrategy::Radius,
        TagFilter::new(&[CombatTag::Enemy]),
    ));
    let goblin = spawn_agent(&mut app, "Goblin", CombatTag::Enemy, Vec2::new(2.0, 0.0), Some(50.0));

    step(&mut app, 0.1);
    app.world_mut().despawn(goblin);
    step(&mut app, 0.1);

    let log = app.world().resource::<CombatLog>();
    let messages: Vec<&str> = log
        .filter_by_type(CombatLogEventType::Perception)
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], "Guard acquires Goblin");
    assert!(messages[1].starts_with("Guard loses "), "got {:?}", messages[1]);
}
