//! Tests for skill definition loading and validation
//!
//! These tests verify that:
//! - The bundled skills file loads and every skill validates
//! - Level scaling and defaults resolve as documented
//! - Broken definitions are rejected with a useful error

use arenacore::combat::events::EffectKind;
use arenacore::skills::{EffectDescriptor, SkillCatalog, DEFAULT_SKILLS_PATH};
use arenacore::CombatError;

fn parse(skills: &str) -> Result<SkillCatalog, CombatError> {
    SkillCatalog::from_ron_str(skills, "inline")
}

// =============================================================================
// Bundled Skills
// =============================================================================

#[test]
fn test_bundled_skills_load() {
    let catalog = SkillCatalog::load(DEFAULT_SKILLS_PATH).expect("bundled skills should load");

    for id in ["fireball", "poison_cloud", "seeker_bolt", "piercing_lance", "mend", "haste"] {
        assert!(catalog.get(id).is_some(), "missing skill {id}");
    }
    let ids = catalog.ids();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "ids are listed in order");
}

#[test]
fn test_bundled_skill_shapes() {
    let catalog = SkillCatalog::load(DEFAULT_SKILLS_PATH).expect("bundled skills should load");

    let war_cry = catalog.require("war_cry").expect("war_cry exists");
    let kinds: Vec<EffectKind> = war_cry.effects.iter().map(EffectDescriptor::kind).collect();
    assert_eq!(kinds, vec![EffectKind::Buff, EffectKind::Damage]);

    let fireball = catalog.require("fireball").expect("fireball exists");
    assert_eq!(fireball.display_name(), "Fireball");
    assert_eq!(fireball.damage.value(1), 30.0);
    assert_eq!(fireball.damage.value(3), 42.0);

    let EffectDescriptor::Projectile(lance) = &catalog.require("piercing_lance").unwrap().effects[0]
    else {
        panic!("piercing_lance should be a projectile");
    };
    assert!(lance.piercing);
    assert_eq!(lance.max_pierce, 3);
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn test_minimal_definition_uses_defaults() {
    let catalog = parse(r#"(skills: [(id: "tap", effects: [Damage(())])])"#).expect("valid");
    let tap = catalog.require("tap").unwrap();

    assert_eq!(tap.display_name(), "tap");
    assert_eq!(tap.crit_chance, 0.0);
    assert_eq!(tap.crit_multiplier, 1.5);
    let EffectDescriptor::Damage(config) = &tap.effects[0] else {
        panic!("tap should be a damage effect");
    };
    assert!(config.damage_on_spawn);
    assert!(config.auto_destroy);
    assert_eq!(config.radius, 0.0);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_unknown_skill_lookup() {
    let catalog = parse("(skills: [])").expect("empty catalog is fine");
    assert!(catalog.is_empty());
    assert!(matches!(catalog.require("nope"), Err(CombatError::UnknownSkill(_))));
}

#[test]
fn test_duplicate_ids_rejected() {
    let result = parse(
        r#"(skills: [
            (id: "jab", effects: [Damage(())]),
            (id: "jab", effects: [Damage(())]),
        ])"#,
    );
    assert!(matches!(result, Err(CombatError::DuplicateSkill(ref id)) if id == "jab"));
}

#[test]
fn test_skill_level_rules() {
    let no_effects = parse(r#"(skills: [(id: "empty", effects: [])])"#);
    assert!(matches!(no_effects, Err(CombatError::InvalidSkill { .. })));

    let bad_crit = parse(r#"(skills: [(id: "lucky", crit_chance: 1.5, effects: [Damage(())])])"#);
    assert!(matches!(bad_crit, Err(CombatError::InvalidSkill { .. })));
}

#[test]
fn test_effect_level_rules() {
    let cases = [
        r#"(id: "dot", effects: [Damage((damage_over_time: true, tick_interval: 0.0))])"#,
        r#"(id: "hot", effects: [Heal((instant: false, tick_interval: 0.0))])"#,
        r#"(id: "stuck", effects: [Projectile((speed: 0.0))])"#,
        r#"(id: "short", effects: [Projectile((max_distance: 0.0))])"#,
        r#"(id: "blind", effects: [Projectile((homing: true, homing_radius: 0.0))])"#,
        r#"(id: "null", effects: [Buff((multiplier: (base: 0.0)))])"#,
        r#"(id: "past", effects: [Damage((lifetime: Some(-1.0)))])"#,
    ];
    for case in cases {
        let result = parse(&format!("(skills: [{case}])"));
        assert!(
            matches!(result, Err(CombatError::InvalidEffect { index: 0, .. })),
            "expected rejection for {case}, got {result:?}"
        );
    }
}

#[test]
fn test_parse_and_io_errors() {
    assert!(matches!(parse("(skills: [(id: ])"), Err(CombatError::Parse { .. })));
    assert!(matches!(
        SkillCatalog::load("does/not/exist.ron"),
        Err(CombatError::Io { .. })
    ));
}
