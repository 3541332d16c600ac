//! Data-driven skill definitions
//!
//! Skills are defined in `assets/config/skills.ron` instead of Rust code. Each
//! skill lists one or more effect descriptors; casting the skill spawns one
//! effect instance per descriptor.
//!
//! ## Usage
//! ```ignore
//! fn my_system(catalog: Res<SkillCatalog>) {
//!     if let Some(fireball) = catalog.get("fireball") {
//!         println!("Fireball level 3 damage: {}", fireball.damage.value(3));
//!     }
//! }
//! ```
//!
//! Definitions and descriptors are shared behind `Arc`: effect instances hold a
//! reference to their descriptor and never copy or mutate it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::components::{CombatTag, StatKind, TagFilter};
use crate::combat::error::{CombatError, CombatResult};
use crate::combat::events::{DamageType, EffectKind};

/// Default path of the skill definitions file
pub const DEFAULT_SKILLS_PATH: &str = "assets/config/skills.ron";

/// A value that grows linearly with skill level.
///
/// `value(level) = base + per_level * (level - 1)`, with level 0 treated as 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelScaling {
    pub base: f32,
    #[serde(default)]
    pub per_level: f32,
}

impl LevelScaling {
    pub fn flat(base: f32) -> Self {
        Self {
            base,
            per_level: 0.0,
        }
    }

    pub fn value(&self, level: u32) -> f32 {
        self.base + self.per_level * (level.max(1) - 1) as f32
    }
}

fn default_crit_multiplier() -> f32 {
    1.5
}

fn default_damage_type() -> DamageType {
    DamageType::Physical
}

/// One skill as loaded from RON. Immutable after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Unique key used by cast requests
    pub id: String,
    /// Display name (falls back to the id)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub damage: LevelScaling,
    /// Seconds; drives DoT/HoT length, buff length and effect lifetimes
    #[serde(default)]
    pub duration: LevelScaling,
    #[serde(default = "default_damage_type")]
    pub damage_type: DamageType,
    /// Probability in [0, 1] that a cast is critical
    #[serde(default)]
    pub crit_chance: f32,
    /// Damage multiplier for critical casts
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f32,
    /// Sound played when the cast is accepted
    #[serde(default)]
    pub cast_sound: Option<String>,
    /// Spawned in order, one effect instance each
    pub effects: Vec<EffectDescriptor>,
}

impl SkillDefinition {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Per-effect configuration, one variant per behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EffectDescriptor {
    Damage(Arc<DamageEffectConfig>),
    Projectile(Arc<ProjectileEffectConfig>),
    Heal(Arc<HealEffectConfig>),
    Buff(Arc<BuffEffectConfig>),
}

impl EffectDescriptor {
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectDescriptor::Damage(_) => EffectKind::Damage,
            EffectDescriptor::Projectile(_) => EffectKind::Projectile,
            EffectDescriptor::Heal(_) => EffectKind::Heal,
            EffectDescriptor::Buff(_) => EffectKind::Buff,
        }
    }

    /// Lifetime override and auto-destroy switch shared by every behavior
    pub fn lifetime(&self) -> (Option<f32>, bool) {
        match self {
            EffectDescriptor::Damage(c) => (c.lifetime, c.auto_destroy),
            EffectDescriptor::Projectile(c) => (c.lifetime, c.auto_destroy),
            EffectDescriptor::Heal(c) => (c.lifetime, c.auto_destroy),
            EffectDescriptor::Buff(c) => (c.lifetime, c.auto_destroy),
        }
    }
}

fn default_enemy_tags() -> TagFilter {
    TagFilter::new(&[CombatTag::Enemy])
}

fn default_ally_tags() -> TagFilter {
    TagFilter::new(&[CombatTag::Player, CombatTag::Ally])
}

/// Instant or area damage, optionally over time or on trigger contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageEffectConfig {
    /// Area radius; `<= 0` switches to a forward ray probe
    pub radius: f32,
    /// Length of the forward ray probe
    pub probe_distance: f32,
    /// Distance in front of the caster where the effect is centred
    pub forward_offset: f32,
    pub damage_on_spawn: bool,
    pub damage_over_time: bool,
    /// Seconds between DoT passes
    pub tick_interval: f32,
    /// Damage each qualifying entity that enters `trigger_radius`, once
    pub damage_on_trigger: bool,
    pub trigger_radius: f32,
    pub target_tags: TagFilter,
    /// Impulse magnitude applied along origin -> target
    pub knockback: f32,
    pub show_damage_numbers: bool,
    pub hit_visual: Option<String>,
    pub hit_sound: Option<String>,
    pub lifetime: Option<f32>,
    pub auto_destroy: bool,
}

impl Default for DamageEffectConfig {
    fn default() -> Self {
        Self {
            radius: 0.0,
            probe_distance: 1.5,
            forward_offset: 0.0,
            damage_on_spawn: true,
            damage_over_time: false,
            tick_interval: 0.5,
            damage_on_trigger: false,
            trigger_radius: 0.0,
            target_tags: default_enemy_tags(),
            knockback: 0.0,
            show_damage_numbers: true,
            hit_visual: None,
            hit_sound: None,
            lifetime: None,
            auto_destroy: true,
        }
    }
}

/// Travelling projectile, optionally homing and piercing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileEffectConfig {
    /// Units per second
    pub speed: f32,
    /// Distance after which the projectile fizzles
    pub max_distance: f32,
    /// Contact radius
    pub radius: f32,
    pub forward_offset: f32,
    /// Move through a `Velocity` body instead of stepping the position directly
    pub physics_driven: bool,
    pub piercing: bool,
    /// Hits before a piercing projectile is spent; `<= 0` is unlimited
    pub max_pierce: i32,
    pub homing: bool,
    pub homing_radius: f32,
    /// Degrees per second
    pub turn_rate: f32,
    /// Seconds between target re-acquisition attempts (0 = every tick)
    pub homing_retarget_interval: f32,
    pub target_tags: TagFilter,
    pub knockback: f32,
    pub show_damage_numbers: bool,
    pub impact_visual: Option<String>,
    pub hit_sound: Option<String>,
    pub lifetime: Option<f32>,
    pub auto_destroy: bool,
}

impl Default for ProjectileEffectConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            max_distance: 20.0,
            radius: 0.25,
            forward_offset: 0.5,
            physics_driven: false,
            piercing: false,
            max_pierce: 0,
            homing: false,
            homing_radius: 6.0,
            turn_rate: 180.0,
            homing_retarget_interval: 0.0,
            target_tags: default_enemy_tags(),
            knockback: 0.0,
            show_damage_numbers: true,
            impact_visual: None,
            hit_sound: None,
            lifetime: None,
            auto_destroy: true,
        }
    }
}

/// Instant or over-time healing for the caster and nearby allies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealEffectConfig {
    /// Heal amount; the skill's resolved damage when absent
    pub amount: Option<LevelScaling>,
    pub instant: bool,
    /// Seconds between HoT ticks
    pub tick_interval: f32,
    pub heal_self: bool,
    pub heal_allies: bool,
    pub radius: f32,
    pub ally_tags: TagFilter,
    pub heal_visual: Option<String>,
    pub lifetime: Option<f32>,
    pub auto_destroy: bool,
}

impl Default for HealEffectConfig {
    fn default() -> Self {
        Self {
            amount: None,
            instant: true,
            tick_interval: 1.0,
            heal_self: true,
            heal_allies: false,
            radius: 0.0,
            ally_tags: default_ally_tags(),
            heal_visual: None,
            lifetime: None,
            auto_destroy: true,
        }
    }
}

/// Timed stat multiplier for the caster and nearby allies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffEffectConfig {
    pub stat: StatKind,
    pub multiplier: LevelScaling,
    pub buff_self: bool,
    pub buff_allies: bool,
    pub radius: f32,
    pub ally_tags: TagFilter,
    /// Indicator spawned on each buffed target
    pub visual: Option<String>,
    /// Keep the indicator on the target instead of leaving it in place
    pub visual_follows_target: bool,
    /// Lifetime of a free-standing indicator
    pub visual_lifetime: f32,
    pub lifetime: Option<f32>,
    pub auto_destroy: bool,
}

impl Default for BuffEffectConfig {
    fn default() -> Self {
        Self {
            stat: StatKind::MoveSpeed,
            multiplier: LevelScaling::flat(1.0),
            buff_self: true,
            buff_allies: false,
            radius: 0.0,
            ally_tags: default_ally_tags(),
            visual: None,
            visual_follows_target: true,
            visual_lifetime: 1.0,
            lifetime: None,
            auto_destroy: true,
        }
    }
}

/// Root structure for the skills.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct SkillsFile {
    pub skills: Vec<SkillDefinition>,
}

/// Resource containing every skill definition, keyed by id.
#[derive(Resource, Debug, Default, Clone)]
pub struct SkillCatalog {
    definitions: HashMap<String, Arc<SkillDefinition>>,
}

impl SkillCatalog {
    /// Build a catalog from definitions, validating each one.
    pub fn from_definitions(skills: Vec<SkillDefinition>) -> CombatResult<Self> {
        let mut catalog = Self::default();
        for skill in skills {
            catalog.insert(skill)?;
        }
        Ok(catalog)
    }

    /// Parse RON text. `origin` names the source in error messages.
    pub fn from_ron_str(contents: &str, origin: &str) -> CombatResult<Self> {
        let file: SkillsFile = ron::from_str(contents).map_err(|source| CombatError::Parse {
            path: origin.to_string(),
            source,
        })?;
        Self::from_definitions(file.skills)
    }

    /// Load and validate a skills file
    pub fn load(path: impl AsRef<Path>) -> CombatResult<Self> {
        let path = path.as_ref();
        let display_path = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| CombatError::Io {
            path: display_path.clone(),
            source,
        })?;
        let catalog = Self::from_ron_str(&contents, &display_path)?;
        info!("Loaded {} skill definitions from {}", catalog.len(), display_path);
        Ok(catalog)
    }

    /// Validate and add one definition
    pub fn insert(&mut self, skill: SkillDefinition) -> CombatResult<()> {
        if self.definitions.contains_key(&skill.id) {
            return Err(CombatError::DuplicateSkill(skill.id));
        }
        validate_skill(&skill)?;
        self.definitions.insert(skill.id.clone(), Arc::new(skill));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<SkillDefinition>> {
        self.definitions.get(id)
    }

    /// Like `get`, but an unknown id is an error
    pub fn require(&self, id: &str) -> CombatResult<&Arc<SkillDefinition>> {
        self.get(id)
            .ok_or_else(|| CombatError::UnknownSkill(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All skill ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn invalid_effect(skill: &SkillDefinition, index: usize, reason: impl Into<String>) -> CombatError {
    CombatError::InvalidEffect {
        skill: skill.id.clone(),
        index,
        reason: reason.into(),
    }
}

/// Reject configurations the runtime can't honour. Merely odd ones get a warning.
pub fn validate_skill(skill: &SkillDefinition) -> CombatResult<()> {
    let invalid = |reason: &str| CombatError::InvalidSkill {
        skill: skill.id.clone(),
        reason: reason.to_string(),
    };

    if skill.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if skill.effects.is_empty() {
        return Err(invalid("skill has no effects"));
    }
    if !(0.0..=1.0).contains(&skill.crit_chance) {
        return Err(invalid("crit_chance must be between 0 and 1"));
    }
    if skill.crit_multiplier < 1.0 {
        warn!(
            "Skill '{}' has crit_multiplier {} below 1; critical casts will be weaker",
            skill.id, skill.crit_multiplier
        );
    }

    for (index, effect) in skill.effects.iter().enumerate() {
        if let (Some(lifetime), _) = effect.lifetime() {
            if lifetime < 0.0 {
                return Err(invalid_effect(skill, index, "lifetime must not be negative"));
            }
        }

        match effect {
            EffectDescriptor::Damage(config) => {
                if config.damage_over_time && config.tick_interval <= 0.0 {
                    return Err(invalid_effect(
                        skill,
                        index,
                        "damage over time needs a positive tick_interval",
                    ));
                }
                if config.damage_on_trigger && config.trigger_radius <= 0.0 {
                    warn!(
                        "Skill '{}' effect #{}: damage_on_trigger with no trigger_radius is disabled",
                        skill.id, index
                    );
                }
                warn_empty_tags(skill, index, &config.target_tags, true);
            }
            EffectDescriptor::Projectile(config) => {
                if config.speed <= 0.0 {
                    return Err(invalid_effect(skill, index, "projectile speed must be positive"));
                }
                if config.max_distance <= 0.0 {
                    return Err(invalid_effect(
                        skill,
                        index,
                        "projectile max_distance must be positive",
                    ));
                }
                if config.turn_rate < 0.0 {
                    return Err(invalid_effect(skill, index, "turn_rate must not be negative"));
                }
                if config.homing && config.homing_radius <= 0.0 {
                    return Err(invalid_effect(
                        skill,
                        index,
                        "homing projectiles need a positive homing_radius",
                    ));
                }
                warn_empty_tags(skill, index, &config.target_tags, true);
            }
            EffectDescriptor::Heal(config) => {
                if !config.instant && config.tick_interval <= 0.0 {
                    return Err(invalid_effect(
                        skill,
                        index,
                        "heal over time needs a positive tick_interval",
                    ));
                }
                warn_empty_tags(skill, index, &config.ally_tags, config.heal_allies);
            }
            EffectDescriptor::Buff(config) => {
                if config.multiplier.base <= 0.0 {
                    return Err(invalid_effect(skill, index, "buff multiplier must be positive"));
                }
                warn_empty_tags(skill, index, &config.ally_tags, config.buff_allies);
            }
        }
    }

    Ok(())
}

fn warn_empty_tags(skill: &SkillDefinition, index: usize, tags: &TagFilter, used: bool) {
    if used && tags.is_empty() {
        warn!(
            "Skill '{}' effect #{} has an empty tag filter and will never find a target",
            skill.id, index
        );
    }
}

/// Bevy plugin that loads the skill catalog at startup.
///
/// A missing or invalid file is fatal: casts would otherwise silently fail.
pub struct SkillCatalogPlugin {
    pub path: String,
}

impl Default for SkillCatalogPlugin {
    fn default() -> Self {
        Self {
            path: DEFAULT_SKILLS_PATH.to_string(),
        }
    }
}

impl Plugin for SkillCatalogPlugin {
    fn build(&self, app: &mut App) {
        match SkillCatalog::load(&self.path) {
            Ok(catalog) => {
                app.insert_resource(catalog);
            }
            Err(e) => {
                panic!("Failed to load skill definitions: {}", e);
            }
        }
    }
}
