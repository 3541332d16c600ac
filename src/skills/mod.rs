//! Skill definitions and per-cast resolution

pub mod catalog;
pub mod instance;

pub use catalog::{
    BuffEffectConfig, DamageEffectConfig, EffectDescriptor, HealEffectConfig, LevelScaling,
    ProjectileEffectConfig, SkillCatalog, SkillCatalogPlugin, SkillDefinition,
    DEFAULT_SKILLS_PATH,
};
pub use instance::SkillInstance;
