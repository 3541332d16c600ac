//! Per-cast resolution of a skill definition.

use std::sync::Arc;

use bevy::prelude::*;

use super::catalog::SkillDefinition;
use crate::combat::events::DamageType;
use crate::combat::CombatRng;

/// Values resolved once when a skill is cast.
///
/// Built by the casting system, handed to each spawned effect, then dropped.
/// Nothing here changes after `resolve`.
#[derive(Debug, Clone)]
pub struct SkillInstance {
    pub definition: Arc<SkillDefinition>,
    /// Non-owning; the caster may be despawned while effects still run
    pub caster: Entity,
    pub level: u32,
    pub damage: f32,
    pub duration: f32,
    pub damage_type: DamageType,
    pub is_critical: bool,
}

impl SkillInstance {
    /// Resolve level scaling and roll for a critical hit.
    ///
    /// The RNG is only consumed when the skill can crit, so adding a non-crit
    /// skill to a seeded scenario doesn't shift everyone else's rolls.
    pub fn resolve(
        definition: Arc<SkillDefinition>,
        caster: Entity,
        level: u32,
        rng: &mut CombatRng,
    ) -> Self {
        let level = level.max(1);
        let is_critical = definition.crit_chance > 0.0 && rng.chance(definition.crit_chance);

        let mut damage = definition.damage.value(level).max(0.0);
        if is_critical {
            damage *= definition.crit_multiplier;
        }
        let duration = definition.duration.value(level).max(0.0);
        let damage_type = definition.damage_type;

        Self {
            definition,
            caster,
            level,
            damage,
            duration,
            damage_type,
            is_critical,
        }
    }

    pub fn skill_id(&self) -> &str {
        &self.definition.id
    }
}
