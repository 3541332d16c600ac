//! Damage and healing application shared by the behaviors.

use bevy::prelude::*;

use super::CombatAccess;
use crate::combat::components::TagFilter;
use crate::combat::events::{
    AgentDied, DamageDealt, DamageType, HealApplied, KnockbackImpulse, SpawnFloatingDamage,
};
use crate::physics::{QueryFilter, QueryShape, SpatialQuery};

/// One hit's worth of damage and its side effects
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub amount: f32,
    pub damage_type: DamageType,
    pub is_critical: bool,
    pub skill_id: &'a str,
    pub caster: Entity,
    /// Impulse magnitude; 0 disables knockback
    pub knockback: f32,
    pub show_damage_numbers: bool,
    pub visual: Option<&'a str>,
    pub sound: Option<&'a str>,
}

/// Damage `target`, pushing it away from `origin`.
///
/// Targets without a health capability, or already dead, are left alone.
/// Returns whether damage was applied.
pub fn apply_hit(access: &mut CombatAccess, target: Entity, origin: Vec2, hit: &Hit) -> bool {
    let Ok(mut health) = access.healths.get_mut(target) else {
        return false;
    };
    if health.is_dead() {
        return false;
    }
    health.take_damage(hit.amount);
    let died = health.is_dead();
    let remaining = health.current;

    let source = access.exists(hit.caster).then_some(hit.caster);
    let target_position = access.position_of(target).unwrap_or(origin);

    debug!(
        "{} hits {target} for {:.1} ({:.1} left)",
        hit.skill_id, hit.amount, remaining
    );
    access.damage.send(DamageDealt {
        source,
        target,
        amount: hit.amount,
        damage_type: hit.damage_type,
        is_critical: hit.is_critical,
        skill_id: hit.skill_id.to_string(),
    });
    if died {
        access.deaths.send(AgentDied {
            entity: target,
            killer: source,
        });
    }

    if hit.show_damage_numbers {
        access.floating.send(SpawnFloatingDamage {
            position: target_position,
            amount: hit.amount,
            damage_type: hit.damage_type,
            is_critical: hit.is_critical,
        });
    }
    access.spawn_visual(hit.visual, target_position);
    access.play_sound(hit.sound);

    if hit.knockback > 0.0 {
        let direction = (target_position - origin).normalize_or_zero();
        if direction != Vec2::ZERO {
            access.knockback.send(KnockbackImpulse {
                target,
                direction,
                magnitude: hit.knockback,
            });
        }
    }

    true
}

/// Restore up to `amount` health on `target`. Returns the amount restored.
///
/// A heal that restores nothing (full health, dead, no health capability)
/// produces no event and no visual.
pub fn apply_heal(
    access: &mut CombatAccess,
    target: Entity,
    amount: f32,
    skill_id: &str,
    caster: Entity,
    visual: Option<&str>,
) -> f32 {
    let Ok(mut health) = access.healths.get_mut(target) else {
        return 0.0;
    };
    let restored = health.heal(amount);
    if restored <= 0.0 {
        return 0.0;
    }

    let source = access.exists(caster).then_some(caster);
    access.heals.send(HealApplied {
        source,
        target,
        requested: amount,
        amount: restored,
        skill_id: skill_id.to_string(),
    });
    if let Some(position) = access.position_of(target) {
        access.spawn_visual(visual, position);
    }
    restored
}

/// Solid agents within `radius` of `center` whose tag passes `tags`, excluding
/// `caster`. Provider order is kept.
pub fn targets_in_radius<P: SpatialQuery>(
    spatial: &P,
    access: &CombatAccess,
    center: Vec2,
    radius: f32,
    tags: &TagFilter,
    caster: Entity,
) -> Vec<Entity> {
    if radius <= 0.0 {
        return Vec::new();
    }
    spatial
        .overlap(
            QueryShape::circle(center, radius),
            QueryFilter::default().excluding(Some(caster)),
        )
        .into_iter()
        .filter(|hit| !hit.is_trigger && hit.entity != caster)
        .filter(|hit| tags.accepts(access.tag_of(hit.entity).as_ref()))
        .map(|hit| hit.entity)
        .collect()
}
