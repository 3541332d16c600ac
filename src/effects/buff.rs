//! Buff behavior
//!
//! Applies a timed stat multiplier once, to the caster and/or allies in range.
//! An optional indicator either sticks to each target or stands on its own for
//! `visual_lifetime`. Indicators still around when the buff instance goes away
//! are removed with it.

use std::sync::Arc;

use bevy::prelude::*;

use super::apply::targets_in_radius;
use super::{CastOrigin, EffectContext, EffectCore, EffectPlacement};
use crate::combat::components::{Position, StatModifier};
use crate::combat::events::BuffApplied;
use crate::physics::SpatialQuery;
use crate::skills::BuffEffectConfig;

/// Presentation entity spawned by a buff.
#[derive(Component, Debug, Clone)]
pub struct EffectVisual {
    pub prefab: String,
    /// Target whose position the indicator tracks
    pub follow: Option<Entity>,
    /// Seconds left for free-standing indicators
    pub remaining: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct BuffBehavior {
    pub config: Arc<BuffEffectConfig>,
    multiplier: f32,
    targets: Vec<Entity>,
    visuals: Vec<Entity>,
}

impl BuffBehavior {
    pub fn new(config: Arc<BuffEffectConfig>) -> Self {
        Self {
            config,
            multiplier: 1.0,
            targets: Vec::new(),
            visuals: Vec::new(),
        }
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Agents the buff landed on
    pub fn targets(&self) -> &[Entity] {
        &self.targets
    }

    pub fn initialize<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        origin: &CastOrigin,
    ) -> EffectPlacement {
        self.multiplier = self.config.multiplier.value(core.level);

        if self.config.buff_self && ctx.access.exists(core.caster) {
            self.targets.push(core.caster);
        }
        if self.config.buff_allies {
            self.targets.extend(targets_in_radius(
                ctx.spatial,
                ctx.access,
                origin.position,
                self.config.radius,
                &self.config.ally_tags,
                core.caster,
            ));
        }

        for target in self.targets.clone() {
            self.apply_to(core, ctx, target);
        }

        EffectPlacement::at(origin.position)
    }

    fn apply_to<P: SpatialQuery>(&mut self, core: &EffectCore, ctx: &mut EffectContext<P>, target: Entity) {
        if let Ok(mut modifiers) = ctx.access.modifiers.get_mut(target) {
            modifiers.push(StatModifier {
                stat: self.config.stat,
                multiplier: self.multiplier,
                remaining: Some(core.duration),
                source: ctx.entity,
            });
        }

        debug!(
            "{} buffs {target}: {:?} x{:.2} for {:.1}s",
            core.skill_id(),
            self.config.stat,
            self.multiplier,
            core.duration
        );
        ctx.access.buffs.send(BuffApplied {
            source: Some(core.caster),
            target,
            stat: self.config.stat,
            multiplier: self.multiplier,
            duration: core.duration,
            skill_id: core.skill_id().to_string(),
        });

        let Some(prefab) = self.config.visual.clone() else {
            return;
        };
        let Some(position) = ctx.access.position_of(target) else {
            return;
        };
        let (follow, remaining) = if self.config.visual_follows_target {
            (Some(target), None)
        } else {
            (None, Some(self.config.visual_lifetime))
        };
        ctx.access.spawn_visual(Some(&prefab), position);
        let visual = ctx
            .access
            .commands
            .spawn((
                EffectVisual {
                    prefab,
                    follow,
                    remaining,
                },
                Position(position),
            ))
            .id();
        self.visuals.push(visual);
    }

    /// Remove indicators that are still alive
    pub fn on_destroy<P: SpatialQuery>(&mut self, ctx: &mut EffectContext<P>) {
        for visual in self.visuals.drain(..) {
            if let Some(mut entity) = ctx.access.commands.get_entity(visual) {
                entity.despawn();
            }
        }
    }
}
