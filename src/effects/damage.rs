//! Damage / area behavior
//!
//! Three independent modes, all driven by one descriptor:
//! - On spawn: one damage pass
//! - Over time: the same pass every `tick_interval` for the resolved duration
//!
//! A pass is a forward ray probe when `radius <= 0`, an area query otherwise.
//! - On trigger: anything qualifying that overlaps `trigger_radius` is hit once

use std::collections::HashSet;
use std::sync::Arc;

use bevy::prelude::*;

use super::apply::{apply_hit, targets_in_radius, Hit};
use super::{CastOrigin, EffectContext, EffectCore, EffectPlacement, EffectStatus, TIMER_EPSILON};
use crate::physics::{QueryFilter, SpatialQuery};
use crate::skills::DamageEffectConfig;

#[derive(Debug, Clone)]
pub struct DamageBehavior {
    pub config: Arc<DamageEffectConfig>,
    direction: Vec2,
    accumulator: f32,
    ticks_done: u32,
    ticks_total: u32,
    /// Entities already hit by the trigger volume
    triggered: HashSet<Entity>,
}

impl DamageBehavior {
    pub fn new(config: Arc<DamageEffectConfig>) -> Self {
        Self {
            config,
            direction: Vec2::X,
            accumulator: 0.0,
            ticks_done: 0,
            ticks_total: 0,
            triggered: HashSet::new(),
        }
    }

    /// Number of DoT passes scheduled for this instance
    pub fn ticks_total(&self) -> u32 {
        self.ticks_total
    }

    pub fn ticks_done(&self) -> u32 {
        self.ticks_done
    }

    pub fn minimum_lifetime(&self) -> f32 {
        self.ticks_total as f32 * self.config.tick_interval
    }

    fn hit<'a>(&'a self, core: &'a EffectCore) -> Hit<'a> {
        Hit {
            amount: core.damage,
            damage_type: core.damage_type,
            is_critical: core.is_critical,
            skill_id: core.skill_id(),
            caster: core.caster,
            knockback: self.config.knockback,
            show_damage_numbers: self.config.show_damage_numbers,
            visual: self.config.hit_visual.as_deref(),
            sound: self.config.hit_sound.as_deref(),
        }
    }

    pub fn initialize<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        origin: &CastOrigin,
    ) -> EffectPlacement {
        self.direction = origin.direction();
        let center = origin.position + self.direction * self.config.forward_offset;

        if self.config.damage_over_time && self.config.tick_interval > 0.0 {
            self.ticks_total =
                (core.duration / self.config.tick_interval + TIMER_EPSILON).floor() as u32;
        }

        if self.config.damage_on_spawn {
            self.damage_pass(core, ctx, center);
        }

        EffectPlacement::at(center)
    }

    pub fn tick<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        position: Vec2,
    ) -> EffectStatus {
        if self.ticks_done < self.ticks_total {
            let interval = self.config.tick_interval;
            self.accumulator += ctx.dt;
            while self.accumulator + TIMER_EPSILON >= interval && self.ticks_done < self.ticks_total {
                self.accumulator -= interval;
                self.ticks_done += 1;
                self.damage_pass(core, ctx, position);
            }
        }

        if self.config.damage_on_trigger && self.config.trigger_radius > 0.0 {
            self.trigger_pass(core, ctx, position);
        }

        EffectStatus::Continue
    }

    fn damage_pass<P: SpatialQuery>(&self, core: &EffectCore, ctx: &mut EffectContext<P>, center: Vec2) {
        if self.config.radius <= 0.0 {
            self.probe(core, ctx, center);
        } else {
            self.area_pass(core, ctx, center);
        }
    }

    /// Forward ray; only the first solid thing in the way can be hit.
    fn probe<P: SpatialQuery>(&self, core: &EffectCore, ctx: &mut EffectContext<P>, origin: Vec2) {
        let filter = QueryFilter::default().excluding(Some(core.caster));
        let Some(ray_hit) =
            ctx.spatial
                .raycast(origin, self.direction, self.config.probe_distance, filter)
        else {
            return;
        };
        let tag = ctx.access.tag_of(ray_hit.entity);
        if self.config.target_tags.accepts(tag.as_ref()) {
            apply_hit(ctx.access, ray_hit.entity, origin, &self.hit(core));
        }
    }

    fn area_pass<P: SpatialQuery>(&self, core: &EffectCore, ctx: &mut EffectContext<P>, center: Vec2) {
        let targets = targets_in_radius(
            ctx.spatial,
            ctx.access,
            center,
            self.config.radius,
            &self.config.target_tags,
            core.caster,
        );
        let hit = self.hit(core);
        for target in targets {
            apply_hit(ctx.access, target, center, &hit);
        }
    }

    fn trigger_pass<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        center: Vec2,
    ) {
        let targets = targets_in_radius(
            ctx.spatial,
            ctx.access,
            center,
            self.config.trigger_radius,
            &self.config.target_tags,
            core.caster,
        );
        for target in targets {
            if self.triggered.insert(target) {
                apply_hit(ctx.access, target, center, &self.hit(core));
            }
        }
    }
}
