//! Heal behavior
//!
//! Instant heals land once at initialization. Heals over time split the total
//! evenly over `ceil(duration / tick_interval)` ticks and apply exactly that
//! many. Allies are re-queried around the caster on every tick.

use std::sync::Arc;

use bevy::prelude::*;

use super::apply::{apply_heal, targets_in_radius};
use super::{CastOrigin, EffectContext, EffectCore, EffectPlacement, EffectStatus, TIMER_EPSILON};
use crate::physics::SpatialQuery;
use crate::skills::HealEffectConfig;

#[derive(Debug, Clone)]
pub struct HealBehavior {
    pub config: Arc<HealEffectConfig>,
    total: f32,
    per_tick: f32,
    ticks_total: u32,
    ticks_done: u32,
    accumulator: f32,
    /// Healing actually accepted by receivers so far
    restored: f32,
}

impl HealBehavior {
    pub fn new(config: Arc<HealEffectConfig>) -> Self {
        Self {
            config,
            total: 0.0,
            per_tick: 0.0,
            ticks_total: 0,
            ticks_done: 0,
            accumulator: 0.0,
            restored: 0.0,
        }
    }

    pub fn ticks_total(&self) -> u32 {
        self.ticks_total
    }

    pub fn ticks_done(&self) -> u32 {
        self.ticks_done
    }

    pub fn per_tick(&self) -> f32 {
        self.per_tick
    }

    pub fn restored(&self) -> f32 {
        self.restored
    }

    /// Every scheduled tick fits inside the instance's lifetime
    pub fn minimum_lifetime(&self) -> f32 {
        if self.config.instant {
            0.0
        } else {
            self.ticks_total as f32 * self.config.tick_interval
        }
    }

    pub fn initialize<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        origin: &CastOrigin,
    ) -> EffectPlacement {
        self.total = self
            .config
            .amount
            .map_or(core.damage, |amount| amount.value(core.level))
            .max(0.0);

        if self.config.instant {
            self.heal_pass(core, ctx, origin.position, self.total);
        } else if self.config.tick_interval > 0.0 {
            self.ticks_total =
                ((core.duration / self.config.tick_interval - TIMER_EPSILON).ceil() as u32).max(1);
            self.per_tick = self.total / self.ticks_total as f32;
        }

        EffectPlacement::at(origin.position)
    }

    pub fn tick<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        position: Vec2,
    ) -> EffectStatus {
        if self.ticks_done >= self.ticks_total {
            return EffectStatus::Continue;
        }

        let interval = self.config.tick_interval;
        let center = ctx.access.position_of(core.caster).unwrap_or(position);
        self.accumulator += ctx.dt;
        while self.accumulator + TIMER_EPSILON >= interval && self.ticks_done < self.ticks_total {
            self.accumulator -= interval;
            self.ticks_done += 1;
            self.heal_pass(core, ctx, center, self.per_tick);
        }

        EffectStatus::Continue
    }

    fn heal_pass<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        center: Vec2,
        amount: f32,
    ) {
        if amount <= 0.0 {
            return;
        }

        let mut targets = Vec::new();
        if self.config.heal_self {
            targets.push(core.caster);
        }
        if self.config.heal_allies {
            targets.extend(targets_in_radius(
                ctx.spatial,
                ctx.access,
                center,
                self.config.radius,
                &self.config.ally_tags,
                core.caster,
            ));
        }

        for target in targets {
            self.restored += apply_heal(
                ctx.access,
                target,
                amount,
                core.skill_id(),
                core.caster,
                self.config.heal_visual.as_deref(),
            );
        }
    }
}
