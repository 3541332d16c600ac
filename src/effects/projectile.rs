//! Projectile behavior
//!
//! Each tick, in order:
//! 1. Advance (or read the position back from the physics body)
//! 2. Fizzle once `max_distance` has been travelled
//! 3. Homing: pick a target if needed and turn towards it, limited by `turn_rate`
//! 4. Contacts: obstacles stop the projectile, qualifying targets take damage
//!
//! Contacts are swept along the whole step, so a fast projectile can't tunnel
//! through something that sits between two tick positions.
//!
//! An entity is damaged at most once per projectile. Piercing projectiles keep
//! going until `max_pierce` hits (unlimited when `max_pierce <= 0`).

use std::collections::HashSet;
use std::sync::Arc;

use bevy::prelude::*;

use super::apply::{apply_hit, Hit};
use super::{CastOrigin, EffectContext, EffectCore, EffectPlacement, EffectStatus, TIMER_EPSILON};
use crate::combat::components::{CombatTag, Velocity};
use crate::physics::{OverlapHit, QueryFilter, QueryShape, SpatialQuery};
use crate::skills::ProjectileEffectConfig;

/// Lower bound on the gap between swept contact samples
const MIN_SWEEP_SPACING: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct ProjectileBehavior {
    pub config: Arc<ProjectileEffectConfig>,
    /// Unit travel direction
    direction: Vec2,
    traveled: f32,
    last_position: Vec2,
    pierce_count: u32,
    hit: HashSet<Entity>,
    /// Non-owning; re-checked every tick
    homing_target: Option<Entity>,
    retarget_timer: f32,
}

impl ProjectileBehavior {
    pub fn new(config: Arc<ProjectileEffectConfig>) -> Self {
        Self {
            config,
            direction: Vec2::X,
            traveled: 0.0,
            last_position: Vec2::ZERO,
            pierce_count: 0,
            hit: HashSet::new(),
            homing_target: None,
            retarget_timer: 0.0,
        }
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn traveled(&self) -> f32 {
        self.traveled
    }

    pub fn pierce_count(&self) -> u32 {
        self.pierce_count
    }

    pub fn homing_target(&self) -> Option<Entity> {
        self.homing_target
    }

    pub fn initialize<P: SpatialQuery>(
        &mut self,
        _core: &EffectCore,
        _ctx: &mut EffectContext<P>,
        origin: &CastOrigin,
    ) -> EffectPlacement {
        self.direction = origin.direction();
        let position = origin.position + self.direction * self.config.forward_offset;
        self.last_position = position;

        EffectPlacement {
            position,
            velocity: self
                .config
                .physics_driven
                .then_some(self.direction * self.config.speed),
        }
    }

    pub fn tick<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        position: &mut Vec2,
        mut velocity: Option<&mut Velocity>,
    ) -> EffectStatus {
        let dt = ctx.dt;
        let start = self.last_position;

        if self.config.physics_driven && velocity.is_some() {
            self.traveled += position.distance(self.last_position);
        } else {
            *position += self.direction * self.config.speed * dt;
            self.traveled += self.config.speed * dt;
        }
        self.last_position = *position;

        if self.traveled + TIMER_EPSILON >= self.config.max_distance {
            return EffectStatus::Despawn { impact: false };
        }

        if self.config.homing {
            self.steer(core, ctx, *position);
            if let Some(velocity) = velocity.as_deref_mut() {
                velocity.0 = self.direction * self.config.speed;
            }
        }

        self.resolve_contacts(core, ctx, start, *position)
    }

    pub fn on_destroy<P: SpatialQuery>(&mut self, ctx: &mut EffectContext<P>, position: Vec2, impact: bool) {
        if impact {
            ctx.access
                .spawn_visual(self.config.impact_visual.as_deref(), position);
        }
    }

    fn is_homing_candidate<P: SpatialQuery>(
        &self,
        core: &EffectCore,
        ctx: &EffectContext<P>,
        entity: Entity,
    ) -> bool {
        entity != core.caster
            && !self.hit.contains(&entity)
            && ctx.access.is_alive(entity)
            && self
                .config
                .target_tags
                .accepts(ctx.access.tag_of(entity).as_ref())
    }

    fn steer<P: SpatialQuery>(&mut self, core: &EffectCore, ctx: &mut EffectContext<P>, position: Vec2) {
        self.retarget_timer -= ctx.dt;

        let held = self
            .homing_target
            .filter(|target| ctx.access.exists(*target) && self.is_homing_candidate(core, ctx, *target));
        self.homing_target = held;

        if self.homing_target.is_none() && self.retarget_timer <= TIMER_EPSILON {
            self.retarget_timer = self.config.homing_retarget_interval;
            self.homing_target = ctx
                .spatial
                .overlap(
                    QueryShape::circle(position, self.config.homing_radius),
                    QueryFilter::default().excluding(Some(core.caster)),
                )
                .into_iter()
                .filter(|hit| !hit.is_trigger && self.is_homing_candidate(core, ctx, hit.entity))
                .min_by(|a, b| {
                    position
                        .distance_squared(a.position)
                        .total_cmp(&position.distance_squared(b.position))
                })
                .map(|hit| hit.entity);
        }

        let Some(target_position) = self.homing_target.and_then(|t| ctx.access.position_of(t)) else {
            return;
        };
        let desired = (target_position - position).normalize_or_zero();
        if desired == Vec2::ZERO {
            return;
        }
        self.direction = turn_towards(self.direction, desired, self.config.turn_rate * ctx.dt);
    }

    /// Contacts met while moving from `from` to `to`, in travel order, each
    /// paired with the sample point that found it.
    fn sweep<P: SpatialQuery>(
        &self,
        core: &EffectCore,
        ctx: &EffectContext<P>,
        from: Vec2,
        to: Vec2,
    ) -> Vec<(OverlapHit, Vec2)> {
        let spacing = self.config.radius.max(MIN_SWEEP_SPACING);
        let samples = ((from.distance(to) / spacing).ceil() as usize).max(1);

        let mut seen = HashSet::new();
        let mut contacts = Vec::new();
        for i in 1..=samples {
            let point = from.lerp(to, i as f32 / samples as f32);
            let mut found: Vec<_> = ctx
                .spatial
                .overlap(
                    QueryShape::circle(point, self.config.radius),
                    QueryFilter::default().excluding(Some(core.caster)),
                )
                .into_iter()
                .filter(|hit| !hit.is_trigger && hit.entity != core.caster)
                .filter(|hit| seen.insert(hit.entity))
                .collect();
            found.sort_by(|a, b| {
                point
                    .distance_squared(a.position)
                    .total_cmp(&point.distance_squared(b.position))
            });
            contacts.extend(found.into_iter().map(|hit| (hit, point)));
        }
        contacts
    }

    fn resolve_contacts<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        from: Vec2,
        to: Vec2,
    ) -> EffectStatus {
        let contacts = self.sweep(core, ctx, from, to);

        for (contact, position) in contacts {
            let tag = ctx.access.tag_of(contact.entity);
            if tag == Some(CombatTag::Obstacle) {
                return EffectStatus::Despawn { impact: true };
            }
            if self.hit.contains(&contact.entity) || !self.config.target_tags.accepts(tag.as_ref()) {
                continue;
            }

            self.hit.insert(contact.entity);
            let hit = Hit {
                amount: core.damage,
                damage_type: core.damage_type,
                is_critical: core.is_critical,
                skill_id: core.skill_id(),
                caster: core.caster,
                knockback: self.config.knockback,
                show_damage_numbers: self.config.show_damage_numbers,
                visual: None,
                sound: self.config.hit_sound.as_deref(),
            };
            apply_hit(ctx.access, contact.entity, position, &hit);

            if !self.config.piercing {
                return EffectStatus::Despawn { impact: true };
            }
            self.pierce_count += 1;
            if self.config.max_pierce > 0 && self.pierce_count >= self.config.max_pierce as u32 {
                return EffectStatus::Despawn { impact: true };
            }
        }

        EffectStatus::Continue
    }
}

/// Rotate `current` towards `desired` by at most `max_degrees`.
pub fn turn_towards(current: Vec2, desired: Vec2, max_degrees: f32) -> Vec2 {
    let angle = current.perp_dot(desired).atan2(current.dot(desired));
    let max = max_degrees.max(0.0).to_radians();
    let step = angle.clamp(-max, max);
    Vec2::from_angle(step).rotate(current).normalize_or_zero()
}
