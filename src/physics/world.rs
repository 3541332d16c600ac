//! Reference spatial query provider
//!
//! `CollisionWorld` is rebuilt from `Position` + `Collider` components at the
//! start of every tick and answers queries by brute force. Good enough for
//! tests and small headless scenarios; a game plugs its own physics backend in
//! through [`SpatialQuery`] instead.

use bevy::prelude::*;

use super::{LayerMask, OverlapHit, QueryFilter, QueryShape, RayHit, SpatialQuery};
use crate::combat::components::{LinearDamping, Position, Velocity};
use crate::combat::events::KnockbackImpulse;
use crate::combat::{CombatClock, CombatPhase, CombatTick};

/// Geometry of a collider, relative to its entity's `Position`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Circle { radius: f32 },
    /// Axis-aligned box
    Rect { half_extents: Vec2 },
}

/// Collision shape registered with the reference provider.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub layers: LayerMask,
    /// Trigger-only (non-solid) shape
    pub is_trigger: bool,
}

impl Collider {
    pub fn circle(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Circle { radius },
            layers: LayerMask::DEFAULT,
            is_trigger: false,
        }
    }

    pub fn rect(half_extents: Vec2) -> Self {
        Self {
            shape: ColliderShape::Rect { half_extents },
            layers: LayerMask::DEFAULT,
            is_trigger: false,
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct ColliderRecord {
    entity: Entity,
    position: Vec2,
    collider: Collider,
}

/// Brute-force collision world. Results are ordered by entity so that
/// iteration order is stable from tick to tick.
#[derive(Resource, Debug, Default)]
pub struct CollisionWorld {
    records: Vec<ColliderRecord>,
}

impl CollisionWorld {
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn insert(&mut self, entity: Entity, position: Vec2, collider: Collider) {
        self.records.push(ColliderRecord {
            entity,
            position,
            collider,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sort(&mut self) {
        self.records.sort_by_key(|record| record.entity);
    }

    fn passes(record: &ColliderRecord, filter: &QueryFilter) -> bool {
        record.collider.layers.intersects(filter.layers) && filter.exclude != Some(record.entity)
    }
}

impl SpatialQuery for CollisionWorld {
    fn overlap(&self, shape: QueryShape, filter: QueryFilter) -> Vec<OverlapHit> {
        let QueryShape::Circle { center, radius } = shape;

        self.records
            .iter()
            .filter(|record| Self::passes(record, &filter))
            .filter(|record| circle_overlaps(center, radius, record.position, record.collider.shape))
            .map(|record| OverlapHit {
                entity: record.entity,
                position: record.position,
                is_trigger: record.collider.is_trigger,
            })
            .collect()
    }

    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        self.records
            .iter()
            .filter(|record| !record.collider.is_trigger && Self::passes(record, &filter))
            .filter_map(|record| {
                let distance = match record.collider.shape {
                    ColliderShape::Circle { radius } => {
                        ray_circle(origin, direction, record.position, radius)
                    }
                    ColliderShape::Rect { half_extents } => {
                        ray_rect(origin, direction, record.position, half_extents)
                    }
                }?;
                (distance <= max_distance).then_some(RayHit {
                    entity: record.entity,
                    point: origin + direction * distance,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn circle_overlaps(center: Vec2, radius: f32, position: Vec2, shape: ColliderShape) -> bool {
    match shape {
        ColliderShape::Circle { radius: other } => center.distance(position) <= radius + other,
        ColliderShape::Rect { half_extents } => {
            let closest = center.clamp(position - half_extents, position + half_extents);
            center.distance(closest) <= radius
        }
    }
}

/// Distance along a unit ray to a circle, 0 when starting inside it.
fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some((-b - discriminant.sqrt()).max(0.0))
}

/// Slab test against an axis-aligned box.
fn ray_rect(origin: Vec2, direction: Vec2, center: Vec2, half_extents: Vec2) -> Option<f32> {
    let min = center - half_extents;
    let max = center + half_extents;
    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d.abs() < 1e-6 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t1, mut t2) = ((lo - o) * inv, (hi - o) * inv);
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

// ============================================================================
// Systems
// ============================================================================

/// Turn knockback requests into velocity changes on bodies that have one.
pub fn apply_knockback_impulses(
    mut impulses: EventReader<KnockbackImpulse>,
    mut bodies: Query<&mut Velocity>,
) {
    for impulse in impulses.read() {
        if let Ok(mut velocity) = bodies.get_mut(impulse.target) {
            velocity.0 += impulse.direction * impulse.magnitude;
        }
    }
}

/// Move every body by its velocity and apply damping.
pub fn integrate_bodies(
    clock: Res<CombatClock>,
    mut bodies: Query<(&mut Position, &mut Velocity, Option<&LinearDamping>)>,
) {
    let dt = clock.delta;
    for (mut position, mut velocity, damping) in bodies.iter_mut() {
        position.0 += velocity.0 * dt;
        if let Some(damping) = damping {
            velocity.0 *= (1.0 - damping.0 * dt).max(0.0);
        }
    }
}

/// Rebuild the collision world from the current colliders.
pub fn sync_collision_world(
    mut world: ResMut<CollisionWorld>,
    colliders: Query<(Entity, &Position, &Collider)>,
) {
    world.clear();
    for (entity, position, collider) in colliders.iter() {
        world.insert(entity, position.0, *collider);
    }
    world.sort();
}

/// Registers `CollisionWorld` and keeps it in sync each tick.
///
/// Knockback events are registered by `CombatCorePlugin`.
pub struct ReferencePhysicsPlugin;

impl Plugin for ReferencePhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionWorld>().add_systems(
            CombatTick,
            (apply_knockback_impulses, integrate_bodies, sync_collision_world)
                .chain()
                .in_set(CombatPhase::Physics),
        );
    }
}
