//! Spatial query contract
//!
//! The combat core never owns collision geometry. It asks a provider resource
//! "what overlaps this shape" and "what does this ray hit first", and sends
//! knockback requests back as events. Any physics backend can sit behind
//! [`SpatialQuery`]; [`world::CollisionWorld`] is a brute-force reference
//! implementation used by tests and the headless runner.

use std::ops::BitOr;

use bevy::prelude::*;

pub mod world;

pub use world::{CollisionWorld, ReferencePhysicsPlugin};

/// Collision layer bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const DEFAULT: LayerMask = LayerMask(1 << 0);
    pub const PLAYER: LayerMask = LayerMask(1 << 1);
    pub const ENEMY: LayerMask = LayerMask(1 << 2);
    pub const ALLY: LayerMask = LayerMask(1 << 3);
    pub const OBSTACLE: LayerMask = LayerMask(1 << 4);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        LayerMask(self.0 | rhs.0)
    }
}

/// Region for an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryShape {
    Circle { center: Vec2, radius: f32 },
}

impl QueryShape {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        QueryShape::Circle { center, radius }
    }
}

/// Which colliders a query may report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryFilter {
    pub layers: LayerMask,
    /// Collider to skip (usually the querying agent)
    pub exclude: Option<Entity>,
}

impl QueryFilter {
    pub fn layers(layers: LayerMask) -> Self {
        Self {
            layers,
            exclude: None,
        }
    }

    pub fn excluding(mut self, entity: Option<Entity>) -> Self {
        self.exclude = entity;
        self
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::layers(LayerMask::ALL)
    }
}

/// One collider returned by an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapHit {
    pub entity: Entity,
    /// Collider centre
    pub position: Vec2,
    /// Trigger-only shapes are reported; callers decide whether to skip them
    pub is_trigger: bool,
}

/// First solid collider along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub point: Vec2,
    pub distance: f32,
}

/// Provider of overlap and ray queries.
///
/// Implementations must be side-effect free: the core calls them many times per
/// tick from sensors and effects. Raycasts never report trigger shapes.
/// Overlap results must come back in a stable order between ticks.
pub trait SpatialQuery: Resource {
    fn overlap(&self, shape: QueryShape, filter: QueryFilter) -> Vec<OverlapHit>;

    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit>;
}
