//! Target sensor
//!
//! Each agent with a `TargetSensor` looks for one hostile target per tick:
//! - Query a circle around the agent through the spatial provider
//! - Keep candidates with an accepted tag that are solid, alive and not the agent itself
//! - Apply the detection strategy (plain radius, facing cone or line of sight)
//!
//! Only transitions are reported. Gaining a target while holding none sends
//! `TargetAcquired`; having nothing eligible while holding a target sends
//! `TargetLost`. Swapping one held target for another is silent.

use bevy::prelude::*;

use crate::combat::components::{CombatTag, Facing, Health, Position, Stunned, TagFilter};
use crate::combat::events::{SensorOverride, SensorOverrideAction, TargetAcquired, TargetLost};
use crate::physics::{LayerMask, QueryFilter, QueryShape, SpatialQuery};

/// Angular slack for the cone edge, in degrees
const CONE_EPSILON_DEGREES: f32 = 1e-3;

/// How a sensor decides whether an in-range candidate is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionStrategy {
    /// Anything in range
    Radius,
    /// In range and within half of `angle_degrees` of the facing direction
    Cone { angle_degrees: f32 },
    /// In range and no obstacle on `obstacles` along the sight line
    LineOfSight { obstacles: LayerMask },
}

/// A change in what the sensor holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorTransition {
    Acquired(Entity),
    Lost(Entity),
}

/// Per-agent target sensor.
#[derive(Component, Debug, Clone)]
pub struct TargetSensor {
    pub radius: f32,
    pub strategy: DetectionStrategy,
    /// Tags a candidate must carry
    pub target_tags: TagFilter,
    /// Collision layers passed to the overlap query
    pub layers: LayerMask,
    /// Offset of the detection origin from the agent's position
    pub origin_offset: Vec2,
    target: Option<Entity>,
}

impl TargetSensor {
    pub fn new(radius: f32, strategy: DetectionStrategy, target_tags: TagFilter) -> Self {
        Self {
            radius,
            strategy,
            target_tags,
            layers: LayerMask::ALL,
            origin_offset: Vec2::ZERO,
            target: None,
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_origin_offset(mut self, offset: Vec2) -> Self {
        self.origin_offset = offset;
        self
    }

    /// Target held after the last evaluation or override
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Record the outcome of an evaluation and report the transition, if any.
    pub fn observe(&mut self, found: Option<Entity>) -> Option<SensorTransition> {
        match (self.target, found) {
            (None, Some(new)) => {
                self.target = Some(new);
                Some(SensorTransition::Acquired(new))
            }
            (Some(old), None) => {
                self.target = None;
                Some(SensorTransition::Lost(old))
            }
            (Some(_), Some(new)) => {
                self.target = Some(new);
                None
            }
            (None, None) => None,
        }
    }

    /// Hold `target` regardless of detection. Always reports an acquisition.
    pub fn force_set(&mut self, target: Entity) -> SensorTransition {
        self.target = Some(target);
        SensorTransition::Acquired(target)
    }

    /// Drop the held target. Reports a loss only if something was held.
    pub fn force_clear(&mut self) -> Option<SensorTransition> {
        self.target.take().map(SensorTransition::Lost)
    }

    /// Whether `point` is within the detection radius of `origin` (inclusive)
    pub fn point_in_range(&self, origin: Vec2, point: Vec2) -> bool {
        origin.distance(point) <= self.radius
    }

    /// Obstacle layers used for sight checks
    pub fn obstacle_layers(&self) -> LayerMask {
        match self.strategy {
            DetectionStrategy::LineOfSight { obstacles } => obstacles,
            _ => LayerMask::OBSTACLE,
        }
    }

    /// Whether nothing on the obstacle layers lies along the sight line.
    ///
    /// The ray runs towards `point` but spans the whole detection radius, so an
    /// obstacle just behind the point still blocks it.
    pub fn has_line_of_sight<P: SpatialQuery>(&self, spatial: &P, origin: Vec2, point: Vec2) -> bool {
        let offset = point - origin;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return true;
        }
        let length = self.radius.max(distance);
        spatial
            .raycast(origin, offset / distance, length, QueryFilter::layers(self.obstacle_layers()))
            .is_none()
    }

    /// Whether `point` is inside the cone opening around `facing`
    pub fn point_in_cone(&self, origin: Vec2, facing: Vec2, point: Vec2, angle_degrees: f32) -> bool {
        let offset = point - origin;
        if offset.length_squared() <= f32::EPSILON {
            return true;
        }
        let cos = offset.normalize().dot(facing.normalize_or_zero()).clamp(-1.0, 1.0);
        cos.acos().to_degrees() <= angle_degrees * 0.5 + CONE_EPSILON_DEGREES
    }

    /// Range check plus the strategy-specific constraint
    pub fn is_eligible<P: SpatialQuery>(
        &self,
        spatial: &P,
        origin: Vec2,
        facing: Vec2,
        point: Vec2,
    ) -> bool {
        if !self.point_in_range(origin, point) {
            return false;
        }
        match self.strategy {
            DetectionStrategy::Radius => true,
            DetectionStrategy::Cone { angle_degrees } => {
                self.point_in_cone(origin, facing, point, angle_degrees)
            }
            DetectionStrategy::LineOfSight { .. } => self.has_line_of_sight(spatial, origin, point),
        }
    }
}

fn send_transition(
    transition: SensorTransition,
    sensor: Entity,
    acquired: &mut EventWriter<TargetAcquired>,
    lost: &mut EventWriter<TargetLost>,
) {
    match transition {
        SensorTransition::Acquired(target) => {
            debug!("Sensor {sensor} acquired {target}");
            acquired.send(TargetAcquired { sensor, target });
        }
        SensorTransition::Lost(target) => {
            debug!("Sensor {sensor} lost {target}");
            lost.send(TargetLost { sensor, target });
        }
    }
}

/// Run every sensor once and report transitions.
///
/// Dead or stunned agents skip evaluation and keep whatever they hold.
pub fn evaluate_sensors<P: SpatialQuery>(
    spatial: Res<P>,
    mut sensors: Query<(
        Entity,
        &mut TargetSensor,
        &Position,
        Option<&Facing>,
        Option<&Health>,
        Has<Stunned>,
    )>,
    candidates: Query<(Option<&CombatTag>, Option<&Health>)>,
    mut acquired: EventWriter<TargetAcquired>,
    mut lost: EventWriter<TargetLost>,
) {
    for (entity, mut sensor, position, facing, health, stunned) in sensors.iter_mut() {
        if stunned || health.is_some_and(Health::is_dead) {
            continue;
        }

        let origin = position.0 + sensor.origin_offset;
        let facing = facing.copied().unwrap_or_default().vector();
        let hits = spatial.overlap(
            QueryShape::circle(origin, sensor.radius),
            QueryFilter::layers(sensor.layers).excluding(Some(entity)),
        );

        let found = hits
            .iter()
            .filter(|hit| !hit.is_trigger && hit.entity != entity)
            .find(|hit| {
                let Ok((tag, candidate_health)) = candidates.get(hit.entity) else {
                    return false;
                };
                sensor.target_tags.accepts(tag)
                    && candidate_health.map_or(true, Health::is_alive)
                    && sensor.is_eligible(&*spatial, origin, facing, hit.position)
            })
            .map(|hit| hit.entity);

        if let Some(transition) = sensor.observe(found) {
            send_transition(transition, entity, &mut acquired, &mut lost);
        }
    }
}

/// Apply `SensorOverride` requests.
pub fn apply_sensor_overrides(
    mut overrides: EventReader<SensorOverride>,
    mut sensors: Query<&mut TargetSensor>,
    mut acquired: EventWriter<TargetAcquired>,
    mut lost: EventWriter<TargetLost>,
) {
    for request in overrides.read() {
        let Ok(mut sensor) = sensors.get_mut(request.sensor) else {
            continue;
        };
        let transition = match request.action {
            SensorOverrideAction::Set(target) => Some(sensor.force_set(target)),
            SensorOverrideAction::Clear => sensor.force_clear(),
        };
        if let Some(transition) = transition {
            send_transition(transition, request.sensor, &mut acquired, &mut lost);
        }
    }
}
