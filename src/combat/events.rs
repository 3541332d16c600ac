//! Combat events
//!
//! Requests flowing into the core (casts, sensor overrides, despawns), state
//! changes flowing out of it (acquired/lost targets, damage, healing, buffs) and
//! fire-and-forget requests for the physics and presentation layers.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::components::StatKind;

/// Types of damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Fire,
    Frost,
    Lightning,
    Poison,
    Holy,
    Shadow,
}

// ============================================================================
// Requests
// ============================================================================

/// Request to cast a skill. Sent by the AI or input layer before a tick.
#[derive(Event, Debug, Clone)]
pub struct CastSkill {
    pub caster: Entity,
    pub skill_id: String,
    pub level: u32,
    /// Aim direction for projectiles; caster facing is used when `None`
    pub aim: Option<Vec2>,
}

/// Manual override of a sensor's held target.
#[derive(Event, Debug, Clone, Copy)]
pub struct SensorOverride {
    pub sensor: Entity,
    pub action: SensorOverrideAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorOverrideAction {
    /// Hold this target, bypassing detection
    Set(Entity),
    /// Drop whatever is held
    Clear,
}

/// Request to despawn an effect instance before its time runs out.
#[derive(Event, Debug, Clone, Copy)]
pub struct DespawnEffect {
    pub instance: Entity,
}

// ============================================================================
// Perception
// ============================================================================

/// A sensor picked up a target while holding none
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetAcquired {
    pub sensor: Entity,
    pub target: Entity,
}

/// A sensor dropped its target. The target entity may no longer exist.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLost {
    pub sensor: Entity,
    pub target: Entity,
}

// ============================================================================
// Casting & effects
// ============================================================================

/// A cast was accepted and its values resolved
#[derive(Event, Debug, Clone)]
pub struct SkillCast {
    pub caster: Entity,
    pub skill_id: String,
    pub level: u32,
    pub damage: f32,
    pub duration: f32,
    pub is_critical: bool,
    pub effects_spawned: usize,
}

/// A cast request was dropped
#[derive(Event, Debug, Clone)]
pub struct CastRejected {
    pub caster: Entity,
    pub skill_id: String,
    pub reason: CastRejectReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRejectReason {
    UnknownSkill,
    CasterMissing,
    CasterDead,
}

/// Which behavior an effect instance runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Damage,
    Projectile,
    Heal,
    Buff,
}

/// Why an effect instance was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnReason {
    /// Lifetime budget used up
    Expired,
    /// The behavior ended itself (impact, max distance, pierce limit)
    Terminal,
    /// `DespawnEffect` request
    Requested,
}

/// An effect instance was destroyed
#[derive(Event, Debug, Clone)]
pub struct EffectExpired {
    pub instance: Entity,
    pub skill_id: String,
    pub kind: EffectKind,
    pub reason: DespawnReason,
}

/// Event fired when damage is dealt
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    /// Caster, if it still existed when the hit landed
    pub source: Option<Entity>,
    pub target: Entity,
    pub amount: f32,
    pub damage_type: DamageType,
    pub is_critical: bool,
    pub skill_id: String,
}

/// Event fired when healing actually restored health
#[derive(Event, Debug, Clone)]
pub struct HealApplied {
    pub source: Option<Entity>,
    pub target: Entity,
    /// Amount the effect tried to restore
    pub requested: f32,
    /// Amount the health capability accepted
    pub amount: f32,
    pub skill_id: String,
}

/// Event fired when a buff lands on a target
#[derive(Event, Debug, Clone)]
pub struct BuffApplied {
    pub source: Option<Entity>,
    pub target: Entity,
    pub stat: StatKind,
    pub multiplier: f32,
    pub duration: f32,
    pub skill_id: String,
}

/// Event fired when a hit takes an agent from alive to dead
#[derive(Event, Debug, Clone, Copy)]
pub struct AgentDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

// ============================================================================
// Outbound: physics & presentation
// ============================================================================

/// Ask the physics layer to push `target`
#[derive(Event, Debug, Clone, Copy)]
pub struct KnockbackImpulse {
    pub target: Entity,
    /// Unit direction
    pub direction: Vec2,
    pub magnitude: f32,
}

#[derive(Event, Debug, Clone)]
pub struct SpawnFloatingDamage {
    pub position: Vec2,
    pub amount: f32,
    pub damage_type: DamageType,
    pub is_critical: bool,
}

#[derive(Event, Debug, Clone)]
pub struct SpawnVisual {
    pub prefab: String,
    pub position: Vec2,
}

#[derive(Event, Debug, Clone)]
pub struct PlaySound {
    pub clip: String,
}
