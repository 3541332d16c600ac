//! Agent components
//!
//! Capabilities an entity can carry to take part in combat. Every capability is
//! optional: effects look them up per target and silently skip entities that
//! don't have them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// World-space position on the 2D combat plane.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Vec2);

/// Horizontal facing. Only the sign matters: negative faces -X, anything else +X.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Facing(pub f32);

impl Default for Facing {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Facing {
    pub const RIGHT: Facing = Facing(1.0);
    pub const LEFT: Facing = Facing(-1.0);

    /// Unit facing vector (±X)
    pub fn vector(&self) -> Vec2 {
        if self.0 < 0.0 {
            Vec2::NEG_X
        } else {
            Vec2::X
        }
    }
}

/// Gameplay category used to decide who an effect may hit or help.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatTag {
    Player,
    Enemy,
    Ally,
    Obstacle,
    Neutral,
}

impl CombatTag {
    pub fn name(&self) -> &'static str {
        match self {
            CombatTag::Player => "Player",
            CombatTag::Enemy => "Enemy",
            CombatTag::Ally => "Ally",
            CombatTag::Obstacle => "Obstacle",
            CombatTag::Neutral => "Neutral",
        }
    }
}

/// A set of tags an effect or sensor accepts. Usually one or two entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagFilter(pub SmallVec<[CombatTag; 4]>);

impl TagFilter {
    pub fn new(tags: &[CombatTag]) -> Self {
        Self(SmallVec::from_slice(tags))
    }

    pub fn contains(&self, tag: CombatTag) -> bool {
        self.0.contains(&tag)
    }

    /// Whether an entity carrying `tag` (if any) passes this filter
    pub fn accepts(&self, tag: Option<&CombatTag>) -> bool {
        tag.is_some_and(|tag| self.contains(*tag))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Health capability.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Health {
    pub current: f32,
    pub maximum: f32,
}

impl Health {
    pub fn new(maximum: f32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).max(0.0);
    }

    /// Restore up to `amount` health, returning how much was actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead() {
            return 0.0;
        }
        let restored = (self.current + amount.max(0.0)).min(self.maximum) - self.current;
        self.current += restored;
        restored
    }

    pub fn fraction(&self) -> f32 {
        if self.maximum <= 0.0 {
            0.0
        } else {
            self.current / self.maximum
        }
    }
}

/// Marker: agent is stunned. Stunned agents don't run their sensors.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Stunned;

/// Linear velocity of a physics body, in units per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec2);

/// Fraction of velocity lost per second by the reference physics integrator.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LinearDamping(pub f32);

/// Stats a buff can modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    MoveSpeed,
    AttackSpeed,
    DamageDealt,
    DamageTaken,
}

/// One timed multiplier on a stat.
#[derive(Debug, Clone, PartialEq)]
pub struct StatModifier {
    pub stat: StatKind,
    pub multiplier: f32,
    /// Seconds left; `None` lasts until removed
    pub remaining: Option<f32>,
    /// Effect instance that applied the modifier
    pub source: Entity,
}

/// Stat-modifier capability. Buffs push entries here; `expire_stat_modifiers`
/// removes them when their time runs out.
#[derive(Component, Debug, Clone, Default)]
pub struct StatModifiers {
    pub entries: Vec<StatModifier>,
}

impl StatModifiers {
    pub fn push(&mut self, modifier: StatModifier) {
        self.entries.push(modifier);
    }

    /// Combined multiplier of every active entry for `stat` (1.0 when none)
    pub fn multiplier(&self, stat: StatKind) -> f32 {
        self.entries
            .iter()
            .filter(|m| m.stat == stat)
            .map(|m| m.multiplier)
            .product()
    }

    /// Advance timers and drop expired entries. Returns how many were removed.
    pub fn tick(&mut self, dt: f32) -> usize {
        let before = self.entries.len();
        for modifier in self.entries.iter_mut() {
            if let Some(remaining) = modifier.remaining.as_mut() {
                *remaining -= dt;
            }
        }
        self.entries
            .retain(|m| m.remaining.map_or(true, |remaining| remaining > 1e-4));
        before - self.entries.len()
    }
}

/// Tick stat modifier timers on every agent that carries them.
pub fn expire_stat_modifiers(
    clock: Res<super::CombatClock>,
    mut modifiers: Query<&mut StatModifiers>,
) {
    for mut stats in modifiers.iter_mut() {
        if stats.entries.is_empty() {
            continue;
        }
        stats.tick(clock.delta);
    }
}
