//! Effect instance lifecycle
//!
//! A cast spawns one effect entity per descriptor of the skill. Each entity
//! carries an `EffectInstance`: the values bound at cast time plus the running
//! state of one behavior (damage, projectile, heal or buff).
//!
//! Lifecycle per instance:
//! 1. Spawned and initialized while casting (initialization runs exactly once)
//! 2. Ticked once per `CombatTick`, starting with the tick after the cast
//! 3. Destroyed at most once: budget used up, behavior finished, or a
//!    `DespawnEffect` request

use std::collections::HashSet;
use std::sync::Arc;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

pub mod apply;
pub mod buff;
pub mod damage;
pub mod heal;
pub mod projectile;

use crate::combat::components::{
    CombatTag, Facing, Health, Position, StatModifiers, Velocity,
};
use crate::combat::events::*;
use crate::combat::{CombatClock, CombatRng};
use crate::physics::SpatialQuery;
use crate::skills::{EffectDescriptor, SkillCatalog, SkillDefinition, SkillInstance};

pub use buff::{BuffBehavior, EffectVisual};
pub use damage::DamageBehavior;
pub use heal::HealBehavior;
pub use projectile::ProjectileBehavior;

/// Slack for timer comparisons, in seconds
pub const TIMER_EPSILON: f32 = 1e-4;

/// Values bound to an effect instance when it is spawned. Read-only afterwards,
/// apart from the elapsed time.
#[derive(Debug, Clone)]
pub struct EffectCore {
    pub definition: Arc<SkillDefinition>,
    /// Non-owning; lookups fail once the caster is despawned
    pub caster: Entity,
    pub level: u32,
    pub damage: f32,
    pub duration: f32,
    pub damage_type: DamageType,
    pub is_critical: bool,
    /// Simulation time at spawn
    pub spawned_at: f32,
    /// Tick at spawn; the instance is first ticked on the following one
    pub spawned_tick: u64,
    /// Seconds ticked so far
    pub elapsed: f32,
    /// Budget after which an auto-destroying instance is removed
    pub lifetime: f32,
    pub auto_destroy: bool,
}

impl EffectCore {
    pub fn skill_id(&self) -> &str {
        &self.definition.id
    }

    pub fn remaining(&self) -> f32 {
        (self.lifetime - self.elapsed).max(0.0)
    }
}

/// Running state of one behavior
#[derive(Debug, Clone)]
pub enum EffectBehavior {
    Damage(DamageBehavior),
    Projectile(ProjectileBehavior),
    Heal(HealBehavior),
    Buff(BuffBehavior),
}

impl EffectBehavior {
    pub fn from_descriptor(descriptor: &EffectDescriptor) -> Self {
        match descriptor {
            EffectDescriptor::Damage(config) => {
                EffectBehavior::Damage(DamageBehavior::new(config.clone()))
            }
            EffectDescriptor::Projectile(config) => {
                EffectBehavior::Projectile(ProjectileBehavior::new(config.clone()))
            }
            EffectDescriptor::Heal(config) => EffectBehavior::Heal(HealBehavior::new(config.clone())),
            EffectDescriptor::Buff(config) => EffectBehavior::Buff(BuffBehavior::new(config.clone())),
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            EffectBehavior::Damage(_) => EffectKind::Damage,
            EffectBehavior::Projectile(_) => EffectKind::Projectile,
            EffectBehavior::Heal(_) => EffectKind::Heal,
            EffectBehavior::Buff(_) => EffectKind::Buff,
        }
    }

    /// Lifetime used when the descriptor doesn't set one
    pub fn default_lifetime(&self) -> f32 {
        match self {
            EffectBehavior::Projectile(_) => 5.0,
            EffectBehavior::Damage(_) | EffectBehavior::Heal(_) | EffectBehavior::Buff(_) => 0.0,
        }
    }

    /// Shortest lifetime that lets the behavior finish its scheduled work
    pub fn minimum_lifetime(&self) -> f32 {
        match self {
            EffectBehavior::Damage(behavior) => behavior.minimum_lifetime(),
            EffectBehavior::Heal(behavior) => behavior.minimum_lifetime(),
            EffectBehavior::Projectile(_) | EffectBehavior::Buff(_) => 0.0,
        }
    }

    pub fn initialize<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        origin: &CastOrigin,
    ) -> EffectPlacement {
        match self {
            EffectBehavior::Damage(behavior) => behavior.initialize(core, ctx, origin),
            EffectBehavior::Projectile(behavior) => behavior.initialize(core, ctx, origin),
            EffectBehavior::Heal(behavior) => behavior.initialize(core, ctx, origin),
            EffectBehavior::Buff(behavior) => behavior.initialize(core, ctx, origin),
        }
    }

    pub fn tick<P: SpatialQuery>(
        &mut self,
        core: &EffectCore,
        ctx: &mut EffectContext<P>,
        position: &mut Vec2,
        velocity: Option<&mut Velocity>,
    ) -> EffectStatus {
        match self {
            EffectBehavior::Damage(behavior) => behavior.tick(core, ctx, *position),
            EffectBehavior::Projectile(behavior) => behavior.tick(core, ctx, position, velocity),
            EffectBehavior::Heal(behavior) => behavior.tick(core, ctx, *position),
            EffectBehavior::Buff(_) => EffectStatus::Continue,
        }
    }

    pub fn on_destroy<P: SpatialQuery>(
        &mut self,
        ctx: &mut EffectContext<P>,
        position: Vec2,
        impact: bool,
    ) {
        match self {
            EffectBehavior::Projectile(behavior) => behavior.on_destroy(ctx, position, impact),
            EffectBehavior::Buff(behavior) => behavior.on_destroy(ctx),
            EffectBehavior::Damage(_) | EffectBehavior::Heal(_) => {}
        }
    }
}

/// One running effect.
#[derive(Component, Debug, Clone)]
pub struct EffectInstance {
    pub core: EffectCore,
    pub behavior: EffectBehavior,
    initialized: bool,
    destroyed: bool,
}

impl EffectInstance {
    pub fn kind(&self) -> EffectKind {
        self.behavior.kind()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// What a behavior asks of the lifecycle after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
    Continue,
    /// Destroy now; `impact` selects the impact presentation
    Despawn { impact: bool },
}

/// Where the caster stood when the skill went off.
#[derive(Debug, Clone, Copy)]
pub struct CastOrigin {
    pub position: Vec2,
    pub facing: Vec2,
    pub aim: Option<Vec2>,
}

impl CastOrigin {
    /// Aim if one was given, else facing, else +X
    pub fn direction(&self) -> Vec2 {
        if let Some(aim) = self.aim.map(Vec2::normalize_or_zero) {
            if aim != Vec2::ZERO {
                return aim;
            }
        }
        let facing = self.facing.normalize_or_zero();
        if facing == Vec2::ZERO {
            Vec2::X
        } else {
            facing
        }
    }
}

/// Initial transform of a freshly spawned effect entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPlacement {
    pub position: Vec2,
    /// Physics body velocity, for physics-driven behaviors
    pub velocity: Option<Vec2>,
}

impl EffectPlacement {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: None,
        }
    }
}

/// World access shared by the casting and effect systems.
#[derive(SystemParam)]
pub struct CombatAccess<'w, 's> {
    pub agents: Query<
        'w,
        's,
        (&'static Position, Option<&'static Facing>, Option<&'static CombatTag>),
        Without<EffectInstance>,
    >,
    pub healths: Query<'w, 's, &'static mut Health>,
    pub modifiers: Query<'w, 's, &'static mut StatModifiers>,
    pub commands: Commands<'w, 's>,
    pub damage: EventWriter<'w, DamageDealt>,
    pub heals: EventWriter<'w, HealApplied>,
    pub buffs: EventWriter<'w, BuffApplied>,
    pub deaths: EventWriter<'w, AgentDied>,
    pub knockback: EventWriter<'w, KnockbackImpulse>,
    pub floating: EventWriter<'w, SpawnFloatingDamage>,
    pub visuals: EventWriter<'w, SpawnVisual>,
    pub sounds: EventWriter<'w, PlaySound>,
}

impl CombatAccess<'_, '_> {
    pub fn position_of(&self, entity: Entity) -> Option<Vec2> {
        self.agents.get(entity).ok().map(|(position, _, _)| position.0)
    }

    pub fn tag_of(&self, entity: Entity) -> Option<CombatTag> {
        self.agents.get(entity).ok().and_then(|(_, _, tag)| tag.copied())
    }

    pub fn exists(&self, entity: Entity) -> bool {
        self.agents.contains(entity)
    }

    /// False only for agents whose health capability reads dead
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.healths.get(entity).map_or(true, |health| health.is_alive())
    }

    pub fn play_sound(&mut self, clip: Option<&str>) {
        if let Some(clip) = clip {
            self.sounds.send(PlaySound {
                clip: clip.to_string(),
            });
        }
    }

    pub fn spawn_visual(&mut self, prefab: Option<&str>, position: Vec2) {
        if let Some(prefab) = prefab {
            self.visuals.send(SpawnVisual {
                prefab: prefab.to_string(),
                position,
            });
        }
    }
}

/// Everything a behavior may touch while initializing or ticking.
pub struct EffectContext<'a, 'w, 's, P: SpatialQuery> {
    pub spatial: &'a P,
    pub access: &'a mut CombatAccess<'w, 's>,
    /// The effect entity itself
    pub entity: Entity,
    pub dt: f32,
}

// ============================================================================
// Systems
// ============================================================================

/// Turn cast requests into effect instances.
#[allow(clippy::too_many_arguments)]
pub fn resolve_casts<P: SpatialQuery>(
    spatial: Res<P>,
    catalog: Res<SkillCatalog>,
    clock: Res<CombatClock>,
    mut rng: ResMut<CombatRng>,
    mut requests: EventReader<CastSkill>,
    mut cast_events: EventWriter<SkillCast>,
    mut rejected: EventWriter<CastRejected>,
    mut access: CombatAccess,
) {
    for request in requests.read() {
        let reject = |reason| CastRejected {
            caster: request.caster,
            skill_id: request.skill_id.clone(),
            reason,
        };

        let Some(definition) = catalog.get(&request.skill_id) else {
            warn!("Cast of unknown skill '{}' ignored", request.skill_id);
            rejected.send(reject(CastRejectReason::UnknownSkill));
            continue;
        };
        let Ok((position, facing, _)) = access.agents.get(request.caster) else {
            rejected.send(reject(CastRejectReason::CasterMissing));
            continue;
        };
        if !access.is_alive(request.caster) {
            rejected.send(reject(CastRejectReason::CasterDead));
            continue;
        }

        let origin = CastOrigin {
            position: position.0,
            facing: facing.copied().unwrap_or_default().vector(),
            aim: request.aim,
        };
        let instance = SkillInstance::resolve(definition.clone(), request.caster, request.level, &mut rng);

        for (index, descriptor) in definition.effects.iter().enumerate() {
            spawn_effect(&*spatial, &mut access, &clock, &instance, index, descriptor, &origin);
        }

        access.play_sound(definition.cast_sound.as_deref());
        debug!(
            "{} cast by {} (level {}, damage {:.1}, duration {:.2}{})",
            instance.skill_id(),
            request.caster,
            instance.level,
            instance.damage,
            instance.duration,
            if instance.is_critical { ", critical" } else { "" }
        );
        cast_events.send(SkillCast {
            caster: request.caster,
            skill_id: instance.skill_id().to_string(),
            level: instance.level,
            damage: instance.damage,
            duration: instance.duration,
            is_critical: instance.is_critical,
            effects_spawned: definition.effects.len(),
        });
    }
}

fn spawn_effect<P: SpatialQuery>(
    spatial: &P,
    access: &mut CombatAccess,
    clock: &CombatClock,
    instance: &SkillInstance,
    index: usize,
    descriptor: &EffectDescriptor,
    origin: &CastOrigin,
) {
    let entity = access.commands.spawn_empty().id();
    let (lifetime_override, auto_destroy) = descriptor.lifetime();

    let mut behavior = EffectBehavior::from_descriptor(descriptor);
    let mut core = EffectCore {
        definition: instance.definition.clone(),
        caster: instance.caster,
        level: instance.level,
        damage: instance.damage,
        duration: instance.duration,
        damage_type: instance.damage_type,
        is_critical: instance.is_critical,
        spawned_at: clock.elapsed,
        spawned_tick: clock.tick,
        elapsed: 0.0,
        lifetime: 0.0,
        auto_destroy,
    };

    let placement = {
        let mut ctx = EffectContext {
            spatial,
            access: &mut *access,
            entity,
            dt: 0.0,
        };
        behavior.initialize(&core, &mut ctx, origin)
    };

    core.lifetime = core
        .duration
        .max(lifetime_override.unwrap_or_else(|| behavior.default_lifetime()))
        .max(behavior.minimum_lifetime());

    let name = Name::new(format!("{}#{}", instance.skill_id(), index));
    let mut commands = access.commands.entity(entity);
    commands.insert((
        EffectInstance {
            core,
            behavior,
            initialized: true,
            destroyed: false,
        },
        Position(placement.position),
        name,
    ));
    if let Some(velocity) = placement.velocity {
        commands.insert(Velocity(velocity));
    }
}

/// Advance every effect instance and destroy the ones that are done.
pub fn tick_effects<P: SpatialQuery>(
    spatial: Res<P>,
    clock: Res<CombatClock>,
    mut despawn_requests: EventReader<DespawnEffect>,
    mut expired: EventWriter<EffectExpired>,
    mut effects: Query<(Entity, &mut EffectInstance, &mut Position, Option<&mut Velocity>)>,
    mut access: CombatAccess,
) {
    let requested: HashSet<Entity> = despawn_requests.read().map(|r| r.instance).collect();
    let dt = clock.delta;

    for (entity, mut instance, mut position, mut velocity) in effects.iter_mut() {
        if instance.destroyed || !instance.initialized {
            continue;
        }
        let EffectInstance { core, behavior, .. } = &mut *instance;

        let mut ctx = EffectContext {
            spatial: &*spatial,
            access: &mut access,
            entity,
            dt,
        };

        let outcome = if requested.contains(&entity) {
            Some((DespawnReason::Requested, false))
        } else if core.spawned_tick == clock.tick {
            None
        } else {
            core.elapsed += dt;
            match behavior.tick(core, &mut ctx, &mut position.0, velocity.as_deref_mut()) {
                EffectStatus::Despawn { impact } => Some((DespawnReason::Terminal, impact)),
                EffectStatus::Continue
                    if core.auto_destroy && core.elapsed + TIMER_EPSILON >= core.lifetime =>
                {
                    Some((DespawnReason::Expired, false))
                }
                EffectStatus::Continue => None,
            }
        };

        let Some((reason, impact)) = outcome else {
            continue;
        };

        behavior.on_destroy(&mut ctx, position.0, impact);
        let kind = behavior.kind();
        let skill_id = core.skill_id().to_string();
        instance.destroyed = true;

        debug!("Effect {entity} ({skill_id} {kind:?}) destroyed: {reason:?}");
        expired.send(EffectExpired {
            instance: entity,
            skill_id,
            kind,
            reason,
        });
        access.commands.entity(entity).despawn();
    }
}

/// Move buff indicators with their targets and expire free-standing ones.
pub fn drive_effect_visuals(
    mut commands: Commands,
    clock: Res<CombatClock>,
    mut visuals: Query<(Entity, &mut EffectVisual, &mut Position)>,
    targets: Query<&Position, Without<EffectVisual>>,
) {
    for (entity, mut visual, mut position) in visuals.iter_mut() {
        if let Some(follow) = visual.follow {
            match targets.get(follow) {
                Ok(target) => position.0 = target.0,
                Err(_) => {
                    commands.entity(entity).despawn();
                    continue;
                }
            }
        }

        if let Some(remaining) = visual.remaining.as_mut() {
            *remaining -= clock.delta;
            if *remaining <= TIMER_EPSILON {
                commands.entity(entity).despawn();
            }
        }
    }
}
