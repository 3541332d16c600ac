//! Combat core
//!
//! Scheduling and shared state for the combat simulation:
//! - `CombatTick` schedule and its ordered `CombatPhase` sets
//! - `CombatClock` and the explicit [`tick`] entry point
//! - `CombatCorePlugin`, generic over the spatial query provider
//! - Agent components, events, combat logging and errors

use std::marker::PhantomData;

use bevy::ecs::schedule::{ExecutorKind, ScheduleLabel};
use bevy::prelude::*;
use rand::prelude::*;

pub mod components;
pub mod error;
pub mod events;
pub mod log;
pub mod systems;

use crate::effects::{drive_effect_visuals, resolve_casts, tick_effects};
use crate::physics::SpatialQuery;
use crate::sensor::{apply_sensor_overrides, evaluate_sensors};
use crate::skills::SkillCatalog;
use components::expire_stat_modifiers;
use error::{CombatError, CombatResult};
use events::*;
use systems::{record_combat_log, rotate_events};

/// Schedule holding every combat system. Run once per [`tick`].
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombatTick;

/// Ordered phases inside `CombatTick`.
///
/// Commands queued in one phase are applied before the next one starts, so an
/// effect spawned while casting is visible to the effects phase of the same tick.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CombatPhase {
    /// Impulses, body integration, provider sync
    Physics,
    /// Target sensors and overrides
    Perception,
    /// Cast requests become effect instances
    Casting,
    /// Behavior ticks, lifetimes, visuals, stat modifiers
    Effects,
    /// Combat log and event housekeeping
    Bookkeeping,
}

/// Simulation time as seen by the combat systems.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct CombatClock {
    /// Seconds advanced by the current tick
    pub delta: f32,
    /// Seconds since the first tick
    pub elapsed: f32,
    /// Number of ticks run so far (the current tick included)
    pub tick: u64,
}

impl CombatClock {
    pub fn advance(&mut self, dt: f32) {
        self.delta = dt;
        self.elapsed += dt;
        self.tick += 1;
    }
}

/// Advance the simulation by `dt` seconds and run every combat system once.
///
/// This is the entry point for an external scheduler. Nothing in the core keeps
/// its own timers or threads; all time flows in through here.
pub fn tick(world: &mut World, dt: f32) {
    world
        .get_resource_or_insert_with(CombatClock::default)
        .advance(dt.max(0.0));
    world.run_schedule(CombatTick);
}

/// Check that the spatial query provider `P` has been inserted.
pub fn ensure_provider<P: SpatialQuery>(world: &World) -> CombatResult<()> {
    if world.contains_resource::<P>() {
        Ok(())
    } else {
        Err(CombatError::ProviderUnavailable(std::any::type_name::<P>()))
    }
}

/// Random number generator for combat rolls (critical hits).
///
/// With a seed the same inputs always produce the same rolls. Without one it
/// draws from system entropy.
#[derive(Resource)]
pub struct CombatRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl CombatRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Random f32 in [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Roll against a probability in [0, 1]
    pub fn chance(&mut self, probability: f32) -> bool {
        probability > 0.0 && self.random_f32() < probability
    }
}

impl Default for CombatRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Who advances the `CombatTick` schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickDriver {
    /// The host calls [`tick`] itself
    #[default]
    Manual,
    /// Run one tick per `FixedUpdate`, using `Time<Fixed>` as the step
    FixedUpdate,
}

/// Plugin for the combat core, generic over the spatial query provider `P`.
///
/// The provider resource must exist by the time the app finishes building
/// (insert it directly or add a plugin such as `ReferencePhysicsPlugin`).
pub struct CombatCorePlugin<P: SpatialQuery> {
    pub driver: TickDriver,
    _provider: PhantomData<fn() -> P>,
}

impl<P: SpatialQuery> CombatCorePlugin<P> {
    pub fn new(driver: TickDriver) -> Self {
        Self {
            driver,
            _provider: PhantomData,
        }
    }
}

impl<P: SpatialQuery> Default for CombatCorePlugin<P> {
    fn default() -> Self {
        Self::new(TickDriver::Manual)
    }
}

impl<P: SpatialQuery> Plugin for CombatCorePlugin<P> {
    fn build(&self, app: &mut App) {
        app.edit_schedule(CombatTick, |schedule| {
            schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        });

        app.configure_sets(
            CombatTick,
            (
                CombatPhase::Physics,
                CombatPhase::Perception,
                CombatPhase::Casting,
                CombatPhase::Effects,
                CombatPhase::Bookkeeping,
            )
                .chain(),
        );

        // Bevy only rotates event buffers from `First`, which never runs when
        // the host drives ticks by hand.
        let rotate_manually = self.driver == TickDriver::Manual;
        add_combat_event::<CastSkill>(app, rotate_manually);
        add_combat_event::<SensorOverride>(app, rotate_manually);
        add_combat_event::<DespawnEffect>(app, rotate_manually);
        add_combat_event::<TargetAcquired>(app, rotate_manually);
        add_combat_event::<TargetLost>(app, rotate_manually);
        add_combat_event::<SkillCast>(app, rotate_manually);
        add_combat_event::<CastRejected>(app, rotate_manually);
        add_combat_event::<EffectExpired>(app, rotate_manually);
        add_combat_event::<DamageDealt>(app, rotate_manually);
        add_combat_event::<HealApplied>(app, rotate_manually);
        add_combat_event::<BuffApplied>(app, rotate_manually);
        add_combat_event::<AgentDied>(app, rotate_manually);
        add_combat_event::<KnockbackImpulse>(app, rotate_manually);
        add_combat_event::<SpawnFloatingDamage>(app, rotate_manually);
        add_combat_event::<SpawnVisual>(app, rotate_manually);
        add_combat_event::<PlaySound>(app, rotate_manually);

        app.init_resource::<CombatClock>()
            .init_resource::<CombatRng>()
            .init_resource::<SkillCatalog>()
            .init_resource::<log::CombatLog>();

        app.add_systems(
            CombatTick,
            (
                (evaluate_sensors::<P>, apply_sensor_overrides)
                    .chain()
                    .in_set(CombatPhase::Perception),
                // Modifiers applied by this tick's casts start counting next tick,
                // in step with their effect instance.
                (expire_stat_modifiers, resolve_casts::<P>)
                    .chain()
                    .in_set(CombatPhase::Casting),
                (tick_effects::<P>, drive_effect_visuals)
                    .chain()
                    .in_set(CombatPhase::Effects),
                record_combat_log.in_set(CombatPhase::Bookkeeping),
            ),
        );

        if self.driver == TickDriver::FixedUpdate {
            app.add_systems(FixedUpdate, run_combat_tick);
        }
    }

    fn finish(&self, app: &mut App) {
        if let Err(err) = ensure_provider::<P>(app.world()) {
            panic!("{err}");
        }
        info!(
            "Combat core ready ({} skills, provider {})",
            app.world().resource::<SkillCatalog>().len(),
            std::any::type_name::<P>()
        );
    }
}

fn add_combat_event<E: Event>(app: &mut App, rotate_manually: bool) {
    app.add_event::<E>();
    if rotate_manually {
        app.add_systems(
            CombatTick,
            rotate_events::<E>
                .in_set(CombatPhase::Bookkeeping)
                .after(record_combat_log),
        );
    }
}

/// Exclusive system driving one combat tick from `FixedUpdate`.
fn run_combat_tick(world: &mut World) {
    let dt = world.resource::<Time<Fixed>>().delta_secs();
    tick(world, dt);
}
