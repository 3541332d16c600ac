//! arenacore - Combat simulation core for a 2D action game
//!
//! Target sensors, skill casting and effect instances (area damage,
//! projectiles, heals, buffs) on top of the Bevy ECS. The core is driven one
//! tick at a time and reaches the physics world only through a
//! [`physics::SpatialQuery`] provider.
//!
//! This library exposes the core modules for embedding, testing and reuse.

pub mod cli;
pub mod combat;
pub mod effects;
pub mod headless;
pub mod physics;
pub mod sensor;
pub mod skills;

// Re-export commonly used types
pub use combat::error::{CombatError, CombatResult};
pub use combat::log::{CombatLog, CombatLogEventType};
pub use combat::{tick, CombatClock, CombatCorePlugin, CombatPhase, CombatRng, CombatTick, TickDriver};
pub use headless::ScenarioConfig;
pub use physics::{CollisionWorld, ReferencePhysicsPlugin, SpatialQuery};
pub use sensor::{DetectionStrategy, TargetSensor};
pub use skills::{SkillCatalog, SkillDefinition};
