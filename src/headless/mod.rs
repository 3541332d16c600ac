//! Headless mode for scripted combat scenarios
//!
//! Runs a scenario without any graphical output, suitable for automated
//! testing and balance checks.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --scenario scenarios/duel.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "name": "duel",
//!   "seed": 7,
//!   "duration_secs": 10,
//!   "agents": [
//!     { "name": "Hero", "tag": "Player", "position": [0, 0], "health": 100,
//!       "sensor": { "radius": 8 } },
//!     { "name": "Goblin", "tag": "Enemy", "position": [5, 0], "health": 60 }
//!   ],
//!   "auto_casts": [ { "caster": "Hero", "skill": "fireball", "cooldown": 1.5 } ]
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::ScenarioConfig;
pub use runner::{run_headless_scenario, run_scenario, ScenarioOutcome, ScenarioResult};
