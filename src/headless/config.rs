//! JSON scenario configuration for headless mode
//!
//! A scenario places agents and obstacles on the combat plane, then schedules
//! casts (at fixed times, or whenever an agent's sensor holds a target).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::components::CombatTag;
use crate::combat::error::{CombatError, CombatResult};
use crate::skills::{SkillCatalog, DEFAULT_SKILLS_PATH};

/// Headless scenario loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Name used in the log header
    #[serde(default = "default_name")]
    pub name: String,
    /// Skill definitions file
    #[serde(default = "default_skills_path")]
    pub skills_path: String,
    /// Ticks per simulated second (default: 30)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f32,
    /// Simulated seconds to run (default: 30)
    #[serde(default = "default_duration")]
    pub duration_secs: f32,
    /// Stop early once every Player or every Enemy agent is dead
    #[serde(default = "default_true")]
    pub stop_on_elimination: bool,
    /// Random seed for reproducible critical hits
    #[serde(default)]
    pub seed: Option<u64>,
    /// Custom output path for the combat log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub casts: Vec<ScheduledCast>,
    #[serde(default)]
    pub auto_casts: Vec<AutoCast>,
}

/// One combat agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique name, referenced by casts
    pub name: String,
    pub tag: CombatTag,
    pub position: [f32; 2],
    /// Negative faces -X
    #[serde(default = "default_facing")]
    pub facing: f32,
    /// Maximum health; omit for agents without a health capability
    #[serde(default)]
    pub health: Option<f32>,
    /// Collider radius
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub sensor: Option<SensorConfig>,
    /// Give the agent a stat-modifier capability (buff receiver)
    #[serde(default = "default_true")]
    pub stat_modifiers: bool,
    /// Give the agent a physics body so knockback moves it
    #[serde(default)]
    pub physics_body: bool,
    /// Velocity lost per second, for physics bodies
    #[serde(default = "default_damping")]
    pub damping: f32,
}

/// Target sensor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub radius: f32,
    #[serde(default)]
    pub strategy: SensorStrategyConfig,
    #[serde(default = "default_sensor_tags")]
    pub target_tags: Vec<CombatTag>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum SensorStrategyConfig {
    #[default]
    Radius,
    Cone {
        angle_degrees: f32,
    },
    /// Blocked by obstacle colliders
    LineOfSight,
}

/// Axis-aligned wall
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub position: [f32; 2],
    pub half_extents: [f32; 2],
}

/// A cast sent at a fixed simulation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCast {
    pub at_secs: f32,
    pub caster: String,
    pub skill: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub aim: Option<[f32; 2]>,
}

/// Cast `skill` at whatever the caster's sensor holds, at most once per `cooldown`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCast {
    pub caster: String,
    pub skill: String,
    #[serde(default = "default_level")]
    pub level: u32,
    pub cooldown: f32,
}

fn default_name() -> String {
    "scenario".to_string()
}

fn default_skills_path() -> String {
    DEFAULT_SKILLS_PATH.to_string()
}

fn default_tick_rate() -> f32 {
    30.0
}

fn default_duration() -> f32 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_facing() -> f32 {
    1.0
}

fn default_radius() -> f32 {
    0.5
}

fn default_damping() -> f32 {
    4.0
}

fn default_level() -> u32 {
    1
}

fn default_sensor_tags() -> Vec<CombatTag> {
    vec![CombatTag::Enemy]
}

impl ScenarioConfig {
    /// Load and validate a scenario from a JSON file
    pub fn load_from_file(path: &Path) -> CombatResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CombatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> CombatResult<Self> {
        let config: ScenarioConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration on its own (skill ids are checked separately)
    pub fn validate(&self) -> CombatResult<()> {
        let invalid = |msg: String| Err(CombatError::InvalidScenario(msg));

        if self.tick_rate <= 0.0 {
            return invalid("tick_rate must be positive".to_string());
        }
        if self.duration_secs <= 0.0 {
            return invalid("duration_secs must be positive".to_string());
        }
        if self.agents.is_empty() {
            return invalid("scenario has no agents".to_string());
        }

        let mut names = HashSet::new();
        for agent in &self.agents {
            if !names.insert(agent.name.as_str()) {
                return invalid(format!("duplicate agent name '{}'", agent.name));
            }
            if agent.health.is_some_and(|health| health <= 0.0) {
                return invalid(format!("agent '{}' must have positive health", agent.name));
            }
            if agent.radius <= 0.0 {
                return invalid(format!("agent '{}' must have a positive radius", agent.name));
            }
            if let Some(sensor) = &agent.sensor {
                if sensor.radius <= 0.0 {
                    return invalid(format!(
                        "agent '{}' sensor radius must be positive",
                        agent.name
                    ));
                }
                if let SensorStrategyConfig::Cone { angle_degrees } = sensor.strategy {
                    if angle_degrees <= 0.0 || angle_degrees > 360.0 {
                        return invalid(format!(
                            "agent '{}' cone angle must be in (0, 360]",
                            agent.name
                        ));
                    }
                }
            }
        }

        for obstacle in &self.obstacles {
            if obstacle.half_extents.iter().any(|e| *e <= 0.0) {
                return invalid("obstacle half_extents must be positive".to_string());
            }
        }

        for cast in &self.casts {
            if !names.contains(cast.caster.as_str()) {
                return invalid(format!("cast references unknown agent '{}'", cast.caster));
            }
            if cast.at_secs < 0.0 {
                return invalid(format!("cast of '{}' has a negative time", cast.skill));
            }
        }
        for auto in &self.auto_casts {
            if !names.contains(auto.caster.as_str()) {
                return invalid(format!(
                    "auto cast references unknown agent '{}'",
                    auto.caster
                ));
            }
            if auto.cooldown <= 0.0 {
                return invalid(format!("auto cast of '{}' needs a positive cooldown", auto.skill));
            }
            let has_sensor = self
                .agents
                .iter()
                .any(|agent| agent.name == auto.caster && agent.sensor.is_some());
            if !has_sensor {
                return invalid(format!(
                    "auto cast caster '{}' has no sensor",
                    auto.caster
                ));
            }
        }

        Ok(())
    }

    /// Check that every referenced skill exists in `catalog`
    pub fn check_skills(&self, catalog: &SkillCatalog) -> CombatResult<()> {
        let referenced = self
            .casts
            .iter()
            .map(|cast| cast.skill.as_str())
            .chain(self.auto_casts.iter().map(|auto| auto.skill.as_str()));
        for skill in referenced {
            catalog.require(skill)?;
        }
        Ok(())
    }

    /// Number of ticks needed to cover `duration_secs`
    pub fn total_ticks(&self) -> u64 {
        (self.duration_secs * self.tick_rate).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_scenario_defaults() {
        let config = ScenarioConfig::from_json_str(
            r#"{ "agents": [ { "name": "Hero", "tag": "Player", "position": [0, 0] } ] }"#,
        )
        .unwrap();
        assert_eq!(config.tick_rate, 30.0);
        assert_eq!(config.skills_path, DEFAULT_SKILLS_PATH);
        assert_eq!(config.agents[0].facing, 1.0);
        assert!(config.agents[0].health.is_none());
        assert_eq!(config.total_ticks(), 900);
    }

    #[test]
    fn test_cast_with_unknown_caster_is_rejected() {
        let result = ScenarioConfig::from_json_str(
            r#"{
                "agents": [ { "name": "Hero", "tag": "Player", "position": [0, 0] } ],
                "casts": [ { "at_secs": 0.0, "caster": "Ghost", "skill": "fireball" } ]
            }"#,
        );
        assert!(matches!(result, Err(CombatError::InvalidScenario(_))));
    }

    #[test]
    fn test_sensor_strategy_parsing() {
        let config = ScenarioConfig::from_json_str(
            r#"{
                "agents": [ {
                    "name": "Scout", "tag": "Enemy", "position": [0, 0], "health": 50,
                    "sensor": { "radius": 6, "strategy": { "Cone": { "angle_degrees": 90 } }, "target_tags": ["Player"] }
                } ]
            }"#,
        )
        .unwrap();
        let sensor = config.agents[0].sensor.as_ref().unwrap();
        assert!(matches!(
            sensor.strategy,
            SensorStrategyConfig::Cone { angle_degrees } if angle_degrees == 90.0
        ));
        assert_eq!(sensor.target_tags, vec![CombatTag::Player]);
    }
}
