//! Combat logging
//!
//! Records combat events for display and post-run analysis.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use bevy::prelude::*;

use super::components::StatKind;

/// A single entry in the combat log
#[derive(Debug, Clone)]
pub struct CombatLogEntry {
    /// Timestamp in simulation time (seconds since the first tick)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Machine-readable payload for aggregation queries
    pub data: Option<StructuredEventData>,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatLogEventType {
    /// Sensor acquired or lost a target
    Perception,
    /// Skill cast accepted
    SkillCast,
    /// Skill cast dropped
    CastRejected,
    /// Damage dealt
    Damage,
    /// Healing done
    Healing,
    /// Stat modifier applied
    Buff,
    /// Effect instance destroyed
    EffectExpired,
    /// Agent died
    Death,
    /// Scenario event (start, end, etc.)
    MatchEvent,
}

/// Structured payload attached to HP-changing and casting entries.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredEventData {
    Damage {
        source: String,
        target: String,
        skill: String,
        amount: f32,
        is_killing_blow: bool,
    },
    Healing {
        source: String,
        target: String,
        skill: String,
        amount: f32,
    },
    SkillCast {
        caster: String,
        skill: String,
    },
    Buff {
        source: String,
        target: String,
        stat: StatKind,
        multiplier: f32,
    },
}

/// Final state of one agent, written in the log header
#[derive(Debug, Clone)]
pub struct AgentMetadata {
    pub name: String,
    pub tag: String,
    pub max_health: f32,
    pub final_health: f32,
    pub final_position: (f32, f32),
}

/// Information about a finished scenario, written in the log header
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetadata {
    pub scenario_name: String,
    pub seed: Option<u64>,
    pub duration: f32,
    pub agents: Vec<AgentMetadata>,
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current simulation time
    pub match_time: f32,
}

impl CombatLog {
    /// Clear the log for a new run
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.push(event_type, message, None);
    }

    fn push(
        &mut self,
        event_type: CombatLogEventType,
        message: String,
        data: Option<StructuredEventData>,
    ) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            data,
        });
    }

    pub fn log_damage(
        &mut self,
        source: String,
        target: String,
        skill: String,
        amount: f32,
        is_killing_blow: bool,
        message: String,
    ) {
        self.push(
            CombatLogEventType::Damage,
            message,
            Some(StructuredEventData::Damage {
                source,
                target,
                skill,
                amount,
                is_killing_blow,
            }),
        );
    }

    pub fn log_healing(
        &mut self,
        source: String,
        target: String,
        skill: String,
        amount: f32,
        message: String,
    ) {
        self.push(
            CombatLogEventType::Healing,
            message,
            Some(StructuredEventData::Healing {
                source,
                target,
                skill,
                amount,
            }),
        );
    }

    pub fn log_skill_cast(&mut self, caster: String, skill: String, message: String) {
        self.push(
            CombatLogEventType::SkillCast,
            message,
            Some(StructuredEventData::SkillCast { caster, skill }),
        );
    }

    pub fn log_buff(
        &mut self,
        source: String,
        target: String,
        stat: StatKind,
        multiplier: f32,
        message: String,
    ) {
        self.push(
            CombatLogEventType::Buff,
            message,
            Some(StructuredEventData::Buff {
                source,
                target,
                stat,
                multiplier,
            }),
        );
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Number of entries of one type
    pub fn count(&self, event_type: CombatLogEventType) -> usize {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage | CombatLogEventType::Healing
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Damage dealt by `source`, summed per skill
    pub fn damage_by_skill(&self, source: &str) -> HashMap<String, f32> {
        let mut totals = HashMap::new();
        for entry in &self.entries {
            if let Some(StructuredEventData::Damage {
                source: s,
                skill,
                amount,
                ..
            }) = &entry.data
            {
                if s == source {
                    *totals.entry(skill.clone()).or_insert(0.0) += amount;
                }
            }
        }
        totals
    }

    /// Healing done by `source`, summed per skill
    pub fn healing_by_skill(&self, source: &str) -> HashMap<String, f32> {
        let mut totals = HashMap::new();
        for entry in &self.entries {
            if let Some(StructuredEventData::Healing {
                source: s,
                skill,
                amount,
                ..
            }) = &entry.data
            {
                if s == source {
                    *totals.entry(skill.clone()).or_insert(0.0) += amount;
                }
            }
        }
        totals
    }

    pub fn total_damage_dealt(&self, source: &str) -> f32 {
        self.damage_by_skill(source).values().sum()
    }

    pub fn total_damage_taken(&self, target: &str) -> f32 {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.data {
                Some(StructuredEventData::Damage {
                    target: t, amount, ..
                }) if t == target => Some(*amount),
                _ => None,
            })
            .sum()
    }

    pub fn total_healing_done(&self, source: &str) -> f32 {
        self.healing_by_skill(source).values().sum()
    }

    pub fn killing_blows(&self, source: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                matches!(
                    &entry.data,
                    Some(StructuredEventData::Damage {
                        source: s,
                        is_killing_blow: true,
                        ..
                    }) if s == source
                )
            })
            .count()
    }

    /// Skill ids cast by `caster`, in order
    pub fn skill_casts_for(&self, caster: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.data {
                Some(StructuredEventData::SkillCast { caster: c, skill }) if c == caster => {
                    Some(skill.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Render the log with a metadata header
    pub fn render(&self, metadata: &ScenarioMetadata) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", metadata.scenario_name);
        match metadata.seed {
            Some(seed) => {
                let _ = writeln!(out, "Seed: {seed}");
            }
            None => {
                let _ = writeln!(out, "Seed: (entropy)");
            }
        }
        let _ = writeln!(out, "Duration: {:.2}s", metadata.duration);
        let _ = writeln!(out);
        for agent in &metadata.agents {
            let _ = writeln!(
                out,
                "{} [{}] {:.0}/{:.0} HP at ({:.2}, {:.2})",
                agent.name,
                agent.tag,
                agent.final_health,
                agent.max_health,
                agent.final_position.0,
                agent.final_position.1
            );
        }
        let _ = writeln!(out);
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "[{:>7.2}] {:?}: {}",
                entry.timestamp, entry.event_type, entry.message
            );
        }
        out
    }

    /// Write the rendered log to `output_path`, or to a timestamped file under
    /// `combat_logs/` when no path is given. Returns the path written.
    pub fn save_to_file(
        &self,
        metadata: &ScenarioMetadata,
        output_path: Option<&str>,
    ) -> io::Result<String> {
        let path = match output_path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                format!("combat_logs/scenario_{stamp}.txt")
            }
        };

        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, self.render(metadata))?;
        Ok(path)
    }
}
