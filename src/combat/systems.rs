//! Combat bookkeeping systems
//!
//! Turn the core's outcome events into combat log entries, and rotate event
//! buffers when the host drives ticks by hand.

use bevy::prelude::*;

use super::events::*;
use super::log::{CombatLog, CombatLogEventType};
use super::CombatClock;

/// Readable name for log lines: the entity's `Name`, else its id.
fn agent_name(names: &Query<&Name>, entity: Entity) -> String {
    names
        .get(entity)
        .map(|name| name.as_str().to_string())
        .unwrap_or_else(|_| format!("{entity}"))
}

fn source_name(names: &Query<&Name>, source: Option<Entity>) -> String {
    source
        .map(|entity| agent_name(names, entity))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Record this tick's combat events in the combat log.
#[allow(clippy::too_many_arguments)]
pub fn record_combat_log(
    clock: Res<CombatClock>,
    mut combat_log: ResMut<CombatLog>,
    mut acquired: EventReader<TargetAcquired>,
    mut lost: EventReader<TargetLost>,
    mut casts: EventReader<SkillCast>,
    mut rejected: EventReader<CastRejected>,
    mut damage_events: EventReader<DamageDealt>,
    mut healing_events: EventReader<HealApplied>,
    mut buff_events: EventReader<BuffApplied>,
    mut death_events: EventReader<AgentDied>,
    mut expired: EventReader<EffectExpired>,
    names: Query<&Name>,
) {
    combat_log.match_time = clock.elapsed;

    for event in acquired.read() {
        let message = format!(
            "{} acquires {}",
            agent_name(&names, event.sensor),
            agent_name(&names, event.target)
        );
        combat_log.log(CombatLogEventType::Perception, message);
    }

    for event in lost.read() {
        let message = format!(
            "{} loses {}",
            agent_name(&names, event.sensor),
            agent_name(&names, event.target)
        );
        combat_log.log(CombatLogEventType::Perception, message);
    }

    for event in casts.read() {
        let caster = agent_name(&names, event.caster);
        let crit = if event.is_critical { " (Critical)" } else { "" };
        let message = format!(
            "{} casts {} (level {}, {:.0} damage, {:.1}s){}",
            caster, event.skill_id, event.level, event.damage, event.duration, crit
        );
        combat_log.log_skill_cast(caster, event.skill_id.clone(), message);
    }

    for event in rejected.read() {
        let message = format!(
            "{}'s cast of {} rejected: {:?}",
            agent_name(&names, event.caster),
            event.skill_id,
            event.reason
        );
        combat_log.log(CombatLogEventType::CastRejected, message);
    }

    // Deaths are read first so the hit that caused them can be flagged.
    let deaths: Vec<AgentDied> = death_events.read().copied().collect();

    for event in damage_events.read() {
        let source = source_name(&names, event.source);
        let target = agent_name(&names, event.target);
        let crit = if event.is_critical { " (Critical)" } else { "" };
        let is_killing_blow = deaths.iter().any(|death| death.entity == event.target);

        let message = format!(
            "{}'s {} hits {} for {:.0} {:?} damage{}",
            source, event.skill_id, target, event.amount, event.damage_type, crit
        );
        combat_log.log_damage(
            source,
            target,
            event.skill_id.clone(),
            event.amount,
            is_killing_blow,
            message,
        );
    }

    for event in healing_events.read() {
        let source = source_name(&names, event.source);
        let target = agent_name(&names, event.target);
        let message = format!(
            "{}'s {} heals {} for {:.0}",
            source, event.skill_id, target, event.amount
        );
        combat_log.log_healing(source, target, event.skill_id.clone(), event.amount, message);
    }

    for event in buff_events.read() {
        let source = source_name(&names, event.source);
        let target = agent_name(&names, event.target);
        let message = format!(
            "{}'s {} grants {} {:?} x{:.2} for {:.1}s",
            source, event.skill_id, target, event.stat, event.multiplier, event.duration
        );
        combat_log.log_buff(source, target, event.stat, event.multiplier, message);
    }

    for event in &deaths {
        let message = match event.killer {
            Some(killer) => format!(
                "{} has been killed by {}",
                agent_name(&names, event.entity),
                agent_name(&names, killer)
            ),
            None => format!("{} has died", agent_name(&names, event.entity)),
        };
        combat_log.log(CombatLogEventType::Death, message);
    }

    for event in expired.read() {
        let message = format!(
            "{} {:?} effect ended ({:?})",
            event.skill_id, event.kind, event.reason
        );
        combat_log.log(CombatLogEventType::EffectExpired, message);
    }
}

/// Swap an event type's buffers at the end of a manually driven tick.
///
/// Events survive one full tick after the one that sent them, so readers in an
/// earlier phase of the next tick still see them.
pub fn rotate_events<E: Event>(mut events: ResMut<Events<E>>) {
    events.update();
}
