//! arenacore - headless combat scenario runner
//!
//! Loads skill definitions and a JSON scenario, runs the combat core at a
//! fixed step and writes the combat log.

use std::process::ExitCode;

use bevy::log::LogPlugin;
use bevy::prelude::*;

use arenacore::cli::{parse_args, Args};
use arenacore::headless::{run_headless_scenario, ScenarioConfig};
use arenacore::skills::{SkillCatalog, DEFAULT_SKILLS_PATH};

fn main() -> ExitCode {
    let args = parse_args();

    // Only for the tracing subscriber; the scenario builds its own app.
    App::new().add_plugins(LogPlugin::default()).finish();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), arenacore::CombatError> {
    let skills = args
        .skills
        .as_ref()
        .map(|path| path.display().to_string());

    if args.check_skills {
        let path = skills.as_deref().unwrap_or(DEFAULT_SKILLS_PATH);
        let catalog = SkillCatalog::load(path)?;
        println!("{} skills OK: {}", catalog.len(), catalog.ids().join(", "));
        return Ok(());
    }

    let Some(scenario_path) = args.scenario.as_ref() else {
        println!("Nothing to do: pass --scenario <FILE> or --check-skills (see --help)");
        return Ok(());
    };

    let mut config = ScenarioConfig::load_from_file(scenario_path)?;
    if let Some(max_duration) = args.max_duration {
        config.duration_secs = config.duration_secs.min(max_duration.max(0.0));
        config.validate()?;
    }

    println!("Starting scenario '{}'...", config.name);
    println!("  Agents: {}", config.agents.len());
    println!("  Duration: {:.1}s at {} ticks/s", config.duration_secs, config.tick_rate);

    let output = args.output.as_ref().map(|path| path.display().to_string());
    let result = run_headless_scenario(&config, skills.as_deref(), output.as_deref())?;

    println!("Finished after {:.2}s ({} ticks)", result.elapsed, result.ticks);
    for agent in &result.agents {
        let health = match (agent.final_health, agent.max_health) {
            (Some(current), Some(max)) => format!("{current:.0}/{max:.0} HP"),
            _ => "no health".to_string(),
        };
        println!(
            "  {:<16} {:<8} {:<14} dealt {:>6.0}  taken {:>6.0}  healed {:>6.0}",
            agent.name,
            agent.tag.name(),
            health,
            agent.damage_dealt,
            agent.damage_taken,
            agent.healing_done
        );
    }
    Ok(())
}
