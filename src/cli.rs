//! Command-line interface for the headless combat runner

use clap::Parser;
use std::path::PathBuf;

/// Headless combat scenario runner
#[derive(Parser, Debug)]
#[command(name = "arenacore")]
#[command(about = "Run combat scenarios without graphics")]
#[command(version)]
pub struct Args {
    /// Run the scenario in this JSON file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub scenario: Option<PathBuf>,

    /// Skill definitions to use instead of the scenario's own
    #[arg(long, value_name = "SKILLS_FILE")]
    pub skills: Option<PathBuf>,

    /// Output path for the combat log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Override the scenario's duration in seconds
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Only load and validate the skill definitions, then exit
    #[arg(long)]
    pub check_skills: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
