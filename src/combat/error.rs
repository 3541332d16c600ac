//! Error types for loading and validating combat configuration.

use thiserror::Error;

/// Errors surfaced by configuration loading, validation and startup checks.
///
/// Nothing in the per-tick path returns these: runtime problems (missing
/// capabilities, despawned targets) degrade to "do nothing this tick".
#[derive(Debug, Error)]
pub enum CombatError {
    /// The spatial query provider resource was never inserted
    #[error("spatial query provider `{0}` is not registered; insert it before the combat plugin starts")]
    ProviderUnavailable(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate skill id `{0}`")]
    DuplicateSkill(String),

    #[error("unknown skill `{0}`")]
    UnknownSkill(String),

    #[error("skill `{skill}`: {reason}")]
    InvalidSkill { skill: String, reason: String },

    #[error("skill `{skill}` effect #{index}: {reason}")]
    InvalidEffect {
        skill: String,
        index: usize,
        reason: String,
    },

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

pub type CombatResult<T> = Result<T, CombatError>;
