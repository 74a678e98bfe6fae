//! Error types for PulseGrid core parsing and configuration.

use thiserror::Error;

/// Result type alias for core operations.
pub type PulseResult<T> = Result<T, PulseError>;

/// Errors surfaced by the core.
///
/// Scoring and decision paths never fail; these variants cover wire
/// parsing of enum values and configuration loading only.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("unknown throttle level: {0}")]
    UnknownThrottleLevel(String),

    #[error("unknown container status: {0}")]
    UnknownContainerStatus(String),

    #[error("unknown operational mode: {0}")]
    UnknownMode(String),

    #[error("unknown trend direction: {0}")]
    UnknownTrendDirection(String),

    #[error("unknown trigger type: {0}")]
    UnknownTriggerType(String),

    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),
}
