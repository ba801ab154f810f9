//! Error types for the mechanism engine

use thiserror::Error;

/// Configuration error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("Invalid parameter value: {0}")]
    InvalidValue(String),

    #[error("Missing mechanism parameters: {0}")]
    MissingParams(String),
}

/// Engine and mechanic hook error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MechanismError {
    #[error("Mechanism '{mechanism_id}' is not active")]
    Inactive { mechanism_id: String },

    #[error("Mechanism '{mechanism_id}' expected {expected} state")]
    StateMismatch {
        mechanism_id: String,
        expected: &'static str,
    },

    #[error("Mechanism '{mechanism_id}' hook failed: {reason}")]
    Hook { mechanism_id: String, reason: String },

    #[error("Unknown mechanism: {0}")]
    UnknownMechanism(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias
pub type EngineResult<T> = Result<T, MechanismError>;
