use thiserror::Error;

/// Validation and contract errors exposed by `chainfall-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chain identifier cannot be empty")]
    EmptyChain,

    #[error("invalid operation '{value}', expected one of token_metadata, security_scan, market_data, contract_source")]
    InvalidOperation { value: String },

    #[error("adapter id cannot be empty")]
    EmptyAdapterId,

    #[error("'{value}' is not an RFC3339 timestamp")]
    MalformedTimestamp { value: String },

    #[error("timestamp '{value}' carries offset {offset}, expected UTC (suffix Z)")]
    TimestampNotUtc { value: String, offset: String },
}

/// Invalid orchestrator tuning, usually coming from the environment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnvValue { name: &'static str, value: String },

    #[error("adapter timeout must be greater than zero")]
    ZeroTimeout,

    #[error("health alpha must be within (0, 1], got {value}")]
    AlphaOutOfRange { value: f64 },

    #[error("circuit threshold must be within [0, 100], got {value}")]
    ThresholdOutOfRange { value: f64 },

    #[error("rate quota limit and window must be greater than zero, got {limit} per {window_ms} ms")]
    ZeroQuota { limit: u32, window_ms: u64 },
}

/// Administrative misuse of a running orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("adapter '{adapter_id}' is not registered")]
    UnknownAdapter { adapter_id: String },
}
