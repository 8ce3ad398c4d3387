use std::path::PathBuf;

use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] chainfall_core::ValidationError),

    #[error(transparent)]
    Config(#[from] chainfall_core::ConfigError),

    #[error("invalid drill plan: {0}")]
    Plan(String),

    #[error("failed to read {}: {source}", path.display())]
    ReadPlan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("strict mode failed: {failed_requests} request(s) did not succeed")]
    StrictModeViolation { failed_requests: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Plan(_) => 2,
            Self::ReadPlan { .. } => 10,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
