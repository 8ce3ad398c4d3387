use chainfall_core::OrchestratorConfig;

use crate::error::CliError;

use super::CommandResult;

pub fn run() -> Result<CommandResult, CliError> {
    let config = OrchestratorConfig::from_env()?;
    let data = serde_json::to_value(config)?;
    Ok(CommandResult::ok(data))
}
