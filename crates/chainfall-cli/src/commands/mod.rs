mod config;
mod drill;

use chainfall_core::UtcDateTime;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, EnvelopeMeta};

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
    pub total_requests: usize,
    pub failed_requests: usize,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            latency_ms: 0,
            total_requests: 0,
            failed_requests: 0,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_request_counts(mut self, total: usize, failed: usize) -> Self {
        self.total_requests = total;
        self.failed_requests = failed;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let command_result = match &cli.command {
        Command::Drill(args) => drill::run(args).await?,
        Command::Config => config::run()?,
    };

    let CommandResult {
        data,
        warnings,
        latency_ms,
        total_requests,
        failed_requests,
    } = command_result;

    let mut meta = EnvelopeMeta::new(UtcDateTime::now(), latency_ms)
        .with_request_counts(total_requests, failed_requests);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope { meta, data })
}
