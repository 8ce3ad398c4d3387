//! Failover drills.
//!
//! A drill plan declares scripted adapters and rounds of requests:
//!
//! ```json
//! {
//!   "settings": { "adapter_timeout_ms": 500 },
//!   "adapters": [
//!     { "id": "etherscan", "chains": ["ethereum"], "priority": 0,
//!       "script": [{ "outcome": "fail", "message": "NOTOK" }] },
//!     { "id": "blockscout", "chains": ["ethereum"], "priority": 1,
//!       "script": [{ "outcome": "ok", "data": { "decimals": 18 } }] }
//!   ],
//!   "rounds": [
//!     { "label": "outage", "repeat": 8,
//!       "requests": [{ "chain": "ethereum", "operation": "token_metadata" }] },
//!     { "label": "cool-down", "advance_ms": 60000,
//!       "requests": [{ "chain": "ethereum", "operation": "metadata" }] }
//!   ]
//! }
//! ```
//!
//! Adapter delays and timeouts run on real time. Circuit cool-downs run on a
//! manual clock that only moves by each round's `advance_ms`, so a drill can
//! cover a 60 s cool-down without waiting for it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chainfall_core::{
    AdapterDescriptor, AdapterHealth, AdapterQuota, CallOutcome, ChainId, Clock,
    FallbackOrchestrator, ManualClock, Operation, OperationRequest, OperationSet,
    OrchestratorConfig, ScriptStep, ScriptedAdapter, UtcDateTime, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::cli::DrillArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DrillPlan {
    #[serde(default)]
    settings: PlanSettings,
    adapters: Vec<PlanAdapter>,
    rounds: Vec<PlanRound>,
}

/// Overrides applied on top of the environment configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanSettings {
    adapter_timeout_ms: Option<u64>,
    health_alpha: Option<f64>,
    circuit_threshold: Option<f64>,
    circuit_open_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanAdapter {
    id: String,
    name: Option<String>,
    chains: Vec<String>,
    #[serde(default)]
    priority: i32,
    operations: Option<Vec<String>>,
    quota: Option<AdapterQuota>,
    script: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanRound {
    label: Option<String>,
    #[serde(default)]
    advance_ms: u64,
    /// Adapter ids whose health is reset before the round runs.
    #[serde(default)]
    reset: Vec<String>,
    #[serde(default = "default_repeat")]
    repeat: usize,
    requests: Vec<PlanRequest>,
}

/// Upper bound on `repeat`; a drill replays a scenario, it is not a load test.
const MAX_REPEAT: usize = 10_000;

fn default_repeat() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanRequest {
    chain: String,
    operation: String,
    #[serde(default)]
    args: Value,
}

impl PlanRequest {
    fn to_request(&self) -> Result<OperationRequest, ValidationError> {
        let chain = ChainId::parse(&self.chain)?;
        let operation = self.operation.parse::<Operation>()?;
        Ok(OperationRequest::new(chain, operation, self.args.clone()))
    }
}

#[derive(Debug, Serialize)]
struct DrillReport {
    config: OrchestratorConfig,
    chains: Vec<ChainId>,
    rounds: Vec<RoundReport>,
    health: BTreeMap<String, AdapterHealth>,
}

#[derive(Debug, Serialize)]
struct RoundReport {
    round: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    clock: UtcDateTime,
    outcomes: Vec<CallOutcome>,
}

pub async fn run(args: &DrillArgs) -> Result<CommandResult, CliError> {
    let raw = std::fs::read_to_string(&args.plan).map_err(|source| CliError::ReadPlan {
        path: args.plan.clone(),
        source,
    })?;
    let plan: DrillPlan = serde_json::from_str(&raw)?;

    let started = Instant::now();
    let (report, warnings) = execute_plan(plan).await?;

    let outcomes = report.rounds.iter().flat_map(|round| round.outcomes.iter());
    let total = outcomes.clone().count();
    let failed = outcomes.filter(|outcome| !outcome.succeeded).count();

    Ok(CommandResult::ok(serde_json::to_value(&report)?)
        .with_warnings(warnings)
        .with_latency(started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64)
        .with_request_counts(total, failed))
}

async fn execute_plan(plan: DrillPlan) -> Result<(DrillReport, Vec<String>), CliError> {
    let rounds = validate_rounds(&plan)?;
    let clock = Arc::new(ManualClock::new(UtcDateTime::now()));
    let (orchestrator, warnings) = build_orchestrator(&plan, Arc::clone(&clock))?;

    let mut reports = Vec::with_capacity(rounds.len());
    for (index, (round, requests)) in plan.rounds.iter().zip(rounds).enumerate() {
        clock.advance(Duration::from_millis(round.advance_ms));
        for adapter_id in &round.reset {
            orchestrator
                .health()
                .reset(adapter_id.trim())
                .map_err(|error| CliError::Plan(format!("round {}: {error}", index + 1)))?;
        }

        let mut outcomes = Vec::new();
        for _ in 0..round.repeat {
            outcomes.extend(orchestrator.execute_many(requests.clone()).await);
        }

        info!(
            round = index + 1,
            requests = outcomes.len(),
            failed = outcomes.iter().filter(|outcome| !outcome.succeeded).count(),
            "drill round finished"
        );
        reports.push(RoundReport {
            round: index + 1,
            label: round.label.clone(),
            clock: clock.now(),
            outcomes,
        });
    }

    let report = DrillReport {
        config: *orchestrator.config(),
        chains: orchestrator.supported_chains(),
        rounds: reports,
        health: orchestrator.health().snapshot(),
    };
    Ok((report, warnings))
}

fn validate_rounds(plan: &DrillPlan) -> Result<Vec<Vec<OperationRequest>>, CliError> {
    if plan.adapters.is_empty() {
        return Err(CliError::Plan(String::from("plan declares no adapters")));
    }
    if plan.rounds.is_empty() {
        return Err(CliError::Plan(String::from("plan declares no rounds")));
    }

    let known = plan
        .adapters
        .iter()
        .map(|adapter| adapter.id.trim())
        .collect::<HashSet<_>>();

    plan.rounds
        .iter()
        .enumerate()
        .map(|(index, round)| {
            if !(1..=MAX_REPEAT).contains(&round.repeat) {
                return Err(CliError::Plan(format!(
                    "round {}: repeat must be between 1 and {MAX_REPEAT}, got {}",
                    index + 1,
                    round.repeat
                )));
            }
            if let Some(unknown) = round.reset.iter().find(|id| !known.contains(id.trim())) {
                return Err(CliError::Plan(format!(
                    "round {}: cannot reset unknown adapter '{unknown}'",
                    index + 1
                )));
            }
            round
                .requests
                .iter()
                .map(|request| request.to_request().map_err(CliError::from))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

fn build_orchestrator(
    plan: &DrillPlan,
    clock: Arc<ManualClock>,
) -> Result<(FallbackOrchestrator, Vec<String>), CliError> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut builder = FallbackOrchestrator::builder()
        .with_config(apply_settings(OrchestratorConfig::from_env()?, &plan.settings))
        .with_clock(clock);

    for adapter in &plan.adapters {
        let descriptor = adapter_descriptor(adapter)?;
        if !seen.insert(descriptor.id.clone()) {
            return Err(CliError::Plan(format!(
                "adapter '{}' is declared more than once",
                descriptor.id
            )));
        }
        if adapter.script.is_empty() {
            warnings.push(format!(
                "adapter '{}' has an empty script and will fail every call",
                descriptor.id
            ));
        }
        builder = builder.with_adapter_for_supported_chains(Arc::new(ScriptedAdapter::new(
            descriptor,
            adapter.script.clone(),
        )));
    }

    Ok((builder.build()?, warnings))
}

fn adapter_descriptor(adapter: &PlanAdapter) -> Result<AdapterDescriptor, CliError> {
    let id = adapter.id.trim();
    if id.is_empty() {
        return Err(ValidationError::EmptyAdapterId.into());
    }
    let chains = adapter
        .chains
        .iter()
        .map(|chain| ChainId::parse(chain))
        .collect::<Result<Vec<_>, _>>()?;
    if chains.is_empty() {
        return Err(CliError::Plan(format!("adapter '{id}' serves no chains")));
    }

    let name = adapter.name.clone().unwrap_or_else(|| id.to_owned());
    let mut descriptor = AdapterDescriptor::new(id, name, adapter.priority).with_chains(chains);
    if let Some(operations) = &adapter.operations {
        let operations = operations
            .iter()
            .map(|raw| raw.parse::<Operation>())
            .collect::<Result<OperationSet, _>>()?;
        descriptor = descriptor.with_operations(operations);
    }
    if let Some(quota) = adapter.quota {
        descriptor = descriptor.with_quota(quota);
    }
    Ok(descriptor)
}

fn apply_settings(mut config: OrchestratorConfig, settings: &PlanSettings) -> OrchestratorConfig {
    if let Some(ms) = settings.adapter_timeout_ms {
        config.adapter_timeout = Duration::from_millis(ms);
    }
    if let Some(alpha) = settings.health_alpha {
        config.health.alpha = alpha;
    }
    if let Some(threshold) = settings.circuit_threshold {
        config.health.circuit_threshold = threshold;
    }
    if let Some(ms) = settings.circuit_open_ms {
        config.health.circuit_open_duration = Duration::from_millis(ms);
    }
    config
}
