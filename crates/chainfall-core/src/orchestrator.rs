use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::{AdapterError, ChainAdapter, OperationRequest};
use crate::clock::{Clock, SystemClock};
use crate::config::OrchestratorConfig;
use crate::health::HealthTracker;
use crate::registry::AdapterRegistry;
use crate::throttling::RateBudget;
use crate::timeout::run_with_timeout;
use crate::{ChainId, ConfigError, Operation};

/// `source_adapter_id` of an outcome that no adapter produced.
pub const NO_SOURCE: &str = "none";
pub const CIRCUIT_OPEN_SUFFIX: &str = " (circuit open)";
pub const RATE_LIMITED_SUFFIX: &str = " (rate limited)";
pub const ALL_ADAPTERS_FAILED: &str = "All adapters failed";

/// Why one invoked adapter did not produce data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub adapter_id: String,
    pub code: String,
    pub message: String,
}

impl AttemptFailure {
    fn new(adapter_id: &str, error: &AdapterError) -> Self {
        Self {
            adapter_id: adapter_id.to_owned(),
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }
}

/// Result envelope of one routed request. Adapter failures are reported
/// here and never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub chain: ChainId,
    pub operation: Operation,
    pub succeeded: bool,
    pub data: Option<Value>,
    pub source_adapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Every candidate in the order it was considered; skipped ones carry a
    /// suffix such as `" (circuit open)"`.
    pub attempted_adapter_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AttemptFailure>,
    pub elapsed_ms: u64,
}

impl CallOutcome {
    fn unroutable(request: &OperationRequest, message: String) -> Self {
        Self {
            chain: request.chain.clone(),
            operation: request.operation,
            succeeded: false,
            data: None,
            source_adapter_id: NO_SOURCE.to_owned(),
            error_message: Some(message),
            attempted_adapter_ids: Vec::new(),
            failures: Vec::new(),
            elapsed_ms: 0,
        }
    }
}

/// Chain-aware fallback orchestrator.
///
/// Holds the adapter registry and the shared health table. Construct once,
/// register adapters at startup, and share behind an `Arc`.
pub struct FallbackOrchestrator {
    config: OrchestratorConfig,
    registry: RwLock<AdapterRegistry>,
    health: HealthTracker,
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("config", &self.config)
            .field("chains", &self.supported_chains())
            .field("health", &self.health)
            .finish()
    }
}

impl Default for FallbackOrchestrator {
    fn default() -> Self {
        Self::assemble(OrchestratorConfig::default(), Arc::new(SystemClock))
    }
}

impl FallbackOrchestrator {
    /// Rejects tuning that [`OrchestratorConfig::validate`] refuses.
    pub fn new(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, clock))
    }

    fn assemble(config: OrchestratorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            registry: RwLock::new(AdapterRegistry::new()),
            health: HealthTracker::new(config.health, clock),
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Adds `adapter` to `chain`'s candidates and creates its health record.
    pub fn register(&self, chain: impl Into<ChainId>, adapter: Arc<dyn ChainAdapter>) {
        let chain = chain.into();
        self.health.ensure(adapter.id());
        self.registry
            .write()
            .expect("adapter registry lock is not poisoned")
            .register(&chain, adapter);
    }

    /// Registers `adapter` under every chain its descriptor lists.
    pub fn register_for_supported_chains(&self, adapter: Arc<dyn ChainAdapter>) {
        let chains = adapter.descriptor().supported_chains.clone();
        for chain in chains {
            self.register(chain, Arc::clone(&adapter));
        }
    }

    pub fn candidates_for(&self, chain: impl Into<ChainId>) -> Vec<Arc<dyn ChainAdapter>> {
        self.registry
            .read()
            .expect("adapter registry lock is not poisoned")
            .candidates_for(&chain.into())
    }

    pub fn supported_chains(&self) -> Vec<ChainId> {
        self.registry
            .read()
            .expect("adapter registry lock is not poisoned")
            .supported_chains()
    }

    pub async fn execute_with_fallback(
        &self,
        chain: impl Into<ChainId>,
        operation: Operation,
        args: Value,
    ) -> CallOutcome {
        self.execute(OperationRequest::new(chain, operation, args))
            .await
    }

    /// Tries the chain's adapters in priority order until one succeeds.
    pub async fn execute(&self, request: OperationRequest) -> CallOutcome {
        let registered = self.candidates_for(&request.chain);
        if registered.is_empty() {
            debug!(chain = request.chain.as_str(), "no adapters registered");
            return CallOutcome::unroutable(
                &request,
                format!("No adapters registered for chain: {}", request.chain),
            );
        }

        let candidates = registered
            .into_iter()
            .filter(|adapter| adapter.descriptor().operations.supports(request.operation))
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return CallOutcome::unroutable(
                &request,
                format!(
                    "No adapters support operation {} for chain: {}",
                    request.operation, request.chain
                ),
            );
        }

        let started = Instant::now();
        let mut attempted = Vec::with_capacity(candidates.len());
        let mut failures = Vec::new();

        for adapter in candidates {
            let adapter_id = adapter.id().to_owned();

            if !self.health.is_available(&adapter_id, self.health.now()) {
                debug!(adapter = adapter_id.as_str(), "skipping adapter with open circuit");
                attempted.push(format!("{adapter_id}{CIRCUIT_OPEN_SUFFIX}"));
                continue;
            }

            if let Some(budget) = self.budget_for(&adapter_id) {
                if !budget.try_acquire() {
                    debug!(adapter = adapter_id.as_str(), "skipping adapter without rate budget");
                    attempted.push(format!("{adapter_id}{RATE_LIMITED_SUFFIX}"));
                    continue;
                }
            }

            attempted.push(adapter_id.clone());
            debug!(
                adapter = adapter_id.as_str(),
                chain = request.chain.as_str(),
                operation = request.operation.as_str(),
                "attempting adapter"
            );

            match run_with_timeout(adapter, request.clone(), self.config.adapter_timeout).await {
                Ok(data) => {
                    self.health.record_outcome(&adapter_id, true);
                    return CallOutcome {
                        chain: request.chain,
                        operation: request.operation,
                        succeeded: true,
                        data: Some(data),
                        source_adapter_id: adapter_id,
                        error_message: None,
                        attempted_adapter_ids: attempted,
                        failures,
                        elapsed_ms: elapsed_ms(started),
                    };
                }
                Err(error) => {
                    warn!(
                        adapter = adapter_id.as_str(),
                        chain = request.chain.as_str(),
                        operation = request.operation.as_str(),
                        error = %error,
                        "adapter attempt failed"
                    );
                    self.health.record_outcome(&adapter_id, false);
                    failures.push(AttemptFailure::new(&adapter_id, &error));
                }
            }
        }

        warn!(
            chain = request.chain.as_str(),
            operation = request.operation.as_str(),
            attempted = attempted.len(),
            "all adapters failed"
        );

        CallOutcome {
            chain: request.chain,
            operation: request.operation,
            succeeded: false,
            data: None,
            source_adapter_id: NO_SOURCE.to_owned(),
            error_message: Some(ALL_ADAPTERS_FAILED.to_owned()),
            attempted_adapter_ids: attempted,
            failures,
            elapsed_ms: elapsed_ms(started),
        }
    }

    /// Runs independent requests concurrently. Outcomes come back in input
    /// order and one request's failure never affects the others.
    pub async fn execute_many(&self, requests: Vec<OperationRequest>) -> Vec<CallOutcome> {
        join_all(requests.into_iter().map(|request| self.execute(request))).await
    }

    fn budget_for(&self, adapter_id: &str) -> Option<Arc<RateBudget>> {
        self.registry
            .read()
            .expect("adapter registry lock is not poisoned")
            .budget_for(adapter_id)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Builder with explicit dependencies for the orchestrator.
///
/// ```rust,ignore
/// let orchestrator = FallbackOrchestrator::builder()
///     .with_adapter_timeout(Duration::from_secs(10))
///     .with_adapter("ethereum", Arc::new(etherscan))
///     .with_adapter("ethereum", Arc::new(blockscout))
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    clock: Arc<dyn Clock>,
    registrations: Vec<(Option<ChainId>, Arc<dyn ChainAdapter>)>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            clock: Arc::new(SystemClock),
            registrations: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.config.adapter_timeout = timeout;
        self
    }

    pub fn with_health_alpha(mut self, alpha: f64) -> Self {
        self.config.health.alpha = alpha;
        self
    }

    pub fn with_circuit_threshold(mut self, threshold: f64) -> Self {
        self.config.health.circuit_threshold = threshold;
        self
    }

    pub fn with_circuit_open_duration(mut self, duration: Duration) -> Self {
        self.config.health.circuit_open_duration = duration;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_adapter(
        mut self,
        chain: impl Into<ChainId>,
        adapter: Arc<dyn ChainAdapter>,
    ) -> Self {
        self.registrations.push((Some(chain.into()), adapter));
        self
    }

    /// Registers the adapter for every chain in its descriptor.
    pub fn with_adapter_for_supported_chains(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.registrations.push((None, adapter));
        self
    }

    pub fn build(self) -> Result<FallbackOrchestrator, ConfigError> {
        let orchestrator = FallbackOrchestrator::with_clock(self.config, self.clock)?;
        for (chain, adapter) in self.registrations {
            match chain {
                Some(chain) => orchestrator.register(chain, adapter),
                None => orchestrator.register_for_supported_chains(adapter),
            }
        }
        Ok(orchestrator)
    }
}
