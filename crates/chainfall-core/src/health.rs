//! Per-adapter rolling health and circuit breaking.
//!
//! # States
//! - Closed: the adapter is offered to callers.
//! - Open: the adapter is skipped until the cool-down has elapsed since its
//!   last failure.
//!
//! # Transitions
//! ```text
//! Closed → Open: a failure leaves the EMA score below the threshold
//! Open → Closed: an availability check after the cool-down (consecutive
//!                failures reset, score kept as is)
//! any → Closed, score 100: manual reset
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::HealthPolicy;
use crate::{CoreError, UtcDateTime};

pub const MAX_SCORE: f64 = 100.0;

/// Reporting label derived from an [`AdapterHealth`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    CircuitOpen,
}

impl HealthState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

/// Health record for one adapter id, shared by every chain it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterHealth {
    pub score: f64,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<UtcDateTime>,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub circuit_open: bool,
}

impl Default for AdapterHealth {
    fn default() -> Self {
        Self {
            score: MAX_SCORE,
            consecutive_failures: 0,
            last_failure_at: None,
            total_calls: 0,
            successful_calls: 0,
            circuit_open: false,
        }
    }
}

impl AdapterHealth {
    pub fn status(&self) -> HealthState {
        if self.circuit_open {
            HealthState::CircuitOpen
        } else if self.consecutive_failures > 0 {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }

    /// Share of successful calls, `None` before the first call.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_calls == 0 {
            return None;
        }
        Some(self.successful_calls as f64 / self.total_calls as f64)
    }

    fn apply(&mut self, success: bool, now: UtcDateTime, policy: &HealthPolicy) -> bool {
        let alpha = policy.alpha;
        self.total_calls = self.total_calls.saturating_add(1);

        if success {
            self.successful_calls = self.successful_calls.saturating_add(1);
            self.consecutive_failures = 0;
            self.score = clamp_score(self.score * (1.0 - alpha) + MAX_SCORE * alpha);
            return false;
        }

        self.last_failure_at = Some(now);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.score = clamp_score(self.score * (1.0 - alpha));

        let was_open = self.circuit_open;
        if self.score < policy.circuit_threshold {
            self.circuit_open = true;
        }
        !was_open && self.circuit_open
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, MAX_SCORE)
}

type HealthCell = Arc<Mutex<AdapterHealth>>;

/// Thread-safe health table. Each adapter id has its own lock, so updates to
/// different adapters never contend.
pub struct HealthTracker {
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
    records: RwLock<HashMap<String, HealthCell>>,
}

impl std::fmt::Debug for HealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthTracker")
            .field("policy", &self.policy)
            .field("adapters", &self.snapshot().len())
            .finish_non_exhaustive()
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(HealthPolicy::default(), Arc::new(SystemClock))
    }
}

impl HealthTracker {
    /// `policy` must already be validated.
    pub(crate) fn new(policy: HealthPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> UtcDateTime {
        self.clock.now()
    }

    /// Creates a fresh record unless one already exists.
    pub fn ensure(&self, adapter_id: &str) {
        let _ = self.cell_or_insert(adapter_id);
    }

    pub fn contains(&self, adapter_id: &str) -> bool {
        self.cell(adapter_id).is_some()
    }

    /// Applies one call outcome with the EMA update and opens the circuit
    /// when the score falls below the threshold.
    pub fn record_outcome(&self, adapter_id: &str, success: bool) {
        let now = self.clock.now();
        let cell = self.cell_or_insert(adapter_id);
        let mut record = cell.lock().expect("health record lock is not poisoned");

        if record.apply(success, now, &self.policy) {
            warn!(
                adapter = adapter_id,
                score = record.score,
                consecutive_failures = record.consecutive_failures,
                "circuit opened"
            );
        }
    }

    /// Whether the adapter may be attempted at `now`.
    ///
    /// An open circuit whose cool-down has elapsed is closed here, with the
    /// consecutive-failure counter reset; the score is left untouched.
    pub fn is_available(&self, adapter_id: &str, now: UtcDateTime) -> bool {
        let Some(cell) = self.cell(adapter_id) else {
            return true;
        };
        let mut record = cell.lock().expect("health record lock is not poisoned");
        if !record.circuit_open {
            return true;
        }

        let open_ms = i128::try_from(self.policy.circuit_open_duration.as_millis())
            .unwrap_or(i128::MAX);
        let cooled_down = record
            .last_failure_at
            .map(|failed_at| now.millis_since(failed_at) >= open_ms)
            .unwrap_or(true);
        if !cooled_down {
            return false;
        }

        record.circuit_open = false;
        record.consecutive_failures = 0;
        info!(adapter = adapter_id, score = record.score, "circuit half-open, retrying adapter");
        true
    }

    /// Manual recovery: restores a perfect record, keeping call counters.
    pub fn reset(&self, adapter_id: &str) -> Result<(), CoreError> {
        let cell = self.cell(adapter_id).ok_or_else(|| CoreError::UnknownAdapter {
            adapter_id: adapter_id.to_owned(),
        })?;
        let mut record = cell.lock().expect("health record lock is not poisoned");
        record.score = MAX_SCORE;
        record.consecutive_failures = 0;
        record.circuit_open = false;
        record.last_failure_at = None;

        info!(adapter = adapter_id, "adapter health reset");
        Ok(())
    }

    pub fn get(&self, adapter_id: &str) -> Option<AdapterHealth> {
        self.cell(adapter_id)
            .map(|cell| cell.lock().expect("health record lock is not poisoned").clone())
    }

    /// Owned copy of every record, ordered by adapter id.
    pub fn snapshot(&self) -> BTreeMap<String, AdapterHealth> {
        let records = self.records.read().expect("health table lock is not poisoned");
        records
            .iter()
            .map(|(id, cell)| {
                let record = cell.lock().expect("health record lock is not poisoned");
                (id.clone(), record.clone())
            })
            .collect()
    }

    fn cell(&self, adapter_id: &str) -> Option<HealthCell> {
        self.records
            .read()
            .expect("health table lock is not poisoned")
            .get(adapter_id)
            .cloned()
    }

    fn cell_or_insert(&self, adapter_id: &str) -> HealthCell {
        if let Some(cell) = self.cell(adapter_id) {
            return cell;
        }
        let mut records = self.records.write().expect("health table lock is not poisoned");
        Arc::clone(records.entry(adapter_id.to_owned()).or_default())
    }
}
