//! Orchestrator tuning.
//!
//! Defaults match the production constants: 30 s per adapter attempt, an EMA
//! weight of 0.2, a circuit threshold of 20, and a 60 s cool-down.
//!
//! # Environment Variables
//!
//! | Variable | Unit | Default |
//! |----------|------|---------|
//! | `CHAINFALL_ADAPTER_TIMEOUT_MS` | ms | `30000` |
//! | `CHAINFALL_HEALTH_ALPHA` | ratio | `0.2` |
//! | `CHAINFALL_CIRCUIT_THRESHOLD` | score | `20` |
//! | `CHAINFALL_CIRCUIT_OPEN_MS` | ms | `60000` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::ConfigError;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_HEALTH_ALPHA: f64 = 0.2;
pub const DEFAULT_CIRCUIT_THRESHOLD: f64 = 20.0;
pub const DEFAULT_CIRCUIT_OPEN_DURATION: Duration = Duration::from_millis(60_000);

pub const ENV_ADAPTER_TIMEOUT_MS: &str = "CHAINFALL_ADAPTER_TIMEOUT_MS";
pub const ENV_HEALTH_ALPHA: &str = "CHAINFALL_HEALTH_ALPHA";
pub const ENV_CIRCUIT_THRESHOLD: &str = "CHAINFALL_CIRCUIT_THRESHOLD";
pub const ENV_CIRCUIT_OPEN_MS: &str = "CHAINFALL_CIRCUIT_OPEN_MS";

/// Health scoring and circuit-breaker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthPolicy {
    /// EMA weight given to the newest outcome.
    pub alpha: f64,
    /// A failure that leaves the score below this value opens the circuit.
    pub circuit_threshold: f64,
    #[serde(rename = "circuit_open_ms", serialize_with = "serialize_millis")]
    pub circuit_open_duration: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_HEALTH_ALPHA,
            circuit_threshold: DEFAULT_CIRCUIT_THRESHOLD,
            circuit_open_duration: DEFAULT_CIRCUIT_OPEN_DURATION,
        }
    }
}

impl HealthPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::AlphaOutOfRange { value: self.alpha });
        }
        if !(0.0..=100.0).contains(&self.circuit_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.circuit_threshold,
            });
        }
        Ok(())
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrchestratorConfig {
    #[serde(rename = "adapter_timeout_ms", serialize_with = "serialize_millis")]
    pub adapter_timeout: Duration,
    pub health: HealthPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            health: HealthPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Starts from defaults and applies any `CHAINFALL_*` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_ADAPTER_TIMEOUT_MS)? {
            config.adapter_timeout = Duration::from_millis(ms);
        }
        if let Some(alpha) = parse_var::<f64, _>(&lookup, ENV_HEALTH_ALPHA)? {
            config.health.alpha = alpha;
        }
        if let Some(threshold) = parse_var::<f64, _>(&lookup, ENV_CIRCUIT_THRESHOLD)? {
            config.health.circuit_threshold = threshold;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_CIRCUIT_OPEN_MS)? {
            config.health.circuit_open_duration = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adapter_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.health.validate()
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvValue { name, value: raw })
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis().min(u128::from(u64::MAX)) as u64)
}
