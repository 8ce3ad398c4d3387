//! # Chainfall Core
//!
//! Chain-aware fallback orchestration for token analysis data sources.
//!
//! ## Overview
//!
//! Token analysis pulls from several competing third-party APIs per chain
//! (block explorers, security scanners, market feeds). This crate decides
//! which of them serves a request:
//!
//! - **Adapter registry** keyed by chain, ordered by static priority
//! - **Health tracking** with an exponential moving average per adapter
//! - **Circuit breaking** of adapters whose score collapses
//! - **Timeout guard** so a stuck upstream never blocks fallback
//! - **Batch execution** of independent requests with partial failure
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Adapter trait, descriptors, and typed failures |
//! | [`adapters`] | Bundled adapters (scripted replay for drills and tests) |
//! | [`clock`] | Injectable wall clock |
//! | [`config`] | Orchestrator tuning and environment overrides |
//! | [`domain`] | Chain ids, operations, timestamps |
//! | [`health`] | Health records and circuit state |
//! | [`orchestrator`] | Fallback executor and batch coordinator |
//! | [`registry`] | Chain → adapter candidates |
//! | [`timeout`] | Deadline-bounded adapter invocation |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chainfall_core::{FallbackOrchestrator, Operation};
//!
//! let orchestrator = FallbackOrchestrator::default();
//! orchestrator.register("ethereum", Arc::new(etherscan));
//! orchestrator.register("ethereum", Arc::new(blockscout));
//!
//! let outcome = orchestrator
//!     .execute_with_fallback("ethereum", Operation::TokenMetadata, args)
//!     .await;
//! if !outcome.succeeded {
//!     // degrade: treat the field as unknown
//! }
//! ```
//!
//! ## Error Handling
//!
//! Adapter failures, timeouts, and panics never surface as Rust errors from
//! the executor; they are folded into [`CallOutcome`]. `Result` is reserved
//! for configuration and administrative misuse:
//!
//! ```rust
//! use chainfall_core::{CoreError, FallbackOrchestrator};
//!
//! let orchestrator = FallbackOrchestrator::default();
//! match orchestrator.health().reset("etherscan") {
//!     Err(CoreError::UnknownAdapter { adapter_id }) => assert_eq!(adapter_id, "etherscan"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

pub mod adapter;
pub mod adapters;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod provider_policy;
pub mod registry;
pub mod throttling;
pub mod timeout;

pub use adapter::{
    AdapterDescriptor, AdapterError, AdapterErrorKind, AdapterFuture, AdapterResult,
    ChainAdapter, OperationRequest,
};
pub use adapters::{ScriptStep, ScriptedAdapter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HealthPolicy, OrchestratorConfig};
pub use domain::{ChainId, Operation, OperationSet, UtcDateTime};
pub use error::{ConfigError, CoreError, ValidationError};
pub use health::{AdapterHealth, HealthState, HealthTracker};
pub use orchestrator::{
    AttemptFailure, CallOutcome, FallbackOrchestrator, OrchestratorBuilder,
    ALL_ADAPTERS_FAILED, CIRCUIT_OPEN_SUFFIX, NO_SOURCE, RATE_LIMITED_SUFFIX,
};
pub use provider_policy::AdapterQuota;
pub use registry::AdapterRegistry;
pub use throttling::RateBudget;
pub use timeout::run_with_timeout;
