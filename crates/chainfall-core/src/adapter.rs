use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider_policy::AdapterQuota;
use crate::{ChainId, Operation, OperationSet};

/// Identity and static routing attributes of one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub id: String,
    pub name: String,
    pub supported_chains: BTreeSet<ChainId>,
    /// Lower values are tried first.
    pub priority: i32,
    #[serde(default)]
    pub operations: OperationSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<AdapterQuota>,
}

impl AdapterDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supported_chains: BTreeSet::new(),
            priority,
            operations: OperationSet::all(),
            quota: None,
        }
    }

    pub fn with_chains<I, C>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChainId>,
    {
        self.supported_chains
            .extend(chains.into_iter().map(Into::into));
        self
    }

    pub fn with_operations(mut self, operations: OperationSet) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_quota(mut self, quota: AdapterQuota) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn supports_chain(&self, chain: &ChainId) -> bool {
        self.supported_chains.contains(chain)
    }
}

/// One logical call routed to a chain's adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub chain: ChainId,
    pub operation: Operation,
    #[serde(default)]
    pub args: Value,
}

impl OperationRequest {
    pub fn new(chain: impl Into<ChainId>, operation: Operation, args: Value) -> Self {
        Self {
            chain: chain.into(),
            operation,
            args,
        }
    }
}

/// Adapter-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Failed,
    Timeout,
    Panicked,
}

/// Typed failure returned by an adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    kind: AdapterErrorKind,
    message: String,
}

impl AdapterError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: AdapterErrorKind::Timeout,
            message: format!("adapter did not respond within {} ms", after.as_millis()),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Panicked,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> AdapterErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            AdapterErrorKind::Failed => "adapter.failed",
            AdapterErrorKind::Timeout => "adapter.timeout",
            AdapterErrorKind::Panicked => "adapter.panicked",
        }
    }
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for AdapterError {}

pub type AdapterResult = Result<Value, AdapterError>;

pub type AdapterFuture<'a> = Pin<Box<dyn Future<Output = AdapterResult> + Send + 'a>>;

/// Interchangeable data source for one or more chains.
///
/// Implementations wrap a single upstream API (block explorer, security
/// scanner, market feed). They report failure through [`AdapterError`];
/// panics are tolerated but treated as failures by the orchestrator.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use chainfall_core::{AdapterDescriptor, AdapterFuture, ChainAdapter, OperationRequest};
///
/// struct Explorer {
///     descriptor: AdapterDescriptor,
/// }
///
/// impl ChainAdapter for Explorer {
///     fn descriptor(&self) -> &AdapterDescriptor {
///         &self.descriptor
///     }
///
///     fn execute(&self, request: OperationRequest) -> AdapterFuture<'_> {
///         Box::pin(async move { fetch_token_json(&request).await })
///     }
/// }
/// ```
pub trait ChainAdapter: Send + Sync {
    fn descriptor(&self) -> &AdapterDescriptor;

    fn execute(&self, request: OperationRequest) -> AdapterFuture<'_>;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn priority(&self) -> i32 {
        self.descriptor().priority
    }
}
