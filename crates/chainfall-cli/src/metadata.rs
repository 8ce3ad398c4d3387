use std::fmt::{Display, Formatter};

use chainfall_core::UtcDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "v1";

/// Request identifier (UUID v4) for correlating a report with its logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Metadata attached to every command response.
///
/// Field order is fixed to keep deterministic JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: RequestId,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    pub latency_ms: u64,
    pub total_requests: usize,
    pub failed_requests: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(generated_at: UtcDateTime, latency_ms: u64) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            schema_version: String::from(SCHEMA_VERSION),
            generated_at,
            latency_ms,
            total_requests: 0,
            failed_requests: 0,
            warnings: Vec::new(),
        }
    }

    pub fn with_request_counts(mut self, total: usize, failed: usize) -> Self {
        self.total_requests = total;
        self.failed_requests = failed;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
}
