use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Request budget for one adapter, shared across every chain it serves.
///
/// Both the limit and the window are non-zero; a quota that would never
/// admit a call cannot be constructed or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuotaFields", into = "QuotaFields")]
pub struct AdapterQuota {
    limit: NonZeroU32,
    window_ms: NonZeroU64,
}

#[derive(Serialize, Deserialize)]
struct QuotaFields {
    limit: u32,
    window_ms: u64,
}

impl AdapterQuota {
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        let window_ms = window.as_millis().min(u128::from(u64::MAX)) as u64;
        match (NonZeroU32::new(limit), NonZeroU64::new(window_ms)) {
            (Some(limit), Some(window_ms)) => Ok(Self { limit, window_ms }),
            _ => Err(ConfigError::ZeroQuota { limit, window_ms }),
        }
    }

    pub fn limit(self) -> NonZeroU32 {
        self.limit
    }

    pub fn window(self) -> Duration {
        Duration::from_millis(self.window_ms.get())
    }
}

impl TryFrom<QuotaFields> for AdapterQuota {
    type Error = ConfigError;

    fn try_from(fields: QuotaFields) -> Result<Self, Self::Error> {
        Self::new(fields.limit, Duration::from_millis(fields.window_ms))
    }
}

impl From<AdapterQuota> for QuotaFields {
    fn from(quota: AdapterQuota) -> Self {
        Self {
            limit: quota.limit.get(),
            window_ms: quota.window_ms.get(),
        }
    }
}
