use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::AdapterQuota;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Non-blocking rate budget for one adapter.
pub struct RateBudget {
    limiter: DirectRateLimiter,
    quota: AdapterQuota,
}

impl std::fmt::Debug for RateBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl RateBudget {
    pub fn new(quota: AdapterQuota) -> Self {
        Self {
            limiter: RateLimiter::direct(quota_from_window(quota.window(), quota.limit())),
            quota,
        }
    }

    /// Consumes one unit of budget. Returns false when the adapter must be skipped.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn quota(&self) -> AdapterQuota {
        self.quota
    }
}

fn quota_from_window(quota_window: Duration, burst: NonZeroU32) -> Quota {
    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_exhausted_after_burst() {
        let budget = RateBudget::new(
            AdapterQuota::new(2, Duration::from_secs(60)).expect("valid quota"),
        );

        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn budget_reports_its_quota() {
        let quota = AdapterQuota::new(10, Duration::from_secs(1)).expect("valid quota");
        assert_eq!(RateBudget::new(quota).quota(), quota);
    }
}
