use std::sync::Mutex;
use std::time::Duration;

use crate::UtcDateTime;

/// Wall-clock source for health bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

/// Reads the system UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Clock that only moves when told to. Lets circuit cool-down be exercised
/// without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<UtcDateTime>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UtcDateTime::now())
    }
}

impl ManualClock {
    pub fn new(start: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now = now.saturating_add(duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("manual clock lock is not poisoned")
    }
}
