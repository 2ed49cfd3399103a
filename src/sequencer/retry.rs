use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::report::Outcome;
use crate::testing::only_soft;

/// Optional wrapper around a single case's execution. Off unless configured.
///
/// A failed case is retried only when every failing assertion is soft
/// (latency). An errored case is retried only for transport failures, and
/// only when `retry_transport_errors` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub retry_transport_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            retry_transport_errors: false,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(HarnessError::config("retry max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether another attempt should follow attempt number `attempts`.
    pub fn should_retry(&self, attempts: u32, outcome: &Outcome) -> bool {
        if attempts >= self.max_attempts {
            return false;
        }
        match outcome {
            Outcome::Passed => false,
            Outcome::Failed { failures } => only_soft(failures),
            Outcome::Errored { kind, .. } => {
                self.retry_transport_errors && kind.is_transport()
            }
        }
    }
}
