//! Retry and polling schedules
//!
//! Two distinct concerns share this module. [`RetryPolicy`] re-runs a failed
//! transport call with exponential backoff. [`PollingSchedule`] paces the
//! repeated status lookups of a long-running server-side job: a fixed
//! interval while the job is young, then exponentially longer waits up to a
//! cap.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for the delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Runs `f` until it succeeds, returns a non-transient error, or the policy
/// is exhausted.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, op: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = String::new();

    for attempt in 0..policy.max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                last_error = e.to_string();
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    debug!(
                        "{op} attempt {} failed: {last_error}. Retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(ClientError::RetryExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}

#[derive(Debug, Clone)]
pub struct PollingSchedule {
    /// Wait between the first polls
    pub fixed_delay: Duration,
    /// Number of polls served at the fixed interval
    pub fixed_attempts: u32,
    /// Multiplier applied once the fixed phase is over
    pub backoff_multiplier: f64,
    /// Upper bound for the wait between polls
    pub max_delay: Duration,
}

impl Default for PollingSchedule {
    fn default() -> Self {
        Self {
            fixed_delay: Duration::from_millis(500),
            fixed_attempts: 10,
            backoff_multiplier: 1.5,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl PollingSchedule {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt < self.fixed_attempts {
            return self.fixed_delay;
        }
        let exceeded = attempt - self.fixed_attempts + 1;
        let factor = self.backoff_multiplier.powi(exceeded as i32);
        let delay = self.fixed_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// An unbounded iterator of waits; callers decide when to stop polling.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..).map(|attempt| self.delay_for_attempt(attempt))
    }
}
