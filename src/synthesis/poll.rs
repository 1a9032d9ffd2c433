//! Fixed-interval polling with an attempt budget.
//!
//! [`poll_until`] sleeps `interval`, probes, and stops as soon as the probed
//! value is settled or `max_attempts` probes have been made.  Sleeping goes
//! through the [`Sleeper`] seam so tests run without real delays.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RemoteConfig;

// ---------------------------------------------------------------------------
// PollPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.max_poll_attempts,
        )
    }

    /// Total time spent sleeping when the budget is exhausted.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&RemoteConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// poll_until
// ---------------------------------------------------------------------------

/// Result of a polling run that did not error.
#[derive(Debug, Clone, PartialEq)]
pub enum Polled<T> {
    /// The predicate accepted `value` on probe number `attempts`.
    Settled { value: T, attempts: u32 },
    /// Every probe ran and none settled; `last` is the final probed value.
    Exhausted { last: Option<T>, attempts: u32 },
}

/// Poll `probe` until `is_settled` accepts its value or the budget runs out.
///
/// Probe errors stop polling immediately and are returned unchanged.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    sleeper: &dyn Sleeper,
    mut probe: F,
    is_settled: P,
) -> Result<Polled<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        sleeper.sleep(policy.interval).await;
        let value = probe(attempt).await?;
        if is_settled(&value) {
            return Ok(Polled::Settled {
                value,
                attempts: attempt,
            });
        }
        last = Some(value);
    }

    Ok(Polled::Exhausted {
        last,
        attempts: policy.max_attempts,
    })
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Records requested sleeps and returns immediately.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
