//! Polling waits with a typed outcome.
//!
//! A wait repeatedly runs a probe until the probe reports [`Probe::Ready`],
//! a terminal [`Probe::Failed`], or the timeout elapses. The timeout is only
//! reported once it has actually passed. Dropping the future cancels the wait.

use std::future::Future;
use std::time::Duration;

use autodeploy_core::WaitConfig;
use tokio::time::Instant;

use crate::tool::ToolError;

/// Observation of a resource at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Ready,
    Pending,
    /// The resource can no longer become ready (e.g. a failed Job)
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

impl From<&WaitConfig> for WaitPolicy {
    fn from(config: &WaitConfig) -> Self {
        Self::new(config.timeout(), config.interval())
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&WaitConfig::default())
    }
}

#[derive(Debug)]
pub enum WaitOutcome {
    Ready { elapsed: Duration },
    Failed { reason: String },
    TimedOut { elapsed: Duration },
    /// The probe itself could not run
    Errored { source: ToolError },
}

impl WaitOutcome {
    /// Convert into a result, naming the awaited resource in the error.
    pub fn into_result(self, what: impl Into<String>) -> Result<Duration, WaitError> {
        match self {
            WaitOutcome::Ready { elapsed } => Ok(elapsed),
            WaitOutcome::Failed { reason } => Err(WaitError::Failed {
                what: what.into(),
                reason,
            }),
            WaitOutcome::TimedOut { elapsed } => Err(WaitError::TimedOut {
                what: what.into(),
                elapsed,
            }),
            WaitOutcome::Errored { source } => Err(WaitError::Probe {
                what: what.into(),
                source,
            }),
        }
    }
}

/// Run `probe` every `policy.interval` until it settles or `policy.timeout` passes.
///
/// A probe that is still running at the deadline is abandoned and counts as a timeout.
pub async fn poll_until<F, Fut>(policy: WaitPolicy, mut probe: F) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe, ToolError>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;

    loop {
        let observed = match tokio::time::timeout_at(deadline, probe()).await {
            Ok(observed) => observed,
            Err(_) => {
                return WaitOutcome::TimedOut {
                    elapsed: start.elapsed(),
                };
            }
        };

        match observed {
            Ok(Probe::Ready) => {
                return WaitOutcome::Ready {
                    elapsed: start.elapsed(),
                };
            }
            Ok(Probe::Failed(reason)) => return WaitOutcome::Failed { reason },
            Ok(Probe::Pending) => {}
            Err(source) => return WaitOutcome::Errored { source },
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut {
                elapsed: now - start,
            };
        }
        tokio::time::sleep_until((now + policy.interval).min(deadline)).await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("{what} did not become ready within {}s", .elapsed.as_secs())]
    TimedOut { what: String, elapsed: Duration },

    #[error("{what} failed: {reason}")]
    Failed { what: String, reason: String },

    #[error("failed to check {what}")]
    Probe { what: String, source: ToolError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(timeout: u64, interval: u64) -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(timeout), Duration::from_secs(interval))
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_first_probe() {
        let outcome = poll_until(policy(600, 5), || async { Ok(Probe::Ready) }).await;
        assert!(matches!(outcome, WaitOutcome::Ready { elapsed } if elapsed.is_zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_some_polls() {
        let calls = AtomicUsize::new(0);
        let outcome = poll_until(policy(600, 5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(if n >= 3 { Probe::Ready } else { Probe::Pending })
            }
        })
        .await;

        assert!(matches!(outcome, WaitOutcome::Ready { elapsed } if elapsed == Duration::from_secs(15)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_only_after_timeout() {
        let start = Instant::now();
        let calls = AtomicUsize::new(0);
        let outcome = poll_until(policy(600, 5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Probe::Pending) }
        })
        .await;

        assert!(start.elapsed() >= Duration::from_secs(600));
        assert!(
            matches!(outcome, WaitOutcome::TimedOut { elapsed } if elapsed == Duration::from_secs(600))
        );
        // t = 0, 5, ..., 600
        assert_eq!(calls.load(Ordering::SeqCst), 121);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_times_out_at_deadline() {
        let outcome = poll_until(policy(30, 5), || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Probe::Ready)
        })
        .await;

        assert!(
            matches!(outcome, WaitOutcome::TimedOut { elapsed } if elapsed == Duration::from_secs(30))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_stops_polling() {
        let calls = AtomicUsize::new(0);
        let outcome = poll_until(policy(600, 5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Probe::Failed("BackoffLimitExceeded".to_owned())) }
        })
        .await;

        assert!(matches!(outcome, WaitOutcome::Failed { ref reason } if reason == "BackoffLimitExceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timed_out_error_names_resource() {
        let err = WaitOutcome::TimedOut {
            elapsed: Duration::from_secs(600),
        }
        .into_result("deployment production")
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "deployment production did not become ready within 600s"
        );
    }

    #[test]
    fn policy_from_config() {
        let policy = WaitPolicy::from(&WaitConfig::default());
        assert_eq!(policy.timeout, Duration::from_secs(600));
        assert_eq!(policy.interval, Duration::from_secs(5));
    }
}
