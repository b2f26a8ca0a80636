use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

pub const DEFAULT_REPORT_RETRIES: usize = 2;
pub const DEFAULT_REPORT_RETRY_DELAY_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Fixed-count, fixed-delay retry budget shared by every report kind.
pub struct RetryPolicy {
    /// Extra attempts after the first call.
    pub retries: usize,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_REPORT_RETRIES,
            delay_ms: DEFAULT_REPORT_RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: usize, delay_ms: u64) -> Self {
        Self { retries, delay_ms }
    }

    pub fn max_attempts(&self) -> usize {
        self.retries.saturating_add(1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Outcome of a poll: the last payload plus whether it ever became ready.
pub struct Polled<T> {
    pub payload: T,
    pub attempts: usize,
    pub ready: bool,
}

/// Calls `fetch` until `is_ready` accepts the payload or the budget runs out.
///
/// A payload that never becomes ready is returned with `ready == false`
/// rather than as an error. Fetch failures are retried with the same budget
/// and delay; the last failure propagates once the budget is exhausted.
pub async fn poll_until_ready<T, E, F, Fut, P>(
    policy: RetryPolicy,
    operation: &str,
    mut fetch: F,
    is_ready: P,
) -> Result<Polled<T>, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0_usize;
    loop {
        attempt = attempt.saturating_add(1);
        match fetch().await {
            Ok(payload) => {
                let ready = is_ready(&payload);
                if ready || attempt >= max_attempts {
                    if !ready {
                        tracing::warn!(
                            operation,
                            attempts = attempt,
                            "report still empty after retry budget"
                        );
                    }
                    return Ok(Polled {
                        payload,
                        attempts: attempt,
                        ready,
                    });
                }
                tracing::debug!(operation, attempt, "report not ready; polling again");
            }
            Err(error) => {
                if attempt >= max_attempts {
                    return Err(error);
                }
                tracing::debug!(operation, attempt, error = %error, "report fetch failed; retrying");
            }
        }
        sleep(policy.delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::{poll_until_ready, Polled, RetryPolicy};

    #[test]
    fn unit_default_policy_allows_two_retries_at_fixed_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_millis(250));
        assert_eq!(RetryPolicy::new(0, 10).max_attempts(), 1);
    }

    #[tokio::test]
    async fn functional_poll_returns_first_ready_payload_with_exact_call_count() {
        let calls = AtomicUsize::new(0);
        let stamps = Mutex::new(Vec::new());
        let polled = poll_until_ready(
            RetryPolicy::new(4, 20),
            "unit",
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                stamps.lock().expect("stamps").push(Instant::now());
                async move { Ok::<usize, String>(call) }
            },
            |payload| *payload == 3,
        )
        .await
        .expect("poll");

        assert_eq!(
            polled,
            Polled {
                payload: 3,
                attempts: 3,
                ready: true
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stamps = stamps.into_inner().expect("stamps");
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(20));
        }
    }

    #[tokio::test]
    async fn functional_poll_returns_last_payload_when_never_ready() {
        let calls = AtomicUsize::new(0);
        let polled = poll_until_ready(
            RetryPolicy::new(2, 1),
            "unit",
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<String, String>(format!("empty-{call}")) }
            },
            |_payload| false,
        )
        .await
        .expect("never-ready poll must not fail");

        assert_eq!(polled.payload, "empty-3");
        assert_eq!(polled.attempts, 3);
        assert!(!polled.ready);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn regression_poll_recovers_from_transient_failure() {
        let calls = AtomicUsize::new(0);
        let polled = poll_until_ready(
            RetryPolicy::new(2, 1),
            "unit",
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call == 1 {
                        Err("connection reset".to_string())
                    } else {
                        Ok(call)
                    }
                }
            },
            |_payload| true,
        )
        .await
        .expect("second attempt succeeds");
        assert_eq!(polled.payload, 2);
        assert!(polled.ready);
    }

    #[tokio::test]
    async fn regression_poll_propagates_failure_after_budget() {
        let calls = AtomicUsize::new(0);
        let error = poll_until_ready(
            RetryPolicy::new(1, 1),
            "unit",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<usize, String>("backend down".to_string()) }
            },
            |_payload| true,
        )
        .await
        .expect_err("exhausted failures propagate");
        assert_eq!(error, "backend down");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
