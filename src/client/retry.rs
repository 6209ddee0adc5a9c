//! Retry policy for transport calls: bounded attempts, exponential backoff,
//! jitter, and a per-call deadline.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult, TransportFailure};

/// Randomization applied to each backoff delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// Use the exact exponential schedule.
    None,
    /// Scale each delay by a random factor in `1 ± ratio`.
    Proportional(f64),
    /// Pick each delay uniformly from `0..=delay`.
    Full,
}

/// How transport failures are retried.
///
/// Only retryable failures (timeouts, refused connections, HTTP 5xx) consume
/// the budget; everything else surfaces at once.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use a2a_tasks::client::{Jitter, RetryPolicy};
///
/// let policy = RetryPolicy {
///     max_attempts: 4,
///     initial_backoff: Duration::from_millis(100),
///     jitter: Jitter::None,
///     ..RetryPolicy::default()
/// };
/// assert_eq!(policy.base_delay(1), Duration::from_millis(100));
/// assert_eq!(policy.base_delay(2), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Randomization of each delay.
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: Jitter::Proportional(0.2),
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

    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        let cap = self.max_backoff.as_secs_f64();
        if secs.is_finite() && secs >= 0.0 {
            Duration::try_from_secs_f64(secs.min(cap)).unwrap_or(self.max_backoff)
        } else {
            self.max_backoff
        }
    }

    /// Delay before retry number `retry`, with jitter applied.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        match self.jitter {
            Jitter::None => base,
            Jitter::Full => {
                let secs = rand::thread_rng().gen_range(0.0..=base.as_secs_f64());
                Duration::try_from_secs_f64(secs).unwrap_or(base)
            }
            Jitter::Proportional(ratio) => {
                // NaN survives clamp; a non-finite ratio means no jitter.
                let ratio = if ratio.is_finite() {
                    ratio.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                if ratio == 0.0 {
                    return base;
                }
                let factor = 1.0 + rand::thread_rng().gen_range(-ratio..=ratio);
                let secs = (base.as_secs_f64() * factor).min(self.max_backoff.as_secs_f64());
                Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(base)
            }
        }
    }

    /// Run `op` until it succeeds, fails non-retryably, the attempt budget is
    /// spent, or `deadline` passes.
    ///
    /// Each attempt is bounded by the time left before `deadline`; an attempt
    /// cut short that way counts as a timeout. The loop never sleeps past the
    /// deadline.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        deadline: Option<Instant>,
        mut op: F,
    ) -> A2AResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportFailure>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let outcome = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(A2AError::TransportExhausted {
                            attempts: attempt - 1,
                            last: TransportFailure::Timeout("call deadline elapsed".to_string()),
                        });
                    }
                    tokio::time::timeout(deadline - now, op())
                        .await
                        .unwrap_or_else(|_| {
                            Err(TransportFailure::Timeout(
                                "call deadline elapsed".to_string(),
                            ))
                        })
                }
                None => op().await,
            };

            let failure = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Transport call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                debug!(label, attempt, error = %failure, "Non-retryable transport failure");
                return Err(A2AError::TransportRejected(failure));
            }

            if attempt >= max_attempts {
                warn!(label, attempts = attempt, error = %failure, "Retry budget exhausted");
                return Err(A2AError::TransportExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = self.delay_for(attempt);
            if let Some(deadline) = deadline {
                if Instant::now() + delay >= deadline {
                    warn!(label, attempts = attempt, error = %failure, "Deadline leaves no room for another retry");
                    return Err(A2AError::TransportExhausted {
                        attempts: attempt,
                        last: failure,
                    });
                }
            }

            debug!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Retrying transport call"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
