use std::{fmt::Display, future::Future, time::Duration};
use tracing::warn;

/// Policy governing retry of transiently failing outbound I/O.
///
/// Attempt `n` (1-indexed) of a retry sleeps `base * 2^n` before re-invoking the operation,
/// so the default policy backs off 2s, 4s, 8s, 16s, 32s across its five retries.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts permitted after the initial one.
    pub max_retries: u32,

    /// Base unit of the exponential backoff.
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    /// Policy that retries without sleeping. Intended for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Backoff delay preceding retry attempt `n` (1-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base * 2u32.saturating_pow(attempt)
    }
}

/// Retry `op` while it yields `None`, sleeping the policy backoff between attempts.
///
/// Transient failures manifest as `None` - operations catch and log their own errors. Returns
/// `None` once the initial attempt plus `policy.max_retries` retries are all exhausted.
pub async fn retry_null<T, Op, Fut>(policy: RetryPolicy, label: &str, mut op: Op) -> Option<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut result = op().await;
    let mut attempt = 0;

    while result.is_none() && attempt < policy.max_retries {
        attempt += 1;
        let delay = policy.backoff_delay(attempt);
        warn!(
            label,
            attempt,
            ?delay,
            "operation yielded no result - backing off before retry"
        );
        tokio::time::sleep(delay).await;
        result = op().await;
    }

    result
}

/// Error types that distinguish transient failures worth retrying from terminal ones.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry `op` while it fails transiently, sleeping the policy backoff between attempts.
///
/// Non-transient errors short-circuit immediately - eg/ rejected session tokens must abort
/// rather than hammer the API five more times.
pub async fn retry_transient<T, E, Op, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: Op,
) -> Result<T, E>
where
    E: Transient + Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff_delay(attempt);
                warn!(
                    label,
                    attempt,
                    %error,
                    ?delay,
                    "transient failure - backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
