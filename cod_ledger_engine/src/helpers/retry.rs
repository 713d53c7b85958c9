use std::{future::Future, time::Duration};

use log::*;

use crate::traits::CashLedgerError;

/// Bounded whole-operation retry for transactions that the store aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Always at least one.
    pub max_attempts: u32,
    /// Linear backoff step. Attempt `n` waits `n * backoff` before running again.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_millis(50) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the policy's attempts are used up.
///
/// `op` must describe the *whole* operation (a fresh transaction each time). Only errors for which
/// [`CashLedgerError::is_transient`] is true are retried, and those guarantee nothing was written.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, CashLedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CashLedgerError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!("🔁️ {label}: attempt {attempt}/{} aborted ({e}). Retrying.", policy.max_attempts);
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            },
            Err(e) if e.is_transient() => {
                error!("🔁️ {label}: giving up after {attempt} attempts. {e}");
                return Err(e);
            },
            result => return result,
        }
    }
}
