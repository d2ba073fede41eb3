//! Polling-based wait primitive
//!
//! Synchronizes with asynchronous UI state changes that expose no event
//! channel: a probe is evaluated on a fixed interval until it yields a value
//! or a timeout elapses. Every poll is a non-blocking check and the task is
//! suspended between polls, so the rest of the system (rendering, the
//! cancellation flag) keeps making progress.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::constants::wait;
use crate::errors::{WaitError, WaitResult};

/// Configuration of one wait call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Interval between probe evaluations
    pub poll_interval: Duration,
    /// Total time budget for the wait
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: wait::POLL_INTERVAL,
            timeout: wait::RESOLVE_TIMEOUT,
        }
    }
}

impl WaitConfig {
    /// Fast preset for tests
    pub fn testing() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(100),
        }
    }
}

/// Repeatedly evaluate `probe` until it yields a value or the timeout elapses
///
/// The first evaluation happens immediately, so an already-satisfied
/// condition resolves without waiting a full interval. The final sleep is
/// clipped to the remaining budget so the timeout is not overshot. Each call
/// is independent; no state is shared across calls.
///
/// # Errors
///
/// Returns [`WaitError::Timeout`] if no probe invocation produced a value
/// before `config.timeout` elapsed since the call began.
pub async fn wait_for<T, F, Fut>(mut probe: F, config: &WaitConfig) -> WaitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        if let Some(value) = probe().await {
            trace!(polls, "condition satisfied");
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                timeout: config.timeout,
            });
        }

        let remaining = deadline - now;
        tokio::time::sleep(config.poll_interval.min(remaining)).await;
    }
}
