//! Resilient transfer wrapper
//!
//! Wraps single-attempt [`Transport`] calls with bounded retry and a fixed
//! inter-attempt delay, producing exactly one outcome per logical transfer.
//! Attempts are strictly sequential and reuse the same request; abort and
//! timeout signals are terminal and never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::transport::{TransferRequest, Transport, TransportSignal};
use crate::constants::transfer;
use crate::errors::{TransferError, TransferResult};

/// Retry configuration of a resilient transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Maximum transport attempts per logical transfer
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Grace delay after a completed attempt, letting the transport flush
    pub grace_delay: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_attempts: transfer::MAX_ATTEMPTS,
            retry_delay: transfer::RETRY_DELAY,
            grace_delay: transfer::GRACE_DELAY,
        }
    }
}

impl TransferConfig {
    /// Fast preset for tests
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(5),
            grace_delay: Duration::from_millis(1),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts cannot be zero".to_string());
        }
        Ok(())
    }
}

/// Retry-wrapping facade over a single-attempt transport
#[derive(Clone)]
pub struct ResilientTransfer {
    transport: Arc<dyn Transport>,
    config: TransferConfig,
}

impl ResilientTransfer {
    /// Create a resilient transfer over the given transport
    pub fn new(transport: Arc<dyn Transport>, config: TransferConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch one artifact, retrying failed attempts up to the configured bound
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::AttemptsExhausted`] when every attempt failed,
    /// [`TransferError::Aborted`] or [`TransferError::TimedOut`] immediately
    /// when the transport signals those terminal conditions.
    pub async fn transfer(&self, request: &TransferRequest) -> TransferResult<()> {
        let mut attempt: u32 = 1;

        loop {
            debug!(
                name = %request.destination_name,
                attempt,
                max_attempts = self.config.max_attempts,
                "starting transport attempt"
            );

            match self.transport.attempt(request).await {
                TransportSignal::Completed { status } => {
                    // Let the underlying transfer flush before settling
                    tokio::time::sleep(self.config.grace_delay).await;
                    info!(name = %request.destination_name, status, "transfer completed");
                    return Ok(());
                }
                TransportSignal::Failed { cause } => {
                    if attempt < self.config.max_attempts {
                        warn!(
                            name = %request.destination_name,
                            attempt,
                            %cause,
                            "attempt failed, retrying in {:?}",
                            self.config.retry_delay
                        );
                        tokio::time::sleep(self.config.retry_delay).await;
                        attempt += 1;
                    } else {
                        warn!(
                            name = %request.destination_name,
                            attempts = attempt,
                            %cause,
                            "transfer failed, attempts exhausted"
                        );
                        return Err(TransferError::AttemptsExhausted {
                            attempts: attempt,
                            last_cause: cause,
                        });
                    }
                }
                TransportSignal::Aborted => {
                    warn!(name = %request.destination_name, "transfer aborted");
                    return Err(TransferError::Aborted);
                }
                TransportSignal::TimedOut => {
                    warn!(name = %request.destination_name, "transfer timed out");
                    return Err(TransferError::TimedOut);
                }
            }
        }
    }
}
