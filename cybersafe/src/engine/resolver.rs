//! Poll-until-complete resolver
//!
//! Fetches scan status at a fixed interval until the service reports a
//! terminal state, the attempt budget runs out, or the caller cancels.
//! The delay only sits between attempts: `n` attempts sleep `n - 1` times.

use crate::intelligence::{PollOutcome, ScanBackend, ScanError, ScanHandle, ScanReport};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Attempt budget and fixed inter-attempt delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(2000),
        }
    }
}

/// Lifecycle of a submitted scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScanStatus {
    Pending,
    Completed(ScanReport),
    TimedOut { attempts: u32 },
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanStatus::Pending)
    }

    /// The completed report, or the error describing why there is none
    pub fn into_report(self) -> Result<ScanReport, ScanError> {
        match self {
            ScanStatus::Completed(report) => Ok(report),
            ScanStatus::TimedOut { attempts } => Err(ScanError::PollTimeout { attempts }),
            ScanStatus::Pending => Err(ScanError::InvalidRequest(
                "scan has not reached a terminal state".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PollResolver {
    policy: PollPolicy,
}

impl PollResolver {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `handle` until it completes or the budget is spent
    ///
    /// Retryable errors consume an attempt like a pending answer does.
    /// Non-retryable errors abort immediately. If every attempt failed
    /// before reaching the service, the last transport error is returned
    /// instead of `TimedOut`.
    pub async fn resolve<B>(
        &self,
        backend: &B,
        handle: &ScanHandle,
        cancel: &CancellationToken,
    ) -> Result<ScanStatus, ScanError>
    where
        B: ScanBackend + ?Sized,
    {
        let mut remaining = self.policy.max_attempts;
        let mut attempt = 0u32;
        let mut reached_service = false;
        let mut last_error: Option<ScanError> = None;

        while remaining > 0 {
            attempt += 1;
            remaining -= 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                outcome = backend.poll(handle) => outcome,
            };

            match outcome {
                PollOutcome::Terminal(report) => {
                    info!(
                        scan_id = handle.scan_id(),
                        attempt,
                        "Scan completed"
                    );
                    return Ok(ScanStatus::Completed(report));
                }
                PollOutcome::Pending => {
                    reached_service = true;
                    debug!(scan_id = handle.scan_id(), attempt, remaining, "Scan still pending");
                }
                PollOutcome::Error(e) if e.is_retryable() => {
                    warn!(
                        scan_id = handle.scan_id(),
                        attempt,
                        remaining,
                        "Poll attempt failed: {}",
                        e
                    );
                    if !matches!(e, ScanError::Transport(_)) {
                        reached_service = true;
                    }
                    last_error = Some(e);
                }
                PollOutcome::Error(e) => {
                    warn!(scan_id = handle.scan_id(), attempt, "Polling aborted: {}", e);
                    return Err(e);
                }
            }

            if remaining == 0 {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        match last_error {
            Some(e) if !reached_service => Err(e),
            _ => {
                warn!(scan_id = handle.scan_id(), attempts = attempt, "Scan timed out");
                Ok(ScanStatus::TimedOut { attempts: attempt })
            }
        }
    }
}
