//! Convergence wait state machine
//!
//! ```text
//!            fetch ok, status != target, budget left
//!              ┌──────────┐
//!              ▼          │
//!         ┌─────────┐─────┘
//!  start─►│ Polling │──── fetch ok, status == target ───► Converged
//!         └─────────┘──── fetch error ──────────────────► Failed
//!              │
//!              └───────── budget spent ─────────────────► Exhausted
//! ```
//!
//! [`ConvergenceWait::observe`] is the pure transition function; the async
//! driver [`ConvergenceWait::run`] feeds it one fetch at a time and sleeps on
//! the tokio timer between attempts. Cancellation is only checked at the
//! attempt boundaries, never while a fetch is in flight.

use crate::backoff::{Backoff, BackoffPolicy};
use crate::error::{Error, Result};
use crate::traits::{FloatingIp, FloatingIpApi, FloatingIpStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// State after an observed fetch
#[derive(Debug)]
pub enum ConvergenceState {
    /// Target not reached yet; wait `next_delay` before fetching again
    Polling {
        /// Fetches performed so far
        attempts: u32,
        /// Delay before the next fetch
        next_delay: Duration,
    },
    /// The remote reports the target status
    Converged(FloatingIp),
    /// A fetch failed; no further attempts
    Failed(Error),
    /// Retry budget spent without reaching the target
    Exhausted {
        /// Fetches performed
        attempts: u32,
    },
}

/// Bounded wait for a floating IP to reach a target status
#[derive(Debug)]
pub struct ConvergenceWait {
    id: String,
    target: FloatingIpStatus,
    backoff: Backoff,
    attempts: u32,
}

impl ConvergenceWait {
    /// Start waiting for `id` to report `target`
    pub fn new(id: impl Into<String>, target: FloatingIpStatus, policy: &BackoffPolicy) -> Self {
        Self {
            id: id.into(),
            target,
            backoff: policy.start(),
            attempts: 0,
        }
    }

    /// Identifier being polled
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetches observed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Feed the outcome of one fetch
    pub fn observe(&mut self, fetched: Result<FloatingIp>) -> ConvergenceState {
        self.attempts += 1;

        let fip = match fetched {
            Ok(fip) => fip,
            Err(e) => return ConvergenceState::Failed(e),
        };

        debug!(
            id = %self.id,
            attempt = self.attempts,
            status = %fip.status,
            target = %self.target,
            "Polled floating IP status"
        );

        if fip.status == self.target {
            return ConvergenceState::Converged(fip);
        }

        match self.backoff.step() {
            Some(next_delay) => ConvergenceState::Polling {
                attempts: self.attempts,
                next_delay,
            },
            None => ConvergenceState::Exhausted {
                attempts: self.attempts,
            },
        }
    }

    /// Drive the wait against `api` until a terminal state
    pub async fn run(
        mut self,
        api: &dyn FloatingIpApi,
        cancel: Option<&CancellationToken>,
    ) -> Result<FloatingIp> {
        if self.backoff.remaining() == 0 {
            return Err(self.timeout());
        }

        loop {
            if let Some(token) = cancel
                && token.is_cancelled()
            {
                return Err(self.cancelled());
            }

            let fetched = api.get(&self.id).await;
            match self.observe(fetched) {
                ConvergenceState::Converged(fip) => return Ok(fip),
                ConvergenceState::Failed(e) => return Err(e),
                ConvergenceState::Exhausted { .. } => return Err(self.timeout()),
                ConvergenceState::Polling { next_delay, .. } => match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => return Err(self.cancelled()),
                            _ = tokio::time::sleep(next_delay) => {}
                        }
                    }
                    None => tokio::time::sleep(next_delay).await,
                },
            }
        }
    }

    fn timeout(&self) -> Error {
        Error::ConvergenceTimeout {
            id: self.id.clone(),
            target: self.target.to_string(),
            attempts: self.attempts,
        }
    }

    fn cancelled(&self) -> Error {
        Error::Cancelled {
            id: self.id.clone(),
            attempts: self.attempts,
        }
    }
}
