//! Fixed-cadence polling until healthy or a deadline passes.

use super::HealthChecker;
use crate::error::{ProbeError, TimeoutError};
use smol::Timer;
use smol::future;
use smol::stream::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Time between probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Overall deadline measured from the start of the wait
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Cadence and deadline of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Time between probes; no backoff, no jitter
    pub interval: Duration,
    /// Deadline measured from the start of the wait
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Where a wait currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitState {
    /// Not healthy yet, deadline not reached
    Waiting,
    /// A probe succeeded
    Healthy,
    /// The deadline fired first
    TimedOut,
}

enum Event {
    Deadline,
    Tick,
}

/// Drives a checker until it reports healthy or the policy deadline fires
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    policy: WaitPolicy,
}

impl Waiter {
    /// Create a waiter with the given policy
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// Probe on every tick until healthy; fail once the deadline passes
    ///
    /// The first probe runs one interval after the call. Failed probes only
    /// keep the wait going. The deadline is independent of the ticks and wins
    /// when both are ready at once. A probe already in flight is not
    /// interrupted by the deadline.
    pub async fn wait(&self, checker: &dyn HealthChecker) -> Result<(), TimeoutError> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut ticker = Timer::interval(self.policy.interval);
        let mut probes = 0u32;
        let mut last_error: Option<ProbeError> = None;

        debug!(
            "Waiting for {} (every {:?}, up to {:?})",
            checker.describe(),
            self.policy.interval,
            self.policy.timeout
        );

        loop {
            let event = future::or(
                async {
                    Timer::at(deadline).await;
                    Event::Deadline
                },
                async {
                    ticker.next().await;
                    Event::Tick
                },
            )
            .await;

            let state = match event {
                Event::Deadline => WaitState::TimedOut,
                Event::Tick => {
                    probes += 1;
                    match checker.check().await {
                        Ok(()) => WaitState::Healthy,
                        Err(e) => {
                            info!("Still waiting for {}: {}", checker.describe(), e);
                            last_error = Some(e);
                            WaitState::Waiting
                        }
                    }
                }
            };

            match state {
                WaitState::Waiting => continue,
                WaitState::Healthy => {
                    info!(
                        "{} is healthy after {} probe(s)",
                        checker.describe(),
                        probes
                    );
                    return Ok(());
                }
                WaitState::TimedOut => {
                    return Err(TimeoutError {
                        elapsed: started.elapsed(),
                        probes,
                        last_error,
                    });
                }
            }
        }
    }
}
