//! Health checking for started services.
//!
//! A [`HealthChecker`] performs exactly one probe per call and never retries.
//! Retrying on a fixed cadence until a deadline is the job of the
//! [`Waiter`]. Checkers are built from declarative descriptors by
//! [`build_checker`].

mod command;
mod factory;
mod http;
mod waiter;

pub use command::CommandHealthCheck;
pub use factory::{HealthCheckKind, build_checker};
pub use http::{HTTP_PROBE_TIMEOUT, HttpHealthCheck};
pub use waiter::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, WaitPolicy, WaitState, Waiter};

use crate::error::ProbeError;
use async_trait::async_trait;

/// One point-in-time readiness probe
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Run a single probe
    async fn check(&self) -> Result<(), ProbeError>;

    /// Short human-readable description of what is probed
    fn describe(&self) -> String;
}
