//! Error types for the escalation bridge.

use std::time::Duration;
use thiserror::Error;

/// Errors from an escalation attempt.
///
/// Every variant is recoverable by design: the caller falls back to its
/// locally computed verdict. Escalation failure must never take the
/// request pipeline down with it.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The reasoning engine did not answer within the deadline.
    #[error("escalation timed out after {0:?}")]
    Timeout(Duration),

    /// The reasoning engine could not be reached.
    #[error("reasoning engine unavailable: {0}")]
    Unavailable(String),

    /// The reasoning engine answered with a failure.
    #[error("reasoning engine failed: {0}")]
    Engine(String),
}
