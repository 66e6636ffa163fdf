//! Error types for the Rampart core.

use thiserror::Error;

/// Core error type for gate operations.
///
/// None of these reach the wrapped application as a fault: configuration
/// errors fail fast at startup, and escalation failures are absorbed into
/// the fail-open/fail-closed policy before a verdict is returned.
#[derive(Debug, Error)]
pub enum RampartError {
    /// Invalid or missing configuration, rejected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Escalation bridge failure passthrough.
    #[error("escalation error: {0}")]
    Bridge(#[from] rampart_bridge::BridgeError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
