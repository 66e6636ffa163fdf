//! Configuration types for the Rampart gate.
//!
//! All configuration is provided at startup, validated fail-fast, and
//! treated as immutable for the process lifetime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RampartError;
use rampart_detect::{DetectionConfig, Severity};
use rampart_state::{DecayPolicy, RangePolicy, RateLimitConfig, SuspicionPolicy};

/// Configuration for the gate facade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RampartConfig {
    /// Request-rate budgets.
    pub rate: RateLimitConfig,

    /// Detection engine settings.
    pub detection: DetectionConfig,

    /// Escalation settings.
    pub escalation: EscalationConfig,

    /// Blocking and reputation policy.
    pub policy: PolicyConfig,
}

/// When and how to consult the external reasoning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Master switch. With no engine attached this is moot.
    pub enabled: bool,

    /// Consult the engine for every request, not only suspicious ones.
    pub escalate_all_requests: bool,

    /// Minimum aggregate severity that triggers escalation.
    pub severity_threshold: Severity,

    /// Deadline for one engine call.
    pub timeout: Duration,

    /// What to do when the engine is unavailable.
    pub fail_mode: FailMode,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            escalate_all_requests: false,
            severity_threshold: Severity::High,
            timeout: Duration::from_secs(5),
            fail_mode: FailMode::FailOpen,
        }
    }
}

/// Behavior when escalation is required but unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailMode {
    /// Fall back to the locally computed verdict.
    FailOpen,
    /// Deny the request.
    FailClosed,
}

/// Blocking and reputation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Aggregate severity at or above which a request is blocked and the
    /// address added to the block list.
    pub block_severity: Severity,

    /// Suspicion score at which an address is auto-blocked.
    pub auto_block_suspicion: u32,

    /// Suspicion added per rate violation.
    pub rate_violation_increment: u32,

    /// Optional suspicion decay interval. `None` disables decay.
    pub decay_interval: Option<Duration>,

    /// Suspicion subtracted per elapsed decay interval.
    pub decay_amount: u32,

    /// Widening prefix for IPv4 range blocks.
    pub range_prefix_v4: u8,

    /// Widening prefix for IPv6 range blocks.
    pub range_prefix_v6: u8,

    /// Run detection on rate-limited requests for audit purposes.
    /// Detection never overrides the rate-limit denial either way.
    pub detect_when_rate_limited: bool,

    /// Bound on retained threat events.
    pub max_events: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            block_severity: Severity::High,
            auto_block_suspicion: 10,
            rate_violation_increment: 2,
            decay_interval: None,
            decay_amount: 1,
            range_prefix_v4: 24,
            range_prefix_v6: 64,
            detect_when_rate_limited: false,
            max_events: rampart_state::DEFAULT_MAX_EVENTS,
        }
    }
}

impl RampartConfig {
    /// Validates the configuration, failing fast on values that would
    /// otherwise surface as misbehavior deep in the pipeline.
    pub fn validate(&self) -> Result<(), RampartError> {
        if self.rate.requests_per_minute == 0 {
            return Err(RampartError::Config(
                "requests_per_minute must be positive".into(),
            ));
        }
        if self.rate.requests_per_hour == 0 {
            return Err(RampartError::Config(
                "requests_per_hour must be positive".into(),
            ));
        }
        if self.rate.burst_limit == 0 {
            return Err(RampartError::Config("burst_limit must be positive".into()));
        }
        if self.detection.max_payload_bytes == 0 {
            return Err(RampartError::Config(
                "max_payload_bytes must be positive".into(),
            ));
        }
        if self.escalation.timeout.is_zero() {
            return Err(RampartError::Config(
                "escalation timeout must be positive".into(),
            ));
        }
        if self.policy.auto_block_suspicion == 0 {
            return Err(RampartError::Config(
                "auto_block_suspicion must be positive".into(),
            ));
        }
        if self.policy.max_events == 0 {
            return Err(RampartError::Config("max_events must be positive".into()));
        }
        if self.policy.range_prefix_v4 > 32 {
            return Err(RampartError::Config(
                "range_prefix_v4 must be at most 32".into(),
            ));
        }
        if self.policy.range_prefix_v6 > 128 {
            return Err(RampartError::Config(
                "range_prefix_v6 must be at most 128".into(),
            ));
        }
        Ok(())
    }

    /// The widening policy derived from this configuration.
    pub(crate) fn range_policy(&self) -> RangePolicy {
        RangePolicy {
            prefix_v4: self.policy.range_prefix_v4,
            prefix_v6: self.policy.range_prefix_v6,
        }
    }

    /// The suspicion policy derived from this configuration.
    pub(crate) fn suspicion_policy(&self) -> SuspicionPolicy {
        SuspicionPolicy {
            auto_block_threshold: self.policy.auto_block_suspicion,
            rate_violation_increment: self.policy.rate_violation_increment,
            decay: self.policy.decay_interval.map(|interval| DecayPolicy {
                interval,
                amount: self.policy.decay_amount,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RampartConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate.requests_per_minute, 60);
        assert_eq!(config.policy.block_severity, Severity::High);
        assert_eq!(config.escalation.fail_mode, FailMode::FailOpen);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = RampartConfig::default();
        config.rate.requests_per_minute = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = RampartConfig::default();
        config.escalation.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_prefix_rejected() {
        let mut config = RampartConfig::default();
        config.policy.range_prefix_v4 = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RampartConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RampartConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.rate.requests_per_hour,
            config.rate.requests_per_hour
        );
    }
}
