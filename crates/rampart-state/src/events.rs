//! Threat events and state snapshots.
//!
//! A [`ThreatEvent`] is an immutable record appended once a verdict is
//! finalized. Events are created only by the decision pipeline, never
//! mutated afterwards, and retained for reporting and health checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

use rampart_detect::{Severity, ThreatType};

/// The action the pipeline took for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTaken {
    /// Request forwarded with no findings worth noting.
    Allowed,
    /// Request forwarded, findings recorded for audit.
    Logged,
    /// Request denied for exceeding a rate budget.
    RateLimited,
    /// Request denied outright.
    Blocked,
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTaken::Allowed => write!(f, "ALLOWED"),
            ActionTaken::Logged => write!(f, "LOGGED"),
            ActionTaken::RateLimited => write!(f, "RATE_LIMITED"),
            ActionTaken::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// One finalized security decision.
///
/// `threat_type` and `severity` are absent for events with no detector
/// finding behind them, such as rate-limit denials and requests rejected
/// because the address was already blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatEvent {
    /// Unique event id.
    pub id: Uuid,
    /// When the verdict was finalized.
    pub timestamp: DateTime<Utc>,
    /// The client the decision applied to.
    pub ip_address: IpAddr,
    /// Attack class of the highest-severity finding, if any.
    pub threat_type: Option<ThreatType>,
    /// Severity of that finding, if any.
    pub severity: Option<Severity>,
    /// What the pipeline did.
    pub action_taken: ActionTaken,
    /// Free-form diagnostic detail.
    pub details: String,
}

impl ThreatEvent {
    /// Creates an event with no associated detector finding.
    pub fn new(ip_address: IpAddr, action_taken: ActionTaken, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            ip_address,
            threat_type: None,
            severity: None,
            action_taken,
            details: details.into(),
        }
    }

    /// Attaches the dominant finding's classification.
    pub fn with_threat(mut self, threat_type: ThreatType, severity: Severity) -> Self {
        self.threat_type = Some(threat_type);
        self.severity = Some(severity);
        self
    }
}

/// A suspicious client and its current score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspectEntry {
    pub address: IpAddr,
    pub score: u32,
}

/// Read-only counts and samples from the security state, for an
/// operator-facing health or status surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Explicitly blocked addresses.
    pub blocked_addresses: usize,
    /// Blocked CIDR ranges.
    pub blocked_ranges: usize,
    /// Whitelisted addresses.
    pub whitelisted_addresses: usize,
    /// Threat events currently retained.
    pub total_events: usize,
    /// Addresses under active rate tracking.
    pub tracked_clients: usize,
    /// Highest-scoring clients, descending.
    pub top_suspicious: Vec<SuspectEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> IpAddr {
        "1.2.3.4".parse().unwrap()
    }

    #[test]
    fn test_event_without_finding() {
        let event = ThreatEvent::new(addr(), ActionTaken::RateLimited, "minute window exceeded");
        assert_eq!(event.action_taken, ActionTaken::RateLimited);
        assert!(event.threat_type.is_none());
        assert!(event.severity.is_none());
    }

    #[test]
    fn test_event_with_threat() {
        let event = ThreatEvent::new(addr(), ActionTaken::Blocked, "tautology matched")
            .with_threat(ThreatType::SqlInjection, Severity::High);
        assert_eq!(event.threat_type, Some(ThreatType::SqlInjection));
        assert_eq!(event.severity, Some(Severity::High));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(ActionTaken::Blocked.to_string(), "BLOCKED");
        assert_eq!(ActionTaken::RateLimited.to_string(), "RATE_LIMITED");
    }

    #[test]
    fn test_event_serialization() {
        let event = ThreatEvent::new(addr(), ActionTaken::Logged, "audit")
            .with_threat(ThreatType::Xss, Severity::Medium);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ThreatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
