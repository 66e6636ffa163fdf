//! Verdict types for gate decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

use rampart_detect::ThreatFinding;

/// The action the gate decided on for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateAction {
    /// Forward the request to the wrapped application.
    Allow,
    /// Deny the request for exceeding a rate budget.
    RateLimited,
    /// Deny the request outright.
    Block,
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateAction::Allow => write!(f, "ALLOW"),
            GateAction::RateLimited => write!(f, "RATE_LIMITED"),
            GateAction::Block => write!(f, "BLOCK"),
        }
    }
}

/// The gate's decision for one request.
///
/// An `Allow` with non-empty `triggering_findings` is the
/// pass-through-with-audit case: suspicious but below the blocking
/// threshold, forwarded and logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// What to do with the request.
    pub action: GateAction,
    /// Why.
    pub reason: String,
    /// Findings that drove the decision, highest severity first.
    pub triggering_findings: Vec<ThreatFinding>,
    /// Whether the external reasoning engine was consulted.
    pub escalated: bool,
}

impl Verdict {
    /// Creates an Allow verdict.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            action: GateAction::Allow,
            reason: reason.into(),
            triggering_findings: Vec::new(),
            escalated: false,
        }
    }

    /// Creates a RateLimited verdict.
    pub fn rate_limited(reason: impl Into<String>) -> Self {
        Self {
            action: GateAction::RateLimited,
            reason: reason.into(),
            triggering_findings: Vec::new(),
            escalated: false,
        }
    }

    /// Creates a Block verdict.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: GateAction::Block,
            reason: reason.into(),
            triggering_findings: Vec::new(),
            escalated: false,
        }
    }

    /// Attaches the findings behind this decision, ordered by severity
    /// descending.
    pub fn with_findings(mut self, mut findings: Vec<ThreatFinding>) -> Self {
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        self.triggering_findings = findings;
        self
    }

    /// Marks the verdict as having consulted the reasoning engine.
    pub fn via_escalation(mut self) -> Self {
        self.escalated = true;
        self
    }

    /// Returns true if this is an Allow verdict.
    pub fn is_allowed(&self) -> bool {
        self.action == GateAction::Allow
    }

    /// Returns true if this is a Block verdict.
    pub fn is_blocked(&self) -> bool {
        self.action == GateAction::Block
    }

    /// Returns true if this is a RateLimited verdict.
    pub fn is_rate_limited(&self) -> bool {
        self.action == GateAction::RateLimited
    }

    /// True when the request should reach the wrapped application.
    pub fn permits_forwarding(&self) -> bool {
        self.action == GateAction::Allow
    }
}
