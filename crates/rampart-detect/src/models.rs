//! # Core Types for the Detection Engine
//!
//! This module defines the fundamental data types used throughout the
//! detection pipeline for threat classification and finding reports.
//!
//! ## Threat Model
//!
//! The type system encodes a taxonomy of classic web-application attack
//! classes:
//!
//! - **OWASP Top 10** - injection, XSS, SSRF, path traversal
//! - **Resource exhaustion** - oversized request bodies
//! - **Degraded inspection** - payloads the normalizer cannot parse
//!
//! Each [`ThreatType`] variant maps to one attack class with a dedicated
//! detector and calibrated severity.
//!
//! ## Design Principles
//!
//! 1. **Exhaustive Classification** - every detected threat maps to a variant
//! 2. **Ordered Severity** - [`Severity`] is totally ordered so findings can
//!    be aggregated by maximum
//! 3. **Serializable** - all types derive Serde traits for logging and audit
//!    trails

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attack classes the detection engine can report.
///
/// | Variant | Attack Class | Detection Method |
/// |---------|--------------|------------------|
/// | `SqlInjection` | SQL injection idioms | Pattern matching |
/// | `Xss` | Cross-site scripting | Pattern matching |
/// | `CommandInjection` | Shell command injection | Pattern matching |
/// | `PathTraversal` | Directory ascension | Pattern matching + depth |
/// | `Ssrf` | Server-side request forgery | Address/scheme matching |
/// | `OversizedPayload` | Resource exhaustion | Byte-size threshold |
/// | `MalformedPayload` | Un-normalizable body | Normalizer signal |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    /// SQL injection: tautologies, UNION exfiltration, statement
    /// termination with destructive statements, comment truncation.
    SqlInjection,

    /// Cross-site scripting: script tags, inline event handlers,
    /// the `javascript:` pseudo-protocol.
    Xss,

    /// Shell command injection: chaining metacharacters, command
    /// substitution, destructive shell idioms.
    CommandInjection,

    /// Directory ascension sequences, plain or percent-encoded.
    PathTraversal,

    /// Values resolving to loopback, link-local metadata, or
    /// non-HTTP fetch schemes embedded where data is expected.
    Ssrf,

    /// Request body larger than the configured byte threshold.
    OversizedPayload,

    /// Body that looked structured but could not be parsed; inspection
    /// ran in degraded mode over the raw text.
    MalformedPayload,
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatType::SqlInjection => write!(f, "SQL injection"),
            ThreatType::Xss => write!(f, "cross-site scripting"),
            ThreatType::CommandInjection => write!(f, "command injection"),
            ThreatType::PathTraversal => write!(f, "path traversal"),
            ThreatType::Ssrf => write!(f, "server-side request forgery"),
            ThreatType::OversizedPayload => write!(f, "oversized payload"),
            ThreatType::MalformedPayload => write!(f, "malformed payload"),
        }
    }
}

/// How dangerous a detected pattern is judged to be.
///
/// The ordering is total (`Low < Medium < High < Critical`) so callers can
/// aggregate a set of findings by taking the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// Informational. Logged, never blocks on its own.
    Low,
    /// Suspicious. Blocks only under a strict policy.
    Medium,
    /// High-confidence attack pattern.
    High,
    /// Unambiguous attack, or several high-confidence signals combined.
    Critical,
}

impl Severity {
    /// Reputation weight added to a client's suspicion score when a
    /// threat of this severity is detected.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single detector's report for one attack class.
///
/// The engine returns every matching finding for a payload, not just the
/// first, so callers can observe multiple simultaneous threat types in one
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatFinding {
    /// The attack class that matched.
    pub threat_type: ThreatType,
    /// Calibrated severity of the match.
    pub severity: Severity,
    /// The matched fragment or a short rule description.
    pub evidence: String,
    /// Whether the detector considers this a positive match.
    pub detected: bool,
}

impl ThreatFinding {
    /// Creates a positive finding.
    pub fn new(threat_type: ThreatType, severity: Severity, evidence: impl Into<String>) -> Self {
        Self {
            threat_type,
            severity,
            evidence: evidence.into(),
            detected: true,
        }
    }
}

impl fmt::Display for ThreatFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.threat_type, self.severity, self.evidence
        )
    }
}
