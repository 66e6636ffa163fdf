//! Heuristic detectors, one per attack class.
//!
//! Each detector is an independent unit answering one question: does this
//! normalized payload match my attack class, and how badly. Detectors hold
//! only compiled signatures, never shared state, so a single instance is
//! safe to run concurrently across requests.

use regex::Regex;

use crate::models::{Severity, ThreatFinding, ThreatType};
use crate::normalize::NormalizedPayload;

/// One attack-class heuristic.
///
/// Implementations must be pure functions of the payload. Returning `None`
/// means the class did not match; a returned finding always has
/// `detected == true`.
pub trait Detector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Inspects a normalized payload for this detector's attack class.
    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding>;
}

/// A signature with its calibrated severity.
struct Signature {
    pattern: Regex,
    severity: Severity,
    description: &'static str,
}

impl Signature {
    fn new(pattern: &str, severity: Severity, description: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            severity,
            description,
        }
    }

    /// Returns the matched fragment if the signature fires.
    fn matched<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern.find(text).map(|m| m.as_str())
    }
}

/// Reports the highest-severity signature match as one finding.
fn best_match(
    signatures: &[Signature],
    threat_type: ThreatType,
    text: &str,
) -> Option<ThreatFinding> {
    signatures
        .iter()
        .filter_map(|sig| {
            sig.matched(text)
                .map(|fragment| (sig.severity, sig.description, fragment))
        })
        .max_by_key(|(severity, _, _)| *severity)
        .map(|(severity, description, fragment)| {
            ThreatFinding::new(
                threat_type,
                severity,
                format!("{description}: {}", fragment.trim()),
            )
        })
}

// ── SQL injection ────────────────────────────────────────────────────────────

/// Matches common SQL injection idioms.
///
/// Boolean tautologies and UNION exfiltration are treated as
/// high-confidence attacks; comment truncation on its own is only
/// suspicious.
pub struct SqlInjectionDetector {
    signatures: Vec<Signature>,
}

impl SqlInjectionDetector {
    pub fn new() -> Self {
        Self {
            signatures: vec![
                Signature::new(
                    r#"(?i)['"]\s*(or|and)\b\s*['"]?\s*\w+\s*['"]?\s*=\s*['"]?\s*\w+"#,
                    Severity::High,
                    "boolean tautology",
                ),
                Signature::new(
                    r"(?i)\bunion\b(\s+all)?\s+select\b",
                    Severity::High,
                    "UNION-based exfiltration",
                ),
                Signature::new(
                    r"(?i);\s*(drop|delete|truncate|alter|insert|update)\b",
                    Severity::High,
                    "statement termination with destructive statement",
                ),
                Signature::new(
                    r"(?i)\b(drop\s+table|drop\s+database|truncate\s+table|xp_cmdshell)\b",
                    Severity::High,
                    "destructive SQL keyword",
                ),
                Signature::new(
                    r#"['"]\s*(--|#)"#,
                    Severity::Medium,
                    "comment-based truncation",
                ),
            ],
        }
    }
}

impl Default for SqlInjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SqlInjectionDetector {
    fn name(&self) -> &'static str {
        "sql-injection"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        best_match(&self.signatures, ThreatType::SqlInjection, &payload.text)
    }
}

// ── Cross-site scripting ─────────────────────────────────────────────────────

/// Matches script-tag injection, inline event handlers, and the
/// `javascript:` pseudo-protocol. A script tag is executable context and
/// rates higher than bare handler text.
pub struct XssDetector {
    signatures: Vec<Signature>,
}

impl XssDetector {
    pub fn new() -> Self {
        Self {
            signatures: vec![
                Signature::new(r"(?i)<\s*script\b", Severity::High, "script tag injection"),
                Signature::new(
                    r"(?i)\bon(error|load|click|mouseover|focus|submit)\s*=",
                    Severity::Medium,
                    "inline event handler",
                ),
                Signature::new(
                    r"(?i)javascript\s*:",
                    Severity::Medium,
                    "javascript pseudo-protocol",
                ),
            ],
        }
    }
}

impl Default for XssDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for XssDetector {
    fn name(&self) -> &'static str {
        "xss"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        best_match(&self.signatures, ThreatType::Xss, &payload.text)
    }
}

// ── Command injection ────────────────────────────────────────────────────────

/// Matches shell chaining, command substitution, and destructive shell
/// idioms. Every match is high severity.
pub struct CommandInjectionDetector {
    signatures: Vec<Signature>,
}

impl CommandInjectionDetector {
    pub fn new() -> Self {
        Self {
            signatures: vec![
                Signature::new(r"(?i)\brm\s+-rf?\b", Severity::High, "destructive shell idiom"),
                Signature::new(
                    r"(?i)(;|\||&&)\s*(cat|ls|rm|curl|wget|nc|sh|bash|python|perl|chmod|chown|whoami|id)\b",
                    Severity::High,
                    "shell command chaining",
                ),
                Signature::new(r"`[^`]+`", Severity::High, "backtick command substitution"),
                Signature::new(r"\$\([^)]+\)", Severity::High, "command substitution"),
                Signature::new(
                    r"(?i)/etc/(passwd|shadow)",
                    Severity::High,
                    "sensitive file access",
                ),
            ],
        }
    }
}

impl Default for CommandInjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for CommandInjectionDetector {
    fn name(&self) -> &'static str {
        "command-injection"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        best_match(&self.signatures, ThreatType::CommandInjection, &payload.text)
    }
}

// ── Path traversal ───────────────────────────────────────────────────────────

/// Matches directory-ascension sequences, plain and percent-encoded.
/// Severity scales with ascension depth: three or more steps reach well
/// outside any application directory.
pub struct PathTraversalDetector {
    ascension: Regex,
}

impl PathTraversalDetector {
    pub fn new() -> Self {
        Self {
            ascension: Regex::new(r"(?i)(\.\.|%2e%2e)(/|\\|%2f|%5c)").unwrap(),
        }
    }
}

impl Default for PathTraversalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PathTraversalDetector {
    fn name(&self) -> &'static str {
        "path-traversal"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        let depth = self.ascension.find_iter(&payload.text).count();
        if depth == 0 {
            return None;
        }
        let severity = if depth >= 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        Some(ThreatFinding::new(
            ThreatType::PathTraversal,
            severity,
            format!("directory ascension, depth {depth}"),
        ))
    }
}

// ── Server-side request forgery ──────────────────────────────────────────────

/// Matches values that resolve to loopback, link-local metadata, or
/// non-HTTP fetch schemes where plain data is expected.
pub struct SsrfDetector {
    signatures: Vec<Signature>,
}

impl SsrfDetector {
    pub fn new() -> Self {
        Self {
            signatures: vec![
                Signature::new(
                    r"(?i)127\.0\.0\.1|0\.0\.0\.0|169\.254\.169\.254|\blocalhost\b|\[::1\]|metadata\.google\.internal",
                    Severity::High,
                    "internal address reference",
                ),
                Signature::new(
                    r"(?i)\b(file|gopher|dict)://",
                    Severity::High,
                    "non-HTTP fetch scheme",
                ),
            ],
        }
    }
}

impl Default for SsrfDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SsrfDetector {
    fn name(&self) -> &'static str {
        "ssrf"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        best_match(&self.signatures, ThreatType::Ssrf, &payload.text)
    }
}

// ── Oversized payload ────────────────────────────────────────────────────────

/// Size-based detector, independent of content. Severity scales with the
/// multiplier over the threshold.
pub struct OversizedPayloadDetector {
    threshold: usize,
}

impl OversizedPayloadDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl Detector for OversizedPayloadDetector {
    fn name(&self) -> &'static str {
        "oversized-payload"
    }

    fn inspect(&self, payload: &NormalizedPayload) -> Option<ThreatFinding> {
        if payload.byte_len <= self.threshold {
            return None;
        }
        let severity = if payload.byte_len >= self.threshold.saturating_mul(4) {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(ThreatFinding::new(
            ThreatType::OversizedPayload,
            severity,
            format!(
                "{} bytes exceeds {} byte limit",
                payload.byte_len, self.threshold
            ),
        ))
    }
}
