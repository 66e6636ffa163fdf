//! Detection engine facade.
//!
//! Runs every registered detector against one normalized payload and
//! returns all matching findings. The engine is a pure function of its
//! input: no shared state, safe to share across concurrent requests.

use serde::{Deserialize, Serialize};

use crate::detectors::{
    CommandInjectionDetector, Detector, OversizedPayloadDetector, PathTraversalDetector,
    SqlInjectionDetector, SsrfDetector, XssDetector,
};
use crate::models::{Severity, ThreatFinding, ThreatType};
use crate::normalize::NormalizedPayload;

/// Default oversized-payload threshold in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 100_000;

/// Detection engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Byte threshold for the oversized-payload detector.
    pub max_payload_bytes: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// The threat detection engine.
pub struct DetectionEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectionEngine {
    /// Creates an engine with the standard detector set and default config.
    pub fn new() -> Self {
        Self::with_config(DetectionConfig::default())
    }

    /// Creates an engine with the standard detector set.
    pub fn with_config(config: DetectionConfig) -> Self {
        Self {
            detectors: vec![
                Box::new(SqlInjectionDetector::new()),
                Box::new(XssDetector::new()),
                Box::new(CommandInjectionDetector::new()),
                Box::new(PathTraversalDetector::new()),
                Box::new(SsrfDetector::new()),
                Box::new(OversizedPayloadDetector::new(config.max_payload_bytes)),
            ],
        }
    }

    /// Creates an engine with a custom detector set.
    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// Inspects a raw request body and returns every matching finding.
    ///
    /// A body that looks structured but cannot be parsed yields a low
    /// severity [`ThreatType::MalformedPayload`] finding and inspection
    /// continues over the raw text, so detection degrades instead of
    /// failing.
    pub fn detect(&self, raw: &str) -> Vec<ThreatFinding> {
        let payload = NormalizedPayload::from_raw(raw);

        let mut findings: Vec<ThreatFinding> = self
            .detectors
            .iter()
            .filter_map(|detector| detector.inspect(&payload))
            .collect();

        if payload.malformed {
            findings.push(ThreatFinding::new(
                ThreatType::MalformedPayload,
                Severity::Low,
                "request body could not be parsed for inspection",
            ));
        }

        findings
    }

    /// Returns the number of registered detectors.
    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Returns the names of all registered detectors.
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates a finding set into one severity.
///
/// The aggregate is the maximum severity across all findings, with one
/// combination rule: two or more simultaneous Medium findings escalate the
/// aggregate to High, since independent medium-confidence signals together
/// are worse than one.
pub fn aggregate_severity(findings: &[ThreatFinding]) -> Option<Severity> {
    let max = findings.iter().map(|f| f.severity).max()?;
    if max == Severity::Medium {
        let mediums = findings
            .iter()
            .filter(|f| f.severity == Severity::Medium)
            .count();
        if mediums >= 2 {
            return Some(Severity::High);
        }
    }
    Some(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_payload_no_findings() {
        let engine = DetectionEngine::new();
        let findings = engine.detect(r#"{"username":"admin","password":"password123"}"#);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_sql_injection_found() {
        let engine = DetectionEngine::new();
        let findings = engine.detect("admin' OR '1'='1");
        assert!(findings
            .iter()
            .any(|f| f.threat_type == ThreatType::SqlInjection));
    }

    #[test]
    fn test_xss_found() {
        let engine = DetectionEngine::new();
        let findings = engine.detect("<script>alert(1)</script>");
        assert!(findings.iter().any(|f| f.threat_type == ThreatType::Xss));
    }

    #[test]
    fn test_multiple_threats_in_different_fields() {
        let engine = DetectionEngine::new();
        let findings = engine.detect(
            r#"{"name":"<script>alert('XSS')</script>","email":"admin' OR '1'='1@example.com"}"#,
        );
        assert!(findings.iter().any(|f| f.threat_type == ThreatType::Xss));
        assert!(findings
            .iter()
            .any(|f| f.threat_type == ThreatType::SqlInjection));
    }

    #[test]
    fn test_detection_is_idempotent() {
        let engine = DetectionEngine::new();
        let payload = r#"{"query":"../../etc/passwd; cat /etc/passwd"}"#;
        let first = engine.detect(payload);
        let second = engine.detect(payload);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_oversized_payload_flagged() {
        let engine = DetectionEngine::new();
        let big = "A".repeat(150_000);
        let findings = engine.detect(&big);
        assert!(findings
            .iter()
            .any(|f| f.threat_type == ThreatType::OversizedPayload));

        let findings = engine.detect("tiny body");
        assert!(findings
            .iter()
            .all(|f| f.threat_type != ThreatType::OversizedPayload));
    }

    #[test]
    fn test_malformed_body_degrades_to_finding() {
        let engine = DetectionEngine::new();
        let findings = engine.detect(r#"{"username": "admin"#);
        assert!(findings
            .iter()
            .any(|f| f.threat_type == ThreatType::MalformedPayload
                && f.severity == Severity::Low));
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        assert_eq!(aggregate_severity(&[]), None);
    }

    #[test]
    fn test_aggregate_takes_maximum() {
        let findings = vec![
            ThreatFinding::new(ThreatType::OversizedPayload, Severity::Low, "size"),
            ThreatFinding::new(ThreatType::SqlInjection, Severity::High, "tautology"),
        ];
        assert_eq!(aggregate_severity(&findings), Some(Severity::High));
    }

    #[test]
    fn test_aggregate_two_mediums_escalate_to_high() {
        let findings = vec![
            ThreatFinding::new(ThreatType::Xss, Severity::Medium, "handler"),
            ThreatFinding::new(ThreatType::PathTraversal, Severity::Medium, "depth 2"),
        ];
        assert_eq!(aggregate_severity(&findings), Some(Severity::High));
    }

    #[test]
    fn test_aggregate_single_medium_stays_medium() {
        let findings = vec![ThreatFinding::new(
            ThreatType::Xss,
            Severity::Medium,
            "handler",
        )];
        assert_eq!(aggregate_severity(&findings), Some(Severity::Medium));
    }

    #[test]
    fn test_standard_detector_set() {
        let engine = DetectionEngine::new();
        assert_eq!(engine.detector_count(), 6);
        assert!(engine.detector_names().contains(&"sql-injection"));
        assert!(engine.detector_names().contains(&"ssrf"));
    }
}
