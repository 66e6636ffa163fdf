//! # Rampart Detect - Heuristic Threat Detection
//!
//! The detection engine is the content-inspection stage of the Rampart
//! request gate. It examines one normalized representation of the full
//! request body and reports every attack-class match it finds.
//!
//! ## Purpose
//!
//! This crate implements two capabilities:
//!
//! 1. **Payload Normalization** - JSON bodies are flattened to their keys
//!    and values so a threat embedded in any field is caught without
//!    assuming a field layout.
//!
//! 2. **Attack-Class Detection** - independent heuristic detectors, one per
//!    attack class, each returning a severity-calibrated finding.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | SQL Injection | Tautologies, UNION, destructive DDL | Pattern matching |
//! | XSS | Script tags, event handlers, `javascript:` | Pattern matching |
//! | Command Injection | Chaining, substitution, `rm -rf` | Pattern matching |
//! | Path Traversal | `../` sequences, percent-encoded | Pattern + depth |
//! | SSRF | Loopback/metadata addresses, `file://` | Address matching |
//! | Oversized Payload | Resource exhaustion via body size | Byte threshold |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DETECTION ENGINE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   raw body ──► NormalizedPayload ──► [ Detector; N ]        │
//! │                                           │                 │
//! │                                           ▼                 │
//! │                                  Vec<ThreatFinding>         │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Notes
//!
//! - The engine is pure: identical input yields identical findings
//! - Every matching detector reports; callers see simultaneous threats
//! - Unparseable structured bodies degrade to a low-severity finding
//!   instead of failing the pipeline

mod detectors;
mod engine;
mod models;
mod normalize;

pub use detectors::{
    CommandInjectionDetector, Detector, OversizedPayloadDetector, PathTraversalDetector,
    SqlInjectionDetector, SsrfDetector, XssDetector,
};
pub use engine::{
    aggregate_severity, DetectionConfig, DetectionEngine, DEFAULT_MAX_PAYLOAD_BYTES,
};
pub use models::{Severity, ThreatFinding, ThreatType};
pub use normalize::NormalizedPayload;
