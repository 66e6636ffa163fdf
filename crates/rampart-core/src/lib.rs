//! # Rampart Core
//!
//! Unified request-gate security facade. Sits in front of an HTTP
//! application and decides, per request, whether to allow, rate-limit, or
//! block it.
//!
//! ## Threat Coverage
//!
//! Rampart provides layered defense against multiple abuse vectors:
//!
//! | Layer | Component | Threats Handled |
//! |-------|-----------|-----------------|
//! | Reputation | Rate Tracker | Floods, bursts, repeat offenders |
//! | Content | Detection Engine | SQLi, XSS, CMDi, traversal, SSRF |
//! | Judgment | Escalation Bridge | Ambiguous or novel payloads |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        RAMPART CORE                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │     Rampart     │  ← Unified Facade        │
//! │                    │      Gate       │                          │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │         ┌───────────────────┼───────────────────┐               │
//! │         ▼                   ▼                   ▼               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐          │
//! │  │  Security   │    │  Detection  │    │ Escalation  │          │
//! │  │   State     │    │   Engine    │    │   Bridge    │          │
//! │  └─────────────┘    └─────────────┘    └─────────────┘          │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rampart_core::{Rampart, RampartConfig};
//!
//! let gate = Rampart::new(RampartConfig::default())?;
//!
//! let verdict = gate.decide(client_addr, body).await?;
//! if verdict.permits_forwarding() {
//!     forward(request)
//! } else {
//!     deny(verdict)
//! }
//! ```
//!
//! ## Security Notes
//!
//! - Whitelist wins over every block source and is checked first
//! - Already-blocked addresses are rejected before detection runs
//! - Escalation carries an explicit deadline; failure falls back to the
//!   local verdict under the configured fail-open/fail-closed policy
//! - Exactly one threat event is recorded per noteworthy decision

mod config;
mod error;
mod gate;
mod verdict;

pub use config::{EscalationConfig, FailMode, PolicyConfig, RampartConfig};
pub use error::RampartError;
pub use gate::Rampart;
pub use verdict::{GateAction, Verdict};

// Re-export component types for convenience
pub use rampart_bridge::{
    BridgeError, EscalationBridge, EscalationRequest, EscalationVerdict, ReasoningEngine,
    Recommendation, Remediation,
};
pub use rampart_detect::{
    aggregate_severity, DetectionConfig, DetectionEngine, Detector, NormalizedPayload, Severity,
    ThreatFinding, ThreatType,
};
pub use rampart_state::{
    ActionTaken, BlockScope, RangePolicy, RateLimitConfig, RateStatus, RateTracker, SecurityState,
    StateSnapshot, SuspectEntry, SuspicionPolicy, ThreatEvent, WindowKind,
};

/// Core result type for gate operations.
pub type Result<T> = std::result::Result<T, RampartError>;
