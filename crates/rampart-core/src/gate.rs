//! The unified gate facade.
//!
//! [`Rampart`] orchestrates the decision pipeline for one request at a
//! time: whitelist and block-list short circuits, rate and reputation
//! tracking, heuristic detection, optional escalation, and finalization.
//! Each request walks the pipeline once; no stage is revisited.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use rampart_bridge::{
    EscalationBridge, EscalationRequest, ReasoningEngine, Recommendation, Remediation,
};
use rampart_detect::{aggregate_severity, DetectionEngine, Severity, ThreatFinding};
use rampart_state::{
    ActionTaken, BlockScope, RateStatus, RateTracker, SecurityState, ThreatEvent,
};

use crate::config::{FailMode, RampartConfig};
use crate::verdict::Verdict;
use crate::Result;

/// The unified request-gate security facade.
///
/// Rampart composes four components:
/// - **Security State**: block lists, whitelist, reputation, event history
/// - **Rate Tracker**: minute / hour / burst budgets per client
/// - **Detection Engine**: stateless attack-class heuristics
/// - **Escalation Bridge**: optional deferral to an external reasoning
///   engine
///
/// # Decision Pipeline
///
/// 1. Whitelist check (short-circuits everything)
/// 2. Block-list check (detection is skipped for blocked addresses)
/// 3. Rate and reputation tracking
/// 4. Heuristic detection
/// 5. Optional escalation with timeout and fallback
/// 6. Finalize: apply blocks, record exactly one threat event
///
/// Escalation failure never fails the pipeline; the fail-open or
/// fail-closed policy decides the outcome instead.
///
/// # Example
///
/// ```rust,ignore
/// let gate = Rampart::new(RampartConfig::default())?;
///
/// let verdict = gate.decide(client_addr, body).await?;
/// if verdict.permits_forwarding() {
///     // hand the request to the wrapped application
/// }
/// ```
pub struct Rampart {
    /// Configuration, immutable for the process lifetime.
    config: RampartConfig,

    /// Shared security state.
    state: Arc<SecurityState>,

    /// Rate and reputation tracker.
    tracker: RateTracker,

    /// Heuristic detection engine.
    detection: DetectionEngine,

    /// Bridge to the external reasoning engine, if one is attached.
    bridge: Option<EscalationBridge>,
}

impl Rampart {
    /// Creates a gate with no reasoning engine attached. Every verdict is
    /// computed locally.
    pub fn new(config: RampartConfig) -> Result<Self> {
        let detection = DetectionEngine::with_config(config.detection.clone());
        Self::with_components(config, detection, None)
    }

    /// Creates a gate that escalates to the given reasoning engine.
    pub fn with_engine(config: RampartConfig, engine: Arc<dyn ReasoningEngine>) -> Result<Self> {
        let detection = DetectionEngine::with_config(config.detection.clone());
        Self::with_components(config, detection, Some(engine))
    }

    /// Creates a gate from explicit components. Useful for tests that
    /// need an instrumented detector set.
    pub fn with_components(
        config: RampartConfig,
        detection: DetectionEngine,
        engine: Option<Arc<dyn ReasoningEngine>>,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SecurityState::with_policy(
            config.range_policy(),
            config.policy.max_events,
        ));
        let tracker = RateTracker::new(
            Arc::clone(&state),
            config.rate.clone(),
            config.suspicion_policy(),
        );
        let bridge = engine.map(|engine| EscalationBridge::new(engine, config.escalation.timeout));

        info!(
            rpm = config.rate.requests_per_minute,
            rph = config.rate.requests_per_hour,
            burst = config.rate.burst_limit,
            escalation = bridge.is_some(),
            "rampart gate initialized"
        );

        Ok(Self {
            config,
            state,
            tracker,
            detection,
            bridge,
        })
    }

    /// The shared security state, for status reporting and for embedding
    /// the gate in a larger serving stack.
    pub fn state(&self) -> Arc<SecurityState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &RampartConfig {
        &self.config
    }

    /// Decides what to do with one request.
    ///
    /// This is the only entry point of the gate. It never returns an
    /// error for anything the client did; errors are reserved for
    /// internal misuse, so callers can forward on `Allow` and deny
    /// otherwise without a separate error path.
    pub async fn decide(&self, addr: IpAddr, payload: &str) -> Result<Verdict> {
        debug!(client = %addr, bytes = payload.len(), "evaluating request");

        // Phase 1: whitelist short-circuits every other check.
        if self.state.is_whitelisted(&addr) {
            debug!(client = %addr, "whitelisted, allowing");
            return Ok(Verdict::allow("address is whitelisted"));
        }

        // Phase 2: already-blocked addresses exit before detection runs.
        if self.state.is_blocked(&addr) {
            warn!(client = %addr, "request from blocked address rejected");
            self.state.record_event(ThreatEvent::new(
                addr,
                ActionTaken::Blocked,
                "address is on the block list",
            ));
            return Ok(Verdict::block("address is blocked"));
        }

        // Phase 3: rate and reputation.
        let rate = self.tracker.evaluate(addr);
        if !rate.within_limits {
            return Ok(self.deny_rate_limited(addr, payload, rate));
        }

        // Phase 4: heuristic detection.
        let findings = self.detection.detect(payload);
        let aggregate = aggregate_severity(&findings);
        if let Some(severity) = aggregate {
            debug!(client = %addr, %severity, findings = findings.len(), "threats detected");
        }

        // Phase 5: escalation.
        let mut escalated = false;
        let mut escalation_note: Option<String> = None;
        let mut recommendation: Option<Recommendation> = None;

        if let Some(bridge) = &self.bridge {
            if self.should_escalate(aggregate) {
                escalated = true;
                let request = EscalationRequest::new(addr, payload, findings.clone());
                match bridge.escalate(&request).await {
                    Ok(verdict) => {
                        info!(
                            client = %addr,
                            recommendation = ?verdict.recommendation,
                            "escalation verdict received"
                        );
                        self.apply_remediations(&verdict.remediations);
                        recommendation = Some(verdict.recommendation);
                        if !verdict.rationale.is_empty() {
                            escalation_note = Some(verdict.rationale);
                        }
                    }
                    Err(err) => {
                        warn!(client = %addr, error = %err, "escalation unavailable, applying fail mode");
                        if self.config.escalation.fail_mode == FailMode::FailClosed {
                            let event = attach_findings(
                                ThreatEvent::new(
                                    addr,
                                    ActionTaken::Blocked,
                                    format!("escalation unavailable ({err}), fail-closed policy"),
                                ),
                                &findings,
                            );
                            self.state.record_event(event);
                            return Ok(Verdict::block(
                                "escalation unavailable under fail-closed policy",
                            )
                            .with_findings(findings)
                            .via_escalation());
                        }
                        escalation_note = Some(format!("escalation unavailable: {err}"));
                    }
                }
            }
        }

        // Phase 6: finalize.
        Ok(self.finalize(addr, findings, aggregate, escalated, recommendation, escalation_note))
    }

    /// Rate-limit denial path. Detection may still run for audit, but the
    /// denial stands regardless of what it finds.
    fn deny_rate_limited(&self, addr: IpAddr, payload: &str, rate: RateStatus) -> Verdict {
        let mut details = match rate.exceeded {
            Some(kind) => format!("{kind} window budget exceeded"),
            None => "rate budget exceeded".to_string(),
        };

        let mut findings = Vec::new();
        if self.config.policy.detect_when_rate_limited {
            findings = self.detection.detect(payload);
            if !findings.is_empty() {
                details.push_str(&format!("; {} finding(s) recorded for audit", findings.len()));
            }
        }

        warn!(client = %addr, suspicion = rate.suspicion, "request rate limited");
        self.state.record_event(attach_findings(
            ThreatEvent::new(addr, ActionTaken::RateLimited, details),
            &findings,
        ));

        Verdict::rate_limited("rate budget exceeded").with_findings(findings)
    }

    /// Whether the aggregate severity warrants consulting the engine.
    fn should_escalate(&self, aggregate: Option<Severity>) -> bool {
        if !self.config.escalation.enabled {
            return false;
        }
        if self.config.escalation.escalate_all_requests {
            return true;
        }
        aggregate.map_or(false, |severity| {
            severity >= self.config.escalation.severity_threshold
        })
    }

    /// Applies state changes requested by the reasoning engine.
    fn apply_remediations(&self, remediations: &[Remediation]) {
        for remediation in remediations {
            match remediation {
                Remediation::BlockAddress(addr) => {
                    info!(client = %addr, "engine remediation: block address");
                    self.state.block(*addr, BlockScope::Single);
                }
                Remediation::BlockRange(addr) => {
                    info!(client = %addr, "engine remediation: block range");
                    self.state.block(*addr, BlockScope::Range);
                }
            }
        }
    }

    /// Combines local findings and the engine's recommendation into the
    /// final verdict, applies blocks, and records exactly one event.
    fn finalize(
        &self,
        addr: IpAddr,
        findings: Vec<ThreatFinding>,
        aggregate: Option<Severity>,
        escalated: bool,
        recommendation: Option<Recommendation>,
        escalation_note: Option<String>,
    ) -> Verdict {
        // Detected threats feed the reputation score whatever the verdict.
        if let Some(severity) = aggregate {
            self.note_threat(addr, severity);
        }

        let local_block =
            aggregate.map_or(false, |severity| severity >= self.config.policy.block_severity);

        // The engine's recommendation, when present, can confirm,
        // downgrade, or upgrade the local verdict.
        let blocked = match recommendation {
            Some(Recommendation::Block) => true,
            Some(Recommendation::Allow) | Some(Recommendation::RateLimit) => false,
            None => local_block,
        };

        let mark = |verdict: Verdict| if escalated { verdict.via_escalation() } else { verdict };

        if blocked {
            self.state.block(addr, BlockScope::Single);
            let reason = if recommendation == Some(Recommendation::Block) {
                "reasoning engine recommended block"
            } else {
                "threat severity at or above block threshold"
            };
            warn!(client = %addr, reason, "request blocked");

            let mut details = summarize(&findings);
            if let Some(note) = &escalation_note {
                details.push_str("; ");
                details.push_str(note);
            }
            self.state.record_event(attach_findings(
                ThreatEvent::new(addr, ActionTaken::Blocked, details),
                &findings,
            ));
            return mark(Verdict::block(reason).with_findings(findings));
        }

        if recommendation == Some(Recommendation::RateLimit) {
            let details = escalation_note
                .unwrap_or_else(|| "reasoning engine recommended rate limiting".to_string());
            self.state.record_event(attach_findings(
                ThreatEvent::new(addr, ActionTaken::RateLimited, details),
                &findings,
            ));
            return mark(
                Verdict::rate_limited("reasoning engine recommended rate limiting")
                    .with_findings(findings),
            );
        }

        if !findings.is_empty() {
            // Suspicious but below the blocking threshold: pass through
            // with an audit trail.
            let mut details = summarize(&findings);
            if let Some(note) = &escalation_note {
                details.push_str("; ");
                details.push_str(note);
            }
            debug!(client = %addr, "findings below block threshold, passing through");
            self.state.record_event(attach_findings(
                ThreatEvent::new(addr, ActionTaken::Logged, details),
                &findings,
            ));
            return mark(
                Verdict::allow("findings below block threshold, logged").with_findings(findings),
            );
        }

        // Clean allow. Only worth an event when escalation left a note.
        if let Some(note) = escalation_note {
            self.state
                .record_event(ThreatEvent::new(addr, ActionTaken::Allowed, note));
        }
        mark(Verdict::allow("no threats detected"))
    }

    /// Reputation bookkeeping for a detected threat, with auto-block once
    /// the score crosses the configured threshold.
    fn note_threat(&self, addr: IpAddr, severity: Severity) {
        let score = self.state.raise_suspicion(addr, severity.weight());
        if score >= self.config.policy.auto_block_suspicion && !self.state.is_blocked(&addr) {
            warn!(client = %addr, score, "suspicion threshold crossed, auto-blocking");
            self.state.block(addr, BlockScope::Single);
        }
    }
}

/// Carries the dominant finding's classification onto an event.
fn attach_findings(event: ThreatEvent, findings: &[ThreatFinding]) -> ThreatEvent {
    match findings.iter().max_by_key(|f| f.severity) {
        Some(top) => event.with_threat(top.threat_type, top.severity),
        None => event,
    }
}

/// One-line summary of a finding set for event details.
fn summarize(findings: &[ThreatFinding]) -> String {
    if findings.is_empty() {
        return "no local findings".to_string();
    }
    findings
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
