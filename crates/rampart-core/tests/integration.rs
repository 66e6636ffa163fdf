//! # Rampart Integration Tests
//!
//! End-to-end tests driving the full decision pipeline.
//!
//! ## Property Coverage
//!
//! | Property | Test |
//! |----------|------|
//! | Whitelist always wins | `test_whitelisted_address_always_allowed` |
//! | Blocked addresses skip detection | `test_blocked_address_skips_detection` |
//! | Rate limiting is monotonic | `test_rate_limit_monotonic_within_window` |
//! | Threats block and record events | `test_sql_injection_blocks_and_records` |
//! | Escalation timeout falls back | `test_escalation_timeout_falls_back_to_local_verdict` |
//! | Engine remediations apply | `test_engine_remediation_blocks_address` |
//! | Fail-closed denies on bridge loss | `test_fail_closed_blocks_when_engine_unavailable` |

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rampart_core::{
    ActionTaken, BridgeError, DetectionEngine, Detector, EscalationRequest, EscalationVerdict,
    FailMode, GateAction, NormalizedPayload, Rampart, RampartConfig, ReasoningEngine,
    Recommendation, Remediation, ThreatFinding, ThreatType,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rampart=debug")
        .try_init();
}

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn gate(config: RampartConfig) -> Rampart {
    init_tracing();
    Rampart::new(config).unwrap()
}

const SQLI_PAYLOAD: &str = r#"{"username":"admin' OR '1'='1","password":"x"}"#;
const CLEAN_PAYLOAD: &str = r#"{"username":"admin","password":"password123"}"#;

// =============================================================================
// TEST ENGINES
// =============================================================================

/// Returns a fixed verdict immediately.
struct StubEngine {
    verdict: EscalationVerdict,
}

#[async_trait]
impl ReasoningEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn assess(
        &self,
        _request: &EscalationRequest,
    ) -> Result<EscalationVerdict, BridgeError> {
        Ok(self.verdict.clone())
    }
}

/// Sleeps past any reasonable deadline.
struct SlowEngine;

#[async_trait]
impl ReasoningEngine for SlowEngine {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn assess(
        &self,
        _request: &EscalationRequest,
    ) -> Result<EscalationVerdict, BridgeError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(EscalationVerdict::allow("too late"))
    }
}

/// Always unreachable.
struct FailingEngine;

#[async_trait]
impl ReasoningEngine for FailingEngine {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn assess(
        &self,
        _request: &EscalationRequest,
    ) -> Result<EscalationVerdict, BridgeError> {
        Err(BridgeError::Unavailable("connection refused".to_string()))
    }
}

/// Counts invocations without ever matching.
struct CountingDetector {
    calls: Arc<AtomicUsize>,
}

impl Detector for CountingDetector {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn inspect(&self, _payload: &NormalizedPayload) -> Option<ThreatFinding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

// =============================================================================
// WHITELIST AND BLOCK LIST
// =============================================================================

#[tokio::test]
async fn test_whitelisted_address_always_allowed() {
    let gate = gate(RampartConfig::default());
    let client = addr("10.0.0.1");

    gate.state().whitelist(client);
    // Even an explicit block entry must not win over the whitelist.
    gate.state()
        .block(client, rampart_core::BlockScope::Single);

    for payload in [CLEAN_PAYLOAD, SQLI_PAYLOAD, "<script>alert(1)</script>"] {
        let verdict = gate.decide(client, payload).await.unwrap();
        assert!(verdict.is_allowed(), "whitelisted client must pass: {payload}");
    }

    // Whitelisted traffic leaves no event trail.
    assert_eq!(gate.state().event_count(), 0);
}

#[tokio::test]
async fn test_blocked_address_skips_detection() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let detection = DetectionEngine::with_detectors(vec![Box::new(CountingDetector {
        calls: Arc::clone(&calls),
    })]);
    let gate = Rampart::with_components(RampartConfig::default(), detection, None).unwrap();

    let client = addr("10.0.0.2");
    gate.state()
        .block(client, rampart_core::BlockScope::Single);

    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "detection must not run");

    let events = gate.state().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action_taken, ActionTaken::Blocked);
}

#[tokio::test]
async fn test_range_blocked_address_rejected() {
    let gate = gate(RampartConfig::default());
    gate.state()
        .block(addr("192.168.7.9"), rampart_core::BlockScope::Range);

    // A sibling in the widened /24 is also rejected.
    let verdict = gate.decide(addr("192.168.7.200"), CLEAN_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_monotonic_within_window() {
    let mut config = RampartConfig::default();
    config.rate.requests_per_minute = 3;
    config.rate.burst_limit = 100;
    let gate = gate(config);
    let client = addr("10.0.0.3");

    for i in 0..3 {
        let verdict = gate.decide(client, CLEAN_PAYLOAD).await.unwrap();
        assert!(verdict.is_allowed(), "request {i} should pass");
    }

    let verdict = gate.decide(client, CLEAN_PAYLOAD).await.unwrap();
    assert!(verdict.is_rate_limited());

    let events = gate.state().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action_taken, ActionTaken::RateLimited);
    assert!(events[0].details.contains("minute"));
}

#[tokio::test]
async fn test_rate_limited_request_can_still_audit_detection() {
    let mut config = RampartConfig::default();
    config.rate.requests_per_minute = 1;
    config.rate.burst_limit = 100;
    config.policy.detect_when_rate_limited = true;
    let gate = gate(config);
    let client = addr("10.0.0.4");

    gate.decide(client, CLEAN_PAYLOAD).await.unwrap();
    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();

    // The denial stands; detection only annotates it.
    assert!(verdict.is_rate_limited());
    assert!(!verdict.triggering_findings.is_empty());

    let events = gate.state().events();
    assert_eq!(events.last().unwrap().action_taken, ActionTaken::RateLimited);
    assert_eq!(
        events.last().unwrap().threat_type,
        Some(ThreatType::SqlInjection)
    );
}

// =============================================================================
// DETECTION DRIVEN DECISIONS
// =============================================================================

#[tokio::test]
async fn test_clean_login_allowed_without_block_event() {
    let gate = gate(RampartConfig::default());
    let verdict = gate.decide(addr("1.2.3.4"), CLEAN_PAYLOAD).await.unwrap();

    assert_eq!(verdict.action, GateAction::Allow);
    assert!(gate
        .state()
        .events()
        .iter()
        .all(|e| e.action_taken != ActionTaken::Blocked));
}

#[tokio::test]
async fn test_sql_injection_blocks_and_records() {
    let gate = gate(RampartConfig::default());
    let client = addr("1.2.3.4");
    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();

    assert_eq!(verdict.action, GateAction::Block);
    assert!(!verdict.escalated);
    assert!(gate.state().is_blocked(&client));

    let events = gate.state().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].threat_type, Some(ThreatType::SqlInjection));
    assert_eq!(events[0].action_taken, ActionTaken::Blocked);
}

#[tokio::test]
async fn test_oversized_payload_logged_not_blocked() {
    let gate = gate(RampartConfig::default());
    let client = addr("10.0.0.5");
    let big = "A".repeat(150_000);

    let verdict = gate.decide(client, &big).await.unwrap();
    assert!(verdict.is_allowed());
    assert_eq!(
        verdict.triggering_findings[0].threat_type,
        ThreatType::OversizedPayload
    );

    let events = gate.state().events();
    assert_eq!(events[0].action_taken, ActionTaken::Logged);
    assert!(!gate.state().is_blocked(&client));
}

// =============================================================================
// ESCALATION
// =============================================================================

#[tokio::test]
async fn test_escalation_timeout_falls_back_to_local_verdict() {
    init_tracing();
    let mut config = RampartConfig::default();
    config.escalation.timeout = Duration::from_millis(10);
    let gate = Rampart::with_engine(config, Arc::new(SlowEngine)).unwrap();
    let client = addr("10.0.0.6");

    // High-severity finding triggers escalation; the engine never answers
    // in time, so the local verdict stands.
    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
    assert!(verdict.escalated);

    let events = gate.state().events();
    assert_eq!(events.len(), 1);
    assert!(events[0].details.contains("escalation unavailable"));
}

#[tokio::test]
async fn test_escalation_failure_on_clean_request_still_allows() {
    let mut config = RampartConfig::default();
    config.escalation.escalate_all_requests = true;
    config.escalation.timeout = Duration::from_millis(10);
    let gate = Rampart::with_engine(config, Arc::new(SlowEngine)).unwrap();

    let verdict = gate.decide(addr("10.0.0.7"), CLEAN_PAYLOAD).await.unwrap();
    assert!(verdict.is_allowed());
    assert!(verdict.escalated);

    // The failure is still on the record.
    let events = gate.state().events();
    assert_eq!(events[0].action_taken, ActionTaken::Allowed);
    assert!(events[0].details.contains("escalation unavailable"));
}

#[tokio::test]
async fn test_engine_can_downgrade_local_block() {
    let gate = Rampart::with_engine(
        RampartConfig::default(),
        Arc::new(StubEngine {
            verdict: EscalationVerdict::allow("known harmless test traffic"),
        }),
    )
    .unwrap();
    let client = addr("10.0.0.8");

    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_allowed());
    assert!(verdict.escalated);
    assert!(!gate.state().is_blocked(&client));

    // Downgraded traffic is still audited.
    let events = gate.state().events();
    assert_eq!(events[0].action_taken, ActionTaken::Logged);
}

#[tokio::test]
async fn test_engine_remediation_blocks_address() {
    let offender = addr("10.0.0.9");
    let gate = Rampart::with_engine(
        RampartConfig::default(),
        Arc::new(StubEngine {
            verdict: EscalationVerdict::block("credential stuffing pattern")
                .with_remediation(Remediation::BlockAddress(offender)),
        }),
    )
    .unwrap();

    let verdict = gate.decide(offender, SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
    assert!(verdict.escalated);
    assert!(gate.state().is_blocked(&offender));

    // The next request exits before detection even runs.
    let verdict = gate.decide(offender, CLEAN_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
}

#[tokio::test]
async fn test_engine_recommendation_can_rate_limit() {
    let gate = Rampart::with_engine(
        RampartConfig::default(),
        Arc::new(StubEngine {
            verdict: EscalationVerdict {
                recommendation: Recommendation::RateLimit,
                remediations: Vec::new(),
                rationale: "suspected scraper".to_string(),
            },
        }),
    )
    .unwrap();

    let verdict = gate.decide(addr("10.0.0.10"), SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_rate_limited());
    assert!(verdict.escalated);
}

#[tokio::test]
async fn test_fail_closed_blocks_when_engine_unavailable() {
    let mut config = RampartConfig::default();
    config.escalation.fail_mode = FailMode::FailClosed;
    let gate = Rampart::with_engine(config, Arc::new(FailingEngine)).unwrap();
    let client = addr("10.0.0.11");

    let verdict = gate.decide(client, SQLI_PAYLOAD).await.unwrap();
    assert!(verdict.is_blocked());
    assert!(verdict.escalated);
    assert!(verdict.reason.contains("fail-closed"));
}

// =============================================================================
// STATUS SURFACE
// =============================================================================

#[tokio::test]
async fn test_snapshot_reflects_activity() {
    let gate = gate(RampartConfig::default());

    gate.state().whitelist(addr("10.1.0.1"));
    gate.decide(addr("10.1.0.2"), SQLI_PAYLOAD).await.unwrap();
    gate.decide(addr("10.1.0.3"), CLEAN_PAYLOAD).await.unwrap();

    let snapshot = gate.state().snapshot();
    assert_eq!(snapshot.whitelisted_addresses, 1);
    assert_eq!(snapshot.blocked_addresses, 1);
    assert_eq!(snapshot.total_events, 1);
    assert!(snapshot.tracked_clients >= 2);
    assert_eq!(snapshot.top_suspicious[0].address, addr("10.1.0.2"));
}
