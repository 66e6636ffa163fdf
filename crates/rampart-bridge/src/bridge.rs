//! The escalation bridge.
//!
//! The bridge is the narrow contract by which the decision pipeline hands
//! a request to an external reasoning engine and consumes its verdict.
//! What the engine actually does (prompting, model choice, report text) is
//! entirely outside this crate; only the call shape and the timeout
//! discipline live here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use rampart_detect::ThreatFinding;

use crate::error::BridgeError;

/// Everything the reasoning engine gets to see for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRequest {
    /// The client the request came from.
    pub client: IpAddr,
    /// The raw request payload.
    pub payload: String,
    /// Findings the local detection engine accumulated.
    pub findings: Vec<ThreatFinding>,
}

impl EscalationRequest {
    pub fn new(client: IpAddr, payload: impl Into<String>, findings: Vec<ThreatFinding>) -> Self {
        Self {
            client,
            payload: payload.into(),
            findings,
        }
    }
}

/// Action the reasoning engine recommends for the current request.
///
/// The recommendation may confirm, downgrade, or upgrade the locally
/// computed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Allow,
    RateLimit,
    Block,
}

/// A remediation the engine asks the gate to apply to its security state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remediation {
    /// Block this single address.
    BlockAddress(IpAddr),
    /// Block the address widened to its enclosing range.
    BlockRange(IpAddr),
}

/// The reasoning engine's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationVerdict {
    /// Recommended action for the current request.
    pub recommendation: Recommendation,
    /// State changes the engine wants applied.
    pub remediations: Vec<Remediation>,
    /// Short justification, recorded in the threat event.
    pub rationale: String,
}

impl EscalationVerdict {
    /// A verdict that confirms the request is fine.
    pub fn allow(rationale: impl Into<String>) -> Self {
        Self {
            recommendation: Recommendation::Allow,
            remediations: Vec::new(),
            rationale: rationale.into(),
        }
    }

    /// A verdict that asks for the request to be blocked.
    pub fn block(rationale: impl Into<String>) -> Self {
        Self {
            recommendation: Recommendation::Block,
            remediations: Vec::new(),
            rationale: rationale.into(),
        }
    }

    /// Adds a remediation request.
    pub fn with_remediation(mut self, remediation: Remediation) -> Self {
        self.remediations.push(remediation);
        self
    }
}

/// An external reasoning engine.
///
/// Implementations wrap whatever deeper analysis exists outside the gate.
/// `assess` may be slow or fail; the bridge bounds it with a deadline and
/// the caller treats any error as a signal to fall back, never as fatal.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Produces a verdict for one escalated request.
    async fn assess(&self, request: &EscalationRequest) -> Result<EscalationVerdict, BridgeError>;
}

/// Bounds every engine call with an explicit deadline.
pub struct EscalationBridge {
    engine: Arc<dyn ReasoningEngine>,
    timeout: Duration,
}

impl EscalationBridge {
    pub fn new(engine: Arc<dyn ReasoningEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// Invokes the reasoning engine, giving it at most the configured
    /// deadline to answer.
    pub async fn escalate(
        &self,
        request: &EscalationRequest,
    ) -> Result<EscalationVerdict, BridgeError> {
        debug!(
            engine = self.engine.name(),
            client = %request.client,
            findings = request.findings.len(),
            "escalating request"
        );
        match tokio::time::timeout(self.timeout, self.engine.assess(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    engine = self.engine.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "reasoning engine missed its deadline"
                );
                Err(BridgeError::Timeout(self.timeout))
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
