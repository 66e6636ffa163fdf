//! Rate and reputation tracking.
//!
//! Each client address carries three fixed counting windows (minute, hour,
//! burst) plus a running suspicion score. Windows roll over lazily at
//! evaluation time; there is no background timer to manage. Fixed windows
//! trade edge bursts at window boundaries for cheap bookkeeping, which is
//! acceptable here because the burst window bounds short spikes anyway.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::store::{BlockScope, SecurityState};

const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const HOUR_WINDOW: Duration = Duration::from_secs(3600);
/// Sub-window used for burst detection.
const BURST_WINDOW: Duration = Duration::from_secs(10);

/// Request-rate budgets, immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per minute window.
    pub requests_per_minute: u32,
    /// Requests allowed per hour window.
    pub requests_per_hour: u32,
    /// Requests allowed within one burst window.
    pub burst_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1000,
            burst_limit: 10,
        }
    }
}

/// Which window a request exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowKind {
    Minute,
    Hour,
    Burst,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Minute => write!(f, "minute"),
            WindowKind::Hour => write!(f, "hour"),
            WindowKind::Burst => write!(f, "burst"),
        }
    }
}

/// Result of one rate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    /// False when any window budget was exceeded.
    pub within_limits: bool,
    /// The client's suspicion score after this evaluation.
    pub suspicion: u32,
    /// The first window found over budget, if any.
    pub exceeded: Option<WindowKind>,
}

impl RateStatus {
    /// Status for clients that bypass tracking entirely.
    pub fn unlimited() -> Self {
        Self {
            within_limits: true,
            suspicion: 0,
            exceeded: None,
        }
    }
}

/// Suspicion scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspicionPolicy {
    /// Score at which an address is automatically blocked.
    pub auto_block_threshold: u32,
    /// Fixed amount added on each rate violation.
    pub rate_violation_increment: u32,
    /// Optional lazy decay applied on access.
    pub decay: Option<DecayPolicy>,
}

impl Default for SuspicionPolicy {
    fn default() -> Self {
        Self {
            auto_block_threshold: 10,
            rate_violation_increment: 2,
            decay: None,
        }
    }
}

/// Lazy suspicion decay: `amount` is subtracted once per elapsed
/// `interval` whenever the record is next touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayPolicy {
    pub interval: Duration,
    pub amount: u32,
}

/// One fixed counting window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { count: 0, started: now }
    }

    /// Rolls the window over if its period elapsed, then counts one
    /// request. Counts never go negative and reset exactly at
    /// boundaries.
    fn record(&mut self, now: Instant, period: Duration) -> u32 {
        if now.duration_since(self.started) >= period {
            self.started = now;
            self.count = 0;
        }
        self.count += 1;
        self.count
    }
}

/// Per-client mutable state. Lives inside the state store's sharded map,
/// so all access is serialized per address.
#[derive(Debug, Clone)]
pub(crate) struct ClientRecord {
    minute: Window,
    hour: Window,
    burst: Window,
    pub(crate) suspicion: u32,
    pub(crate) total_requests: u64,
    last_decay: Instant,
}

impl Default for ClientRecord {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            minute: Window::new(now),
            hour: Window::new(now),
            burst: Window::new(now),
            suspicion: 0,
            total_requests: 0,
            last_decay: now,
        }
    }
}

impl ClientRecord {
    fn apply_decay(&mut self, policy: &SuspicionPolicy, now: Instant) {
        let Some(decay) = policy.decay else { return };
        if decay.interval.is_zero() {
            return;
        }
        let elapsed = now.duration_since(self.last_decay);
        let steps = (elapsed.as_millis() / decay.interval.as_millis()) as u32;
        if steps > 0 {
            self.suspicion = self
                .suspicion
                .saturating_sub(decay.amount.saturating_mul(steps));
            self.last_decay = now;
        }
    }
}

/// Computes, per client address, whether the current request fits the
/// configured budgets, and maintains the suspicion score.
pub struct RateTracker {
    state: Arc<SecurityState>,
    limits: RateLimitConfig,
    policy: SuspicionPolicy,
}

impl RateTracker {
    pub fn new(state: Arc<SecurityState>, limits: RateLimitConfig, policy: SuspicionPolicy) -> Self {
        Self {
            state,
            limits,
            policy,
        }
    }

    /// Evaluates one request from `addr`.
    ///
    /// Whitelisted addresses bypass tracking entirely; their counters are
    /// never touched. For everyone else the three windows are rolled over
    /// and incremented, then compared against the budgets. A violation
    /// raises the suspicion score, and crossing the auto-block threshold
    /// blocks the address as a side effect, independent of any later
    /// detection-based blocking.
    pub fn evaluate(&self, addr: IpAddr) -> RateStatus {
        if self.state.is_whitelisted(&addr) {
            return RateStatus::unlimited();
        }

        let now = Instant::now();
        let (exceeded, suspicion) = {
            // Entry guard serializes concurrent requests from one address.
            let mut record = self.state.clients().entry(addr).or_default();
            record.apply_decay(&self.policy, now);
            record.total_requests += 1;

            let burst = record.burst.record(now, BURST_WINDOW);
            let minute = record.minute.record(now, MINUTE_WINDOW);
            let hour = record.hour.record(now, HOUR_WINDOW);

            let exceeded = if burst > self.limits.burst_limit {
                Some(WindowKind::Burst)
            } else if minute > self.limits.requests_per_minute {
                Some(WindowKind::Minute)
            } else if hour > self.limits.requests_per_hour {
                Some(WindowKind::Hour)
            } else {
                None
            };

            if exceeded.is_some() {
                record.suspicion = record
                    .suspicion
                    .saturating_add(self.policy.rate_violation_increment);
            }
            (exceeded, record.suspicion)
        };

        match exceeded {
            Some(kind) => {
                debug!(client = %addr, window = %kind, suspicion, "rate budget exceeded");
                if suspicion >= self.policy.auto_block_threshold && !self.state.is_blocked(&addr) {
                    warn!(client = %addr, score = suspicion, "suspicion threshold crossed, auto-blocking");
                    self.state.block(addr, BlockScope::Single);
                }
                RateStatus {
                    within_limits: false,
                    suspicion,
                    exceeded,
                }
            }
            None => RateStatus {
                within_limits: true,
                suspicion,
                exceeded: None,
            },
        }
    }

    pub fn limits(&self) -> &RateLimitConfig {
        &self.limits
    }
}
