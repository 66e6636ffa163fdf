//! The shared security state store.
//!
//! One [`SecurityState`] instance is owned by the decision pipeline and
//! shared by reference with the rate tracker. All interior synchronization
//! is per structure: set-shaped state behind `RwLock`, per-client records
//! in a sharded map so concurrent requests from different addresses never
//! contend on each other's counters, and requests from the same address
//! serialize on that address's entry.
//!
//! Lock ordering: no method holds two locks at once except `snapshot`,
//! which takes read guards only.

use dashmap::DashMap;
use ipnet::IpNet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::events::{StateSnapshot, SuspectEntry, ThreatEvent};
use crate::rate::ClientRecord;

/// Number of clients reported in [`StateSnapshot::top_suspicious`].
const TOP_SUSPECTS: usize = 5;

/// Default bound on retained threat events.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Scope of a block operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockScope {
    /// Block exactly this address.
    Single,
    /// Widen the address to its enclosing range and block the range.
    Range,
}

/// How a single address is widened to a blocked range.
///
/// The widening prefix is a policy choice made at startup, not a hidden
/// default buried in the block path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePolicy {
    /// Prefix length applied to IPv4 addresses.
    pub prefix_v4: u8,
    /// Prefix length applied to IPv6 addresses.
    pub prefix_v6: u8,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            prefix_v4: 24,
            prefix_v6: 64,
        }
    }
}

/// Process-wide registry of blocked addresses, blocked ranges, whitelisted
/// addresses, per-client counters and scores, and the threat-event history.
pub struct SecurityState {
    whitelist: RwLock<HashSet<IpAddr>>,
    blocked: RwLock<HashSet<IpAddr>>,
    blocked_ranges: RwLock<HashSet<IpNet>>,
    clients: DashMap<IpAddr, ClientRecord>,
    events: RwLock<VecDeque<ThreatEvent>>,
    max_events: usize,
    range_policy: RangePolicy,
}

impl SecurityState {
    /// Creates a state store with default policy.
    pub fn new() -> Self {
        Self::with_policy(RangePolicy::default(), DEFAULT_MAX_EVENTS)
    }

    /// Creates a state store with an explicit widening policy and event
    /// retention bound.
    pub fn with_policy(range_policy: RangePolicy, max_events: usize) -> Self {
        Self {
            whitelist: RwLock::new(HashSet::new()),
            blocked: RwLock::new(HashSet::new()),
            blocked_ranges: RwLock::new(HashSet::new()),
            clients: DashMap::new(),
            events: RwLock::new(VecDeque::new()),
            max_events,
            range_policy,
        }
    }

    // ── Whitelist ────────────────────────────────────────────────────────

    /// Adds an address to the whitelist. Whitelisted addresses bypass
    /// every blocking and rate-limiting check.
    pub fn whitelist(&self, addr: IpAddr) {
        info!(client = %addr, "address whitelisted");
        self.whitelist.write().insert(addr);
    }

    /// Removes an address from the whitelist.
    pub fn unwhitelist(&self, addr: &IpAddr) {
        self.whitelist.write().remove(addr);
    }

    pub fn is_whitelisted(&self, addr: &IpAddr) -> bool {
        self.whitelist.read().contains(addr)
    }

    // ── Block lists ──────────────────────────────────────────────────────

    /// Returns true if the address is effectively blocked.
    ///
    /// Precedence, evaluated in order: whitelist membership short-circuits
    /// to not blocked, then explicit address blocks, then range blocks.
    pub fn is_blocked(&self, addr: &IpAddr) -> bool {
        if self.whitelist.read().contains(addr) {
            return false;
        }
        if self.blocked.read().contains(addr) {
            return true;
        }
        self.blocked_ranges
            .read()
            .iter()
            .any(|net| net.contains(addr))
    }

    /// Blocks an address, either alone or widened to its enclosing range
    /// per the configured [`RangePolicy`].
    pub fn block(&self, addr: IpAddr, scope: BlockScope) {
        match scope {
            BlockScope::Single => {
                info!(client = %addr, "address blocked");
                self.blocked.write().insert(addr);
            }
            BlockScope::Range => {
                let prefix = match addr {
                    IpAddr::V4(_) => self.range_policy.prefix_v4,
                    IpAddr::V6(_) => self.range_policy.prefix_v6,
                };
                match IpNet::new(addr, prefix) {
                    Ok(net) => {
                        let net = net.trunc();
                        info!(client = %addr, range = %net, "address range blocked");
                        self.blocked_ranges.write().insert(net);
                    }
                    Err(err) => {
                        // Prefix was validated at startup; fall back rather
                        // than lose the block.
                        warn!(client = %addr, prefix, error = %err,
                              "range widening failed, blocking single address");
                        self.blocked.write().insert(addr);
                    }
                }
            }
        }
    }

    /// Removes an explicit address block. Range blocks containing the
    /// address are left in place.
    pub fn unblock(&self, addr: &IpAddr) {
        info!(client = %addr, "address unblocked");
        self.blocked.write().remove(addr);
    }

    /// Removes a blocked range.
    pub fn unblock_range(&self, net: &IpNet) {
        self.blocked_ranges.write().remove(net);
    }

    // ── Reputation ───────────────────────────────────────────────────────

    /// Adds to an address's suspicion score and returns the new score.
    pub fn raise_suspicion(&self, addr: IpAddr, amount: u32) -> u32 {
        let mut record = self.clients.entry(addr).or_default();
        record.suspicion = record.suspicion.saturating_add(amount);
        debug!(client = %addr, score = record.suspicion, "suspicion raised");
        record.suspicion
    }

    /// Returns an address's current suspicion score.
    pub fn suspicion(&self, addr: &IpAddr) -> u32 {
        self.clients.get(addr).map(|r| r.suspicion).unwrap_or(0)
    }

    /// Returns the total requests seen from an address.
    pub fn request_count(&self, addr: &IpAddr) -> u64 {
        self.clients
            .get(addr)
            .map(|r| r.total_requests)
            .unwrap_or(0)
    }

    pub(crate) fn clients(&self) -> &DashMap<IpAddr, ClientRecord> {
        &self.clients
    }

    // ── Event history ────────────────────────────────────────────────────

    /// Appends a finalized threat event. The history is bounded; the
    /// oldest event is dropped once the bound is reached.
    pub fn record_event(&self, event: ThreatEvent) {
        let mut events = self.events.write();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Returns a copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<ThreatEvent> {
        self.events.read().iter().cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    // ── Reporting ────────────────────────────────────────────────────────

    /// Produces a read-only view of the current state for status
    /// reporting.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut suspects: Vec<SuspectEntry> = self
            .clients
            .iter()
            .filter(|entry| entry.value().suspicion > 0)
            .map(|entry| SuspectEntry {
                address: *entry.key(),
                score: entry.value().suspicion,
            })
            .collect();
        suspects.sort_by(|a, b| b.score.cmp(&a.score));
        suspects.truncate(TOP_SUSPECTS);

        StateSnapshot {
            blocked_addresses: self.blocked.read().len(),
            blocked_ranges: self.blocked_ranges.read().len(),
            whitelisted_addresses: self.whitelist.read().len(),
            total_events: self.events.read().len(),
            tracked_clients: self.clients.len(),
            top_suspicious: suspects,
        }
    }
}

impl Default for SecurityState {
    fn default() -> Self {
        Self::new()
    }
}
