//! # Rampart State
//!
//! Shared security state for the Rampart request gate: block lists,
//! whitelist, per-client rate windows and suspicion scores, and the
//! threat-event history.
//!
//! ## Concurrency Model
//!
//! The store is the only shared mutable resource in the decision core.
//! Synchronization is fine-grained so unrelated traffic never serializes:
//!
//! | State | Synchronization |
//! |-------|-----------------|
//! | Block lists / whitelist | `RwLock<HashSet>` (read-mostly) |
//! | Per-client counters and scores | sharded map, per-address entry locks |
//! | Event history | `RwLock<VecDeque>`, append-only, bounded |
//!
//! Concurrent requests from the same address serialize on that address's
//! record; requests from different addresses proceed independently.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`SecurityState`] | Block/whitelist registry, reputation, event log |
//! | [`RateTracker`] | Minute / hour / burst budgets with lazy rollover |
//! | [`ThreatEvent`] | Immutable record of one finalized decision |
//!
//! ## Quick Start
//!
//! ```rust
//! use rampart_state::{RateLimitConfig, RateTracker, SecurityState, SuspicionPolicy};
//! use std::sync::Arc;
//!
//! let state = Arc::new(SecurityState::new());
//! let tracker = RateTracker::new(
//!     Arc::clone(&state),
//!     RateLimitConfig::default(),
//!     SuspicionPolicy::default(),
//! );
//!
//! let client = "1.2.3.4".parse().unwrap();
//! let status = tracker.evaluate(client);
//! assert!(status.within_limits);
//! ```

mod events;
mod rate;
mod store;

pub use events::{ActionTaken, StateSnapshot, SuspectEntry, ThreatEvent};
pub use rate::{
    DecayPolicy, RateLimitConfig, RateStatus, RateTracker, SuspicionPolicy, WindowKind,
};
pub use store::{BlockScope, RangePolicy, SecurityState, DEFAULT_MAX_EVENTS};
