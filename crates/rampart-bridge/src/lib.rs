//! # Rampart Bridge
//!
//! The escalation contract between the Rampart request gate and an
//! external reasoning engine.
//!
//! The gate resolves most requests locally from cheap heuristics. When a
//! request deserves deeper judgment, it is handed across this bridge:
//! payload and accumulated findings in, an optional verdict out, bounded
//! by an explicit deadline. The engine may also ask for remediations,
//! such as blocking the offending address, which the gate applies to its
//! own security state.
//!
//! ## Failure Discipline
//!
//! The bridge is the only suspending operation in the decision core, and
//! the only one allowed to fail routinely:
//!
//! - every call carries an explicit timeout
//! - a timeout or engine failure is a recoverable [`BridgeError`]
//! - callers fall back to their local verdict; the pipeline never stalls
//!   or crashes on an absent engine

mod bridge;
mod error;

pub use bridge::{
    EscalationBridge, EscalationRequest, EscalationVerdict, ReasoningEngine, Recommendation,
    Remediation,
};
pub use error::BridgeError;
