//! Error taxonomy for the simulation engine.
//!
//! Every recoverable failure is strongly typed so callers can match on the
//! condition; none of these is fatal to a running session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The connectivity probe failed or has not succeeded yet; `start` stays
    /// blocked until a re-probe succeeds.
    #[error("decision service not connected: {detail}")]
    Connectivity { detail: String },

    /// A per-tick consult failed. The tick's effect is skipped and the loop
    /// continues on schedule.
    #[error("consult failed: {detail}")]
    AgentComm { detail: String },

    /// A decision referenced a node id the registry does not know.
    #[error("decision targets unknown node {ip}")]
    InvalidActionTarget { ip: i64 },

    /// Rejected before any mutation (empty command target, no attacker
    /// selected, reentrant start, edits while running).
    #[error("{reason}")]
    Validation { reason: String },

    /// Registry lookup with an unknown node id.
    #[error("unknown node id {id}")]
    NotFound { id: u32 },
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
