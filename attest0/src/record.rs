//! Ledger-side records: one agent's view of one exchange, and the per-agent
//! counters the ledger derives from them.

use crate::id::{AgentId, InteractionId};
use serde::{Deserialize, Serialize};

/// Status code of a record whose response has not been logged yet.
pub const STATUS_PENDING: u16 = 0;
/// Status code logged for a successful exchange.
pub const STATUS_OK: u16 = 200;
/// Status code logged when the primary call failed.
pub const STATUS_ERROR: u16 = 500;

/// Transport-level identifiers carried for audit only.
///
/// The protocol never interprets these; they exist so an auditor can join
/// a ledger record back to transport logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    /// Transport conversation id.
    pub context_id: String,
    /// Transport task id.
    pub task_id: String,
    /// Transport message id.
    pub message_id: String,
    /// End user on whose behalf the caller acted, if known.
    pub end_user_id: String,
    /// End user's session, if known.
    pub end_user_session_id: String,
}

/// One agent's record of one logical exchange.
///
/// Both parties to an exchange hold their own `InteractionRecord` under the
/// same `interaction_id`. The two rows should agree on the hashes but
/// nothing forces them to; that is what an audit checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Shared correlation id.
    pub interaction_id: InteractionId,
    /// Agent that sent the request.
    pub caller_id: AgentId,
    /// Agent that received the request.
    pub callee_id: AgentId,
    /// Hex SHA-256 of the canonical request.
    pub request_hash: String,
    /// Hex SHA-256 of the canonical response. Empty while pending.
    pub response_hash: String,
    /// Short classifier derived from the request.
    pub intent: String,
    /// 0 while pending, 2xx on success, >= 400 on failure.
    pub status_code: u16,
    /// Seconds since the epoch, set by the logging party.
    pub timestamp: u64,
    /// Opaque transport correlation ids.
    #[serde(default)]
    pub correlation: Correlation,
}

impl InteractionRecord {
    /// True until a response has been logged.
    pub fn is_pending(&self) -> bool {
        self.status_code == STATUS_PENDING
    }

    /// True if the logged status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Rolling per-agent counters maintained by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInteractionStats {
    /// Requests this agent originated.
    pub requests_sent: u64,
    /// Requests this agent recorded receiving.
    pub requests_received: u64,
    /// Responses this agent recorded sending.
    pub responses_sent: u64,
    /// Responses logged with a 2xx status.
    pub success_count: u64,
    /// Distinct counterparties seen.
    pub unique_counterparties: u64,
    /// Timestamp of the latest logged event, seconds since the epoch.
    pub last_interaction_at: u64,
}

/// A page of records, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPage {
    /// Records on this page.
    pub records: Vec<InteractionRecord>,
    /// Total records on the partition.
    pub total: u64,
}
