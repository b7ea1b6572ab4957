//! The in-band trace envelope piggybacked on a protocol message.

use crate::id::{AgentId, InteractionId};
use crate::record::Correlation;
use serde::{Deserialize, Serialize};

/// Extension URI under which the envelope lives in `Message::metadata`,
/// and which is declared in `Message::extensions` when present.
pub const TRACE_EXTENSION_URI: &str = "https://attest.dev/extensions/trace";

/// The end user a caller acted on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndUser {
    /// End user id.
    pub id: String,
    /// End user's session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Transport correlation ids as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceCorrelation {
    /// Transport conversation id.
    #[serde(default)]
    pub context_id: String,
    /// Transport task id.
    #[serde(default)]
    pub task_id: String,
    /// Transport message id.
    #[serde(default)]
    pub message_id: String,
}

/// Correlates a transport message with a ledger interaction.
///
/// Created by the caller before the first network call with an empty
/// `interaction_id`, filled in once the caller's ledger mints one, and
/// read (never mutated) by the callee. Not persisted; only the ledger
/// records outlive the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEnvelope {
    /// Conversation this exchange belongs to.
    pub conversation_id: String,
    /// Ledger correlation id; empty until minted.
    #[serde(default)]
    pub interaction_id: InteractionId,
    /// Calling agent. Empty means tracing is skipped on the receiving side.
    #[serde(default)]
    pub caller_id: AgentId,
    /// Receiving agent.
    #[serde(default)]
    pub callee_id: AgentId,
    /// End user, if the caller knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_user: Option<EndUser>,
    /// Transport correlation ids.
    #[serde(default)]
    pub correlation: TraceCorrelation,
    /// Short classifier of the request.
    #[serde(default)]
    pub intent: String,
    /// Caller clock at envelope creation, milliseconds since the epoch.
    #[serde(default)]
    pub client_timestamp_ms: u64,
}

impl TraceEnvelope {
    /// Flatten the envelope's correlation ids into the ledger's bag.
    pub fn ledger_correlation(&self) -> Correlation {
        let (end_user_id, end_user_session_id) = match &self.end_user {
            Some(user) => (user.id.clone(), user.session_id.clone().unwrap_or_default()),
            None => (String::new(), String::new()),
        };
        Correlation {
            context_id: self.correlation.context_id.clone(),
            task_id: self.correlation.task_id.clone(),
            message_id: self.correlation.message_id.clone(),
            end_user_id,
            end_user_session_id,
        }
    }
}
