//! Interface of the deployed interaction logic: routine names, argument
//! order, and the layout of an actor's partition.
//!
//! Both the ledger client and any ledger implementation agree on these
//! names. Argument order is positional; see each routine's doc.

/// Registers the signer. Args: `[agent_id]`.
pub const ENLIST: &str = "Enlist";

/// Appends a pending record. Args: `[interaction_id, counterparty,
/// is_sender, request_hash, intent, timestamp, context_id, task_id,
/// message_id, end_user_id, end_user_session_id]`. An empty
/// `interaction_id` asks the logic to mint one. Output names the id.
pub const LOG_REQUEST: &str = "LogRequest";

/// Completes a pending record. Args: `[interaction_id, counterparty,
/// is_sender, response_hash, status_code, timestamp]`.
pub const LOG_RESPONSE: &str = "LogResponse";

/// Indexed lookup. Args: `[actor, interaction_id]`. Output:
/// `{"record": {..}, "found": bool}`.
pub const GET_INTERACTION: &str = "GetInteraction";

/// Indexed page, most recent first. Args: `[actor, limit, offset]`.
/// Output: `{"records": [..], "total": n}`.
pub const LIST_INTERACTIONS: &str = "ListInteractionsByAgent";

/// Indexed counters. Args: `[actor]`. Output: `{"stats": {..}, "found": bool}`.
pub const GET_STATS: &str = "GetAgentInteractionStats";

/// Ordered collection holding an actor's records, oldest first.
pub const INTERACTIONS: &str = "interactions";

/// Scalar holding the enlisted agent id.
pub const AGENT_ID: &str = "agent_id";

/// Per-record fields, as stored in [`INTERACTIONS`] and as returned
/// (flat) by the indexed routines.
pub mod field {
    /// Correlation id.
    pub const INTERACTION_ID: &str = "interaction_id";
    /// Caller agent id.
    pub const CALLER_ID: &str = "caller_id";
    /// Callee agent id.
    pub const CALLEE_ID: &str = "callee_id";
    /// Request digest.
    pub const REQUEST_HASH: &str = "request_hash";
    /// Response digest.
    pub const RESPONSE_HASH: &str = "response_hash";
    /// Intent.
    pub const INTENT: &str = "intent";
    /// Status code.
    pub const STATUS_CODE: &str = "status_code";
    /// Seconds since the epoch.
    pub const TIMESTAMP: &str = "timestamp";
    /// Transport conversation id.
    pub const CONTEXT_ID: &str = "context_id";
    /// Transport task id.
    pub const TASK_ID: &str = "task_id";
    /// Transport message id.
    pub const MESSAGE_ID: &str = "message_id";
    /// End user id.
    pub const END_USER_ID: &str = "end_user_id";
    /// End user session id.
    pub const END_USER_SESSION_ID: &str = "end_user_session_id";

    /// Every record field, in storage order.
    pub const ALL: [&str; 13] = [
        INTERACTION_ID,
        CALLER_ID,
        CALLEE_ID,
        REQUEST_HASH,
        RESPONSE_HASH,
        INTENT,
        STATUS_CODE,
        TIMESTAMP,
        CONTEXT_ID,
        TASK_ID,
        MESSAGE_ID,
        END_USER_ID,
        END_USER_SESSION_ID,
    ];
}

/// Per-actor counter scalars.
pub mod stat {
    /// Requests originated.
    pub const REQUESTS_SENT: &str = "stats_total_requests_sent";
    /// Requests received.
    pub const REQUESTS_RECEIVED: &str = "stats_total_requests_received";
    /// Responses sent.
    pub const RESPONSES_SENT: &str = "stats_total_responses_sent";
    /// 2xx completions.
    pub const SUCCESS_COUNT: &str = "stats_success_count";
    /// Distinct counterparties.
    pub const UNIQUE_COUNTERPARTIES: &str = "stats_unique_counterparties";
    /// Latest logged timestamp.
    pub const LAST_INTERACTION_AT: &str = "stats_last_interaction_at";
}
