//! Envelope construction shared by both wrappers.

use attest0::{AgentId, InteractionId, Message, TraceCorrelation, TraceEnvelope};
use attest_codec::derive_intent;

/// Conversation id for a message: its context id, else its task id, else
/// its message id, else a fresh UUID.
pub(crate) fn conversation_id(message: &Message) -> String {
    [
        message.context_id.as_deref(),
        message.task_id.as_deref(),
        Some(message.message_id.as_str()),
    ]
    .into_iter()
    .flatten()
    .find(|id| !id.is_empty())
    .map(str::to_owned)
    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub(crate) fn transport_correlation(message: &Message) -> TraceCorrelation {
    TraceCorrelation {
        context_id: message.context_id.clone().unwrap_or_default(),
        task_id: message.task_id.clone().unwrap_or_default(),
        message_id: message.message_id.clone(),
    }
}

/// Envelope for an incoming message that arrived without one.
pub(crate) fn synthesize(message: &Message, caller: Option<AgentId>, callee: AgentId) -> TraceEnvelope {
    TraceEnvelope {
        conversation_id: conversation_id(message),
        interaction_id: InteractionId::default(),
        caller_id: caller.unwrap_or_default(),
        callee_id: callee,
        end_user: None,
        correlation: transport_correlation(message),
        intent: derive_intent(message),
        client_timestamp_ms: now_millis(),
    }
}

pub(crate) fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_precedence() {
        let msg = Message::user_text("m1", "hi");
        assert_eq!(conversation_id(&msg), "m1");
        assert_eq!(conversation_id(&msg.clone().with_task_id("t1")), "t1");
        assert_eq!(
            conversation_id(&msg.with_task_id("t1").with_context_id("c1")),
            "c1"
        );
    }

    #[test]
    fn conversation_id_falls_back_to_uuid() {
        let msg = Message::user_text("", "hi");
        let id = conversation_id(&msg);
        assert_eq!(id.len(), 36);
        assert_ne!(id, conversation_id(&msg));
    }

    #[test]
    fn synthesized_envelope_has_no_id() {
        let msg = Message::user_text("m1", "ping").with_context_id("c1");
        let env = synthesize(&msg, Some("agent_1".into()), "agent_2".into());
        assert!(env.interaction_id.is_empty());
        assert_eq!(env.caller_id.as_str(), "agent_1");
        assert_eq!(env.correlation.context_id, "c1");
        assert_eq!(env.intent, "ping");
        assert!(env.client_timestamp_ms > 0);
    }
}
