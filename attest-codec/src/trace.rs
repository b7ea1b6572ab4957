//! Reading and writing the trace envelope on a message.

use crate::CodecError;
use crate::hash::hash_value;
use attest0::envelope::{TRACE_EXTENSION_URI, TraceEnvelope};
use attest0::message::{Message, SendParams};
use serde_json::Value;

/// JSON-RPC method name of a unary send.
pub const METHOD_SEND: &str = "message/send";
/// JSON-RPC method name of a streaming send.
pub const METHOD_STREAM: &str = "message/stream";

/// Read the envelope from the message's metadata.
///
/// Returns `None` when the key is missing or its value does not parse as
/// an envelope. Never fails.
pub fn extract_trace(message: &Message) -> Option<TraceEnvelope> {
    let raw = message.metadata.as_ref()?.get(TRACE_EXTENSION_URI)?;
    if !raw.is_object() {
        return None;
    }
    serde_json::from_value(raw.clone()).ok()
}

/// Write the envelope into the message's metadata and declare the trace
/// extension. Re-injecting replaces the previous envelope; the extension
/// is declared once.
pub fn inject_trace(message: &mut Message, envelope: &TraceEnvelope) {
    let Ok(value) = serde_json::to_value(envelope) else {
        return;
    };
    message
        .metadata
        .get_or_insert_with(Default::default)
        .insert(TRACE_EXTENSION_URI.to_owned(), value);

    let extensions = message.extensions.get_or_insert_with(Vec::new);
    if !extensions.iter().any(|uri| uri == TRACE_EXTENSION_URI) {
        extensions.push(TRACE_EXTENSION_URI.to_owned());
    }
}

/// A copy of the message with the envelope and its extension marker
/// removed.
///
/// Caller and callee hash this form so the digest does not depend on
/// whether the envelope was empty, filled in, or synthesized.
pub fn sanitize(message: &Message) -> Message {
    let mut clean = message.clone();
    if let Some(metadata) = clean.metadata.as_mut() {
        metadata.remove(TRACE_EXTENSION_URI);
    }
    if let Some(extensions) = clean.extensions.as_mut() {
        extensions.retain(|uri| uri != TRACE_EXTENSION_URI);
    }
    // Injection may have created these containers; drop them if that is
    // all they held.
    if clean.metadata.as_ref().is_some_and(|m| m.is_empty()) {
        clean.metadata = None;
    }
    if clean.extensions.as_ref().is_some_and(Vec::is_empty) {
        clean.extensions = None;
    }
    clean
}

/// Digest of a request as both parties record it:
/// `{"method": <method>, "params": <params with a sanitized message>}`.
pub fn request_hash(params: &SendParams, method: &str) -> Result<String, CodecError> {
    let mut sanitized = params.clone();
    sanitized.message = sanitize(&params.message);
    let payload = serde_json::json!({
        "method": method,
        "params": serde_json::to_value(&sanitized)?,
    });
    Ok(hash_value(&payload))
}

/// True if the message declares the trace extension.
pub fn declares_trace(message: &Message) -> bool {
    message
        .extensions
        .as_deref()
        .is_some_and(|exts| exts.iter().any(|uri| uri == TRACE_EXTENSION_URI))
}

/// Raw envelope value, for diagnostics when [`extract_trace`] rejects it.
pub fn raw_trace(message: &Message) -> Option<&Value> {
    message.metadata.as_ref()?.get(TRACE_EXTENSION_URI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest0::id::{AgentId, InteractionId};
    use serde_json::json;

    fn envelope(id: &str) -> TraceEnvelope {
        TraceEnvelope {
            conversation_id: "ctx-1".into(),
            interaction_id: InteractionId::new(id),
            caller_id: AgentId::new("agent_1"),
            callee_id: AgentId::new("agent_2"),
            intent: "ping".into(),
            client_timestamp_ms: 42,
            ..Default::default()
        }
    }

    #[test]
    fn inject_then_extract_round_trips() {
        let mut msg = Message::user_text("m1", "ping");
        let env = envelope("ix_abc");
        inject_trace(&mut msg, &env);
        assert_eq!(extract_trace(&msg), Some(env));
        assert!(declares_trace(&msg));
    }

    #[test]
    fn reinjecting_replaces_envelope_and_keeps_one_marker() {
        let mut msg = Message::user_text("m1", "ping");
        inject_trace(&mut msg, &envelope(""));
        inject_trace(&mut msg, &envelope("ix_minted"));

        assert_eq!(msg.extensions.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            extract_trace(&msg).map(|e| e.interaction_id),
            Some(InteractionId::new("ix_minted"))
        );
    }

    #[test]
    fn inject_preserves_other_metadata_and_extensions() {
        let mut msg = Message::user_text("m1", "ping");
        msg.metadata = Some(serde_json::Map::from_iter([("other".to_owned(), json!(1))]));
        msg.extensions = Some(vec!["https://example.com/ext".into()]);
        inject_trace(&mut msg, &envelope(""));

        let metadata = msg.metadata.as_ref().unwrap();
        assert_eq!(metadata.get("other"), Some(&json!(1)));
        assert_eq!(msg.extensions.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn extract_returns_none_when_missing_or_malformed() {
        let mut msg = Message::user_text("m1", "ping");
        assert_eq!(extract_trace(&msg), None);

        msg.metadata = Some(serde_json::Map::from_iter([(
            TRACE_EXTENSION_URI.to_owned(),
            json!("not an object"),
        )]));
        assert_eq!(extract_trace(&msg), None);

        msg.metadata = Some(serde_json::Map::from_iter([(
            TRACE_EXTENSION_URI.to_owned(),
            json!({"interaction_id": 7}),
        )]));
        assert_eq!(extract_trace(&msg), None);
        assert!(raw_trace(&msg).is_some());
    }

    #[test]
    fn sanitize_strips_envelope_and_marker_only() {
        let mut msg = Message::user_text("m1", "ping");
        msg.extensions = Some(vec!["https://example.com/ext".into()]);
        inject_trace(&mut msg, &envelope("ix_1"));

        let clean = sanitize(&msg);
        assert_eq!(extract_trace(&clean), None);
        assert_eq!(clean.extensions, Some(vec!["https://example.com/ext".to_owned()]));
        assert_eq!(clean.parts, msg.parts);
    }

    #[test]
    fn request_hash_ignores_envelope_state() {
        let bare = SendParams::new(Message::user_text("m1", "ping"));

        let mut empty_env = bare.clone();
        inject_trace(&mut empty_env.message, &envelope(""));
        let mut filled_env = bare.clone();
        inject_trace(&mut filled_env.message, &envelope("ix_1"));

        let h_bare = request_hash(&bare, METHOD_SEND).unwrap();
        let h_empty = request_hash(&empty_env, METHOD_SEND).unwrap();
        let h_filled = request_hash(&filled_env, METHOD_SEND).unwrap();
        assert_eq!(h_empty, h_filled);
        assert_eq!(h_bare, h_filled);

        let mut other = bare.clone();
        other.message.parts = vec![attest0::message::Part::text("pong")];
        assert_ne!(h_filled, request_hash(&other, METHOD_SEND).unwrap());
    }

    #[test]
    fn request_hash_depends_on_method() {
        let params = SendParams::new(Message::user_text("m1", "ping"));
        assert_ne!(
            request_hash(&params, METHOD_SEND).unwrap(),
            request_hash(&params, METHOD_STREAM).unwrap()
        );
    }
}
