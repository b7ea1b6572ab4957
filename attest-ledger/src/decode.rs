//! Turning whatever the ledger transport handed back into JSON.
//!
//! Transports differ: some decode routine outputs, some hand over JSON
//! bytes, some hand over an encoding only the logic's manifest can read.
//! [`decode_routine_result`] tries a fixed list of strategies in order and
//! never fails; the last resort passes the bytes through flagged for
//! manual decoding. Query answers go through [`decode_query_result`],
//! which accepts JSON only: an id scraped from opaque bytes is no answer
//! to a read.

use attest0::InteractionId;
use attest0::ledger::RawOutput;
use regex::bytes::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static MARKER: LazyLock<MarkerToken> = LazyLock::new(MarkerToken::new);

/// A decoded routine output.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Output understood as JSON.
    Structured(Value),
    /// Output no strategy understood.
    Raw {
        /// The original bytes.
        bytes: Vec<u8>,
        /// Always true; kept so callers can log it.
        needs_manual_decode: bool,
    },
}

impl Decoded {
    /// The JSON value, if decoding succeeded.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Decoded::Structured(v) => Some(v),
            Decoded::Raw { .. } => None,
        }
    }
}

/// One way of reading a raw output.
trait DecodeStrategy: Send + Sync {
    fn decode(&self, raw: &RawOutput) -> Option<Value>;
}

/// Structured values as-is, or bytes that parse as JSON.
struct StructuredJson;

impl DecodeStrategy for StructuredJson {
    fn decode(&self, raw: &RawOutput) -> Option<Value> {
        match raw {
            RawOutput::Structured(v) => Some(v.clone()),
            RawOutput::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
        }
    }
}

/// An interaction id token embedded anywhere in otherwise opaque bytes.
struct MarkerToken {
    pattern: Regex,
}

impl MarkerToken {
    fn new() -> Self {
        Self {
            pattern: Regex::new(r"ix_[0-9a-f]+").expect("valid regex"),
        }
    }
}

impl DecodeStrategy for MarkerToken {
    fn decode(&self, raw: &RawOutput) -> Option<Value> {
        let RawOutput::Bytes(bytes) = raw else {
            return None;
        };
        let token = self.pattern.find(bytes)?;
        let id = std::str::from_utf8(token.as_bytes()).ok()?;
        Some(json!({ "interaction_id": id }))
    }
}

/// Decode a routine output, trying structured JSON, then the id marker.
pub fn decode_routine_result(raw: RawOutput) -> Decoded {
    decode_with(raw, &[&StructuredJson, &*MARKER])
}

/// Decode the output of a read routine. Only structured JSON counts.
pub fn decode_query_result(raw: RawOutput) -> Decoded {
    decode_with(raw, &[&StructuredJson])
}

fn decode_with(raw: RawOutput, strategies: &[&dyn DecodeStrategy]) -> Decoded {
    if let Some(value) = strategies.iter().find_map(|s| s.decode(&raw)) {
        return Decoded::Structured(value);
    }
    let bytes = match raw {
        RawOutput::Bytes(bytes) => bytes,
        RawOutput::Structured(v) => v.to_string().into_bytes(),
    };
    Decoded::Raw {
        bytes,
        needs_manual_decode: true,
    }
}

/// Find the interaction id in a decoded `LogRequest` output.
///
/// Accepts the shapes ledger transports are known to produce: a named
/// field (top level, or under `result` or `output`), positional `outputs`,
/// a flattened `result_interaction_id`, or a bare string.
pub fn interaction_id_of(value: &Value) -> Option<InteractionId> {
    let candidates = [
        value.get("interaction_id"),
        value.pointer("/outputs/0"),
        value.pointer("/result/interaction_id"),
        value.get("result_interaction_id"),
        value.pointer("/output/interaction_id"),
        Some(value),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(InteractionId::new)
}
