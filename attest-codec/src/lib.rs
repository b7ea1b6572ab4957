//! # attest-codec — content hashing and trace envelope codec
//!
//! Pure functions shared by both sides of a traced exchange:
//!
//! - [`hash`]: canonical JSON rendering and SHA-256 digests. Every request
//!   and response is recorded on the ledger by its digest only.
//! - [`trace`]: reading, writing and stripping the [`TraceEnvelope`]
//!   carried in a message's metadata, and the request digest both
//!   parties agree on.
//! - [`intent`]: the short classifier stored with each record.
//!
//! Nothing here does I/O.
//!
//! [`TraceEnvelope`]: attest0::TraceEnvelope

#![deny(missing_docs)]

pub mod hash;
pub mod intent;
pub mod trace;

pub use hash::{canonical_json, error_payload, hash_payload, hash_value, sha256_hex};
pub use intent::{DEFAULT_INTENT, MAX_INTENT_LEN, clamp_intent, derive_intent};
pub use trace::{
    METHOD_SEND, METHOD_STREAM, declares_trace, extract_trace, inject_trace, request_hash,
    sanitize,
};

use thiserror::Error;

/// Errors from hashing a payload.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload could not be turned into JSON.
    #[error("payload is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),
}
