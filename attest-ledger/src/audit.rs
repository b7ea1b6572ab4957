//! After-the-fact integrity checks over ledger records.
//!
//! Each party records its own half of an exchange. An audit reads both
//! halves and checks that they agree, or recomputes a digest from a
//! payload someone claims was exchanged.

use crate::client::InteractionLedger;
use attest0::error::LedgerError;
use attest0::message::SendParams;
use attest0::record::InteractionRecord;
use attest0::{ActorAddress, InteractionId};
use attest_codec::{CodecError, hash_payload, request_hash};
use serde::Serialize;

/// Which digest of a record to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `request_hash`.
    Request,
    /// `response_hash`.
    Response,
}

/// Both halves of one exchange, side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossCheck {
    /// The caller's record, if found.
    pub caller: Option<InteractionRecord>,
    /// The callee's record, if found.
    pub callee: Option<InteractionRecord>,
    /// Both records exist and their request digests agree.
    pub request_hash_match: bool,
    /// Both records exist, are completed, and their response digests agree.
    pub response_hash_match: bool,
}

impl CrossCheck {
    /// True when both halves exist and agree on every digest.
    pub fn is_consistent(&self) -> bool {
        self.request_hash_match && self.response_hash_match
    }
}

/// Outcome of checking a payload against a recorded digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// The recomputed digest equals the recorded one.
    pub verified: bool,
    /// The digest on the ledger.
    pub on_chain_hash: String,
    /// The record's timestamp.
    pub timestamp: u64,
}

/// Read both halves of `id` and compare them.
pub async fn cross_check(
    ledger: &InteractionLedger,
    caller_actor: &ActorAddress,
    callee_actor: &ActorAddress,
    id: &InteractionId,
) -> Result<CrossCheck, LedgerError> {
    let caller = ledger.get_interaction(caller_actor, id).await?;
    let callee = ledger.get_interaction(callee_actor, id).await?;

    let (request_hash_match, response_hash_match) = match (&caller, &callee) {
        (Some(a), Some(b)) => (
            !a.request_hash.is_empty() && a.request_hash == b.request_hash,
            !a.is_pending()
                && !b.is_pending()
                && !a.response_hash.is_empty()
                && a.response_hash == b.response_hash,
        ),
        _ => (false, false),
    };
    if caller.is_some() && callee.is_some() && !(request_hash_match && response_hash_match) {
        tracing::warn!(interaction_id = %id, request_hash_match, response_hash_match, "interaction halves disagree");
    }

    Ok(CrossCheck {
        caller,
        callee,
        request_hash_match,
        response_hash_match,
    })
}

/// Recompute the digest of `payload` and compare it with the record.
///
/// `payload` must be the exact value that was hashed: a reply, a stream
/// event, or an `{"error": ..}` object. Use [`verify_request`] for
/// requests.
pub fn verify_payload<T: Serialize + ?Sized>(
    record: &InteractionRecord,
    payload: &T,
    side: Side,
) -> Result<Verification, CodecError> {
    let computed = hash_payload(payload)?;
    Ok(verification(record, side, &computed))
}

/// Recompute a request digest the way both parties record it.
pub fn verify_request(
    record: &InteractionRecord,
    params: &SendParams,
    method: &str,
) -> Result<Verification, CodecError> {
    let computed = request_hash(params, method)?;
    Ok(verification(record, Side::Request, &computed))
}

fn verification(record: &InteractionRecord, side: Side, computed: &str) -> Verification {
    let on_chain_hash = match side {
        Side::Request => &record.request_hash,
        Side::Response => &record.response_hash,
    };
    Verification {
        verified: !on_chain_hash.is_empty() && on_chain_hash == computed,
        on_chain_hash: on_chain_hash.clone(),
        timestamp: record.timestamp,
    }
}
