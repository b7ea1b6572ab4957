//! The resilient read path.
//!
//! Every read asks the indexed routine first. The raw partition is
//! traversed instead when the index is missing (the storage-not-found
//! message class) or when the index denies knowing an id this client
//! logged itself. A raw traversal that also sees storage-not-found means
//! the partition was never written: definitely absent.

use crate::client::InteractionLedger;
use crate::decode::{Decoded, decode_query_result};
use attest0::error::{LedgerError, RpcError, RpcFault};
use attest0::ledger::{Invocation, RoutineCall, StatePath};
use attest0::logic::{self, INTERACTIONS, field, stat};
use attest0::record::{AgentInteractionStats, Correlation, InteractionPage, InteractionRecord};
use attest0::{ActorAddress, InteractionId, normalize_identifier};
use serde_json::{Map, Value, json};

/// Outcome of one indexed routine call.
enum Indexed {
    Answer(Value),
    NotReady,
}

impl InteractionLedger {
    /// Fetch one record from `actor`'s partition. Like every read here,
    /// `actor` is normalized first, so a bare 64-hex address works.
    ///
    /// `Ok(None)` means the ledger positively reported the record absent.
    pub async fn get_interaction(
        &self,
        actor: &ActorAddress,
        id: &InteractionId,
    ) -> Result<Option<InteractionRecord>, LedgerError> {
        let actor = &normalized(actor);
        let call = RoutineCall::new(logic::GET_INTERACTION, vec![json!(actor), json!(id)]);
        match self.indexed(call).await? {
            Indexed::Answer(value) => {
                if found(&value)? {
                    let record = value
                        .get("record")
                        .and_then(Value::as_object)
                        .ok_or_else(|| query_error("record missing from output", None))?;
                    return Ok(Some(record_from_fields(record)));
                }
                if !self.knows(id).await {
                    return Ok(None);
                }
                tracing::debug!(interaction_id = %id, actor = %actor, "index lags a logged id, traversing partition");
            }
            Indexed::NotReady => {
                tracing::debug!(interaction_id = %id, actor = %actor, "index not ready, traversing partition");
            }
        }
        self.raw_get_interaction(actor, id).await
    }

    /// A page of `actor`'s records, most recent first.
    pub async fn list_interactions(
        &self,
        actor: &ActorAddress,
        limit: u64,
        offset: u64,
    ) -> Result<InteractionPage, LedgerError> {
        let actor = &normalized(actor);
        let call = RoutineCall::new(
            logic::LIST_INTERACTIONS,
            vec![json!(actor), json!(limit), json!(offset)],
        );
        match self.indexed(call).await? {
            Indexed::Answer(value) => {
                let records = value
                    .get("records")
                    .and_then(Value::as_array)
                    .ok_or_else(|| query_error("records missing from output", None))?
                    .iter()
                    .filter_map(Value::as_object)
                    .map(record_from_fields)
                    .collect();
                let total = value
                    .get("total")
                    .and_then(as_u64)
                    .ok_or_else(|| query_error("total missing from output", None))?;
                Ok(InteractionPage { records, total })
            }
            Indexed::NotReady => {
                tracing::debug!(actor = %actor, "index not ready, traversing partition");
                self.raw_list_interactions(actor, limit, offset).await
            }
        }
    }

    /// The `limit` most recent records on `actor`'s partition.
    pub async fn recent(
        &self,
        actor: &ActorAddress,
        limit: u64,
    ) -> Result<Vec<InteractionRecord>, LedgerError> {
        Ok(self.list_interactions(actor, limit, 0).await?.records)
    }

    /// Counters for `actor`, or `None` if the actor never enlisted.
    pub async fn get_stats(
        &self,
        actor: &ActorAddress,
    ) -> Result<Option<AgentInteractionStats>, LedgerError> {
        let actor = &normalized(actor);
        let call = RoutineCall::new(logic::GET_STATS, vec![json!(actor)]);
        match self.indexed(call).await? {
            Indexed::Answer(value) => {
                if !found(&value)? {
                    return Ok(None);
                }
                let stats = value
                    .get("stats")
                    .and_then(Value::as_object)
                    .ok_or_else(|| query_error("stats missing from output", None))?;
                let count = |name: &str| stats.get(name).and_then(as_u64).unwrap_or_default();
                Ok(Some(AgentInteractionStats {
                    requests_sent: count("requests_sent"),
                    requests_received: count("requests_received"),
                    responses_sent: count("responses_sent"),
                    success_count: count("success_count"),
                    unique_counterparties: count("unique_counterparties"),
                    last_interaction_at: count("last_interaction_at"),
                }))
            }
            Indexed::NotReady => {
                tracing::debug!(actor = %actor, "index not ready, reading counters from partition");
                self.raw_get_stats(actor).await
            }
        }
    }

    async fn indexed(&self, call: RoutineCall) -> Result<Indexed, LedgerError> {
        let routine = call.routine.clone();
        let raw = match self.invoker.invoke(call).await {
            Ok(Invocation::Output(raw)) => raw,
            Ok(Invocation::Pending(_)) => {
                return Err(query_error(format!("{routine} submitted a transaction"), None));
            }
            Err(e) if e.fault() == RpcFault::IndexNotReady => return Ok(Indexed::NotReady),
            Err(e) => return Err(query_error(routine, Some(e))),
        };
        match decode_query_result(raw) {
            Decoded::Structured(value) => Ok(Indexed::Answer(value)),
            Decoded::Raw { bytes, .. } => Err(query_error(
                format!("{routine} output needs manual decoding ({} bytes)", bytes.len()),
                None,
            )),
        }
    }

    async fn raw_get_interaction(
        &self,
        actor: &ActorAddress,
        id: &InteractionId,
    ) -> Result<Option<InteractionRecord>, LedgerError> {
        let Some(total) = self.raw_len(actor).await? else {
            return Ok(None);
        };
        // Newest first: a recently logged id is the likely target.
        for index in (0..total).rev() {
            let path = StatePath::element(INTERACTIONS, index, field::INTERACTION_ID);
            let Some(candidate) = self.raw_read(actor, &path).await? else {
                return Ok(None);
            };
            if candidate.as_str() == Some(id.as_str()) {
                return self.raw_record(actor, index).await;
            }
        }
        Ok(None)
    }

    async fn raw_list_interactions(
        &self,
        actor: &ActorAddress,
        limit: u64,
        offset: u64,
    ) -> Result<InteractionPage, LedgerError> {
        let Some(total) = self.raw_len(actor).await? else {
            return Ok(InteractionPage::default());
        };
        let count = limit.min(total.saturating_sub(offset));
        let mut records = Vec::new();
        for i in 0..count {
            let index = total - offset - 1 - i;
            match self.raw_record(actor, index).await? {
                Some(record) => records.push(record),
                None => return Ok(InteractionPage::default()),
            }
        }
        Ok(InteractionPage { records, total })
    }

    async fn raw_get_stats(
        &self,
        actor: &ActorAddress,
    ) -> Result<Option<AgentInteractionStats>, LedgerError> {
        let names = [
            stat::REQUESTS_SENT,
            stat::REQUESTS_RECEIVED,
            stat::RESPONSES_SENT,
            stat::SUCCESS_COUNT,
            stat::UNIQUE_COUNTERPARTIES,
            stat::LAST_INTERACTION_AT,
        ];
        let mut values = [0u64; 6];
        for (slot, name) in values.iter_mut().zip(names) {
            match self.raw_read(actor, &StatePath::scalar(name)).await? {
                Some(v) => *slot = as_u64(&v).unwrap_or_default(),
                None => return Ok(None),
            }
        }
        let [
            requests_sent,
            requests_received,
            responses_sent,
            success_count,
            unique_counterparties,
            last_interaction_at,
        ] = values;
        Ok(Some(AgentInteractionStats {
            requests_sent,
            requests_received,
            responses_sent,
            success_count,
            unique_counterparties,
            last_interaction_at,
        }))
    }

    /// Number of records, or `None` if the partition does not exist.
    async fn raw_len(&self, actor: &ActorAddress) -> Result<Option<u64>, LedgerError> {
        let value = self.raw_read(actor, &StatePath::length(INTERACTIONS)).await?;
        Ok(value.map(|v| as_u64(&v).unwrap_or_default()))
    }

    async fn raw_record(
        &self,
        actor: &ActorAddress,
        index: u64,
    ) -> Result<Option<InteractionRecord>, LedgerError> {
        let mut fields = Map::new();
        for name in field::ALL {
            let path = StatePath::element(INTERACTIONS, index, name);
            match self.raw_read(actor, &path).await? {
                Some(value) => {
                    fields.insert(name.to_owned(), value);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(record_from_fields(&fields)))
    }

    /// One raw field. `None` when the partition does not exist.
    async fn raw_read(
        &self,
        actor: &ActorAddress,
        path: &StatePath,
    ) -> Result<Option<Value>, LedgerError> {
        match self.reader.read_field(actor, path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.fault() == RpcFault::IndexNotReady => Ok(None),
            Err(e) => Err(query_error("raw partition read", Some(e))),
        }
    }
}

/// Build a record from its flat stored form. Both read paths use this so
/// their results are field-identical.
pub(crate) fn record_from_fields(fields: &Map<String, Value>) -> InteractionRecord {
    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    let number = |name: &str| fields.get(name).and_then(as_u64).unwrap_or_default();

    InteractionRecord {
        interaction_id: InteractionId::new(text(field::INTERACTION_ID)),
        caller_id: text(field::CALLER_ID).into(),
        callee_id: text(field::CALLEE_ID).into(),
        request_hash: text(field::REQUEST_HASH),
        response_hash: text(field::RESPONSE_HASH),
        intent: text(field::INTENT),
        status_code: u16::try_from(number(field::STATUS_CODE)).unwrap_or(u16::MAX),
        timestamp: number(field::TIMESTAMP),
        correlation: Correlation {
            context_id: text(field::CONTEXT_ID),
            task_id: text(field::TASK_ID),
            message_id: text(field::MESSAGE_ID),
            end_user_id: text(field::END_USER_ID),
            end_user_session_id: text(field::END_USER_SESSION_ID),
        },
    }
}

/// Ledgers encode large integers as numbers or as decimal strings.
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Actor addresses arrive from users and config; bare hex gets its `0x`.
fn normalized(actor: &ActorAddress) -> ActorAddress {
    ActorAddress::new(normalize_identifier(actor.as_str()))
}

/// The `found` flag of a lookup answer. Anything but a bool is a failed
/// read, never "absent".
fn found(value: &Value) -> Result<bool, LedgerError> {
    value
        .get("found")
        .and_then(Value::as_bool)
        .ok_or_else(|| query_error("found flag missing from output", None))
}

fn query_error(message: impl Into<String>, source: Option<RpcError>) -> LedgerError {
    LedgerError::Query {
        message: message.into(),
        source,
    }
}
