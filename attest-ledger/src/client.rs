//! The write side of [`InteractionLedger`] and its lifecycle.

use crate::config::LedgerConfig;
use crate::decode::{Decoded, decode_routine_result, interaction_id_of};
use attest0::error::{LedgerError, RpcError, RpcFault};
use attest0::ledger::{Invocation, PartitionReader, RawOutput, RoutineCall, RoutineInvoker};
use attest0::logic;
use attest0::record::Correlation;
use attest0::{ActorAddress, AgentId, InteractionId};
use attest_codec::{DEFAULT_INTENT, clamp_intent};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Arguments of one request log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRequest {
    /// Empty asks the ledger to mint one.
    pub interaction_id: InteractionId,
    /// The other party.
    pub counterparty: AgentId,
    /// True on the calling side.
    pub is_sender: bool,
    /// Digest of the sanitized request.
    pub request_hash: String,
    /// Empty falls back to the default intent.
    pub intent: String,
    /// Seconds since the epoch; zero means now.
    pub timestamp: u64,
    /// Transport correlation ids.
    pub correlation: Correlation,
}

/// Arguments of one response log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogResponse {
    /// Id the request was logged under.
    pub interaction_id: InteractionId,
    /// The other party.
    pub counterparty: AgentId,
    /// True on the responding side.
    pub is_sender: bool,
    /// Digest of the response, or of `{"error": ..}`.
    pub response_hash: String,
    /// 2xx on success, >= 400 on failure.
    pub status_code: u16,
    /// Seconds since the epoch; zero means now.
    pub timestamp: u64,
}

/// The most recent ids this client logged, oldest evicted first.
#[derive(Debug)]
struct RecentIds {
    capacity: usize,
    order: VecDeque<InteractionId>,
    members: HashSet<InteractionId>,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    fn insert(&mut self, id: InteractionId) {
        if !self.members.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }

    fn contains(&self, id: &InteractionId) -> bool {
        self.members.contains(id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Enlistment {
    Unknown,
    Enlisted,
    Failed(String),
}

/// One agent identity's client for the interaction logic.
///
/// Construct once at startup and share behind an `Arc`; every method
/// takes `&self`. Writes go to the signer's own partition. Reads can
/// target any actor and fall back to raw partition traversal when the
/// query index cannot answer (see [`get_interaction`](Self::get_interaction)).
pub struct InteractionLedger {
    pub(crate) invoker: Arc<dyn RoutineInvoker>,
    pub(crate) reader: Arc<dyn PartitionReader>,
    agent_id: AgentId,
    config: LedgerConfig,
    enlistment: RwLock<Enlistment>,
    known: RwLock<RecentIds>,
}

impl std::fmt::Debug for InteractionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionLedger")
            .field("agent_id", &self.agent_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InteractionLedger {
    /// Bind a client to `agent_id` and verify the logic is loadable.
    ///
    /// Fails with [`LedgerError::ContractLoad`] if the logic id is empty or
    /// the ledger cannot load it.
    pub async fn connect(
        invoker: Arc<dyn RoutineInvoker>,
        reader: Arc<dyn PartitionReader>,
        agent_id: impl Into<AgentId>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        if config.logic_id.is_empty() {
            return Err(LedgerError::ContractLoad {
                logic_id: String::new(),
                reason: "logic id is empty".into(),
            });
        }
        invoker
            .load(&config.logic_id)
            .await
            .map_err(|e| LedgerError::ContractLoad {
                logic_id: config.logic_id.to_string(),
                reason: e.message,
            })?;

        let known = RwLock::new(RecentIds::new(config.known_ids));
        Ok(Self {
            invoker,
            reader,
            agent_id: agent_id.into(),
            config,
            enlistment: RwLock::new(Enlistment::Unknown),
            known,
        })
    }

    /// The agent this client logs as.
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// The partition this client writes to, if it can sign.
    pub fn actor(&self) -> Option<ActorAddress> {
        self.invoker.signer()
    }

    /// Register this identity with the logic.
    ///
    /// Idempotent: an "already enlisted" answer counts as success. Any
    /// other failure is returned and remembered, and every later write
    /// fails with [`LedgerError::NotEnlisted`] until an enlist succeeds.
    pub async fn enlist(&self) -> Result<(), LedgerError> {
        let call = RoutineCall::new(logic::ENLIST, vec![json!(self.agent_id)])
            .with_fuel(self.config.fuel_price, self.config.enlist_fuel_limit);

        let outcome = match self.submit(call).await {
            Ok(_) => Ok(()),
            Err(Submit::Rpc(e)) if e.fault() == RpcFault::AlreadyEnlisted => {
                tracing::debug!(agent_id = %self.agent_id, "already enlisted");
                Ok(())
            }
            Err(e) => Err(e.into_transaction("enlist")),
        };

        let mut state = self.enlistment.write().await;
        match &outcome {
            Ok(()) => *state = Enlistment::Enlisted,
            Err(e) => *state = Enlistment::Failed(e.to_string()),
        }
        outcome
    }

    /// True once an enlist has succeeded on this client.
    pub async fn is_enlisted(&self) -> bool {
        *self.enlistment.read().await == Enlistment::Enlisted
    }

    /// Append a pending record to this agent's partition.
    ///
    /// An empty `interaction_id` asks the ledger to mint one, which is
    /// returned. A non-empty id is reused verbatim and echoed back.
    pub async fn log_request(&self, req: LogRequest) -> Result<InteractionId, LedgerError> {
        self.check_enlisted().await?;

        let intent = if req.intent.trim().is_empty() {
            DEFAULT_INTENT.to_owned()
        } else {
            clamp_intent(&req.intent)
        };
        let c = &req.correlation;
        let call = RoutineCall::new(
            logic::LOG_REQUEST,
            vec![
                json!(req.interaction_id),
                json!(req.counterparty),
                json!(req.is_sender),
                json!(req.request_hash),
                json!(intent),
                json!(timestamp_or_now(req.timestamp)),
                json!(c.context_id),
                json!(c.task_id),
                json!(c.message_id),
                json!(c.end_user_id),
                json!(c.end_user_session_id),
            ],
        )
        .with_fuel(self.config.fuel_price, self.config.fuel_limit);

        let submitted = self.submit(call).await.map_err(|e| match e {
            Submit::Rpc(e) if e.fault() == RpcFault::NotEnlisted => {
                LedgerError::NotEnlisted(e.message)
            }
            other => other.into_transaction("log request"),
        })?;

        let id = if req.interaction_id.is_empty() {
            let (tx_hash, decoded) = submitted;
            match decoded.as_ref().and_then(Decoded::as_value).and_then(interaction_id_of) {
                Some(id) => {
                    tracing::debug!(interaction_id = %id, tx_hash = %tx_hash, "minted interaction id");
                    id
                }
                None => {
                    return Err(LedgerError::Transaction {
                        message: "interaction id missing from log request output".into(),
                        tx_hash: Some(tx_hash),
                        source: None,
                    });
                }
            }
        } else {
            req.interaction_id
        };

        self.known.write().await.insert(id.clone());
        Ok(id)
    }

    /// Complete the pending record for `resp.interaction_id`.
    pub async fn log_response(&self, resp: LogResponse) -> Result<(), LedgerError> {
        if resp.interaction_id.is_empty() {
            return Err(LedgerError::InteractionNotFound(String::new()));
        }
        self.check_enlisted().await?;

        let call = RoutineCall::new(
            logic::LOG_RESPONSE,
            vec![
                json!(resp.interaction_id),
                json!(resp.counterparty),
                json!(resp.is_sender),
                json!(resp.response_hash),
                json!(resp.status_code),
                json!(timestamp_or_now(resp.timestamp)),
            ],
        )
        .with_fuel(self.config.fuel_price, self.config.fuel_limit);

        self.submit(call).await.map_err(|e| match e {
            Submit::Rpc(e) if e.fault() == RpcFault::InteractionNotFound => {
                LedgerError::InteractionNotFound(resp.interaction_id.to_string())
            }
            Submit::Rpc(e) if e.fault() == RpcFault::NotEnlisted => {
                LedgerError::NotEnlisted(e.message)
            }
            other => other.into_transaction("log response"),
        })?;
        Ok(())
    }

    /// True if `id` is among the most recent ids this client logged.
    pub(crate) async fn knows(&self, id: &InteractionId) -> bool {
        self.known.read().await.contains(id)
    }

    async fn check_enlisted(&self) -> Result<(), LedgerError> {
        match &*self.enlistment.read().await {
            Enlistment::Failed(reason) => Err(LedgerError::NotEnlisted(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Submit a write and wait for finality. Returns the transaction hash
    /// and the decoded output, if the ledger produced one.
    async fn submit(&self, call: RoutineCall) -> Result<(String, Option<Decoded>), Submit> {
        if self.invoker.signer().is_none() {
            return Err(Submit::NoSigner(call.routine));
        }
        match self.invoker.invoke(call).await.map_err(Submit::Rpc)? {
            Invocation::Output(raw) => Ok((String::new(), Some(decode_routine_result(raw)))),
            Invocation::Pending(mut handle) => {
                let receipt = handle.await_finality().await.map_err(Submit::Rpc)?;
                let raw: Option<RawOutput> = match receipt.output {
                    Some(raw) => Some(raw),
                    None => match handle.decode_output().await {
                        Ok(raw) => Some(raw),
                        Err(e) => {
                            tracing::debug!(tx_hash = %receipt.tx_hash, error = %e, "no routine output");
                            None
                        }
                    },
                };
                Ok((receipt.tx_hash, raw.map(decode_routine_result)))
            }
        }
    }
}

/// Why a submission failed, before it is mapped to a [`LedgerError`].
enum Submit {
    NoSigner(String),
    Rpc(RpcError),
}

impl Submit {
    fn into_transaction(self, what: &str) -> LedgerError {
        match self {
            Submit::NoSigner(routine) => LedgerError::SignerRequired(routine),
            Submit::Rpc(e) => LedgerError::Transaction {
                message: format!("{what}: {e}"),
                tx_hash: None,
                source: Some(e),
            },
        }
    }
}

fn timestamp_or_now(timestamp: u64) -> u64 {
    if timestamp != 0 {
        return timestamp;
    }
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
