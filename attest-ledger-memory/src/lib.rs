//! In-memory implementation of attest0's ledger collaborators.
//!
//! [`MemoryLedger`] holds every actor's partition in a `HashMap` behind a
//! `RwLock`. [`MemoryLedger::connect`] hands out a [`MemoryConnection`]
//! bound to one signing actor; it implements both [`RoutineInvoker`] and
//! [`PartitionReader`], so one value can back an `InteractionLedger`.
//!
//! Writes go through a [`SubmissionHandle`] and are applied when finality
//! is awaited, the way a real ledger applies a transaction only once it
//! is final. Reads answer synchronously.
//!
//! Fault injection switches are on [`MemoryLedger`] and apply to every
//! connection.

#![deny(missing_docs)]

mod partition;

use async_trait::async_trait;
use attest0::error::{RpcError, STORAGE_NOT_FOUND};
use attest0::ledger::{
    Invocation, PartitionReader, RawOutput, Receipt, RoutineCall, RoutineInvoker, StatePath,
    SubmissionHandle,
};
use attest0::logic::{self, INTERACTIONS};
use attest0::record::Correlation;
use attest0::{ActorAddress, InteractionRecord, LogicId};
use partition::{Partition, RequestEntry, ResponseEntry, flatten, stats_value};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// How routine outputs are handed back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputEncoding {
    /// Already-decoded JSON.
    #[default]
    Structured,
    /// JSON, but as undecoded bytes.
    JsonBytes,
    /// Bytes no JSON parser accepts. Minted ids remain visible inside.
    Opaque,
}

/// State of the query index behind the indexed read routines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexState {
    /// Indexed reads see everything.
    #[default]
    Ready,
    /// Indexed reads fail with the storage-not-found message.
    Missing,
    /// Indexed record reads answer "not found" and empty pages.
    Stale,
}

#[derive(Debug, Default)]
struct Faults {
    index: IndexState,
    hang_writes: bool,
    fail_writes: Option<String>,
    fail_reads: Option<String>,
    encoding: OutputEncoding,
}

struct Shared {
    logic_id: LogicId,
    partitions: RwLock<HashMap<ActorAddress, Partition>>,
    faults: RwLock<Faults>,
    next_id: AtomicU64,
    next_tx: AtomicU64,
}

/// In-memory ledger shared by any number of connections.
///
/// Cloning is cheap and shares state.
#[derive(Clone)]
pub struct MemoryLedger {
    shared: Arc<Shared>,
}

impl MemoryLedger {
    /// Create an empty ledger that accepts routines for `logic_id`.
    pub fn new(logic_id: impl Into<LogicId>) -> Self {
        Self {
            shared: Arc::new(Shared {
                logic_id: logic_id.into(),
                partitions: RwLock::new(HashMap::new()),
                faults: RwLock::new(Faults::default()),
                next_id: AtomicU64::new(0),
                next_tx: AtomicU64::new(0),
            }),
        }
    }

    /// A connection that signs as `actor`.
    pub fn connect(&self, actor: impl Into<ActorAddress>) -> MemoryConnection {
        MemoryConnection {
            shared: Arc::clone(&self.shared),
            signer: Some(actor.into()),
        }
    }

    /// A connection with no signer. Reads only.
    pub fn read_only(&self) -> MemoryConnection {
        MemoryConnection {
            shared: Arc::clone(&self.shared),
            signer: None,
        }
    }

    /// Set the state of the query index.
    pub async fn set_index(&self, state: IndexState) {
        self.shared.faults.write().await.index = state;
    }

    /// Make every write hang before finality.
    pub async fn hang_writes(&self, hang: bool) {
        self.shared.faults.write().await.hang_writes = hang;
    }

    /// Make every write fail finality with `message`.
    pub async fn fail_writes(&self, message: impl Into<String>) {
        self.shared.faults.write().await.fail_writes = Some(message.into());
    }

    /// Make every read, indexed or raw, fail with `message`.
    pub async fn fail_reads(&self, message: impl Into<String>) {
        self.shared.faults.write().await.fail_reads = Some(message.into());
    }

    /// Choose how outputs are encoded.
    pub async fn set_encoding(&self, encoding: OutputEncoding) {
        self.shared.faults.write().await.encoding = encoding;
    }

    /// Clear every injected fault.
    pub async fn clear_faults(&self) {
        *self.shared.faults.write().await = Faults::default();
    }

    /// Records held by `actor`, oldest first. Bypasses routines and faults.
    pub async fn records(&self, actor: &ActorAddress) -> Vec<InteractionRecord> {
        let partitions = self.shared.partitions.read().await;
        partitions
            .get(actor)
            .map(|p| (0..p.len()).filter_map(|i| p.get(i).cloned()).collect())
            .unwrap_or_default()
    }

    /// True if `actor` has enlisted.
    pub async fn is_enlisted(&self, actor: &ActorAddress) -> bool {
        self.shared.partitions.read().await.contains_key(actor)
    }
}

/// One actor's view of a [`MemoryLedger`].
#[derive(Clone)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
    signer: Option<ActorAddress>,
}

#[async_trait]
impl RoutineInvoker for MemoryConnection {
    async fn load(&self, logic_id: &LogicId) -> Result<(), RpcError> {
        if *logic_id == self.shared.logic_id {
            Ok(())
        } else {
            Err(RpcError::new(format!("logic not found: {logic_id}")))
        }
    }

    fn signer(&self) -> Option<ActorAddress> {
        self.signer.clone()
    }

    async fn invoke(&self, call: RoutineCall) -> Result<Invocation, RpcError> {
        match call.routine.as_str() {
            logic::ENLIST | logic::LOG_REQUEST | logic::LOG_RESPONSE => {
                let signer = self.signer.clone().ok_or_else(|| {
                    RpcError::new(format!("{} requires a signer", call.routine))
                })?;
                if call.fuel_limit == 0 {
                    return Err(RpcError::new("out of fuel"));
                }
                Ok(Invocation::Pending(Box::new(MemorySubmission {
                    shared: Arc::clone(&self.shared),
                    signer,
                    call,
                    receipt: None,
                })))
            }
            logic::GET_INTERACTION | logic::LIST_INTERACTIONS | logic::GET_STATS => {
                let faults = self.shared.faults.read().await;
                if let Some(message) = &faults.fail_reads {
                    return Err(RpcError::new(message.clone()));
                }
                let (index, encoding) = (faults.index, faults.encoding);
                drop(faults);
                let value = self.shared.query(&call, index).await?;
                Ok(Invocation::Output(encode(&value, encoding)))
            }
            other => Err(RpcError::new(format!("unknown routine: {other}"))),
        }
    }
}

#[async_trait]
impl PartitionReader for MemoryConnection {
    async fn read_field(&self, actor: &ActorAddress, path: &StatePath) -> Result<Value, RpcError> {
        if let Some(message) = &self.shared.faults.read().await.fail_reads {
            return Err(RpcError::new(message.clone()));
        }
        let partitions = self.shared.partitions.read().await;
        let partition = partitions
            .get(actor)
            .ok_or_else(|| RpcError::new(STORAGE_NOT_FOUND))?;

        match path {
            StatePath::Scalar { name } => partition
                .scalar(name)
                .ok_or_else(|| RpcError::new(format!("unknown field: {name}"))),
            StatePath::Length { collection } if collection == INTERACTIONS => {
                Ok(json!(partition.len()))
            }
            StatePath::Element {
                collection,
                index,
                field,
            } if collection == INTERACTIONS => {
                let record = usize::try_from(*index)
                    .ok()
                    .and_then(|i| partition.get(i))
                    .ok_or_else(|| RpcError::new(format!("index out of range: {index}")))?;
                flatten(record)
                    .remove(field.as_str())
                    .ok_or_else(|| RpcError::new(format!("unknown field: {field}")))
            }
            other => Err(RpcError::new(format!("unknown collection in {other:?}"))),
        }
    }
}

struct MemorySubmission {
    shared: Arc<Shared>,
    signer: ActorAddress,
    call: RoutineCall,
    receipt: Option<Receipt>,
}

#[async_trait]
impl SubmissionHandle for MemorySubmission {
    async fn await_finality(&mut self) -> Result<Receipt, RpcError> {
        if let Some(receipt) = &self.receipt {
            return Ok(receipt.clone());
        }
        let faults = self.shared.faults.read().await;
        let (hang, failure, encoding) =
            (faults.hang_writes, faults.fail_writes.clone(), faults.encoding);
        drop(faults);

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(message) = failure {
            return Err(RpcError::new(message));
        }

        let output = self.shared.apply(&self.signer, &self.call).await?;
        let tx = self.shared.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        let receipt = Receipt {
            tx_hash: format!("0x{tx:064x}"),
            output: Some(encode(&output, encoding)),
        };
        self.receipt = Some(receipt.clone());
        Ok(receipt)
    }

    async fn decode_output(&mut self) -> Result<RawOutput, RpcError> {
        self.receipt
            .as_ref()
            .and_then(|r| r.output.clone())
            .ok_or_else(|| RpcError::new("transaction is not final"))
    }
}

impl Shared {
    fn mint(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("ix_{n:016x}")
    }

    async fn apply(&self, signer: &ActorAddress, call: &RoutineCall) -> Result<Value, RpcError> {
        let args = Args::new(call);
        let mut partitions = self.partitions.write().await;

        if call.routine == logic::ENLIST {
            let agent_id = args.str(0)?;
            if partitions.contains_key(signer) {
                return Err(RpcError::new(format!("actor {signer} already enlisted")));
            }
            partitions.insert(signer.clone(), Partition::new(agent_id.clone()));
            return Ok(json!({ "agent_id": agent_id }));
        }

        let partition = partitions
            .get_mut(signer)
            .ok_or_else(|| RpcError::new(format!("caller {signer} not enlisted")))?;

        if call.routine == logic::LOG_REQUEST {
            let requested = args.str(0)?;
            let interaction_id = if requested.is_empty() {
                self.mint()
            } else {
                requested
            };
            if partition.contains(&interaction_id) {
                return Err(RpcError::new(format!(
                    "interaction already logged: {interaction_id}"
                )));
            }
            partition.log_request(RequestEntry {
                interaction_id: interaction_id.clone(),
                counterparty: args.str(1)?,
                is_sender: args.bool(2)?,
                request_hash: args.str(3)?,
                intent: args.str(4)?,
                timestamp: args.u64(5)?,
                correlation: Correlation {
                    context_id: args.str(6)?,
                    task_id: args.str(7)?,
                    message_id: args.str(8)?,
                    end_user_id: args.str(9)?,
                    end_user_session_id: args.str(10)?,
                },
            });
            return Ok(json!({ "interaction_id": interaction_id }));
        }

        let status_code = u16::try_from(args.u64(4)?)
            .map_err(|_| RpcError::new("status code out of range"))?;
        partition
            .log_response(ResponseEntry {
                interaction_id: args.str(0)?,
                is_sender: args.bool(2)?,
                response_hash: args.str(3)?,
                status_code,
                timestamp: args.u64(5)?,
            })
            .map_err(RpcError::new)?;
        Ok(json!({}))
    }

    async fn query(&self, call: &RoutineCall, index: IndexState) -> Result<Value, RpcError> {
        let args = Args::new(call);
        let actor = ActorAddress::new(args.str(0)?);
        let partitions = self.partitions.read().await;
        let partition = match (index, partitions.get(&actor)) {
            (IndexState::Missing, _) | (_, None) => {
                return Err(RpcError::new(STORAGE_NOT_FOUND));
            }
            (_, Some(p)) => p,
        };
        let stale = index == IndexState::Stale;

        match call.routine.as_str() {
            logic::GET_INTERACTION => {
                let id = args.str(1)?;
                match partition.find(&id).filter(|_| !stale) {
                    Some(record) => Ok(json!({ "record": flatten(record), "found": true })),
                    None => Ok(json!({ "record": null, "found": false })),
                }
            }
            logic::LIST_INTERACTIONS => {
                if stale {
                    return Ok(json!({ "records": [], "total": 0 }));
                }
                let limit = usize::try_from(args.u64(1)?).unwrap_or(usize::MAX);
                let offset = usize::try_from(args.u64(2)?).unwrap_or(usize::MAX);
                let records: Vec<Value> = partition
                    .page(limit, offset)
                    .into_iter()
                    .map(|r| Value::Object(flatten(r)))
                    .collect();
                Ok(json!({ "records": records, "total": partition.len() }))
            }
            _ => Ok(json!({ "stats": stats_value(partition.stats()), "found": true })),
        }
    }
}

/// Positional argument access with ledger-style error messages.
struct Args<'a> {
    routine: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(call: &'a RoutineCall) -> Self {
        Self {
            routine: &call.routine,
            values: &call.args,
        }
    }

    fn get(&self, i: usize) -> Result<&'a Value, RpcError> {
        self.values
            .get(i)
            .ok_or_else(|| RpcError::new(format!("{}: missing argument {i}", self.routine)))
    }

    fn invalid(&self, i: usize) -> RpcError {
        RpcError::new(format!("{}: invalid argument {i}", self.routine))
    }

    fn str(&self, i: usize) -> Result<String, RpcError> {
        self.get(i)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.invalid(i))
    }

    fn bool(&self, i: usize) -> Result<bool, RpcError> {
        self.get(i)?.as_bool().ok_or_else(|| self.invalid(i))
    }

    fn u64(&self, i: usize) -> Result<u64, RpcError> {
        let value = self.get(i)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| self.invalid(i))
    }
}

fn encode(value: &Value, encoding: OutputEncoding) -> RawOutput {
    match encoding {
        OutputEncoding::Structured => RawOutput::Structured(value.clone()),
        OutputEncoding::JsonBytes => RawOutput::Bytes(value.to_string().into_bytes()),
        OutputEncoding::Opaque => {
            let mut bytes = vec![0x0e, 0x01];
            if let Some(id) = value.get("interaction_id").and_then(Value::as_str) {
                bytes.extend_from_slice(id.as_bytes());
            }
            bytes.push(0x00);
            RawOutput::Bytes(bytes)
        }
    }
}
