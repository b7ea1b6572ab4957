//! The ledger collaborator: routine invocation and raw partition reads.
//!
//! The ledger is an external, RPC-accessible state store with its own
//! finality. This crate only defines the two capability shapes the
//! provenance protocol needs from it:
//!
//! | Shape | Trait | Used for |
//! |-------|-------|----------|
//! | Routine invocation | [`RoutineInvoker`] | writes, indexed reads |
//! | Raw partition access | [`PartitionReader`] | fallback reads |
//!
//! Implementations are bound to one actor's signing context. They must be
//! safe for concurrent use; the protocol never serialises calls.

use crate::error::RpcError;
use crate::id::{ActorAddress, LogicId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named routine call with positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineCall {
    /// Routine name as declared by the ledger logic.
    pub routine: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Fuel price offered for state-mutating routines.
    pub fuel_price: u64,
    /// Fuel limit for state-mutating routines.
    pub fuel_limit: u64,
}

impl RoutineCall {
    /// Create a call with no fuel attached (reads).
    pub fn new(routine: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            routine: routine.into(),
            args,
            fuel_price: 0,
            fuel_limit: 0,
        }
    }

    /// Attach fuel for a state-mutating routine.
    #[must_use]
    pub fn with_fuel(mut self, price: u64, limit: u64) -> Self {
        self.fuel_price = price;
        self.fuel_limit = limit;
        self
    }
}

/// Output as the ledger transport hands it over.
///
/// Some transports decode routine outputs for you; others return the
/// encoded bytes. Callers decode both through one adapter rather than
/// branching on shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// Already-decoded structured output.
    Structured(Value),
    /// Encoded bytes the transport did not decode.
    Bytes(Vec<u8>),
}

/// Proof that a submitted transaction reached finality.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// Routine output as attached to the receipt, if any.
    pub output: Option<RawOutput>,
}

/// A submitted, state-mutating routine call.
#[async_trait]
pub trait SubmissionHandle: Send {
    /// Wait until the transaction is final.
    async fn await_finality(&mut self) -> Result<Receipt, RpcError>;

    /// Fetch the routine's output. Call after [`await_finality`](Self::await_finality).
    async fn decode_output(&mut self) -> Result<RawOutput, RpcError>;
}

/// What invoking a routine produced.
pub enum Invocation {
    /// A synchronous read result.
    Output(RawOutput),
    /// A transaction that was submitted and must be awaited.
    Pending(Box<dyn SubmissionHandle>),
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::Output(out) => f.debug_tuple("Output").field(out).finish(),
            Invocation::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Routine invocation against one deployed logic.
#[async_trait]
pub trait RoutineInvoker: Send + Sync {
    /// Confirm the logic exists and its interface is loadable.
    async fn load(&self, logic_id: &LogicId) -> Result<(), RpcError>;

    /// The actor this invoker signs as, or `None` for a read-only invoker.
    fn signer(&self) -> Option<ActorAddress>;

    /// Invoke a routine.
    async fn invoke(&self, call: RoutineCall) -> Result<Invocation, RpcError>;
}

/// Address of one value inside an actor's state partition.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatePath {
    /// A named scalar.
    Scalar {
        /// Field name.
        name: String,
    },
    /// Number of elements in a named ordered collection.
    Length {
        /// Collection name.
        collection: String,
    },
    /// One field of one element of a named ordered collection.
    Element {
        /// Collection name.
        collection: String,
        /// Zero-based index, oldest first.
        index: u64,
        /// Field name.
        field: String,
    },
}

impl StatePath {
    /// Path to a named scalar.
    pub fn scalar(name: impl Into<String>) -> Self {
        StatePath::Scalar { name: name.into() }
    }

    /// Path to a collection's length.
    pub fn length(collection: impl Into<String>) -> Self {
        StatePath::Length {
            collection: collection.into(),
        }
    }

    /// Path to one element field.
    pub fn element(collection: impl Into<String>, index: u64, field: impl Into<String>) -> Self {
        StatePath::Element {
            collection: collection.into(),
            index,
            field: field.into(),
        }
    }
}

/// Raw, per-field reads against an actor's partition.
///
/// Strictly slower than an indexed routine, but available whenever the
/// partition itself exists.
#[async_trait]
pub trait PartitionReader: Send + Sync {
    /// Read one value. Fails with the storage-not-found message class when
    /// the actor has no partition.
    async fn read_field(&self, actor: &ActorAddress, path: &StatePath) -> Result<Value, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn _assert_send_sync<T: Send + Sync>() {}
    fn _assert_send<T: Send>() {}

    #[test]
    fn collaborator_traits_are_object_safe() {
        _assert_send_sync::<Arc<dyn RoutineInvoker>>();
        _assert_send_sync::<Arc<dyn PartitionReader>>();
        _assert_send::<Box<dyn SubmissionHandle>>();
        _assert_send::<Invocation>();
    }

    #[test]
    fn state_path_wire_shape() {
        let path = StatePath::element("interactions", 3, "request_hash");
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!({
                "kind": "element",
                "collection": "interactions",
                "index": 3,
                "field": "request_hash"
            })
        );
    }
}
