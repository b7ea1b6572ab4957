//! # attest0 — Protocol types for agent interaction provenance
//!
//! This crate defines the data model of the provenance protocol and the
//! three external collaborators it talks to.
//!
//! ## The Data Model
//!
//! | Type | What it is |
//! |------|-----------|
//! | [`InteractionRecord`] | One agent's ledger row for one exchange |
//! | [`AgentInteractionStats`] | Per-agent counters derived by the ledger |
//! | [`TraceEnvelope`] | In-band metadata correlating a message to a ledger id |
//!
//! ## The Collaborators
//!
//! | Collaborator | Traits | What it does |
//! |--------------|--------|-------------|
//! | Ledger | [`RoutineInvoker`], [`PartitionReader`] | Writes, indexed reads, raw partition reads |
//! | Identity registry | [`AgentRegistry`] | Resolves agents to ledger addresses |
//! | Transport | [`Transport`], [`RequestHandler`] | Carries requests and replies |
//!
//! ## Design Principle
//!
//! Each agent writes only its own ledger partition. The two halves of an
//! exchange are correlated by an [`InteractionId`] carried in the
//! [`TraceEnvelope`], never by a shared write. Nothing in this crate
//! talks to a network; implementations live in the `attest-*` crates.

#![deny(missing_docs)]

pub mod envelope;
pub mod error;
pub mod id;
pub mod ledger;
pub mod logic;
pub mod message;
pub mod record;
pub mod registry;
pub mod transport;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use envelope::{EndUser, TRACE_EXTENSION_URI, TraceCorrelation, TraceEnvelope};
pub use error::{HandlerError, LedgerError, RegistryError, RpcError, RpcFault, TransportError};
pub use id::{ActorAddress, AgentId, InteractionId, LogicId, normalize_identifier};
pub use ledger::{
    Invocation, PartitionReader, RawOutput, Receipt, RoutineCall, RoutineInvoker, StatePath,
    SubmissionHandle,
};
pub use message::{Message, Part, Reply, Role, SendParams, StreamEvent, Task, TaskState};
pub use record::{
    AgentInteractionStats, Correlation, InteractionPage, InteractionRecord, STATUS_ERROR,
    STATUS_OK, STATUS_PENDING,
};
pub use registry::{AgentProfile, AgentRegistry, AgentStatus};
pub use transport::{CallContext, EventStream, RequestHandler, Transport};
