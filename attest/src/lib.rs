#![deny(missing_docs)]
//! # attest — umbrella crate
//!
//! A single import surface for interaction provenance. Re-exports the
//! protocol and its implementations behind feature flags, plus a
//! `prelude` for wiring an agent.

#[cfg(feature = "core")]
pub use attest0;
#[cfg(feature = "core")]
pub use attest_codec;
#[cfg(feature = "core")]
pub use attest_ledger;
#[cfg(feature = "ledger-memory")]
pub use attest_ledger_memory;
#[cfg(feature = "trace")]
pub use attest_trace;

/// Happy-path imports for tracing an agent.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use attest0::{
        ActorAddress, AgentId, AgentInteractionStats, AgentRegistry, CallContext, EndUser,
        InteractionId, InteractionRecord, LedgerError, LogicId, PartitionReader, RequestHandler,
        RoutineInvoker, TraceEnvelope, Transport,
    };

    #[cfg(feature = "core")]
    pub use attest_codec::{derive_intent, extract_trace, hash_payload, request_hash};

    #[cfg(feature = "core")]
    pub use attest_ledger::{InteractionLedger, LedgerConfig};

    #[cfg(feature = "trace")]
    pub use attest_trace::{Callee, InteractionObserver, TraceConfig, Tracer};

    #[cfg(feature = "ledger-memory")]
    pub use attest_ledger_memory::MemoryLedger;
}
