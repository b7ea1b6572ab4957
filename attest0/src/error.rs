//! Error types for each protocol boundary.

use thiserror::Error;

/// Message class the ledger uses when an actor's storage (and therefore
/// its query index) has not been materialised yet.
pub const STORAGE_NOT_FOUND: &str = "logic storage tree not found";

/// What an [`RpcError`] means to the provenance protocol.
///
/// The ledger reports failures as free-form messages. Matching on those
/// messages happens here and nowhere else.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcFault {
    /// The actor's storage/index does not exist yet.
    IndexNotReady,
    /// Registration was attempted for an actor that is already registered.
    AlreadyEnlisted,
    /// A write was attempted by an actor that never registered.
    NotEnlisted,
    /// A response was logged for an id this partition has never seen.
    InteractionNotFound,
    /// Anything else.
    Other,
}

/// A failure reported by the ledger collaborator.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RpcError {
    /// The ledger's message, verbatim.
    pub message: String,
}

impl RpcError {
    /// Wrap a ledger message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Classify the failure.
    pub fn fault(&self) -> RpcFault {
        let msg = self.message.to_ascii_lowercase();
        if msg.contains(STORAGE_NOT_FOUND) {
            RpcFault::IndexNotReady
        } else if msg.contains("already enlisted") {
            RpcFault::AlreadyEnlisted
        } else if msg.contains("not enlisted") {
            RpcFault::NotEnlisted
        } else if msg.contains("interaction not found") {
            RpcFault::InteractionNotFound
        } else {
            RpcFault::Other
        }
    }
}

/// Interaction ledger client errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The interaction logic could not be loaded. Fatal at startup.
    #[error("failed to load logic {logic_id}: {reason}")]
    ContractLoad {
        /// Logic that failed to load.
        logic_id: String,
        /// Why.
        reason: String,
    },

    /// A write was attempted without a signing identity.
    #[error("signer required for {0}")]
    SignerRequired(String),

    /// A write was attempted before this identity enlisted.
    #[error("not enlisted: {0}")]
    NotEnlisted(String),

    /// A response was logged for an id unknown to this partition.
    #[error("interaction not found: {0}")]
    InteractionNotFound(String),

    /// Submission or finality failed. Not retried internally.
    #[error("transaction failed: {message}")]
    Transaction {
        /// What was being submitted.
        message: String,
        /// Transaction hash, if the ledger assigned one.
        tx_hash: Option<String>,
        /// Underlying ledger failure.
        #[source]
        source: Option<RpcError>,
    },

    /// A read failed after the fallback path was exhausted.
    #[error("query failed: {message}")]
    Query {
        /// What was being read.
        message: String,
        /// Underlying ledger failure.
        #[source]
        source: Option<RpcError>,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Identity registry errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the application-layer transport on the calling side.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote agent could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The remote agent answered with a protocol-level error.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Protocol error code.
        code: i64,
        /// Protocol error message.
        message: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from a request handler on the receiving side.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was malformed or unsupported.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The agent failed while producing a response.
    #[error("handler failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
