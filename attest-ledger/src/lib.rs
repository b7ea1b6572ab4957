//! # attest-ledger — one agent's client for the interaction logic
//!
//! [`InteractionLedger`] is the state machine for one agent's half of every
//! exchange: it enlists the agent, logs requests (minting interaction ids
//! on demand) and responses, and reads records and counters back.
//!
//! Reads go through a resilient path: the indexed routine first, raw
//! partition traversal when the index cannot answer. Both paths return
//! field-identical records.
//!
//! ```no_run
//! # async fn demo(
//! #     conn: std::sync::Arc<impl attest0::RoutineInvoker + attest0::PartitionReader + 'static>,
//! # ) -> Result<(), attest0::LedgerError> {
//! use attest_ledger::{InteractionLedger, LedgerConfig, LogRequest};
//!
//! let ledger = InteractionLedger::connect(
//!     conn.clone(),
//!     conn,
//!     "agent_1",
//!     LedgerConfig::new("logic_1"),
//! )
//! .await?;
//! ledger.enlist().await?;
//! let id = ledger
//!     .log_request(LogRequest {
//!         counterparty: "agent_2".into(),
//!         is_sender: true,
//!         request_hash: "ab12..".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod audit;
mod client;
pub mod config;
pub mod decode;
mod read;

pub use audit::{CrossCheck, Side, Verification, cross_check, verify_payload, verify_request};
pub use client::{InteractionLedger, LogRequest, LogResponse};
pub use config::{DEFAULT_KNOWN_IDS, LedgerConfig};
pub use decode::{Decoded, decode_query_result, decode_routine_result, interaction_id_of};
