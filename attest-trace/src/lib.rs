//! # attest-trace — record agent-to-agent calls on the interaction ledger
//!
//! Two decorators, one per side of an exchange:
//!
//! | Side | Wrapper | Wraps |
//! |------|---------|-------|
//! | Caller | [`TracedClient`] | [`Transport`](attest0::Transport) |
//! | Callee | [`TracedHandler`] | [`RequestHandler`](attest0::RequestHandler) |
//!
//! Both talk to the ledger only through the observe port
//! ([`InteractionObserver`]), which never fails and never blocks the
//! primary call for longer than the configured log timeout. The caller's
//! ledger mints the interaction id; the id travels to the callee in the
//! trace envelope so both partitions record the exchange under it.
//!
//! [`Tracer`] bundles the shared pieces and hands out wrappers.

#![deny(missing_docs)]

pub mod config;
mod envelope;
mod inbound;
pub mod observe;
mod outbound;
mod tracer;

pub use config::{DEFAULT_LOG_TIMEOUT, LOG_TIMEOUT_ENV, TraceConfig};
pub use inbound::TracedHandler;
pub use observe::{InteractionObserver, LedgerObserver, Stage};
pub use outbound::{Callee, TracedClient};
pub use tracer::Tracer;
