//! The observe port: best-effort ledger writes that never fail the
//! primary call.
//!
//! Each write runs as a detached task and is awaited under a deadline.
//! Past the deadline the caller moves on; the write keeps running and may
//! still land. Failures and timeouts become warnings.

use async_trait::async_trait;
use attest0::{AgentId, InteractionId, LedgerError};
use attest_ledger::{InteractionLedger, LogRequest, LogResponse};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Where in an exchange a ledger write happens. Used as a log label.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Caller logs the request it is about to send.
    OutgoingRequest,
    /// Caller logs the reply it received.
    IncomingResponse,
    /// Caller logs the transport failure it received.
    IncomingResponseError,
    /// Callee logs the request it received.
    IncomingRequest,
    /// Callee logs the reply it produced.
    OutgoingResponse,
    /// Callee logs its handler's failure.
    OutgoingResponseError,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::OutgoingRequest => "outgoing request",
            Stage::IncomingResponse => "incoming response",
            Stage::IncomingResponseError => "incoming response (error)",
            Stage::IncomingRequest => "incoming request",
            Stage::OutgoingResponse => "outgoing response",
            Stage::OutgoingResponseError => "outgoing response (error)",
        })
    }
}

/// Receives one side's view of each exchange.
///
/// Deliberately infallible: implementations report problems through
/// logging and return `None` when no id could be recorded.
#[async_trait]
pub trait InteractionObserver: Send + Sync {
    /// Record a request. Returns the id it was recorded under.
    async fn request(&self, req: LogRequest, stage: Stage) -> Option<InteractionId>;

    /// Record a response.
    async fn response(&self, resp: LogResponse, stage: Stage);
}

/// [`InteractionObserver`] backed by an [`InteractionLedger`].
pub struct LedgerObserver {
    ledger: Arc<InteractionLedger>,
    timeout: Duration,
}

impl LedgerObserver {
    /// Observe into `ledger`, waiting at most `timeout` per write.
    pub fn new(ledger: Arc<InteractionLedger>, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    async fn detached<T, F>(
        &self,
        stage: Stage,
        interaction_id: &InteractionId,
        counterparty: &AgentId,
        write: F,
    ) -> Option<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, LedgerError>> + Send + 'static,
    {
        let task = tokio::spawn(write);
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => Some(value),
            Ok(Ok(Err(e))) => {
                tracing::warn!(
                    %interaction_id,
                    %counterparty,
                    stage = %stage,
                    error = %e,
                    "ledger write failed"
                );
                None
            }
            Ok(Err(join)) => {
                tracing::warn!(%interaction_id, %counterparty, stage = %stage, error = %join, "ledger write task aborted");
                None
            }
            Err(_elapsed) => {
                tracing::warn!(
                    %interaction_id,
                    %counterparty,
                    stage = %stage,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "ledger write timed out, continuing without it"
                );
                None
            }
        }
    }
}

#[async_trait]
impl InteractionObserver for LedgerObserver {
    async fn request(&self, req: LogRequest, stage: Stage) -> Option<InteractionId> {
        let (id, counterparty) = (req.interaction_id.clone(), req.counterparty.clone());
        let ledger = Arc::clone(&self.ledger);
        self.detached(stage, &id, &counterparty, async move {
            ledger.log_request(req).await
        })
        .await
    }

    async fn response(&self, resp: LogResponse, stage: Stage) {
        let (id, counterparty) = (resp.interaction_id.clone(), resp.counterparty.clone());
        let ledger = Arc::clone(&self.ledger);
        self.detached(stage, &id, &counterparty, async move {
            ledger.log_response(resp).await
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::OutgoingRequest.to_string(), "outgoing request");
        assert_eq!(
            Stage::IncomingResponseError.to_string(),
            "incoming response (error)"
        );
    }

    fn _assert_object_safe(_: Arc<dyn InteractionObserver>) {}
}
