//! Tracing around an agent's outgoing calls.

use crate::config::TraceConfig;
use crate::envelope::{conversation_id, now_millis, transport_correlation};
use crate::observe::{InteractionObserver, Stage};
use async_trait::async_trait;
use attest0::{
    AgentId, AgentRegistry, EndUser, InteractionId, Reply, SendParams, TraceEnvelope, Transport,
    TransportError, STATUS_ERROR, STATUS_OK, normalize_identifier,
};
use attest_codec::{derive_intent, error_payload, hash_payload, hash_value, inject_trace, request_hash};
use attest_ledger::{LogRequest, LogResponse};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::Instrument;

/// Who the wrapped transport talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// Known agent id; no registry lookup.
    Id(AgentId),
    /// Endpoint URL, resolved through the registry on first use.
    Url(String),
}

/// A [`Transport`] that records the caller's half of every exchange.
///
/// Per call: build and inject a trace envelope, log the request (the
/// ledger mints the id), re-inject the envelope with that id, send, then
/// log the reply or the failure. Ledger trouble never changes what the
/// caller sees; transport errors come back unchanged.
pub struct TracedClient {
    inner: Arc<dyn Transport>,
    observer: Arc<dyn InteractionObserver>,
    registry: Arc<dyn AgentRegistry>,
    caller: AgentId,
    callee: Callee,
    resolved: OnceCell<AgentId>,
    end_user: Option<EndUser>,
    config: TraceConfig,
}

impl TracedClient {
    /// Wrap `inner`, logging as `caller` through `observer`. A
    /// [`Callee::Id`] is normalized before use.
    pub fn new(
        inner: Arc<dyn Transport>,
        observer: Arc<dyn InteractionObserver>,
        registry: Arc<dyn AgentRegistry>,
        caller: AgentId,
        callee: Callee,
        config: TraceConfig,
    ) -> Self {
        let resolved = match &callee {
            Callee::Id(id) => {
                OnceCell::new_with(Some(AgentId::new(normalize_identifier(id.as_str()))))
            }
            Callee::Url(_) => OnceCell::new(),
        };
        Self {
            inner,
            observer,
            registry,
            caller,
            callee,
            resolved,
            end_user: None,
            config,
        }
    }

    /// Attribute every call to an end user.
    #[must_use]
    pub fn with_end_user(mut self, end_user: EndUser) -> Self {
        self.end_user = Some(end_user);
        self
    }

    /// The callee's agent id, resolving it if needed. Lookup failures are
    /// retried on the next call.
    async fn callee_id(&self) -> Option<AgentId> {
        let Callee::Url(url) = &self.callee else {
            return self.resolved.get().cloned();
        };
        let lookup = self
            .resolved
            .get_or_try_init(|| async {
                match self.registry.resolve_by_url(url).await {
                    Ok(Some(profile)) => Ok(profile.agent_id),
                    Ok(None) => Err(format!("no agent registered at {url}")),
                    Err(e) => Err(e.to_string()),
                }
            })
            .await;
        match lookup {
            Ok(id) => Some(id.clone()),
            Err(reason) => {
                tracing::warn!(%url, %reason, "callee unresolved, sending untraced");
                None
            }
        }
    }

    async fn traced_send(
        &self,
        mut params: SendParams,
        callee: AgentId,
    ) -> Result<Reply, TransportError> {
        let message = &params.message;
        let mut envelope = TraceEnvelope {
            conversation_id: conversation_id(message),
            interaction_id: InteractionId::default(),
            caller_id: self.caller.clone(),
            callee_id: callee.clone(),
            end_user: self.end_user.clone(),
            correlation: transport_correlation(message),
            intent: derive_intent(message),
            client_timestamp_ms: now_millis(),
        };
        inject_trace(&mut params.message, &envelope);

        let hash = match request_hash(&params, &self.config.method) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, "request not hashable, sending untraced");
                return self.inner.send_message(params).await;
            }
        };

        let logged = self
            .observer
            .request(
                LogRequest {
                    interaction_id: InteractionId::default(),
                    counterparty: callee.clone(),
                    is_sender: true,
                    request_hash: hash,
                    intent: envelope.intent.clone(),
                    timestamp: 0,
                    correlation: envelope.ledger_correlation(),
                },
                Stage::OutgoingRequest,
            )
            .await;
        if let Some(id) = &logged {
            envelope.interaction_id = id.clone();
            inject_trace(&mut params.message, &envelope);
        }

        let result = self.inner.send_message(params).await;

        let Some(interaction_id) = logged else {
            tracing::debug!("request was not logged, skipping response log");
            return result;
        };
        let (response_hash, status_code, stage) = match &result {
            Ok(reply) => (hash_payload(reply), STATUS_OK, Stage::IncomingResponse),
            Err(e) => (
                Ok(hash_value(&error_payload(&e.to_string()))),
                STATUS_ERROR,
                Stage::IncomingResponseError,
            ),
        };
        let response_hash = match response_hash {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(%interaction_id, error = %e, "reply not hashable");
                return result;
            }
        };
        self.observer
            .response(
                LogResponse {
                    interaction_id,
                    counterparty: callee,
                    is_sender: false,
                    response_hash,
                    status_code,
                    timestamp: 0,
                },
                stage,
            )
            .await;
        result
    }
}

#[async_trait]
impl Transport for TracedClient {
    async fn send_message(&self, params: SendParams) -> Result<Reply, TransportError> {
        let Some(callee) = self.callee_id().await else {
            return self.inner.send_message(params).await;
        };
        let span = tracing::info_span!("attest.outbound", caller = %self.caller, callee = %callee);
        self.traced_send(params, callee).instrument(span).await
    }
}
