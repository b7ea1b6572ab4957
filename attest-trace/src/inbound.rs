//! Tracing around an agent's incoming requests.

use crate::config::TraceConfig;
use crate::envelope::synthesize;
use crate::observe::{InteractionObserver, Stage};
use async_trait::async_trait;
use attest0::{
    AgentId, CallContext, EventStream, HandlerError, InteractionId, Reply, RequestHandler,
    SendParams, STATUS_ERROR, STATUS_OK, StreamEvent, TraceEnvelope,
};
use attest_codec::{
    CodecError, METHOD_STREAM, error_payload, extract_trace, hash_payload, hash_value,
    inject_trace, request_hash,
};
use attest_ledger::{LogRequest, LogResponse};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;

/// A [`RequestHandler`] that records the callee's half of every exchange.
///
/// The envelope is read, never changed, when the caller sent one. A
/// request without one gets a synthesized envelope; a request whose
/// caller cannot be determined is handled untraced. All ledger writes are
/// best-effort and bounded by the configured timeout.
pub struct TracedHandler {
    inner: Arc<dyn RequestHandler>,
    observer: Arc<dyn InteractionObserver>,
    callee: AgentId,
    config: TraceConfig,
}

/// What the handler knows about one traced request.
struct Traced {
    caller: AgentId,
    interaction_id: Option<InteractionId>,
}

impl TracedHandler {
    /// Wrap `inner`, logging as `callee` through `observer`.
    pub fn new(
        inner: Arc<dyn RequestHandler>,
        observer: Arc<dyn InteractionObserver>,
        callee: AgentId,
        config: TraceConfig,
    ) -> Self {
        Self {
            inner,
            observer,
            callee,
            config,
        }
    }

    /// Find or synthesize the envelope. `None` when the caller is unknown.
    ///
    /// A received envelope without a caller id takes the authenticated
    /// caller from `ctx`; the message itself is left as received.
    fn envelope(&self, params: &mut SendParams, ctx: &CallContext) -> Option<TraceEnvelope> {
        let mut envelope = match extract_trace(&params.message) {
            Some(envelope) => envelope,
            None => {
                let envelope = synthesize(&params.message, ctx.caller.clone(), self.callee.clone());
                inject_trace(&mut params.message, &envelope);
                envelope
            }
        };
        if envelope.caller_id.is_empty() {
            match ctx.caller.clone().filter(|caller| !caller.is_empty()) {
                Some(caller) => envelope.caller_id = caller,
                None => {
                    tracing::debug!(message_id = %params.message.message_id, "no caller id, tracing skipped");
                    return None;
                }
            }
        }
        Some(envelope)
    }

    /// Log the incoming request. The id comes back from the ledger: the
    /// caller's if the envelope carried one, freshly minted otherwise.
    async fn log_request(
        &self,
        envelope: &TraceEnvelope,
        hash: Result<String, CodecError>,
    ) -> Traced {
        let caller = envelope.caller_id.clone();
        let request_hash = match hash {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(interaction_id = %envelope.interaction_id, error = %e, "request not hashable");
                return Traced {
                    caller,
                    interaction_id: None,
                };
            }
        };
        let interaction_id = self
            .observer
            .request(
                LogRequest {
                    interaction_id: envelope.interaction_id.clone(),
                    counterparty: caller.clone(),
                    is_sender: false,
                    request_hash,
                    intent: envelope.intent.clone(),
                    timestamp: 0,
                    correlation: envelope.ledger_correlation(),
                },
                Stage::IncomingRequest,
            )
            .await;
        Traced {
            caller,
            interaction_id,
        }
    }
}

/// Log the reply (or failure) for a traced request.
async fn log_response(
    observer: &dyn InteractionObserver,
    traced: Traced,
    response_hash: Result<String, CodecError>,
    status_code: u16,
) {
    let Some(interaction_id) = traced.interaction_id else {
        tracing::debug!(caller = %traced.caller, "request was not logged, skipping response log");
        return;
    };
    let response_hash = match response_hash {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(%interaction_id, error = %e, "response not hashable");
            return;
        }
    };
    let stage = if status_code == STATUS_OK {
        Stage::OutgoingResponse
    } else {
        Stage::OutgoingResponseError
    };
    observer
        .response(
            LogResponse {
                interaction_id,
                counterparty: traced.caller,
                is_sender: true,
                response_hash,
                status_code,
                timestamp: 0,
            },
            stage,
        )
        .await;
}

fn failure_hash(error: &HandlerError) -> Result<String, CodecError> {
    Ok(hash_value(&error_payload(&error.to_string())))
}

#[async_trait]
impl RequestHandler for TracedHandler {
    async fn send_message(
        &self,
        mut params: SendParams,
        ctx: &CallContext,
    ) -> Result<Reply, HandlerError> {
        let Some(envelope) = self.envelope(&mut params, ctx) else {
            return self.inner.send_message(params, ctx).await;
        };
        let span = tracing::info_span!(
            "attest.inbound",
            caller = %envelope.caller_id,
            callee = %self.callee,
            interaction_id = %envelope.interaction_id,
        );
        async move {
            let hash = request_hash(&params, &self.config.method);
            let traced = self.log_request(&envelope, hash).await;

            let result = self.inner.send_message(params, ctx).await;
            match &result {
                Ok(reply) => {
                    log_response(self.observer.as_ref(), traced, hash_payload(reply), STATUS_OK).await
                }
                Err(e) => {
                    log_response(self.observer.as_ref(), traced, failure_hash(e), STATUS_ERROR).await
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// The response is logged when the stream yields its final status
    /// update or an error, before that item is handed on. A stream without
    /// either is logged once it ends; dropping such a stream early leaves
    /// the record pending.
    async fn send_message_stream(
        &self,
        mut params: SendParams,
        ctx: &CallContext,
    ) -> Result<EventStream, HandlerError> {
        let Some(envelope) = self.envelope(&mut params, ctx) else {
            return self.inner.send_message_stream(params, ctx).await;
        };
        let span = tracing::info_span!(
            "attest.inbound",
            caller = %envelope.caller_id,
            callee = %self.callee,
            interaction_id = %envelope.interaction_id,
        );

        let hash = request_hash(&params, METHOD_STREAM);
        let traced = self.log_request(&envelope, hash).instrument(span).await;

        let mut events = match self.inner.send_message_stream(params, ctx).await {
            Ok(events) => events,
            Err(e) => {
                log_response(self.observer.as_ref(), traced, failure_hash(&e), STATUS_ERROR).await;
                return Err(e);
            }
        };

        let observer = Arc::clone(&self.observer);
        let stream = async_stream::stream! {
            let mut traced = Some(traced);
            let mut last: Option<StreamEvent> = None;
            while let Some(item) = events.next().await {
                // A final event or an error ends the exchange. Log before
                // handing it on: consumers may drop the stream right after.
                let outcome = match &item {
                    Ok(event) if event.is_final() => Some((hash_payload(event), STATUS_OK)),
                    Ok(event) => {
                        last = Some(event.clone());
                        None
                    }
                    Err(e) => Some((Ok(hash_value(&error_payload(&e.to_string()))), STATUS_ERROR)),
                };
                if let Some((hash, status)) = outcome {
                    if let Some(traced) = traced.take() {
                        log_response(observer.as_ref(), traced, hash, status).await;
                    }
                    yield item;
                    break;
                }
                yield item;
            }
            if let Some(traced) = traced.take() {
                let hash = match last {
                    Some(event) => hash_payload(&event),
                    None => Ok(hash_value(&json!({ "status": "completed" }))),
                };
                log_response(observer.as_ref(), traced, hash, STATUS_OK).await;
            }
        };
        Ok(Box::pin(stream))
    }
}
